use serde::Serialize;
use std::fmt;

pub const INS: &str = "Ins";
pub const CLASS: &str = "class";
pub const NET_PROFIT: &str = "Net Profit";
pub const HIGHEST_NET_PROFIT: &str = "Highest Net Profit";
pub const SCRIPT: &str = "Script";
pub const NDC: &str = "NDC";
pub const NDC_FOR_HIGHEST: &str = "NDC for Highest Net Profit";
pub const PRESCRIBER: &str = "Prescriber";

/// Header used for the derived column in tables and exports
pub const NET_PROFIT_CHANGE: &str = "Net Profit Change";

const MINIMAL_COLUMNS: [&str; 4] = [INS, CLASS, NET_PROFIT, HIGHEST_NET_PROFIT];
const EXTENDED_COLUMNS: [&str; 8] = [
    SCRIPT,
    NDC,
    NDC_FOR_HIGHEST,
    PRESCRIBER,
    INS,
    CLASS,
    NET_PROFIT,
    HIGHEST_NET_PROFIT,
];

/// Which column set the input file is expected to carry
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Carrier, class and the two profit columns
    #[default]
    Minimal,

    /// Minimal columns plus script, NDC codes and prescriber
    Extended,
}

impl Variant {
    /// Column names that must all be present in the header row
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            Variant::Minimal => &MINIMAL_COLUMNS,
            Variant::Extended => &EXTENDED_COLUMNS,
        }
    }

    pub fn is_extended(self) -> bool {
        self == Variant::Extended
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Minimal => f.write_str("minimal"),
            Variant::Extended => f.write_str("extended"),
        }
    }
}

/// One claim row after load-time parsing
///
/// The extended fields are `None` for the minimal variant and wherever the
/// source cell was empty.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Record {
    pub script: Option<String>,
    pub ndc: Option<String>,
    pub ndc_for_highest: Option<String>,
    pub prescriber: Option<String>,
    pub ins: String,
    pub class: String,
    pub net_profit: f64,
    pub highest_net_profit: f64,
}

impl Record {
    pub fn new(ins: impl Into<String>, class: impl Into<String>, net_profit: f64, highest_net_profit: f64) -> Self {
        Record {
            script: None,
            ndc: None,
            ndc_for_highest: None,
            prescriber: None,
            ins: ins.into(),
            class: class.into(),
            net_profit,
            highest_net_profit,
        }
    }

    /// Highest Net Profit minus Net Profit
    pub fn net_profit_change(&self) -> f64 {
        self.highest_net_profit - self.net_profit
    }

    pub fn matches(&self, ins: &str, class: &str) -> bool {
        self.ins == ins && self.class == class
    }
}
