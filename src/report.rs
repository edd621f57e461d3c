use crate::dataset::{Dataset, Selection};
use crate::record::{NET_PROFIT_CHANGE, Record, Variant};
use crate::stats::{self, ChangeSummary, GrandTotals, GroupTotal};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;

/// One row of the filtered data table
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ndc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ndc_for_highest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prescriber: Option<String>,
    pub ins: String,
    pub class: String,
    pub net_profit: f64,
    pub highest_net_profit: f64,
    pub net_profit_change: f64,
}

impl From<&Record> for TableRow {
    fn from(record: &Record) -> Self {
        TableRow {
            script: record.script.clone(),
            ndc: record.ndc.clone(),
            ndc_for_highest: record.ndc_for_highest.clone(),
            prescriber: record.prescriber.clone(),
            ins: record.ins.clone(),
            class: record.class.clone(),
            net_profit: record.net_profit,
            highest_net_profit: record.highest_net_profit,
            net_profit_change: record.net_profit_change(),
        }
    }
}

/// Sums only present for the extended variant
#[derive(Clone, Debug, Default, Serialize)]
pub struct GroupedProfit {
    pub by_prescriber: Vec<GroupTotal>,
    pub by_ndc: Vec<GroupTotal>,
}

/// Everything shown for one carrier / class selection
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub variant: Variant,
    pub generated_at: DateTime<Local>,
    pub selection: Option<Selection>,
    pub carriers: Vec<String>,
    pub classes: Vec<String>,
    pub rows: Vec<TableRow>,
    pub summary: ChangeSummary,
    pub totals: GrandTotals,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grouped: Option<GroupedProfit>,
}

impl Report {
    pub fn build(dataset: &Dataset, selection: Option<&Selection>) -> Self {
        let records: Vec<&Record> = selection
            .map(|s| dataset.filter(s))
            .unwrap_or_default();
        let changes: Vec<f64> = records.iter().map(|r| r.net_profit_change()).collect();

        let grouped = dataset.variant().is_extended().then(|| grouped_profit(&records));

        Report {
            variant: dataset.variant(),
            generated_at: Local::now(),
            selection: selection.cloned(),
            carriers: dataset.carriers().into_iter().map(String::from).collect(),
            classes: selection
                .map(|s| dataset.classes_for(&s.ins))
                .unwrap_or_default()
                .into_iter()
                .map(String::from)
                .collect(),
            rows: records.iter().copied().map(TableRow::from).collect(),
            summary: ChangeSummary::from_values(&changes),
            totals: dataset.grand_totals(),
            grouped,
        }
    }

    pub fn changes(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.net_profit_change).collect()
    }
}

/// Net Profit summed per prescriber and per NDC code
pub fn grouped_profit(records: &[&Record]) -> GroupedProfit {
    GroupedProfit {
        by_prescriber: stats::group_sum(
            records.iter().copied(),
            |r| r.prescriber.as_deref(),
            |r| r.net_profit,
        ),
        by_ndc: stats::group_sum(records.iter().copied(), |r| r.ndc.as_deref(), |r| r.net_profit),
    }
}

/// Format a value the way the dashboard and terminal show it
///
/// NaN is printed as `NaN`; everything else with two decimals.
pub fn display_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        format!("{value:.2}")
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(selection) = &self.selection else {
            writeln!(f, "No insurance carriers found in the dataset.")?;
            return write_totals(f, &self.totals);
        };

        writeln!(f, "Data table for {} - {}", selection.ins, selection.class)?;
        writeln!(
            f,
            "{:<16} {:<16} {:>14} {:>20} {:>18}",
            "Ins", "class", "Net Profit", "Highest Net Profit", NET_PROFIT_CHANGE
        )?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<16} {:<16} {:>14} {:>20} {:>18}",
                row.ins,
                row.class,
                display_value(row.net_profit),
                display_value(row.highest_net_profit),
                display_value(row.net_profit_change)
            )?;
        }
        if self.rows.is_empty() {
            writeln!(f, "(no matching records)")?;
        }

        writeln!(f)?;
        writeln!(f, "Key analytical statistics")?;
        writeln!(f, "  Average Net Profit Change:            {}", display_value(self.summary.mean))?;
        writeln!(f, "  Median Net Profit Change:             {}", display_value(self.summary.median))?;
        writeln!(f, "  Standard Deviation of Net Profit Change: {}", display_value(self.summary.std_dev))?;
        write_totals(f, &self.totals)?;

        if let Some(grouped) = &self.grouped {
            writeln!(f)?;
            writeln!(f, "Net Profit by Prescriber")?;
            write_groups(f, &grouped.by_prescriber)?;
            writeln!(f, "Net Profit by NDC")?;
            write_groups(f, &grouped.by_ndc)?;
        }
        Ok(())
    }
}

fn write_totals(f: &mut fmt::Formatter<'_>, totals: &GrandTotals) -> fmt::Result {
    writeln!(f, "  Total Net Profit Before:              {}", display_value(totals.net_profit))?;
    writeln!(f, "  Total Net Profit After:               {}", display_value(totals.highest_net_profit))?;
    writeln!(f, "  Total changes in Net Profit:          {}", display_value(totals.change))
}

fn write_groups(f: &mut fmt::Formatter<'_>, groups: &[GroupTotal]) -> fmt::Result {
    if groups.is_empty() {
        return writeln!(f, "  (none)");
    }
    for group in groups {
        writeln!(f, "  {:<30} {:>14}", group.key, display_value(group.total))?;
    }
    Ok(())
}
