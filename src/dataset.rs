use crate::config::SourceConfig;
use crate::error::ReportError;
use crate::loader::{self, RawTable};
use crate::record::{HIGHEST_NET_PROFIT, INS, NET_PROFIT, Record, Variant};
use crate::schema::{self, ColumnMap};
use crate::stats::{self, GrandTotals};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// The claim table for one session
///
/// Built once from a file and never modified afterwards; rendering code
/// borrows it.
#[derive(Clone, Debug)]
pub struct Dataset {
    source: PathBuf,
    variant: Variant,
    records: Vec<Record>,
    dropped_rows: usize,
}

/// A carrier / class pair chosen by the user
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub ins: String,
    pub class: String,
}

impl Selection {
    pub fn new(ins: impl Into<String>, class: impl Into<String>) -> Self {
        Selection {
            ins: ins.into(),
            class: class.into(),
        }
    }
}

impl Dataset {
    /// Load, validate and normalise the configured file
    pub fn load(config: &SourceConfig) -> Result<Self, ReportError> {
        let table = loader::load_table(&config.path, config.sheet.as_deref())?;
        Self::from_table(&config.path, &table, config.variant)
    }

    /// Build a dataset from an already loaded table
    ///
    /// Fails with [`ReportError::SchemaValidation`] when a required column
    /// is missing, and with [`ReportError::FileLoad`] when a profit cell
    /// holds text that is not a number. Rows with an empty `Ins` are dropped.
    pub fn from_table(
        source: impl AsRef<Path>,
        table: &RawTable,
        variant: Variant,
    ) -> Result<Self, ReportError> {
        let source = source.as_ref();
        let columns = schema::validate(table, variant)?;

        let mut records = Vec::with_capacity(table.rows.len());
        let mut dropped_rows = 0;
        for index in 0..table.rows.len() {
            match parse_row(source, table, index, &columns)? {
                Some(record) => records.push(record),
                None => dropped_rows += 1,
            }
        }

        if dropped_rows > 0 {
            warn!("dropped {dropped_rows} rows with an empty '{INS}' value");
        }
        info!(
            "{} records ready ({} variant) from {}",
            records.len(),
            variant,
            source.display()
        );

        Ok(Dataset {
            source: source.to_path_buf(),
            variant,
            records,
            dropped_rows,
        })
    }

    /// Build a dataset directly from typed records, e.g. for tests
    pub fn from_records(variant: Variant, records: Vec<Record>) -> Self {
        Dataset {
            source: PathBuf::new(),
            variant,
            records,
            dropped_rows: 0,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn dropped_rows(&self) -> usize {
        self.dropped_rows
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct carriers in sorted order
    pub fn carriers(&self) -> Vec<&str> {
        self.records
            .iter()
            .map(|r| r.ins.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct classes seen for `ins`, in sorted order
    pub fn classes_for(&self, ins: &str) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| r.ins == ins)
            .map(|r| r.class.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Resolve a possibly partial choice into a selection
    ///
    /// A missing or empty carrier falls back to the first sorted carrier, a
    /// missing or empty class to the first sorted class of that carrier.
    /// Values that are given but unknown are kept and will match nothing.
    /// Returns `None` only when the dataset has no carriers at all.
    pub fn select(&self, ins: Option<&str>, class: Option<&str>) -> Option<Selection> {
        let ins = match ins.filter(|s| !s.is_empty()) {
            Some(ins) => ins.to_string(),
            None => self.carriers().first()?.to_string(),
        };
        let class = match class.filter(|s| !s.is_empty()) {
            Some(class) => class.to_string(),
            None => self
                .classes_for(&ins)
                .first()
                .map(|c| c.to_string())
                .unwrap_or_default(),
        };
        Some(Selection { ins, class })
    }

    /// Records matching both the carrier and the class of `selection`
    pub fn filter(&self, selection: &Selection) -> Vec<&Record> {
        let matched: Vec<&Record> = self
            .records
            .iter()
            .filter(|r| r.matches(&selection.ins, &selection.class))
            .collect();
        debug!(
            "{} of {} records match {} / {}",
            matched.len(),
            self.records.len(),
            selection.ins,
            selection.class
        );
        matched
    }

    /// Totals over every loaded record, regardless of any selection
    pub fn grand_totals(&self) -> GrandTotals {
        let net: Vec<f64> = self.records.iter().map(|r| r.net_profit).collect();
        let highest: Vec<f64> = self.records.iter().map(|r| r.highest_net_profit).collect();
        GrandTotals::new(stats::sum(&net), stats::sum(&highest))
    }
}

fn parse_row(
    source: &Path,
    table: &RawTable,
    index: usize,
    columns: &ColumnMap,
) -> Result<Option<Record>, ReportError> {
    let cell = |col: usize| table.cell(index, col);
    let optional = |col: Option<usize>| col.and_then(|c| cell(c).to_text());
    let number = |col: usize, name: &str| {
        cell(col).to_number().ok_or_else(|| {
            ReportError::file_load(
                source,
                format!(
                    "row {}, column '{}': {:?} is not a number",
                    index + 2,
                    name,
                    cell(col)
                ),
            )
        })
    };

    let Some(ins) = cell(columns.ins).to_text() else {
        return Ok(None);
    };

    Ok(Some(Record {
        script: optional(columns.script),
        ndc: optional(columns.ndc),
        ndc_for_highest: optional(columns.ndc_for_highest),
        prescriber: optional(columns.prescriber),
        ins,
        class: cell(columns.class)
            .to_text()
            .unwrap_or_else(|| "nan".to_string()),
        net_profit: number(columns.net_profit, NET_PROFIT)?,
        highest_net_profit: number(columns.highest_net_profit, HIGHEST_NET_PROFIT)?,
    }))
}
