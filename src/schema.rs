use crate::error::ReportError;
use crate::loader::RawTable;
use crate::record::{
    CLASS, HIGHEST_NET_PROFIT, INS, NDC, NDC_FOR_HIGHEST, NET_PROFIT, PRESCRIBER, SCRIPT, Variant,
};

/// Positions of the known columns in a validated table
///
/// The four minimal columns are always present; the extended ones are
/// `None` when the table was validated as [`Variant::Minimal`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnMap {
    pub ins: usize,
    pub class: usize,
    pub net_profit: usize,
    pub highest_net_profit: usize,
    pub script: Option<usize>,
    pub ndc: Option<usize>,
    pub ndc_for_highest: Option<usize>,
    pub prescriber: Option<usize>,
}

/// Check that every column the variant needs is present
///
/// All-or-nothing: the error lists every missing column, in the order the
/// variant declares them.
pub fn validate(table: &RawTable, variant: Variant) -> Result<ColumnMap, ReportError> {
    let missing: Vec<String> = variant
        .required_columns()
        .iter()
        .filter(|name| table.column_index(name).is_none())
        .map(|name| name.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(ReportError::SchemaValidation { missing });
    }

    let required = |name: &str| {
        table
            .column_index(name)
            .ok_or_else(|| ReportError::SchemaValidation {
                missing: vec![name.to_string()],
            })
    };
    let extended = |name: &str| {
        if variant.is_extended() {
            table.column_index(name)
        } else {
            None
        }
    };

    Ok(ColumnMap {
        ins: required(INS)?,
        class: required(CLASS)?,
        net_profit: required(NET_PROFIT)?,
        highest_net_profit: required(HIGHEST_NET_PROFIT)?,
        script: extended(SCRIPT),
        ndc: extended(NDC),
        ndc_for_highest: extended(NDC_FOR_HIGHEST),
        prescriber: extended(PRESCRIBER),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str]) -> RawTable {
        RawTable {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    #[test]
    fn minimal_columns_in_any_order() {
        let t = table(&["Highest Net Profit", "extra", "class", "Ins", "Net Profit"]);
        let map = validate(&t, Variant::Minimal).unwrap();
        assert_eq!(map.ins, 3);
        assert_eq!(map.class, 2);
        assert_eq!(map.net_profit, 4);
        assert_eq!(map.highest_net_profit, 0);
        assert_eq!(map.prescriber, None);
    }

    #[test]
    fn reports_every_missing_column() {
        let t = table(&["Ins", "Net Profit"]);
        match validate(&t, Variant::Minimal) {
            Err(ReportError::SchemaValidation { missing }) => {
                assert_eq!(missing, vec!["class", "Highest Net Profit"]);
            }
            other => panic!("expected schema failure, got {other:?}"),
        }
    }

    #[test]
    fn extended_needs_all_eight() {
        let t = table(&["Ins", "class", "Net Profit", "Highest Net Profit", "NDC"]);
        let err = validate(&t, Variant::Extended).unwrap_err();
        assert!(err.is_fatal());
        let message = err.to_string();
        assert!(message.contains("Script"));
        assert!(message.contains("Prescriber"));
        assert!(message.contains("NDC for Highest Net Profit"));
        assert!(!message.contains("Ins,"));
    }

    #[test]
    fn column_names_are_case_sensitive() {
        let t = table(&["ins", "Class", "Net Profit", "Highest Net Profit"]);
        assert!(validate(&t, Variant::Minimal).is_err());
    }
}
