use crate::error::ReportError;
use crate::record::{
    CLASS, HIGHEST_NET_PROFIT, INS, NDC, NDC_FOR_HIGHEST, NET_PROFIT, NET_PROFIT_CHANGE,
    PRESCRIBER, SCRIPT, Variant,
};
use crate::report::TableRow;
use rust_xlsxwriter::Workbook;
use std::path::Path;

/// Export formats offered for the filtered table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "xlsx" => Some(ExportFormat::Xlsx),
            _ => None,
        }
    }

    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_name)
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

/// Column headers of the exported table for a variant
pub fn export_headers(variant: Variant) -> Vec<&'static str> {
    let mut headers = Vec::with_capacity(9);
    if variant.is_extended() {
        headers.extend([SCRIPT, NDC, NDC_FOR_HIGHEST, PRESCRIBER]);
    }
    headers.extend([INS, CLASS, NET_PROFIT, HIGHEST_NET_PROFIT, NET_PROFIT_CHANGE]);
    headers
}

enum Field<'a> {
    Text(&'a str),
    Number(f64),
}

fn text(value: &Option<String>) -> Field<'_> {
    Field::Text(value.as_deref().unwrap_or(""))
}

fn row_fields(row: &TableRow, variant: Variant) -> Vec<Field<'_>> {
    let mut fields = Vec::with_capacity(9);
    if variant.is_extended() {
        fields.push(text(&row.script));
        fields.push(text(&row.ndc));
        fields.push(text(&row.ndc_for_highest));
        fields.push(text(&row.prescriber));
    }
    fields.extend([
        Field::Text(&row.ins),
        Field::Text(&row.class),
        Field::Number(row.net_profit),
        Field::Number(row.highest_net_profit),
        Field::Number(row.net_profit_change),
    ]);
    fields
}

/// Convert the filtered table to CSV
///
/// NaN values are written as empty fields.
pub fn to_csv(rows: &[TableRow], variant: Variant) -> Result<String, ReportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(export_headers(variant))?;

    for row in rows {
        let record: Vec<String> = row_fields(row, variant)
            .into_iter()
            .map(|field| match field {
                Field::Text(s) => s.to_string(),
                Field::Number(n) if n.is_nan() => String::new(),
                Field::Number(n) => n.to_string(),
            })
            .collect();
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ReportError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ReportError::Export(e.to_string()))
}

/// Convert the filtered table to XLSX bytes
///
/// Numbers are written as numeric cells; NaN cells are left blank.
pub fn to_xlsx(rows: &[TableRow], variant: Variant) -> Result<Vec<u8>, ReportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, header) in export_headers(variant).into_iter().enumerate() {
        worksheet.write_string(0, col as u16, header)?;
    }

    for (r, row) in rows.iter().enumerate() {
        let r = (r + 1) as u32;
        for (col, field) in row_fields(row, variant).into_iter().enumerate() {
            let col = col as u16;
            match field {
                Field::Text(s) => {
                    worksheet.write_string(r, col, s)?;
                }
                Field::Number(n) if n.is_nan() => {}
                Field::Number(n) => {
                    worksheet.write_number(r, col, n)?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Write the table to `path`, format chosen by extension
pub fn export_to_file(
    rows: &[TableRow],
    variant: Variant,
    path: impl AsRef<Path>,
) -> Result<ExportFormat, ReportError> {
    let path = path.as_ref();
    let format = ExportFormat::from_path(path).ok_or_else(|| {
        ReportError::Export(format!(
            "cannot export to '{}': use a .csv or .xlsx file name",
            path.display()
        ))
    })?;

    match format {
        ExportFormat::Csv => std::fs::write(path, to_csv(rows, variant)?)?,
        ExportFormat::Xlsx => std::fs::write(path, to_xlsx(rows, variant)?)?,
    }
    Ok(format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;

    fn rows() -> Vec<TableRow> {
        let mut extended = Record::new("A, Inc", "1", 100.0, 150.0);
        extended.prescriber = Some("Dr. Lee".into());
        vec![
            TableRow::from(&extended),
            TableRow::from(&Record::new("A, Inc", "1", f64::NAN, 180.0)),
        ]
    }

    #[test]
    fn csv_quotes_and_blanks_nan() {
        let csv = to_csv(&rows(), Variant::Minimal).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Ins,class,Net Profit,Highest Net Profit,Net Profit Change");
        assert_eq!(lines[1], "\"A, Inc\",1,100,150,50");
        assert_eq!(lines[2], "\"A, Inc\",1,,180,");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn extended_csv_has_nine_columns() {
        let csv = to_csv(&rows(), Variant::Extended).unwrap();
        let first = csv.lines().nth(1).unwrap();
        assert!(first.starts_with(",,,Dr. Lee,"));
        assert_eq!(export_headers(Variant::Extended).len(), 9);
    }

    #[test]
    fn xlsx_is_a_zip_container() {
        let bytes = to_xlsx(&rows(), Variant::Minimal).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn format_from_path() {
        assert_eq!(ExportFormat::from_path(Path::new("out.CSV")), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::from_path(Path::new("out.xlsx")), Some(ExportFormat::Xlsx));
        assert_eq!(ExportFormat::from_path(Path::new("out.pdf")), None);
    }

    #[test]
    fn export_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let err = export_to_file(&rows(), Variant::Minimal, dir.path().join("out.pdf")).unwrap_err();
        assert!(matches!(err, ReportError::Export(_)));
    }
}
