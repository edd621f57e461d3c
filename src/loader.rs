use crate::error::ReportError;
use calamine::{Data, Reader, open_workbook_auto};
use log::{debug, info};
use std::path::Path;

/// A single untyped cell as read from the source file
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Text form of the cell, `None` when the cell is empty
    ///
    /// Integral numbers drop their fraction so that a class stored as `3.0`
    /// and one stored as `3` both read back as `"3"`.
    pub fn to_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(n) => Some(number_to_text(*n)),
            CellValue::Bool(true) => Some("True".to_string()),
            CellValue::Bool(false) => Some("False".to_string()),
        }
    }

    /// Numeric form of the cell; empty cells are NaN
    ///
    /// Returns `None` for text that does not parse as a number.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            CellValue::Empty => Some(f64::NAN),
            CellValue::Number(n) => Some(*n),
            CellValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Some(f64::NAN)
                } else {
                    trimmed.parse().ok()
                }
            }
        }
    }
}

fn number_to_text(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Header row plus data rows, exactly as found in the file
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell at `row`, `col`; [`CellValue::Empty`] outside the table
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&CellValue::Empty)
    }
}

/// Text markers read as a missing value, matched exactly
pub const NA_MARKERS: [&str; 19] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null", "",
];

fn is_na_marker(text: &str) -> bool {
    NA_MARKERS.contains(&text)
}

/// Load a table from a CSV file
///
/// The first record is the header row. Empty fields become
/// [`CellValue::Empty`], fields that parse as numbers become
/// [`CellValue::Number`], everything else is kept as text. Rows whose length
/// differs from the header are rejected as malformed.
pub fn from_csv(filepath: impl AsRef<Path>) -> Result<RawTable, ReportError> {
    let path = filepath.as_ref();
    let mut reader =
        csv::Reader::from_path(path).map_err(|e| ReportError::file_load(path, e))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ReportError::file_load(path, e))?
        .iter()
        .map(String::from)
        .collect();

    if headers.is_empty() {
        return Err(ReportError::file_load(path, "CSV file is empty"));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ReportError::file_load(path, e))?;
        rows.push(record.iter().map(parse_csv_field).collect());
    }

    Ok(RawTable { headers, rows })
}

fn parse_csv_field(field: &str) -> CellValue {
    if is_na_marker(field) {
        return CellValue::Empty;
    }
    match field.trim().parse::<f64>() {
        Ok(n) => CellValue::Number(n),
        Err(_) => CellValue::Text(field.to_string()),
    }
}

/// Load a table from a spreadsheet workbook
///
/// Reads the named worksheet, or the first one when `sheet` is `None`. The
/// first row of the used range is the header row.
pub fn from_excel(filepath: impl AsRef<Path>, sheet: Option<&str>) -> Result<RawTable, ReportError> {
    let path = filepath.as_ref();
    let mut workbook = open_workbook_auto(path).map_err(|e| ReportError::file_load(path, e))?;

    let sheet_names = workbook.sheet_names();
    let sheet_name = match sheet {
        Some(name) if sheet_names.iter().any(|s| s == name) => name.to_string(),
        Some(name) => {
            return Err(ReportError::file_load(path, format!("no sheet named '{name}'")));
        }
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| ReportError::file_load(path, "no sheets found in workbook"))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ReportError::file_load(path, e))?;
    debug!(
        "sheet '{}' has {} rows x {} columns",
        sheet_name,
        range.height(),
        range.width()
    );

    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                cell_from_excel(cell)
                    .to_text()
                    .unwrap_or_else(|| format!("Unnamed: {i}"))
            })
            .collect(),
        None => return Err(ReportError::file_load(path, "sheet is empty")),
    };

    let rows = rows
        .map(|row| row.iter().map(cell_from_excel).collect())
        .collect();

    Ok(RawTable { headers, rows })
}

fn cell_from_excel(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) if is_na_marker(s) => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        other => CellValue::Text(other.to_string()),
    }
}

/// Detect file type and load appropriate format
///
/// CSV files go through [`from_csv`]; workbook formats understood by
/// calamine go through [`from_excel`].
pub fn load_table(filepath: impl AsRef<Path>, sheet: Option<&str>) -> Result<RawTable, ReportError> {
    let path = filepath.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    let table = match extension.as_deref() {
        Some("csv") => from_csv(path)?,
        Some("xlsx") | Some("xlsm") | Some("xlsb") | Some("xls") | Some("ods") => {
            from_excel(path, sheet)?
        }
        Some(ext) => {
            return Err(ReportError::file_load(
                path,
                format!("unsupported file extension: {ext}"),
            ));
        }
        None => return Err(ReportError::file_load(path, "file has no extension")),
    };

    info!(
        "loaded {} rows x {} columns from {}",
        table.rows.len(),
        table.headers.len(),
        path.display()
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn number_text_drops_integral_fraction() {
        assert_eq!(CellValue::Number(3.0).to_text().as_deref(), Some("3"));
        assert_eq!(CellValue::Number(-12.0).to_text().as_deref(), Some("-12"));
        assert_eq!(CellValue::Number(2.5).to_text().as_deref(), Some("2.5"));
        assert_eq!(CellValue::Bool(true).to_text().as_deref(), Some("True"));
        assert_eq!(CellValue::Empty.to_text(), None);
    }

    #[test]
    fn empty_cells_are_nan_numbers() {
        assert!(CellValue::Empty.to_number().unwrap().is_nan());
        assert!(CellValue::Text("  ".into()).to_number().unwrap().is_nan());
        assert_eq!(CellValue::Text(" 12.5 ".into()).to_number(), Some(12.5));
        assert_eq!(CellValue::Text("n/a".into()).to_number(), None);
    }

    #[test]
    fn csv_fields_are_typed() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Ins,class,Net Profit,Highest Net Profit").unwrap();
        writeln!(file, "A,7,100,150.5").unwrap();
        writeln!(file, ",x,,-3").unwrap();

        let table = load_table(file.path(), None).unwrap();
        assert_eq!(table.headers[2], "Net Profit");
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][0], CellValue::Text("A".into()));
        assert_eq!(table.rows[0][1], CellValue::Number(7.0));
        assert_eq!(table.rows[0][3], CellValue::Number(150.5));
        assert!(table.rows[1][0].is_null());
        assert!(table.rows[1][2].is_null());
        assert_eq!(table.column_index("class"), Some(1));
        assert_eq!(table.cell(5, 0), &CellValue::Empty);
    }

    #[test]
    fn na_markers_read_as_empty() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Ins,class,Net Profit,Highest Net Profit").unwrap();
        writeln!(file, "N/A,NULL,NA,#N/A").unwrap();
        writeln!(file, "NAB,na,n/a ,-nan").unwrap();

        let table = load_table(file.path(), None).unwrap();
        assert!(table.rows[0].iter().all(CellValue::is_null));
        assert_eq!(table.rows[1][0], CellValue::Text("NAB".into()));
        assert_eq!(table.rows[1][1], CellValue::Text("na".into()));
        assert_eq!(table.rows[1][2], CellValue::Text("n/a ".into()));
        assert!(table.rows[1][3].is_null());
    }

    #[test]
    fn na_marker_workbook_cells_are_empty() {
        assert!(cell_from_excel(&Data::String("N/A".into())).is_null());
        assert!(cell_from_excel(&Data::String("NULL".into())).is_null());
        assert_eq!(
            cell_from_excel(&Data::String("Acme".into())),
            CellValue::Text("Acme".into())
        );
    }

    #[test]
    fn ragged_csv_is_a_load_failure() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Ins,class").unwrap();
        writeln!(file, "A,1,extra").unwrap();

        let err = load_table(file.path(), None).unwrap_err();
        assert!(matches!(err, ReportError::FileLoad { .. }));
    }

    #[test]
    fn missing_file_is_a_load_failure() {
        let err = load_table("does/not/exist.xlsx", None).unwrap_err();
        assert!(matches!(err, ReportError::FileLoad { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        let err = load_table(file.path(), None).unwrap_err();
        assert!(err.to_string().contains("unsupported file extension"));
    }
}
