use plotters::drawing::DrawingAreaErrorKind;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while loading, validating and presenting a dataset
///
/// `FileLoad` and `SchemaValidation` are the two startup failures: either one
/// stops the session before any report is produced. The remaining variants
/// belong to the outer surfaces (charts, exports, the dashboard).
#[derive(Debug, Error)]
pub enum ReportError {
    /// The input file is missing, unreadable or not a table
    #[error("failed to load '{}': {reason}", .path.display())]
    FileLoad { path: PathBuf, reason: String },

    /// One or more required columns are absent
    #[error(
        "the file does not contain the required columns for analysis (missing: {})",
        .missing.join(", ")
    )]
    SchemaValidation { missing: Vec<String> },

    #[error("unknown chart '{0}'")]
    UnknownChart(String),

    #[error("chart '{0}' requires the extended column set")]
    ChartUnavailable(&'static str),

    #[error("chart rendering failed: {0}")]
    Chart(String),

    #[error("export failed: {0}")]
    Export(String),

    #[error("template rendering failed: {0}")]
    Template(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ReportError {
    pub(crate) fn file_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ReportError::FileLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// True for the failures that halt a session at startup
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ReportError::FileLoad { .. } | ReportError::SchemaValidation { .. }
        )
    }
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for ReportError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        ReportError::Chart(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for ReportError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        ReportError::Export(err.to_string())
    }
}

impl From<csv::Error> for ReportError {
    fn from(err: csv::Error) -> Self {
        ReportError::Export(err.to_string())
    }
}
