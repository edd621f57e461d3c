use crate::record::Variant;
use std::path::PathBuf;

/// Where the claim table comes from and what shape it must have
#[derive(Clone, Debug)]
pub struct SourceConfig {
    pub path: PathBuf,
    pub variant: Variant,
    /// Worksheet to read; the first sheet when unset. Ignored for CSV input.
    pub sheet: Option<String>,
}

impl SourceConfig {
    pub fn new(path: impl Into<PathBuf>, variant: Variant) -> Self {
        SourceConfig {
            path: path.into(),
            variant,
            sheet: None,
        }
    }

    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }
}
