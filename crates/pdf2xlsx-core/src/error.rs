use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Pdf2XlsxError {
    #[error("unknown supplier '{supplier}'. Available: {}", .available.join(", "))]
    UnknownSupplier {
        supplier: String,
        available: Vec<String>,
    },

    #[error("supplier '{0}' is already registered")]
    DuplicateSupplier(String),

    #[error("parser registry has not been bootstrapped")]
    RegistryNotInitialized,

    #[error("no profile configured for supplier '{0}'")]
    MissingProfile(String),

    #[error("invalid profile for supplier '{supplier}': {reason}")]
    InvalidProfile { supplier: String, reason: String },

    #[error("failed to load profiles from {path}: {reason}")]
    ProfileLoad { path: PathBuf, reason: String },

    #[error("PDF extraction failed: {0}")]
    Extraction(String),

    #[error("pdftotext not found. Install poppler: brew install poppler (macOS) or apt install poppler-utils (Linux)")]
    PdftotextNotFound,

    #[error("pdftotext failed with exit code {code}: {stderr}")]
    PdftotextFailed { code: i32, stderr: String },

    #[error("sheet '{sheet}' not found in template. Available: {}", .available.join(", "))]
    SheetNotFound {
        sheet: String,
        available: Vec<String>,
    },

    #[error("column(s) {} not found in header row {header_row} of sheet '{sheet}'", .columns.join(", "))]
    ColumnNotFound {
        sheet: String,
        header_row: u32,
        columns: Vec<String>,
    },

    #[error("template error for {path}: {reason}")]
    Template { path: PathBuf, reason: String },

    #[error("output path {0} is the template itself; refusing to overwrite the template")]
    OutputIsTemplate(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
