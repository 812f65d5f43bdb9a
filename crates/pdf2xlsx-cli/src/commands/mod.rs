pub mod convert;
pub mod parse;
pub mod profiles;
pub mod suppliers;

use pdf2xlsx_core::error::Pdf2XlsxError;
use pdf2xlsx_core::extraction::pdftotext::PdftotextExtractor;
use pdf2xlsx_core::profiles::ProfileStore;
use pdf2xlsx_core::registry::{self, ParserRegistry};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Profile file picked up from the working directory when none is given.
const DEFAULT_PROFILES: &str = "config/supplier_profiles.json";

/// Install the built-in parsers into the process-wide registry.
pub fn bootstrap() -> Result<Arc<ParserRegistry>, Pdf2XlsxError> {
    if !PdftotextExtractor::is_available() {
        warn!("pdftotext was not found on PATH; PDF parsing will fail");
    }
    registry::bootstrap_builtin(Arc::new(PdftotextExtractor::new()))
}

/// Profiles from `path`, else the default file if present, else the
/// built-in set.
pub fn load_profiles(path: Option<&Path>) -> Result<ProfileStore, Pdf2XlsxError> {
    if let Some(path) = path {
        return ProfileStore::from_path(path);
    }
    let default = Path::new(DEFAULT_PROFILES);
    if default.is_file() {
        debug!(path = DEFAULT_PROFILES, "using profile file from working directory");
        return ProfileStore::from_path(default);
    }
    ProfileStore::builtin()
}
