use crate::error::Pdf2XlsxError;
use crate::profiles::ProfileStore;
use std::path::Path;

pub const BUILTIN_PROFILES_JSON: &str = include_str!("../../../../config/supplier_profiles.json");

/// Load the profiles embedded at compile time.
pub fn load_builtin() -> Result<ProfileStore, Pdf2XlsxError> {
    ProfileStore::from_json_str(BUILTIN_PROFILES_JSON, Path::new("<builtin>"))
}
