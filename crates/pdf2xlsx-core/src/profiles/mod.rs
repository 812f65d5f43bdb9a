pub mod builtin;
pub mod schema;

use crate::error::Pdf2XlsxError;
use schema::{ProfileDef, SupplierProfile};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Validated supplier profiles, loaded once per run.
///
/// Every record is validated when the store is built, so a broken
/// configuration is reported before any document is read.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    profiles: BTreeMap<String, SupplierProfile>,
    fallback: Option<SupplierProfile>,
}

impl ProfileStore {
    /// A store with no records; every supplier gets the default profile.
    pub fn empty() -> Self {
        ProfileStore {
            profiles: BTreeMap::new(),
            fallback: Some(SupplierProfile::default_profile()),
        }
    }

    /// The profiles embedded in the crate.
    pub fn builtin() -> Result<Self, Pdf2XlsxError> {
        builtin::load_builtin()
    }

    /// Load profiles from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self, Pdf2XlsxError> {
        let content = std::fs::read_to_string(path).map_err(|e| Pdf2XlsxError::ProfileLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_json_str(&content, path)
    }

    /// Parse profiles from a JSON object keyed by supplier id.
    pub fn from_json_str(json: &str, source: &Path) -> Result<Self, Pdf2XlsxError> {
        let defs: BTreeMap<String, ProfileDef> =
            serde_json::from_str(json).map_err(|e| Pdf2XlsxError::ProfileLoad {
                path: source.to_path_buf(),
                reason: e.to_string(),
            })?;

        let mut profiles = BTreeMap::new();
        for (supplier, def) in &defs {
            if supplier.trim().is_empty() {
                return Err(Pdf2XlsxError::ProfileLoad {
                    path: source.to_path_buf(),
                    reason: "supplier id must not be empty".into(),
                });
            }
            profiles.insert(supplier.clone(), SupplierProfile::from_def(supplier, def)?);
        }
        debug!(source = %source.display(), count = profiles.len(), "loaded supplier profiles");

        Ok(ProfileStore {
            profiles,
            fallback: Some(SupplierProfile::default_profile()),
        })
    }

    /// Disable the default-profile fallback: suppliers without a record
    /// fail with [`Pdf2XlsxError::MissingProfile`].
    pub fn strict(mut self) -> Self {
        self.fallback = None;
        self
    }

    pub fn load(&self, supplier_id: &str) -> Result<SupplierProfile, Pdf2XlsxError> {
        if let Some(profile) = self.profiles.get(supplier_id) {
            return Ok(profile.clone());
        }
        match self.fallback {
            Some(ref profile) => {
                debug!(supplier = supplier_id, "no profile configured, using default");
                Ok(profile.clone())
            }
            None => Err(Pdf2XlsxError::MissingProfile(supplier_id.to_string())),
        }
    }

    /// Suppliers with an explicit record, sorted.
    pub fn supplier_ids(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }
}
