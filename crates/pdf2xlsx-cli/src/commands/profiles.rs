use pdf2xlsx_core::error::Pdf2XlsxError;
use pdf2xlsx_core::profiles::ProfileStore;
use std::path::Path;

use crate::output;

pub fn show(supplier: &str, profiles: Option<&Path>) -> Result<(), Pdf2XlsxError> {
    let store = super::load_profiles(profiles)?;
    let configured = store.supplier_ids().iter().any(|id| id == supplier);
    let profile = store.load(supplier)?;

    if !configured {
        eprintln!("No profile configured for '{supplier}'; showing the default mapping.");
    }
    output::json::print(&profile.to_def())
}

pub fn validate(file: &Path) -> Result<(), Pdf2XlsxError> {
    let store = ProfileStore::from_path(file)?;
    let ids = store.supplier_ids();

    println!("Profile file '{}' is valid.", file.display());
    println!("  Suppliers: {}", ids.join(", "));

    // Profiles for suppliers without a parser are not errors, only unused.
    let registry = super::bootstrap()?;
    let known = registry.supplier_ids();
    let unused: Vec<_> = ids.iter().filter(|id| !known.contains(id)).collect();
    if !unused.is_empty() {
        println!("\nWarnings:");
        for id in unused {
            println!("  - no parser is registered for supplier '{id}'");
        }
    }

    Ok(())
}
