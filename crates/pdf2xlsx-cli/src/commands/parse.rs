use pdf2xlsx_core::error::Pdf2XlsxError;
use std::path::Path;

use crate::output;

pub fn run(pdf_file: &Path, supplier: &str, output_format: &str) -> Result<(), Pdf2XlsxError> {
    let registry = super::bootstrap()?;
    let items = pdf2xlsx_core::extract_items(pdf_file, supplier, &registry)?;

    match output_format {
        "json" => output::json::print(&items)?,
        _ => println!("{}", output::table::format_items(&items)),
    }

    Ok(())
}
