use pdf2xlsx_core::error::Pdf2XlsxError;
use serde::Serialize;

pub fn print<T: Serialize + ?Sized>(value: &T) -> Result<(), Pdf2XlsxError> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}
