use pdf2xlsx_core::error::Pdf2XlsxError;

pub fn run() -> Result<(), Pdf2XlsxError> {
    let registry = super::bootstrap()?;

    println!("Registered suppliers:\n");
    for info in pdf2xlsx_core::list_suppliers(&registry) {
        println!("  {:<10} {}", info.id, info.display_name);
    }
    Ok(())
}
