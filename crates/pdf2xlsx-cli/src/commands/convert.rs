use pdf2xlsx_core::error::Pdf2XlsxError;
use pdf2xlsx_core::profiles::schema::SupplierProfile;
use pdf2xlsx_core::template::xlsx::XlsxBackend;
use pdf2xlsx_core::ConvertRequest;
use std::path::PathBuf;

pub struct Args {
    pub pdf: PathBuf,
    pub template: PathBuf,
    pub out: PathBuf,
    pub supplier: String,
    pub profiles: Option<PathBuf>,
    pub options: Option<String>,
    pub strict_profiles: bool,
}

pub fn run(args: Args) -> Result<(), Pdf2XlsxError> {
    let registry = super::bootstrap()?;
    let mut profiles = super::load_profiles(args.profiles.as_deref())?;
    if args.strict_profiles {
        profiles = profiles.strict();
    }

    let mut request = ConvertRequest::new(args.pdf, args.template, args.out, &args.supplier);
    if let Some(ref json) = args.options {
        request = request.with_profile(SupplierProfile::from_options_json(&args.supplier, json)?);
    }

    let report = pdf2xlsx_core::convert(&request, &registry, &profiles, &XlsxBackend::new())?;

    if report.items == 0 {
        eprintln!("  warning: no line items were found in the PDF");
    }
    println!(
        "Wrote {} item(s) from supplier '{}' to {} (sheet '{}', starting at row {})",
        report.items,
        report.supplier_id,
        report.output_path.display(),
        report.write.sheet,
        report.write.first_row,
    );

    Ok(())
}
