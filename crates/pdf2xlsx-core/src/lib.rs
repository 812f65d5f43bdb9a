pub mod error;
pub mod extraction;
pub mod mapping;
pub mod model;
pub mod parsers;
pub mod profiles;
pub mod registry;
pub mod template;

use error::Pdf2XlsxError;
use mapping::WriteSummary;
use model::LineItem;
use profiles::schema::SupplierProfile;
use profiles::ProfileStore;
use registry::{ParserRegistry, SupplierInfo};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use template::{TemplateBackend, Workbook};
use tracing::{debug, info};

/// One PDF-to-template conversion.
#[derive(Debug, Clone)]
pub struct ConvertRequest {
    pub pdf_path: PathBuf,
    pub template_path: PathBuf,
    pub output_path: PathBuf,
    pub supplier_id: String,
    /// Used instead of the store's profile for this supplier when set.
    pub profile_override: Option<SupplierProfile>,
}

impl ConvertRequest {
    pub fn new(
        pdf_path: impl Into<PathBuf>,
        template_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        supplier_id: impl Into<String>,
    ) -> Self {
        ConvertRequest {
            pdf_path: pdf_path.into(),
            template_path: template_path.into(),
            output_path: output_path.into(),
            supplier_id: supplier_id.into(),
            profile_override: None,
        }
    }

    pub fn with_profile(mut self, profile: SupplierProfile) -> Self {
        self.profile_override = Some(profile);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub supplier_id: String,
    pub output_path: PathBuf,
    pub items: usize,
    pub write: WriteSummary,
}

/// Main API entry point: convert one supplier PDF into a filled template.
///
/// Every step is a hard boundary; the first failure is returned as is.
/// The profile is resolved before the PDF is read, and nothing is written
/// at `output_path` unless every step succeeded. The template file itself
/// is only ever read.
pub fn convert(
    request: &ConvertRequest,
    registry: &ParserRegistry,
    profiles: &ProfileStore,
    backend: &dyn TemplateBackend,
) -> Result<ConversionReport, Pdf2XlsxError> {
    info!(
        supplier = %request.supplier_id,
        pdf = %request.pdf_path.display(),
        "starting conversion"
    );

    if same_file(&request.template_path, &request.output_path) {
        return Err(Pdf2XlsxError::OutputIsTemplate(request.output_path.clone()));
    }

    let parser = registry.resolve(&request.supplier_id)?;
    let profile = match request.profile_override {
        Some(ref profile) => profile.clone(),
        None => profiles.load(&request.supplier_id)?,
    };

    let pdf_bytes = std::fs::read(&request.pdf_path)?;
    let items = parser.parse(&pdf_bytes)?;
    info!(parser = parser.display_name(), items = items.len(), "parsed line items");

    let mut workbook = backend.open(&request.template_path)?;
    let write = mapping::apply(&profile, &items, &mut workbook)?;
    persist(&workbook, &request.output_path, backend)?;

    info!(output = %request.output_path.display(), "conversion finished");
    Ok(ConversionReport {
        supplier_id: request.supplier_id.clone(),
        output_path: request.output_path.clone(),
        items: items.len(),
        write,
    })
}

/// Run independent conversions in parallel, one thread per request.
///
/// The registry, profile store and backend are shared read-only. Results
/// come back in request order. Requests that share an output path are
/// rejected rather than raced.
pub fn convert_batch(
    requests: &[ConvertRequest],
    registry: &ParserRegistry,
    profiles: &ProfileStore,
    backend: &dyn TemplateBackend,
) -> Vec<Result<ConversionReport, Pdf2XlsxError>> {
    let targets: Vec<PathBuf> = requests.iter().map(|r| output_key(&r.output_path)).collect();
    let mut seen = HashSet::new();
    let duplicates: HashSet<&PathBuf> = targets.iter().filter(|p| !seen.insert(*p)).collect();

    std::thread::scope(|scope| {
        let handles: Vec<_> = requests
            .iter()
            .zip(&targets)
            .map(|(request, target)| {
                let shared_output = duplicates.contains(target);
                scope.spawn(move || {
                    if shared_output {
                        return Err(Pdf2XlsxError::Template {
                            path: request.output_path.clone(),
                            reason: "output path is used by more than one request in the batch"
                                .into(),
                        });
                    }
                    convert(request, registry, profiles, backend)
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    })
}

/// Run only the parsing half of a conversion: resolve the supplier's
/// parser and extract line items from a PDF on disk.
pub fn extract_items(
    pdf_path: &Path,
    supplier_id: &str,
    registry: &ParserRegistry,
) -> Result<Vec<LineItem>, Pdf2XlsxError> {
    let parser = registry.resolve(supplier_id)?;
    let pdf_bytes = std::fs::read(pdf_path)?;
    parser.parse(&pdf_bytes)
}

/// Registered suppliers, for presentation.
pub fn list_suppliers(registry: &ParserRegistry) -> Vec<SupplierInfo> {
    registry.suppliers()
}

/// Save to a temp file next to the output and rename it into place, so a
/// failed save never leaves a partial file at `output_path`.
fn persist(
    workbook: &Workbook,
    output_path: &Path,
    backend: &dyn TemplateBackend,
) -> Result<(), Pdf2XlsxError> {
    let dir = output_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let tmp = tempfile::Builder::new()
        .prefix(".pdf2xlsx-")
        .suffix(".xlsx")
        .tempfile_in(dir)?;
    debug!(tmp = %tmp.path().display(), backend = backend.backend_name(), "saving working copy");

    backend.save(workbook, tmp.path())?;
    tmp.persist(output_path).map_err(|e| Pdf2XlsxError::Io(e.error))?;
    Ok(())
}

/// Output path with its directory resolved, so `out.xlsx` and
/// `./out.xlsx` compare equal before either file exists.
fn output_key(path: &Path) -> PathBuf {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    match (dir.canonicalize(), path.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => path.to_path_buf(),
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
