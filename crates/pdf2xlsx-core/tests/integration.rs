//! Integration tests for the convert() pipeline.
//!
//! Uses a MockExtractor that returns pre-built PageContent without
//! invoking pdftotext, and real .xlsx templates written to a temp dir.

use calamine::{open_workbook, Data, Reader, Xlsx};
use pdf2xlsx_core::error::Pdf2XlsxError;
use pdf2xlsx_core::extraction::{PageContent, PdfExtractor};
use pdf2xlsx_core::model::LineItem;
use pdf2xlsx_core::parsers::omnia::OmniaParser;
use pdf2xlsx_core::parsers::SupplierParser;
use pdf2xlsx_core::profiles::ProfileStore;
use pdf2xlsx_core::registry::{self, ParserRegistry};
use pdf2xlsx_core::template::xlsx::XlsxBackend;
use pdf2xlsx_core::template::{CellValue, Sheet, TemplateBackend, Workbook};
use pdf2xlsx_core::{convert, convert_batch, ConvertRequest};
use rust_decimal_macros::dec;
use rust_xlsxwriter::Format;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

struct MockExtractor {
    pages: Vec<PageContent>,
    calls: AtomicUsize,
}

impl MockExtractor {
    fn new(lines: &[&str]) -> Arc<Self> {
        Arc::new(MockExtractor {
            pages: vec![PageContent {
                page_number: 1,
                lines: lines.iter().map(|s| s.to_string()).collect(),
            }],
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PdfExtractor for MockExtractor {
    fn extract_pages(&self, _pdf_bytes: &[u8]) -> Result<Vec<PageContent>, Pdf2XlsxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.pages.clone())
    }

    fn backend_name(&self) -> &str {
        "mock"
    }
}

/// Parser returning a fixed list of items.
struct FixedParser {
    id: &'static str,
    items: Vec<LineItem>,
}

impl SupplierParser for FixedParser {
    fn supplier_id(&self) -> &str {
        self.id
    }

    fn display_name(&self) -> &str {
        "fixed"
    }

    fn parse(&self, _pdf_bytes: &[u8]) -> Result<Vec<LineItem>, Pdf2XlsxError> {
        Ok(self.items.clone())
    }
}

fn text(s: &str) -> CellValue {
    CellValue::Text(s.into())
}

fn item(number: &str, price: rust_decimal::Decimal) -> LineItem {
    LineItem {
        product_number: Some(number.into()),
        net_unit_price: Some(price),
        ..Default::default()
    }
}

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Fixture {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn pdf(&self) -> PathBuf {
        let path = self.path("input.pdf");
        std::fs::write(&path, b"%PDF-1.4 mock").unwrap();
        path
    }

    /// Template with a "Cover" sheet and a "Data" sheet whose header row is
    /// `headers`, followed by one stale data row.
    fn template(&self, headers: &[&str]) -> PathBuf {
        let mut cover = Sheet::new("Cover");
        cover.set_cell(0, 0, text("Supplier intake"));
        let mut data = Sheet::new("Data");
        for (col, h) in headers.iter().enumerate() {
            data.set_cell(0, col as u32, text(h));
            data.set_cell(1, col as u32, text("stale"));
        }
        let path = self.path("template.xlsx");
        XlsxBackend::new()
            .save(&Workbook::new(vec![cover, data]), &path)
            .unwrap();
        path
    }
}

fn open(path: &Path) -> Workbook {
    XlsxBackend::new().open(path).unwrap()
}

fn data_profile(mapping: &str) -> ProfileStore {
    let json = format!(
        r#"{{ "acme": {{ "sheet_name": "Data", "clear_existing": true, "mapping": {mapping} }} }}"#
    );
    ProfileStore::from_json_str(&json, Path::new("test.json")).unwrap()
}

fn acme_registry(items: Vec<LineItem>) -> ParserRegistry {
    ParserRegistry::from_parsers([Arc::new(FixedParser { id: "acme", items }) as Arc<dyn SupplierParser>])
        .unwrap()
}

// ---------------------------------------------------------------------------
// Profile {Data, clear, Číslo/Cena} with two items -> exactly two data rows
// ---------------------------------------------------------------------------
#[test]
fn data_sheet_scenario_writes_two_rows() {
    let fx = Fixture::new();
    let template = fx.template(&["Číslo", "Cena"]);
    let output = fx.path("out.xlsx");
    let registry = acme_registry(vec![item("A1", dec!(10.5)), item("B2", dec!(3))]);
    let profiles =
        data_profile(r#"{ "Číslo": "product_number", "Cena": "net_unit_price" }"#);

    let report = convert(
        &ConvertRequest::new(fx.pdf(), &template, &output, "acme"),
        &registry,
        &profiles,
        &XlsxBackend::new(),
    )
    .unwrap();

    assert_eq!(report.items, 2);
    let wb = open(&output);
    let data = wb.sheet("Data").unwrap();
    assert_eq!(data.row(0), &[text("Číslo"), text("Cena")]);
    assert_eq!(data.row(1), &[text("A1"), CellValue::Number(dec!(10.5))]);
    assert_eq!(data.row(2), &[text("B2"), CellValue::Number(dec!(3))]);
    assert_eq!(data.last_occupied_row(), Some(2));
    assert_eq!(wb.sheet("Cover").unwrap().cell(0, 0), &text("Supplier intake"));

    // The template itself is untouched.
    let original = open(&template);
    assert_eq!(original.sheet("Data").unwrap().cell(1, 0), &text("stale"));
}

// ---------------------------------------------------------------------------
// Missing column -> ColumnNotFound, no output file created or overwritten
// ---------------------------------------------------------------------------
#[test]
fn missing_column_leaves_no_output() {
    let fx = Fixture::new();
    let template = fx.template(&["Číslo", "Cena"]);
    let output = fx.path("out.xlsx");
    let registry = acme_registry(vec![item("A1", dec!(1))]);
    let profiles = data_profile(r#"{ "Číslo": "product_number", "Kód": "customs_code" }"#);

    let err = convert(
        &ConvertRequest::new(fx.pdf(), &template, &output, "acme"),
        &registry,
        &profiles,
        &XlsxBackend::new(),
    )
    .unwrap_err();

    match err {
        Pdf2XlsxError::ColumnNotFound { columns, .. } => assert_eq!(columns, vec!["Kód"]),
        other => panic!("expected ColumnNotFound, got {other:?}"),
    }
    assert!(!output.exists());

    // An existing file at the output path survives a failed run.
    std::fs::write(&output, b"previous result").unwrap();
    let again = convert(
        &ConvertRequest::new(fx.pdf(), &template, &output, "acme"),
        &registry,
        &profiles,
        &XlsxBackend::new(),
    );
    assert!(again.is_err());
    assert_eq!(std::fs::read(&output).unwrap(), b"previous result");

    let leftovers: Vec<_> = std::fs::read_dir(fx.dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(".pdf2xlsx-"))
        .collect();
    assert!(leftovers.is_empty());
}

// ---------------------------------------------------------------------------
// Unknown supplier -> UnknownSupplier, no PDF read attempted
// ---------------------------------------------------------------------------
#[test]
fn unknown_supplier_reads_no_pdf() {
    let fx = Fixture::new();
    let extractor = MockExtractor::new(&[]);
    let registry = ParserRegistry::from_parsers([
        Arc::new(OmniaParser::new(extractor.clone())) as Arc<dyn SupplierParser>
    ])
    .unwrap();

    // The PDF path does not exist; reading it would fail with Io instead.
    let err = convert(
        &ConvertRequest::new(
            fx.path("missing.pdf"),
            fx.path("missing.xlsx"),
            fx.path("out.xlsx"),
            "nobody",
        ),
        &registry,
        &ProfileStore::empty(),
        &XlsxBackend::new(),
    )
    .unwrap_err();

    assert!(matches!(err, Pdf2XlsxError::UnknownSupplier { ref supplier, .. } if supplier == "nobody"));
    assert_eq!(extractor.calls(), 0);
}

// ---------------------------------------------------------------------------
// Profile problems are reported before any PDF bytes are read
// ---------------------------------------------------------------------------
#[test]
fn missing_profile_fails_before_parsing() {
    let fx = Fixture::new();
    let extractor = MockExtractor::new(&["PRODUCT CODE DESCRIPTION QUANTITY"]);
    let registry = ParserRegistry::from_parsers([
        Arc::new(OmniaParser::new(extractor.clone())) as Arc<dyn SupplierParser>
    ])
    .unwrap();
    let strict = ProfileStore::empty().strict();

    let err = convert(
        &ConvertRequest::new(
            fx.path("missing.pdf"),
            fx.path("template.xlsx"),
            fx.path("out.xlsx"),
            "omnia",
        ),
        &registry,
        &strict,
        &XlsxBackend::new(),
    )
    .unwrap_err();

    assert!(matches!(err, Pdf2XlsxError::MissingProfile(_)));
    assert_eq!(extractor.calls(), 0);
}

#[test]
fn invalid_profile_rejected_at_load() {
    let err = ProfileStore::from_json_str(
        r#"{ "omnia": { "mapping": { "Číslo": "product_no" } } }"#,
        Path::new("profiles.json"),
    )
    .unwrap_err();
    assert!(matches!(err, Pdf2XlsxError::InvalidProfile { ref supplier, .. } if supplier == "omnia"));
}

// ---------------------------------------------------------------------------
// Parser cannot make sense of the document -> Extraction, no output
// ---------------------------------------------------------------------------
#[test]
fn extraction_error_surfaces_without_output() {
    let fx = Fixture::new();
    let template = fx.template(&["Číslo"]);
    let output = fx.path("out.xlsx");
    let extractor = MockExtractor::new(&["Dear customer,", "please find attached our catalogue."]);
    let registry = ParserRegistry::from_parsers([
        Arc::new(OmniaParser::new(extractor.clone())) as Arc<dyn SupplierParser>
    ])
    .unwrap();

    let err = convert(
        &ConvertRequest::new(fx.pdf(), &template, &output, "omnia"),
        &registry,
        &ProfileStore::empty(),
        &XlsxBackend::new(),
    )
    .unwrap_err();

    assert!(matches!(err, Pdf2XlsxError::Extraction(_)));
    assert_eq!(extractor.calls(), 1);
    assert!(!output.exists());
}

// ---------------------------------------------------------------------------
// Omnia invoice through the built-in profile into the intake template
// ---------------------------------------------------------------------------
#[test]
fn omnia_invoice_with_sheet_override() {
    let fx = Fixture::new();
    let headers = [
        "Číslo produktu",
        "Označení produktu",
        "Celní kód zboží",
        "Hmotnost v gramech",
        "Dodané množství",
        "Čistá cena za jednotku",
        "Celková cena za množství produktu",
    ];
    let template = fx.template(&headers);
    let output = fx.path("omnia.xlsx");
    let extractor = MockExtractor::new(&[
        "OMNIACOMPONENTS S.R.L.            Invoice 26VIN0042",
        "  PRODUCT CODE   DESCRIPTION             QUANTITY    PREZZO    SCONTO   IMPORTO",
        "  125709         LAMP E14 40W            100 PZ      1.15 €             115.00 €",
        "  VEN-",
        "  9161.167       D.35.8 SHOWER",
        "  1 PZ           1.95 €                  1.95 €",
    ]);
    let registry = ParserRegistry::from_parsers([
        Arc::new(OmniaParser::new(extractor)) as Arc<dyn SupplierParser>
    ])
    .unwrap();
    let mut profile = ProfileStore::builtin().unwrap().load("omnia").unwrap();
    profile.sheet_name = Some("Data".into());

    let report = convert(
        &ConvertRequest::new(fx.pdf(), &template, &output, "omnia").with_profile(profile),
        &registry,
        &ProfileStore::builtin().unwrap(),
        &XlsxBackend::new(),
    )
    .unwrap();

    assert_eq!(report.items, 2);
    let wb = open(&output);
    let data = wb.sheet("Data").unwrap();
    assert_eq!(data.cell(1, 0), &text("125709"));
    assert_eq!(data.cell(1, 1), &text("LAMP E14 40W"));
    assert_eq!(data.cell(1, 2), &CellValue::Empty);
    assert_eq!(data.cell(1, 3), &CellValue::Empty);
    assert_eq!(data.cell(1, 4), &CellValue::Number(dec!(100)));
    assert_eq!(data.cell(1, 5), &CellValue::Number(dec!(1.15)));
    assert_eq!(data.cell(1, 6), &CellValue::Number(dec!(115)));
    assert_eq!(data.cell(2, 0), &text("VEN-9161.167"));
    assert_eq!(data.cell(2, 1), &text("D.35.8 SHOWER"));
    assert_eq!(data.cell(2, 5), &CellValue::Number(dec!(1.95)));
    assert_eq!(data.last_occupied_row(), Some(2));
}

// ---------------------------------------------------------------------------
// Zero items with clear_existing -> only the header row remains
// ---------------------------------------------------------------------------
#[test]
fn zero_items_with_clear_keeps_only_header() {
    let fx = Fixture::new();
    let template = fx.template(&["Číslo", "Cena"]);
    let output = fx.path("out.xlsx");
    let registry = acme_registry(Vec::new());
    let profiles = data_profile(r#"{ "Číslo": "product_number" }"#);

    let report = convert(
        &ConvertRequest::new(fx.pdf(), &template, &output, "acme"),
        &registry,
        &profiles,
        &XlsxBackend::new(),
    )
    .unwrap();

    assert_eq!(report.items, 0);
    let wb = open(&output);
    let data = wb.sheet("Data").unwrap();
    assert_eq!(data.last_occupied_row(), Some(0));
    assert_eq!(data.row(0), &[text("Číslo"), text("Cena")]);
}

#[test]
fn output_equal_to_template_is_rejected() {
    let fx = Fixture::new();
    let template = fx.template(&["Číslo"]);
    let registry = acme_registry(vec![item("A1", dec!(1))]);

    let err = convert(
        &ConvertRequest::new(fx.pdf(), &template, &template, "acme"),
        &registry,
        &ProfileStore::empty(),
        &XlsxBackend::new(),
    )
    .unwrap_err();

    assert!(matches!(err, Pdf2XlsxError::OutputIsTemplate(_)));
    assert_eq!(open(&template).sheet("Data").unwrap().cell(1, 0), &text("stale"));
}

// ---------------------------------------------------------------------------
// Batch conversions share the registry and profiles, not outputs
// ---------------------------------------------------------------------------
#[test]
fn batch_conversions_run_independently() {
    let fx = Fixture::new();
    let template = fx.template(&["Číslo", "Cena"]);
    let pdf = fx.pdf();
    let registry = acme_registry(vec![item("A1", dec!(10.5))]);
    let profiles = data_profile(r#"{ "Číslo": "product_number", "Cena": "net_unit_price" }"#);

    std::fs::create_dir(fx.path("sub")).unwrap();
    let requests: Vec<_> = ["one.xlsx", "two.xlsx", "dup.xlsx", "sub/../dup.xlsx"]
        .iter()
        .map(|name| ConvertRequest::new(&pdf, &template, fx.path(name), "acme"))
        .collect();

    let results = convert_batch(&requests, &registry, &profiles, &XlsxBackend::new());

    assert_eq!(results.len(), 4);
    assert!(results[0].is_ok());
    assert!(results[1].is_ok());
    assert!(results[2].is_err());
    assert!(results[3].is_err());
    for name in ["one.xlsx", "two.xlsx"] {
        let wb = open(&fx.path(name));
        assert_eq!(wb.sheet("Data").unwrap().cell(1, 0), &text("A1"));
    }
    assert!(!fx.path("dup.xlsx").exists());
}

// ---------------------------------------------------------------------------
// Template formulas, date formats and styles survive a conversion
// ---------------------------------------------------------------------------
#[test]
fn template_formulas_and_formats_are_preserved() {
    let fx = Fixture::new();
    let template = fx.path("styled.xlsx");
    let mut book = rust_xlsxwriter::Workbook::new();
    let sheet = book.add_worksheet();
    sheet.set_name("Data").unwrap();
    let bold = Format::new().set_bold();
    sheet.write_string_with_format(0, 0, "Číslo", &bold).unwrap();
    sheet.write_string_with_format(0, 1, "Cena", &bold).unwrap();
    sheet
        .write_number_with_format(0, 5, 45566.0, &Format::new().set_num_format("yyyy-mm-dd"))
        .unwrap();
    sheet.write_formula(1, 3, "=SUM(B2:B100)").unwrap();
    sheet.set_column_width(0, 30).unwrap();
    book.save(&template).unwrap();

    let output = fx.path("out.xlsx");
    let registry = acme_registry(vec![item("A1", dec!(10.5))]);
    let profiles = ProfileStore::from_json_str(
        r#"{ "acme": { "sheet_name": "Data",
                       "mapping": { "Číslo": "product_number", "Cena": "net_unit_price" } } }"#,
        Path::new("test.json"),
    )
    .unwrap();

    let report = convert(
        &ConvertRequest::new(fx.pdf(), &template, &output, "acme"),
        &registry,
        &profiles,
        &XlsxBackend::new(),
    )
    .unwrap();
    assert_eq!(report.items, 1);
    // The formula row counts as occupied, so the item goes below it.
    assert_eq!(report.write.first_row, 3);

    let mut xlsx: Xlsx<_> = open_workbook(&output).unwrap();
    let formulas = xlsx.worksheet_formula("Data").unwrap();
    assert_eq!(formulas.get_value((1, 3)).map(String::as_str), Some("SUM(B2:B100)"));
    let values = xlsx.worksheet_range("Data").unwrap();
    assert!(matches!(values.get_value((0, 5)), Some(Data::DateTime(_))));
    assert_eq!(values.get_value((2, 0)), Some(&Data::String("A1".into())));
    assert_eq!(values.get_value((2, 1)), Some(&Data::Float(10.5)));

    let mut package = zip::ZipArchive::new(File::open(&output).unwrap()).unwrap();
    let mut workbook_xml = String::new();
    package
        .by_name("xl/workbook.xml")
        .unwrap()
        .read_to_string(&mut workbook_xml)
        .unwrap();
    assert!(workbook_xml.contains(r#"fullCalcOnLoad="1""#));
    let mut sheet_xml = String::new();
    package
        .by_name("xl/worksheets/sheet1.xml")
        .unwrap()
        .read_to_string(&mut sheet_xml)
        .unwrap();
    assert!(sheet_xml.contains(r#"<c r="A1" s="1""#));
    assert!(sheet_xml.contains(r#"customWidth="1""#));
}

// ---------------------------------------------------------------------------
// Global bootstrap: all-or-nothing replacement of the process-wide table
// ---------------------------------------------------------------------------
#[test]
fn global_bootstrap_is_all_or_nothing() {
    let extractor = MockExtractor::new(&[]);
    let installed = registry::bootstrap_builtin(extractor).unwrap();
    assert_eq!(installed.supplier_ids(), vec!["generic", "omnia"]);

    let first: Arc<dyn SupplierParser> = Arc::new(FixedParser {
        id: "acme",
        items: Vec::new(),
    });
    let second: Arc<dyn SupplierParser> = Arc::new(FixedParser {
        id: "acme",
        items: Vec::new(),
    });
    let err = registry::bootstrap([first, second]).unwrap_err();
    assert!(matches!(err, Pdf2XlsxError::DuplicateSupplier(ref id) if id == "acme"));

    let current = registry::global().unwrap();
    assert!(Arc::ptr_eq(&current, &installed));
    assert!(matches!(
        current.resolve("acme"),
        Err(Pdf2XlsxError::UnknownSupplier { .. })
    ));
    assert_eq!(current.resolve("omnia").unwrap().supplier_id(), "omnia");
}
