use crate::error::Pdf2XlsxError;
use crate::extraction::PdfExtractor;
use crate::model::LineItem;
use crate::parsers::SupplierParser;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Diagnostics parser: extracts the text layer, logs what it found and
/// produces no line items.
///
/// Useful for checking what a new supplier's documents look like before
/// writing a dedicated parser (run with `--log debug` to see page lines).
pub struct GenericParser {
    extractor: Arc<dyn PdfExtractor>,
}

impl GenericParser {
    pub fn new(extractor: Arc<dyn PdfExtractor>) -> Self {
        GenericParser { extractor }
    }
}

impl SupplierParser for GenericParser {
    fn supplier_id(&self) -> &str {
        "generic"
    }

    fn display_name(&self) -> &str {
        "Generic (no-op / diagnostics)"
    }

    fn parse(&self, pdf_bytes: &[u8]) -> Result<Vec<LineItem>, Pdf2XlsxError> {
        let pages = self.extractor.extract_pages(pdf_bytes)?;
        let line_count: usize = pages.iter().map(|p| p.lines.len()).sum();
        info!(
            backend = self.extractor.backend_name(),
            pages = pages.len(),
            lines = line_count,
            "generic parser inspected document"
        );
        for page in &pages {
            for line in page.lines.iter().filter(|l| !l.trim().is_empty()) {
                debug!(page = page.page_number, "{}", line);
            }
        }
        warn!("generic parser selected; no extraction performed");
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::PageContent;

    struct FixedExtractor;

    impl PdfExtractor for FixedExtractor {
        fn extract_pages(&self, _pdf_bytes: &[u8]) -> Result<Vec<PageContent>, Pdf2XlsxError> {
            Ok(vec![PageContent {
                page_number: 1,
                lines: vec!["Delivery note 42".into()],
            }])
        }

        fn backend_name(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn test_generic_returns_no_items() {
        let parser = GenericParser::new(Arc::new(FixedExtractor));
        assert_eq!(parser.supplier_id(), "generic");
        assert!(parser.parse(b"%PDF").unwrap().is_empty());
    }
}
