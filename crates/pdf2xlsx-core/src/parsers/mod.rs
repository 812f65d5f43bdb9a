pub mod generic;
pub mod omnia;
pub mod text;
pub mod values;

use crate::error::Pdf2XlsxError;
use crate::extraction::PdfExtractor;
use crate::model::LineItem;
use std::sync::Arc;

/// A supplier-specific extraction strategy.
///
/// Implementations are independent of each other; each one owns whatever
/// it needs (typically an extraction backend) and is registered under its
/// `supplier_id`.
pub trait SupplierParser: Send + Sync {
    /// Stable identifier used for registry lookup and profile selection.
    fn supplier_id(&self) -> &str;

    /// Human-readable name for listings.
    fn display_name(&self) -> &str;

    /// Extract line items from a PDF, in document order.
    ///
    /// An empty vector means the document was understood but carried no
    /// items. Layouts the parser cannot make sense of fail with
    /// [`Pdf2XlsxError::Extraction`].
    fn parse(&self, pdf_bytes: &[u8]) -> Result<Vec<LineItem>, Pdf2XlsxError>;
}

/// All parsers shipped with the crate, sharing one extraction backend.
pub fn builtin_parsers(extractor: Arc<dyn PdfExtractor>) -> Vec<Arc<dyn SupplierParser>> {
    vec![
        Arc::new(omnia::OmniaParser::new(Arc::clone(&extractor))),
        Arc::new(generic::GenericParser::new(extractor)),
    ]
}
