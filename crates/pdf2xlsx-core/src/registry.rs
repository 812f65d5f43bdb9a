use crate::error::Pdf2XlsxError;
use crate::extraction::PdfExtractor;
use crate::parsers::{builtin_parsers, SupplierParser};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tracing::info;

/// Supplier id -> parser table.
///
/// Built once by [`bootstrap`] (or [`ParserRegistry::from_parsers`]) and
/// read-only afterwards; it is shared across conversions by reference.
#[derive(Default, Clone)]
pub struct ParserRegistry {
    parsers: BTreeMap<String, Arc<dyn SupplierParser>>,
}

impl std::fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserRegistry")
            .field("parsers", &self.parsers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Supplier listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplierInfo {
    pub id: String,
    pub display_name: String,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a set of parsers. Fails on the first duplicate id.
    pub fn from_parsers<I>(parsers: I) -> Result<Self, Pdf2XlsxError>
    where
        I: IntoIterator<Item = Arc<dyn SupplierParser>>,
    {
        let mut registry = ParserRegistry::new();
        for parser in parsers {
            registry.register(parser)?;
        }
        Ok(registry)
    }

    /// Add a parser under its `supplier_id`. A duplicate id leaves the
    /// registry unchanged.
    pub fn register(&mut self, parser: Arc<dyn SupplierParser>) -> Result<(), Pdf2XlsxError> {
        let id = parser.supplier_id().to_string();
        if self.parsers.contains_key(&id) {
            return Err(Pdf2XlsxError::DuplicateSupplier(id));
        }
        self.parsers.insert(id, parser);
        Ok(())
    }

    pub fn resolve(&self, supplier_id: &str) -> Result<Arc<dyn SupplierParser>, Pdf2XlsxError> {
        self.parsers
            .get(supplier_id)
            .cloned()
            .ok_or_else(|| Pdf2XlsxError::UnknownSupplier {
                supplier: supplier_id.to_string(),
                available: self.supplier_ids(),
            })
    }

    /// Registered supplier ids, sorted.
    pub fn supplier_ids(&self) -> Vec<String> {
        self.parsers.keys().cloned().collect()
    }

    /// Registered suppliers with display names, sorted by id.
    pub fn suppliers(&self) -> Vec<SupplierInfo> {
        self.parsers
            .iter()
            .map(|(id, p)| SupplierInfo {
                id: id.clone(),
                display_name: p.display_name().to_string(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}

static GLOBAL: RwLock<Option<Arc<ParserRegistry>>> = RwLock::new(None);

/// Build a registry from `parsers` and install it as the process-wide table.
///
/// The new table replaces the previous one only if every registration
/// succeeded; on error the previously installed table stays in place.
pub fn bootstrap<I>(parsers: I) -> Result<Arc<ParserRegistry>, Pdf2XlsxError>
where
    I: IntoIterator<Item = Arc<dyn SupplierParser>>,
{
    let registry = Arc::new(ParserRegistry::from_parsers(parsers)?);
    let mut slot = GLOBAL.write().unwrap_or_else(|e| e.into_inner());
    *slot = Some(Arc::clone(&registry));
    info!(suppliers = ?registry.supplier_ids(), "parser registry bootstrapped");
    Ok(registry)
}

/// Install the built-in parsers, all sharing `extractor`.
pub fn bootstrap_builtin(
    extractor: Arc<dyn PdfExtractor>,
) -> Result<Arc<ParserRegistry>, Pdf2XlsxError> {
    bootstrap(builtin_parsers(extractor))
}

/// The currently installed process-wide registry.
pub fn global() -> Result<Arc<ParserRegistry>, Pdf2XlsxError> {
    GLOBAL
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
        .ok_or(Pdf2XlsxError::RegistryNotInitialized)
}
