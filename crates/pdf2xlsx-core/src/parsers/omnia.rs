//! Omnia enterprise invoices.
//!
//! The item table has the columns PRODUCT CODE, DESCRIPTION, QUANTITY,
//! PREZZO, SCONTO, IMPORTO. pdftotext renders rows in several shapes:
//!
//! - one-line items:
//!   `125709  LAMP ...  100 PZ  1.15 €  115.00 €`
//! - two-line items:
//!   `125709  LAMP ...` then `100 PZ  1.15 €  115.00 €`
//! - a code prefix on its own line:
//!   `VEN-` then `9161.167  D.35.8 SHOWER` then `1 PZ  1.95 €  1.95 €`
//! - a prefix glued to the first word of the description, with the numeric
//!   part of the code on the next line:
//!   `SS-POIGNEE  EQUIPEE C&S MULTI` then `2230002839` then
//!   `2 PZ  8.82 €  17.63 €`, which is item `SS-2230002839`
//!   "POIGNEE EQUIPEE C&S MULTI".

use crate::error::Pdf2XlsxError;
use crate::extraction::PdfExtractor;
use crate::model::LineItem;
use crate::parsers::text::{is_table_header, normalized_lines};
use crate::parsers::values::parse_amount;
use crate::parsers::SupplierParser;
use regex::{Captures, Regex};
use rust_decimal::Decimal;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

static ROW_FULL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?P<code>[A-Z0-9][A-Z0-9\-./]{2,})\s+",
        r"(?P<desc>.+?)\s+",
        r"(?P<qty>\d+)\s+PZ\s+",
        r"(?P<price>[\d.,]+)\s*€\s+",
        r"(?P<total>[\d.,]+)\s*€?\s*$",
    ))
    .expect("valid regex")
});

static QTY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<qty>\d+)\s+PZ\s+(?P<price>[\d.,]+)\s*€\s+(?P<total>[\d.,]+)\s*€?\s*$")
        .expect("valid regex")
});

static PREFIX_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2,8}-$").expect("valid regex"));

static CODE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9][A-Z0-9\-./]{2,}$").expect("valid regex"));

static MERGED_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<prefix>[A-Z]{2,8}-)(?P<word>[A-Z]{2,})$").expect("valid regex")
});

static NUMERIC_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{6,}$").expect("valid regex"));

const HEADER_KEYWORDS: &[&str] = &[
    "product",
    "code",
    "description",
    "quantity",
    "prezzo",
    "sconto",
    "importo",
    "totale",
];

/// Half a cent per unit, never less than one cent.
fn total_tolerance(qty: Decimal) -> Decimal {
    (qty * Decimal::new(5, 3)).max(Decimal::new(1, 2))
}

pub struct OmniaParser {
    extractor: Arc<dyn PdfExtractor>,
}

impl OmniaParser {
    pub fn new(extractor: Arc<dyn PdfExtractor>) -> Self {
        OmniaParser { extractor }
    }
}

impl SupplierParser for OmniaParser {
    fn supplier_id(&self) -> &str {
        "omnia"
    }

    fn display_name(&self) -> &str {
        "Omnia (enterprise invoice)"
    }

    fn parse(&self, pdf_bytes: &[u8]) -> Result<Vec<LineItem>, Pdf2XlsxError> {
        let pages = self.extractor.extract_pages(pdf_bytes)?;
        let lines = normalized_lines(&pages);
        parse_lines(&lines)
    }
}

/// Builder state carried between lines of a multi-line item.
#[derive(Debug, Default)]
struct Pending {
    /// Code prefix seen on its own line or glued to a word, e.g. "VEN-".
    prefix: Option<String>,
    code: Option<String>,
    desc: Option<String>,
    /// Description recovered from a glued "SS-POIGNEE ..." line.
    prefix_desc: Option<String>,
}

impl Pending {
    fn take_prefixed(&mut self, code: &str) -> String {
        match self.prefix.take() {
            Some(prefix) => format!("{prefix}{code}"),
            None => code.to_string(),
        }
    }

    fn take_with_prefix_desc(&mut self, desc: &str) -> String {
        match self.prefix_desc.take() {
            Some(head) => format!("{head} {desc}").trim().to_string(),
            None => desc.to_string(),
        }
    }
}

/// Parse normalized text lines into line items.
fn parse_lines(lines: &[String]) -> Result<Vec<LineItem>, Pdf2XlsxError> {
    if lines.is_empty() {
        return Err(Pdf2XlsxError::Extraction(
            "omnia: document has no text layer".into(),
        ));
    }

    if !looks_like_omnia(lines) {
        warn!("document does not look like an Omnia invoice; parsing anyway");
    }

    let mut items = Vec::new();
    let mut saw_header = false;
    let mut pending = Pending::default();

    for line in lines {
        let line = line.as_str();

        if is_table_header(line, HEADER_KEYWORDS, 3) {
            saw_header = true;
            pending = Pending::default();
            continue;
        }

        if PREFIX_ONLY.is_match(line) {
            pending = Pending {
                prefix: Some(line.to_string()),
                ..Default::default()
            };
            continue;
        }

        if let Some(caps) = ROW_FULL.captures(line) {
            let code = pending.take_prefixed(caps["code"].trim());
            let desc = pending.take_with_prefix_desc(caps["desc"].trim());
            items.push(build_item(code, desc, &caps)?);
            pending.code = None;
            pending.desc = None;
            continue;
        }

        if pending.prefix.is_some() && pending.prefix_desc.is_some() && NUMERIC_CODE.is_match(line)
        {
            pending.code = Some(pending.take_prefixed(line));
            pending.desc = pending.prefix_desc.take();
            continue;
        }

        if let Some(caps) = QTY_LINE.captures(line) {
            match (pending.code.take(), pending.desc.take()) {
                (Some(code), Some(desc)) => items.push(build_item(code, desc, &caps)?),
                _ => debug!(line, "quantity line without a pending item"),
            }
            continue;
        }

        if let Some((token, rest)) = line.split_once(' ') {
            if CODE_TOKEN.is_match(token) {
                let rest = rest.trim();
                if let Some(m) = MERGED_PREFIX.captures(token) {
                    pending = Pending {
                        prefix: Some(m["prefix"].to_string()),
                        prefix_desc: Some(format!("{} {}", &m["word"], rest).trim().to_string()),
                        ..Default::default()
                    };
                    continue;
                }

                pending.code = Some(pending.take_prefixed(token));
                pending.desc = Some(pending.take_with_prefix_desc(rest));
                continue;
            }
        }

        if let (Some(_), Some(desc)) = (&pending.code, &mut pending.desc) {
            desc.push(' ');
            desc.push_str(line);
        }
    }

    if let Some(code) = pending.code {
        warn!(code = %code, "item without a quantity line at end of document");
    }

    if items.is_empty() {
        if !saw_header {
            return Err(Pdf2XlsxError::Extraction(
                "omnia: no item table found (expected a PRODUCT CODE / DESCRIPTION / QUANTITY header)"
                    .into(),
            ));
        }
        warn!("no items found; check that the PDF has rows with 'PZ' and € prices");
    }

    Ok(items)
}

fn build_item(code: String, desc: String, caps: &Captures<'_>) -> Result<LineItem, Pdf2XlsxError> {
    let qty = parse_amount(&caps["qty"])?;
    let price = parse_amount(&caps["price"])?;
    let total = parse_amount(&caps["total"])?;

    let item = LineItem {
        product_number: Some(code),
        product_name: Some(desc),
        delivered_qty: Some(qty),
        net_unit_price: Some(price),
        total_price: Some(total),
        ..Default::default()
    };

    if item.total_within(total_tolerance(qty)) == Some(false) {
        warn!(
            code = item.product_number.as_deref().unwrap_or_default(),
            %qty,
            %price,
            %total,
            "line total differs from quantity x unit price"
        );
    }

    Ok(item)
}

fn looks_like_omnia(lines: &[String]) -> bool {
    lines.iter().any(|l| {
        let lower = l.to_lowercase();
        lower.contains("omniacomponents") || lower.contains("26vin") || lower.contains("product code")
    })
}
