use crate::error::Pdf2XlsxError;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse an amount or quantity as printed on a supplier document.
///
/// Handles formats like:
/// - "115.00 €" -> 115.00
/// - "1,15" -> 1.15 (decimal comma)
/// - "1,234.56" -> 1234.56
/// - "1.234,56" -> 1234.56
/// - "12,345" -> 12.345 (a lone comma is a decimal separator)
///
/// When both separators occur, the rightmost one is the decimal separator.
pub fn parse_amount(s: &str) -> Result<Decimal, Pdf2XlsxError> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    if cleaned.is_empty() {
        return Err(Pdf2XlsxError::Extraction(format!(
            "no number in '{}'",
            s.trim()
        )));
    }

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) if cleaned.matches(',').count() == 1 => cleaned.replace(',', "."),
        (Some(_), None) => cleaned.replace(',', ""),
        (None, Some(_)) if cleaned.matches('.').count() > 1 => cleaned.replace('.', ""),
        _ => cleaned,
    };

    Decimal::from_str(&normalized)
        .map_err(|e| Pdf2XlsxError::Extraction(format!("invalid number '{}': {}", s.trim(), e)))
}
