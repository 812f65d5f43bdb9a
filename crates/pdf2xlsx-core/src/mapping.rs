use crate::error::Pdf2XlsxError;
use crate::model::LineItem;
use crate::profiles::schema::{ColumnMapping, SupplierProfile};
use crate::template::{CellValue, Sheet, Workbook};
use serde::Serialize;
use tracing::{debug, info};

/// Rows scanned when the profile does not pin the header row.
const HEADER_SCAN_ROWS: u32 = 50;

/// What [`apply`] wrote. Row numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    pub sheet: String,
    pub header_row: u32,
    pub first_row: u32,
    pub rows_written: usize,
    pub cleared: bool,
}

/// Write `items` into the working copy `workbook` as directed by `profile`.
///
/// Items are appended below the last occupied row (or directly below the
/// header), one row per item, in input order. Numeric attributes become
/// numeric cells; attributes an item lacks are written as blank cells.
pub fn apply(
    profile: &SupplierProfile,
    items: &[LineItem],
    workbook: &mut Workbook,
) -> Result<WriteSummary, Pdf2XlsxError> {
    let available = workbook.sheet_names();
    let sheet_name = match profile.sheet_name {
        Some(ref name) => name.clone(),
        None => workbook
            .first_sheet_name()
            .map(str::to_string)
            .ok_or_else(|| Pdf2XlsxError::SheetNotFound {
                sheet: "<first sheet>".into(),
                available: Vec::new(),
            })?,
    };
    let sheet = workbook
        .sheet_mut(&sheet_name)
        .ok_or_else(|| Pdf2XlsxError::SheetNotFound {
            sheet: sheet_name.clone(),
            available,
        })?;

    let header_row = match profile.header_row {
        Some(n) => n.saturating_sub(1),
        None => detect_header_row(sheet, &profile.mapping),
    };
    let columns = resolve_columns(sheet, header_row, &profile.mapping)?;

    if profile.clear_existing {
        sheet.clear_rows(header_row + 1..u32::MAX);
        debug!(sheet = %sheet_name, "cleared data rows below header");
    }

    let first_row = match sheet.last_occupied_row() {
        Some(last) if last > header_row => last + 1,
        _ => header_row + 1,
    };

    for (offset, item) in items.iter().enumerate() {
        let row = first_row + offset as u32;
        for (mapping, &col) in profile.mapping.iter().zip(&columns) {
            let value = item
                .value(mapping.field)
                .map(CellValue::from)
                .unwrap_or(CellValue::Empty);
            sheet.set_cell(row, col, value);
        }
    }

    let summary = WriteSummary {
        sheet: sheet_name,
        header_row: header_row + 1,
        first_row: first_row + 1,
        rows_written: items.len(),
        cleared: profile.clear_existing,
    };
    info!(
        sheet = %summary.sheet,
        header_row = summary.header_row,
        first_row = summary.first_row,
        rows = summary.rows_written,
        "wrote line items to template"
    );
    Ok(summary)
}

/// Pick the row among the first [`HEADER_SCAN_ROWS`] that contains the
/// most mapped column headers; the earliest such row wins ties. Falls back
/// to the first row when no header matches at all.
fn detect_header_row(sheet: &Sheet, mapping: &[ColumnMapping]) -> u32 {
    let mut best = (0, 0usize);
    for row in 0..sheet.row_count().min(HEADER_SCAN_ROWS) {
        let hits = mapping
            .iter()
            .filter(|m| sheet.find_column(row, &m.column).is_some())
            .count();
        if hits > best.1 {
            best = (row, hits);
        }
        if hits == mapping.len() {
            break;
        }
    }
    best.0
}

/// Resolve every mapped header to its column, reporting all missing ones.
fn resolve_columns(
    sheet: &Sheet,
    header_row: u32,
    mapping: &[ColumnMapping],
) -> Result<Vec<u32>, Pdf2XlsxError> {
    let mut columns = Vec::with_capacity(mapping.len());
    let mut missing = Vec::new();
    for m in mapping {
        match sheet.find_column(header_row, &m.column) {
            Some(col) => columns.push(col),
            None => missing.push(m.column.clone()),
        }
    }

    if !missing.is_empty() {
        return Err(Pdf2XlsxError::ColumnNotFound {
            sheet: sheet.name().to_string(),
            header_row: header_row + 1,
            columns: missing,
        });
    }
    Ok(columns)
}
