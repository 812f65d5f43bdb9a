use crate::error::Pdf2XlsxError;
use crate::template::{package, CellValue, Sheet, TemplateBackend, Workbook};
use calamine::{open_workbook, Data, Reader, Xlsx};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::Format;
use std::path::Path;
use tracing::debug;

/// Template backend for `.xlsx` files.
///
/// Cell values and formulas of every sheet are read with calamine. A
/// workbook opened from a file is saved by patching that file's package,
/// so styles, column widths, merged ranges and untouched formulas come
/// through as they were. A workbook built in memory is written fresh with
/// rust_xlsxwriter.
pub struct XlsxBackend;

impl XlsxBackend {
    pub fn new() -> Self {
        XlsxBackend
    }
}

impl Default for XlsxBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateBackend for XlsxBackend {
    fn open(&self, path: &Path) -> Result<Workbook, Pdf2XlsxError> {
        let template_err = |reason: String| Pdf2XlsxError::Template {
            path: path.to_path_buf(),
            reason,
        };

        let mut xlsx: Xlsx<_> =
            open_workbook(path).map_err(|e| template_err(format!("failed to open xlsx: {e}")))?;

        let mut sheets = Vec::new();
        for name in xlsx.sheet_names() {
            let range = xlsx
                .worksheet_range(&name)
                .map_err(|e| template_err(format!("failed to read sheet '{name}': {e}")))?;
            let formulas = xlsx
                .worksheet_formula(&name)
                .map_err(|e| template_err(format!("failed to read formulas of '{name}': {e}")))?;

            let mut sheet = Sheet::new(name.as_str());
            let (row0, col0) = range.start().unwrap_or((0, 0));
            for (r, c, cell) in range.used_cells() {
                let value = cell_value(cell);
                if value != CellValue::Empty {
                    sheet.load_cell(row0 + r as u32, col0 + c as u32, value);
                }
            }
            let (row0, col0) = formulas.start().unwrap_or((0, 0));
            for (r, c, formula) in formulas.used_cells() {
                let formula = formula.trim_start_matches('=');
                if !formula.is_empty() {
                    let value = CellValue::Formula(formula.to_string());
                    sheet.load_cell(row0 + r as u32, col0 + c as u32, value);
                }
            }
            debug!(sheet = %name, rows = sheet.row_count(), "read template sheet");
            sheets.push(sheet);
        }

        Ok(Workbook::from_source(sheets, path))
    }

    fn save(&self, workbook: &Workbook, path: &Path) -> Result<(), Pdf2XlsxError> {
        if let Some(source) = workbook.source() {
            debug!(source = %source.display(), "patching template package");
            return package::save_patched(source, workbook, path);
        }

        let template_err = |reason: String| Pdf2XlsxError::Template {
            path: path.to_path_buf(),
            reason,
        };

        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        let mut out = rust_xlsxwriter::Workbook::new();
        let to_f64 = |n: &Decimal| {
            n.to_f64()
                .ok_or_else(|| template_err(format!("number {n} cannot be stored in a cell")))
        };
        for sheet in workbook.sheets() {
            let worksheet = out.add_worksheet();
            worksheet
                .set_name(sheet.name())
                .map_err(|e| template_err(format!("invalid sheet name '{}': {e}", sheet.name())))?;

            for (row, col, value) in sheet.cells() {
                let col = u16::try_from(col)
                    .map_err(|_| template_err(format!("column {col} is out of range")))?;
                let written = match value {
                    CellValue::Empty => continue,
                    CellValue::Text(s) => worksheet.write_string(row, col, s),
                    CellValue::Number(n) => worksheet.write_number(row, col, to_f64(n)?),
                    CellValue::DateTime(n) => {
                        worksheet.write_number_with_format(row, col, to_f64(n)?, &date_format)
                    }
                    CellValue::Bool(b) => worksheet.write_boolean(row, col, *b),
                    CellValue::Formula(f) => {
                        worksheet.write_formula(row, col, format!("={f}").as_str())
                    }
                };
                written.map_err(|e| {
                    template_err(format!(
                        "failed to write {}!R{}C{}: {e}",
                        sheet.name(),
                        row + 1,
                        col + 1
                    ))
                })?;
            }
        }

        out.save(path)
            .map_err(|e| template_err(format!("failed to save xlsx: {e}")))?;
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "xlsx"
    }
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(f64_to_decimal(*f)),
        Data::Int(i) => CellValue::Number(Decimal::from(*i)),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::DateTime(f64_to_decimal(dt.as_f64())),
        _ => CellValue::Text(format!("{cell}")),
    }
}

/// Cell floats go through their shortest display form, so a price typed
/// as 0.0035 is read back as exactly that.
fn f64_to_decimal(f: f64) -> Decimal {
    let s = format!("{f}");
    s.parse::<Decimal>()
        .unwrap_or_else(|_| Decimal::try_from(f).unwrap_or_default())
}
