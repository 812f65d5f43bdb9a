//! In-memory working copy of a spreadsheet template.
//!
//! Rows and columns are 0-based here; profiles and log messages use the
//! 1-based row numbers a spreadsheet user sees.
//!
//! A sheet remembers which cells were written and which row ranges were
//! cleared since it was loaded, so a backend can apply just those edits
//! to the template file and leave everything else in it alone.

mod package;
pub mod xlsx;

use crate::error::Pdf2XlsxError;
use crate::model::FieldValue;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(Decimal),
    Bool(bool),
    /// Formula text without the leading `=`.
    Formula(String),
    /// Spreadsheet date serial (days since 1899-12-30).
    DateTime(Decimal),
}

impl CellValue {
    /// Blank cells and whitespace-only text both count as empty.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Formula(formula) => write!(f, "={formula}"),
            CellValue::DateTime(serial) => write!(f, "{serial}"),
        }
    }
}

impl From<FieldValue<'_>> for CellValue {
    fn from(value: FieldValue<'_>) -> Self {
        match value {
            FieldValue::Text(s) => CellValue::Text(s.to_string()),
            FieldValue::Number(n) => CellValue::Number(n),
        }
    }
}

static EMPTY_CELL: CellValue = CellValue::Empty;

/// One worksheet: a sparse grid of cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sheet {
    name: String,
    rows: Vec<Vec<CellValue>>,
    edited: BTreeSet<(u32, u32)>,
    cleared: Vec<Range<u32>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Sheet {
            name: name.into(),
            rows: Vec::new(),
            edited: BTreeSet::new(),
            cleared: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cell(&self, row: u32, col: u32) -> &CellValue {
        self.rows
            .get(row as usize)
            .and_then(|r| r.get(col as usize))
            .unwrap_or(&EMPTY_CELL)
    }

    /// Write a cell and record it as edited.
    pub fn set_cell(&mut self, row: u32, col: u32, value: CellValue) {
        self.edited.insert((row, col));
        self.put(row, col, value);
    }

    /// Fill a cell from the template file without recording an edit.
    pub(crate) fn load_cell(&mut self, row: u32, col: u32, value: CellValue) {
        self.put(row, col, value);
    }

    fn put(&mut self, row: u32, col: u32, value: CellValue) {
        if value == CellValue::Empty && *self.cell(row, col) == CellValue::Empty {
            return;
        }
        let (row, col) = (row as usize, col as usize);
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, CellValue::Empty);
        }
        cells[col] = value;
    }

    /// Cells of one row, left to right. Trailing blank cells may be omitted.
    pub fn row(&self, row: u32) -> &[CellValue] {
        self.rows.get(row as usize).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of rows up to and including the last stored one.
    pub fn row_count(&self) -> u32 {
        self.rows.len() as u32
    }

    /// Blank every cell in `rows`, including cells the working copy never
    /// loaded (styled blanks, formulas without a cached value).
    pub fn clear_rows(&mut self, rows: Range<u32>) {
        if rows.is_empty() {
            return;
        }
        self.edited.retain(|(r, _)| !rows.contains(r));
        self.cleared.push(rows.clone());

        let end = (rows.end as usize).min(self.rows.len());
        let start = (rows.start as usize).min(end);
        for row in &mut self.rows[start..end] {
            row.clear();
        }
        while self.rows.last().is_some_and(|r| r.is_empty()) {
            self.rows.pop();
        }
    }

    /// Index of the last row holding any non-empty cell.
    pub fn last_occupied_row(&self) -> Option<u32> {
        self.rows
            .iter()
            .rposition(|r| r.iter().any(|c| !c.is_empty()))
            .map(|i| i as u32)
    }

    /// Column of the first cell in `row` whose trimmed text equals `header`.
    pub fn find_column(&self, row: u32, header: &str) -> Option<u32> {
        self.row(row)
            .iter()
            .position(|c| !c.is_empty() && c.to_string().trim() == header)
            .map(|i| i as u32)
    }

    /// True once anything was written or cleared since loading.
    pub fn is_edited(&self) -> bool {
        !self.edited.is_empty() || !self.cleared.is_empty()
    }

    /// Cells written since loading, row-major.
    pub fn edited_cells(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.edited.iter().copied()
    }

    pub fn is_row_cleared(&self, row: u32) -> bool {
        self.cleared.iter().any(|r| r.contains(&row))
    }

    /// All non-empty cells as (row, column, value), row-major.
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32, &CellValue)> + '_ {
        self.rows.iter().enumerate().flat_map(|(r, cells)| {
            cells
                .iter()
                .enumerate()
                .filter(|(_, c)| **c != CellValue::Empty)
                .map(move |(c, v)| (r as u32, c as u32, v))
        })
    }
}

/// A workbook: ordered sheets, plus the file they were loaded from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workbook {
    sheets: Vec<Sheet>,
    source: Option<PathBuf>,
}

impl Workbook {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Workbook {
            sheets,
            source: None,
        }
    }

    /// A working copy of the template at `source`.
    pub fn from_source(sheets: Vec<Sheet>, source: impl Into<PathBuf>) -> Self {
        Workbook {
            sheets,
            source: Some(source.into()),
        }
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|s| s.name == name)
    }

    pub fn first_sheet_name(&self) -> Option<&str> {
        self.sheets.first().map(|s| s.name.as_str())
    }
}

/// Trait for template document storage backends.
pub trait TemplateBackend: Send + Sync {
    /// Read the template at `path` into a working copy.
    fn open(&self, path: &Path) -> Result<Workbook, Pdf2XlsxError>;

    /// Write `workbook` to `path`, replacing any file there. A working copy
    /// of a template is written as that template plus the recorded edits.
    fn save(&self, workbook: &Workbook, path: &Path) -> Result<(), Pdf2XlsxError>;

    /// Name of this backend (for diagnostics).
    fn backend_name(&self) -> &str;
}
