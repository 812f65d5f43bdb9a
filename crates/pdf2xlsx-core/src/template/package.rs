//! Apply a working copy's edits to the `.xlsx` package it was loaded from.
//!
//! Only worksheets with edits are rewritten, and inside them only the
//! written cells and the cleared rows change. Every other part of the
//! package (styles, shared strings, drawings, defined names, column
//! widths, merged ranges) is copied through untouched.
//!
//! Written cells keep the style of the cell they replace. Text is stored
//! as inline strings so the shared string table never has to change. The
//! workbook is flagged for a full recalculation on load, and the
//! calculation chain is dropped so a spreadsheet application rebuilds it.

use crate::error::Pdf2XlsxError;
use crate::template::{CellValue, Sheet, Workbook};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::Path;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const CALC_CHAIN_PART: &str = "xl/calcChain.xml";

/// Children of `<workbook>` that follow `<calcPr>` in schema order.
const AFTER_CALC_PR: &[&[u8]] = &[
    b"oleSize",
    b"customWorkbookViews",
    b"pivotCaches",
    b"smartTagPr",
    b"smartTagTypes",
    b"webPublishing",
    b"fileRecoveryPr",
    b"webPublishObjects",
    b"extLst",
];

/// Write `source` with the edits recorded in `workbook` to `dest`.
pub(crate) fn save_patched(
    source: &Path,
    workbook: &Workbook,
    dest: &Path,
) -> Result<(), Pdf2XlsxError> {
    let err = |reason: String| Pdf2XlsxError::Template {
        path: source.to_path_buf(),
        reason,
    };

    let mut archive = ZipArchive::new(BufReader::new(File::open(source)?))
        .map_err(|e| err(format!("not an xlsx package: {e}")))?;
    let parts = sheet_parts(&mut archive).map_err(err)?;

    let mut edits: HashMap<&str, &Sheet> = HashMap::new();
    for sheet in workbook.sheets().iter().filter(|s| s.is_edited()) {
        let part = parts
            .get(sheet.name())
            .ok_or_else(|| err(format!("no worksheet part for sheet '{}'", sheet.name())))?;
        edits.insert(part.as_str(), sheet);
    }

    let mut out = ZipWriter::new(File::create(dest)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let zip_err = |e: zip::result::ZipError| err(e.to_string());
    let xml_err = |part: &str, e: quick_xml::Error| err(format!("{part}: {e}"));

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(zip_err)?;
        let name = entry.name().to_string();

        let patched = if edits.is_empty() {
            None
        } else if name == CALC_CHAIN_PART {
            continue;
        } else if let Some(sheet) = edits.get(name.as_str()) {
            let xml = read_entry(&mut entry).map_err(|e| err(format!("{name}: {e}")))?;
            Some(patch_sheet_xml(&xml, sheet).map_err(|e| xml_err(&name, e))?)
        } else if name == WORKBOOK_PART {
            let xml = read_entry(&mut entry).map_err(|e| err(format!("{name}: {e}")))?;
            Some(force_full_calc(&xml).map_err(|e| xml_err(&name, e))?)
        } else if name == WORKBOOK_RELS_PART {
            let xml = read_entry(&mut entry).map_err(|e| err(format!("{name}: {e}")))?;
            let patched = drop_elements(&xml, b"Relationship", b"Target", |t| {
                t.ends_with("calcChain.xml")
            });
            Some(patched.map_err(|e| xml_err(&name, e))?)
        } else if name == CONTENT_TYPES_PART {
            let xml = read_entry(&mut entry).map_err(|e| err(format!("{name}: {e}")))?;
            let patched = drop_elements(&xml, b"Override", b"PartName", |p| {
                p == format!("/{CALC_CHAIN_PART}")
            });
            Some(patched.map_err(|e| xml_err(&name, e))?)
        } else {
            None
        };

        match patched {
            Some(bytes) => {
                debug!(part = %name, "rewrote package part");
                out.start_file(name.as_str(), options).map_err(zip_err)?;
                out.write_all(&bytes)?;
            }
            None => out.raw_copy_file(entry).map_err(zip_err)?,
        }
    }

    out.finish().map_err(zip_err)?;
    Ok(())
}

fn read_entry(entry: &mut impl Read) -> std::io::Result<String> {
    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    Ok(xml)
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String, String> {
    let mut entry = archive
        .by_name(name)
        .map_err(|e| format!("missing {name}: {e}"))?;
    read_entry(&mut entry).map_err(|e| format!("{name}: {e}"))
}

/// Sheet name -> worksheet part path inside the package.
fn sheet_parts<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<HashMap<String, String>, String> {
    let workbook = read_part(archive, WORKBOOK_PART)?;
    let rels = read_part(archive, WORKBOOK_RELS_PART)?;
    let targets = relationship_targets(&rels).map_err(|e| format!("{WORKBOOK_RELS_PART}: {e}"))?;
    let sheets = sheet_relationships(&workbook).map_err(|e| format!("{WORKBOOK_PART}: {e}"))?;

    Ok(sheets
        .into_iter()
        .filter_map(|(name, id)| targets.get(&id).map(|t| (name, resolve_target(t))))
        .collect())
}

fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target.trim_start_matches("./")),
    }
}

/// `<sheet name=".." r:id=".."/>` entries of workbook.xml, in order.
fn sheet_relationships(xml: &str) -> quick_xml::Result<Vec<(String, String)>> {
    let mut reader = Reader::from_str(xml);
    let mut sheets = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let mut name = None;
                let mut id = None;
                for attr in e.attributes() {
                    let attr = attr?;
                    if attr.key.as_ref() == b"name" {
                        name = Some(quick_xml::escape::unescape(std::str::from_utf8(&attr.value)?)?.into_owned());
                    } else if attr.key.prefix().is_some()
                        && attr.key.local_name().as_ref() == b"id"
                    {
                        id = Some(quick_xml::escape::unescape(std::str::from_utf8(&attr.value)?)?.into_owned());
                    }
                }
                if let (Some(name), Some(id)) = (name, id) {
                    sheets.push((name, id));
                }
            }
            _ => {}
        }
    }
    Ok(sheets)
}

/// Relationship id -> target of a `.rels` part.
fn relationship_targets(xml: &str) -> quick_xml::Result<HashMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    let mut targets = HashMap::new();
    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attr(&e, b"Id")?, attr(&e, b"Target")?) {
                    targets.insert(id, target);
                }
            }
            _ => {}
        }
    }
    Ok(targets)
}

/// Copy `xml`, leaving out every `local` element whose `key` attribute
/// satisfies `reject`.
fn drop_elements(
    xml: &str,
    local: &[u8],
    key: &[u8],
    reject: impl Fn(&str) -> bool,
) -> quick_xml::Result<Vec<u8>> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    loop {
        let event = reader.read_event()?;
        match event {
            Event::Eof => break,
            Event::Empty(ref e) if e.local_name().as_ref() == local => {
                if attr(e, key)?.is_some_and(|v| reject(&v)) {
                    continue;
                }
            }
            Event::Start(ref e) if e.local_name().as_ref() == local => {
                if attr(e, key)?.is_some_and(|v| reject(&v)) {
                    reader.read_to_end(e.name())?;
                    continue;
                }
            }
            _ => {}
        }
        writer.write_event(event)?;
    }
    Ok(writer.into_inner())
}

/// Set `fullCalcOnLoad` on workbook.xml's `<calcPr>`, adding the element
/// in schema position when the workbook has none.
fn force_full_calc(xml: &str) -> quick_xml::Result<Vec<u8>> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 32));
    let mut depth = 0usize;
    let mut prefix = String::new();
    let mut done = false;

    loop {
        let event = reader.read_event()?;
        match event {
            Event::Eof => break,
            Event::Start(ref e) if depth == 0 => prefix = prefix_of(e),
            Event::Start(ref e) | Event::Empty(ref e) if depth == 1 => {
                if e.local_name().as_ref() == b"calcPr" {
                    let mut calc = without_attr(e, b"fullCalcOnLoad")?;
                    calc.push_attribute(("fullCalcOnLoad", "1"));
                    done = true;
                    if matches!(event, Event::Start(_)) {
                        depth += 1;
                        writer.write_event(Event::Start(calc))?;
                    } else {
                        writer.write_event(Event::Empty(calc))?;
                    }
                    continue;
                }
                if !done && AFTER_CALC_PR.contains(&e.local_name().as_ref()) {
                    write_calc_pr(&mut writer, &prefix)?;
                    done = true;
                }
            }
            Event::End(_) if depth == 1 && !done => {
                write_calc_pr(&mut writer, &prefix)?;
                done = true;
            }
            _ => {}
        }

        match event {
            Event::Start(_) => depth += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            _ => {}
        }
        writer.write_event(event)?;
    }
    Ok(writer.into_inner())
}

fn write_calc_pr(writer: &mut Writer<Vec<u8>>, prefix: &str) -> quick_xml::Result<()> {
    let mut calc = BytesStart::new(format!("{prefix}calcPr"));
    calc.push_attribute(("fullCalcOnLoad", "1"));
    writer.write_event(Event::Empty(calc))
}

struct RowXml<'a> {
    index: u32,
    start: BytesStart<'a>,
    empty: bool,
    cells: BTreeMap<u32, CellXml<'a>>,
}

struct CellXml<'a> {
    style: Option<String>,
    events: Vec<Event<'a>>,
}

/// Rewrite a worksheet part with the edits of `sheet`.
fn patch_sheet_xml(xml: &str, sheet: &Sheet) -> quick_xml::Result<Vec<u8>> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Empty(e) if e.local_name().as_ref() == b"dimension" => {
                writer.write_event(Event::Empty(widen_dimension(&e, sheet)?))?;
            }
            Event::Start(e) if e.local_name().as_ref() == b"sheetData" => {
                let prefix = prefix_of(&e);
                let rows = read_rows(&mut reader)?;
                writer.write_event(Event::Start(e))?;
                write_rows(&mut writer, &prefix, rows, sheet)?;
                writer.write_event(Event::End(BytesEnd::new(format!("{prefix}sheetData"))))?;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"sheetData" => {
                let prefix = prefix_of(&e);
                writer.write_event(Event::Start(e))?;
                write_rows(&mut writer, &prefix, Vec::new(), sheet)?;
                writer.write_event(Event::End(BytesEnd::new(format!("{prefix}sheetData"))))?;
            }
            event => writer.write_event(event)?,
        }
    }
    Ok(writer.into_inner())
}

/// Collect the rows of `<sheetData>` up to its end tag.
fn read_rows<'a>(reader: &mut Reader<&'a [u8]>) -> quick_xml::Result<Vec<RowXml<'a>>> {
    let mut rows = Vec::new();
    let mut current: Option<RowXml<'a>> = None;
    let mut next_row = 0u32;
    let mut next_col = 0u32;

    loop {
        match reader.read_event()? {
            Event::Eof => return Err(quick_xml::Error::UnexpectedEof("sheetData".into())),
            Event::End(e) if e.local_name().as_ref() == b"sheetData" => break,
            Event::Start(e) if e.local_name().as_ref() == b"row" => {
                let index = row_index(&e, next_row)?;
                next_row = index + 1;
                next_col = 0;
                let row = RowXml {
                    index,
                    start: e,
                    empty: false,
                    cells: BTreeMap::new(),
                };
                rows.extend(current.replace(row));
            }
            Event::Empty(e) if e.local_name().as_ref() == b"row" => {
                let index = row_index(&e, next_row)?;
                next_row = index + 1;
                rows.extend(current.take());
                rows.push(RowXml {
                    index,
                    start: e,
                    empty: true,
                    cells: BTreeMap::new(),
                });
            }
            Event::End(e) if e.local_name().as_ref() == b"row" => {
                rows.extend(current.take());
            }
            Event::Start(e) if e.local_name().as_ref() == b"c" => {
                let col = cell_column(&e)?.unwrap_or(next_col);
                next_col = col + 1;
                let style = attr(&e, b"s")?;
                let mut events = vec![Event::Start(e)];
                loop {
                    let event = reader.read_event()?;
                    let end =
                        matches!(event, Event::End(ref end) if end.local_name().as_ref() == b"c");
                    if matches!(event, Event::Eof) {
                        return Err(quick_xml::Error::UnexpectedEof("c".into()));
                    }
                    events.push(event);
                    if end {
                        break;
                    }
                }
                if let Some(row) = current.as_mut() {
                    row.cells.insert(col, CellXml { style, events });
                }
            }
            Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                let col = cell_column(&e)?.unwrap_or(next_col);
                next_col = col + 1;
                let style = attr(&e, b"s")?;
                if let Some(row) = current.as_mut() {
                    row.cells.insert(
                        col,
                        CellXml {
                            style,
                            events: vec![Event::Empty(e)],
                        },
                    );
                }
            }
            _ => {}
        }
    }
    rows.extend(current.take());
    Ok(rows)
}

/// 0-based index from the `r` attribute, or the row after the previous one.
fn row_index(e: &BytesStart<'_>, next: u32) -> quick_xml::Result<u32> {
    Ok(attr(e, b"r")?
        .and_then(|r| r.parse::<u32>().ok())
        .and_then(|r| r.checked_sub(1))
        .unwrap_or(next))
}

fn write_rows(
    writer: &mut Writer<Vec<u8>>,
    prefix: &str,
    rows: Vec<RowXml<'_>>,
    sheet: &Sheet,
) -> quick_xml::Result<()> {
    let mut edited: BTreeMap<u32, BTreeSet<u32>> = BTreeMap::new();
    for (row, col) in sheet.edited_cells() {
        edited.entry(row).or_default().insert(col);
    }
    let mut existing: BTreeMap<u32, RowXml<'_>> = rows.into_iter().map(|r| (r.index, r)).collect();
    let indices: BTreeSet<u32> = existing.keys().chain(edited.keys()).copied().collect();
    let row_name = format!("{prefix}row");

    for index in indices {
        let cols = edited.remove(&index).unwrap_or_default();
        let cleared = sheet.is_row_cleared(index);

        let (start, mut cells) = match existing.remove(&index) {
            Some(row) if cols.is_empty() && !cleared => {
                write_row_verbatim(writer, &row_name, row)?;
                continue;
            }
            Some(row) => (without_attr(&row.start, b"spans")?, row.cells),
            None => {
                let mut start = BytesStart::new(row_name.clone());
                start.push_attribute(("r", (index + 1).to_string().as_str()));
                (start, BTreeMap::new())
            }
        };

        let all_cols: BTreeSet<u32> = cells.keys().chain(cols.iter()).copied().collect();
        writer.write_event(Event::Start(start))?;
        for col in all_cols {
            let original = cells.remove(&col);
            let style = original.as_ref().and_then(|c| c.style.as_deref());
            if cols.contains(&col) {
                write_cell(writer, prefix, index, col, sheet.cell(index, col), style)?;
            } else if cleared {
                write_cell(writer, prefix, index, col, &CellValue::Empty, style)?;
            } else if let Some(cell) = original {
                for event in cell.events {
                    writer.write_event(event)?;
                }
            }
        }
        writer.write_event(Event::End(BytesEnd::new(row_name.clone())))?;
    }
    Ok(())
}

fn write_row_verbatim(
    writer: &mut Writer<Vec<u8>>,
    row_name: &str,
    row: RowXml<'_>,
) -> quick_xml::Result<()> {
    if row.empty {
        return writer.write_event(Event::Empty(row.start));
    }
    writer.write_event(Event::Start(row.start))?;
    for cell in row.cells.into_values() {
        for event in cell.events {
            writer.write_event(event)?;
        }
    }
    writer.write_event(Event::End(BytesEnd::new(row_name)))
}

/// Write one `<c>` element holding `value`. A blank without a style is
/// left out entirely.
fn write_cell(
    writer: &mut Writer<Vec<u8>>,
    prefix: &str,
    row: u32,
    col: u32,
    value: &CellValue,
    style: Option<&str>,
) -> quick_xml::Result<()> {
    let name = format!("{prefix}c");
    let reference = cell_ref(row, col);
    let mut start = BytesStart::new(name.as_str());
    start.push_attribute(("r", reference.as_str()));
    if let Some(style) = style {
        start.push_attribute(("s", style));
    }

    match value {
        CellValue::Empty => {
            if style.is_some() {
                writer.write_event(Event::Empty(start))?;
            }
            return Ok(());
        }
        CellValue::Text(text) => {
            start.push_attribute(("t", "inlineStr"));
            writer.write_event(Event::Start(start))?;
            let is = format!("{prefix}is");
            writer.write_event(Event::Start(BytesStart::new(is.as_str())))?;
            let mut t = BytesStart::new(format!("{prefix}t"));
            t.push_attribute(("xml:space", "preserve"));
            writer.write_event(Event::Start(t))?;
            writer.write_event(Event::Text(BytesText::new(text)))?;
            writer.write_event(Event::End(BytesEnd::new(format!("{prefix}t"))))?;
            writer.write_event(Event::End(BytesEnd::new(is)))?;
        }
        CellValue::Number(n) | CellValue::DateTime(n) => {
            writer.write_event(Event::Start(start))?;
            write_text_element(writer, &format!("{prefix}v"), &n.to_string())?;
        }
        CellValue::Bool(b) => {
            start.push_attribute(("t", "b"));
            writer.write_event(Event::Start(start))?;
            write_text_element(writer, &format!("{prefix}v"), if *b { "1" } else { "0" })?;
        }
        CellValue::Formula(formula) => {
            writer.write_event(Event::Start(start))?;
            write_text_element(writer, &format!("{prefix}f"), formula.trim_start_matches('='))?;
        }
    }
    writer.write_event(Event::End(BytesEnd::new(name)))
}

fn write_text_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    text: &str,
) -> quick_xml::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))
}

/// Grow `<dimension ref="A1:D10"/>` to cover every written cell.
fn widen_dimension(e: &BytesStart<'_>, sheet: &Sheet) -> quick_xml::Result<BytesStart<'static>> {
    let Some(range) = attr(e, b"ref")? else {
        return without_attr(e, b"");
    };
    let (first, last) = range.split_once(':').unwrap_or((range.as_str(), range.as_str()));
    let (Some(start), Some(end)) = (parse_cell_ref(first), parse_cell_ref(last)) else {
        return without_attr(e, b"");
    };

    let (mut max_row, mut max_col) = end;
    for (row, col) in sheet.edited_cells() {
        max_row = max_row.max(row);
        max_col = max_col.max(col);
    }

    let mut out = without_attr(e, b"ref")?;
    let widened = format!("{}:{}", cell_ref(start.0, start.1), cell_ref(max_row, max_col));
    out.push_attribute(("ref", widened.as_str()));
    Ok(out)
}

fn attr(e: &BytesStart<'_>, name: &[u8]) -> quick_xml::Result<Option<String>> {
    match e.try_get_attribute(name)? {
        Some(a) => Ok(Some(quick_xml::escape::unescape(std::str::from_utf8(&a.value)?)?.into_owned())),
        None => Ok(None),
    }
}

/// Copy of `e` without the attribute `skip`.
fn without_attr(e: &BytesStart<'_>, skip: &[u8]) -> quick_xml::Result<BytesStart<'static>> {
    let mut out = BytesStart::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
    for a in e.attributes() {
        let a = a?;
        if a.key.as_ref() != skip {
            out.push_attribute(a);
        }
    }
    Ok(out)
}

/// Namespace prefix of `e` including the colon, or an empty string.
fn prefix_of(e: &BytesStart<'_>) -> String {
    e.name()
        .prefix()
        .map(|p| format!("{}:", String::from_utf8_lossy(p.as_ref())))
        .unwrap_or_default()
}

fn cell_column(e: &BytesStart<'_>) -> quick_xml::Result<Option<u32>> {
    Ok(attr(e, b"r")?.and_then(|r| parse_cell_ref(&r)).map(|(_, col)| col))
}

/// "B12" -> (11, 1), both 0-based.
fn parse_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let reference = reference.replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() || !letters.bytes().all(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    let col = letters
        .bytes()
        .fold(0u32, |acc, b| acc * 26 + u32::from(b.to_ascii_uppercase() - b'A') + 1);
    let row: u32 = digits.parse().ok()?;
    Some((row.checked_sub(1)?, col - 1))
}

/// (11, 1) -> "B12".
fn cell_ref(row: u32, col: u32) -> String {
    let mut letters = Vec::new();
    let mut n = col + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    format!("{}{}", String::from_utf8_lossy(&letters), row + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const SHEET: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
        r#"<dimension ref="A1:D2"/>"#,
        r#"<cols><col min="1" max="1" width="30" customWidth="1"/></cols>"#,
        r#"<sheetData>"#,
        r#"<row r="1" spans="1:4"><c r="A1" s="1" t="s"><v>0</v></c><c r="B1" s="1" t="s"><v>1</v></c></row>"#,
        r#"<row r="2" spans="1:4"><c r="A2" s="2" t="s"><v>2</v></c><c r="D2" s="3"><f>SUM(B2:B100)</f><v>0</v></c></row>"#,
        r#"</sheetData>"#,
        r#"<mergeCells count="1"><mergeCell ref="F1:G1"/></mergeCells>"#,
        r#"</worksheet>"#,
    );

    fn patched(sheet: &Sheet) -> String {
        String::from_utf8(patch_sheet_xml(SHEET, sheet).unwrap()).unwrap()
    }

    #[test]
    fn test_cell_refs() {
        assert_eq!(parse_cell_ref("A1"), Some((0, 0)));
        assert_eq!(parse_cell_ref("B12"), Some((11, 1)));
        assert_eq!(parse_cell_ref("$AA$3"), Some((2, 26)));
        assert_eq!(parse_cell_ref("12"), None);
        assert_eq!(cell_ref(11, 1), "B12");
        assert_eq!(cell_ref(0, 26), "AA1");
        assert_eq!(cell_ref(0, 701), "ZZ1");
    }

    #[test]
    fn test_untouched_sheet_is_copied() {
        let out = patched(&Sheet::new("Data"));
        assert!(out.contains(r#"<c r="D2" s="3"><f>SUM(B2:B100)</f><v>0</v></c>"#));
        assert!(out.contains(r#"<row r="1" spans="1:4">"#));
        assert!(out.contains(r#"<mergeCell ref="F1:G1"/>"#));
        assert!(out.contains(r#"<col min="1" max="1" width="30" customWidth="1"/>"#));
    }

    #[test]
    fn test_appended_row_keeps_formula_and_widens_dimension() {
        let mut sheet = Sheet::new("Data");
        sheet.set_cell(2, 0, CellValue::Text("A1 & <b>".into()));
        sheet.set_cell(2, 1, CellValue::Number(dec!(10.5)));
        let out = patched(&sheet);

        assert!(out.contains(r#"<f>SUM(B2:B100)</f>"#));
        assert!(out.contains(r#"<dimension ref="A1:D3"/>"#));
        assert!(out.contains(concat!(
            r#"<row r="3"><c r="A3" t="inlineStr"><is><t xml:space="preserve">A1 &amp; &lt;b&gt;</t></is></c>"#,
            r#"<c r="B3"><v>10.5</v></c></row>"#
        )));
        assert!(out.find(r#"<row r="2""#) < out.find(r#"<row r="3""#));
    }

    #[test]
    fn test_overwritten_cell_keeps_style() {
        let mut sheet = Sheet::new("Data");
        sheet.set_cell(1, 0, CellValue::Text("new".into()));
        let out = patched(&sheet);

        assert!(out.contains(r#"<c r="A2" s="2" t="inlineStr"><is><t xml:space="preserve">new</t></is></c>"#));
        assert!(out.contains(r#"<c r="D2" s="3"><f>SUM(B2:B100)</f><v>0</v></c>"#));
        assert!(!out.contains(r#"<row r="2" spans"#));
    }

    #[test]
    fn test_cleared_rows_drop_values_but_keep_styles() {
        let mut sheet = Sheet::new("Data");
        sheet.clear_rows(1..u32::MAX);
        let out = patched(&sheet);

        assert!(out.contains(r#"<row r="2"><c r="A2" s="2"/><c r="D2" s="3"/></row>"#));
        assert!(!out.contains("SUM(B2:B100)"));
        assert!(out.contains(r#"<c r="A1" s="1" t="s"><v>0</v></c>"#));
    }

    #[test]
    fn test_empty_sheet_data_gets_rows() {
        let xml = r#"<worksheet><sheetData/></worksheet>"#;
        let mut sheet = Sheet::new("Data");
        sheet.set_cell(0, 0, CellValue::Bool(true));
        let out = String::from_utf8(patch_sheet_xml(xml, &sheet).unwrap()).unwrap();
        assert_eq!(
            out,
            r#"<worksheet><sheetData><row r="1"><c r="A1" t="b"><v>1</v></c></row></sheetData></worksheet>"#
        );
    }

    #[test]
    fn test_full_calc_flag() {
        let with_calc = r#"<workbook><sheets><sheet name="Data" sheetId="1" r:id="rId1"/></sheets><calcPr calcId="191029"/></workbook>"#;
        let out = String::from_utf8(force_full_calc(with_calc).unwrap()).unwrap();
        assert!(out.contains(r#"<calcPr calcId="191029" fullCalcOnLoad="1"/>"#));

        let without = r#"<workbook><sheets/><extLst/></workbook>"#;
        let out = String::from_utf8(force_full_calc(without).unwrap()).unwrap();
        assert_eq!(out, r#"<workbook><sheets/><calcPr fullCalcOnLoad="1"/><extLst/></workbook>"#);
    }

    #[test]
    fn test_sheet_relationships_resolve_to_parts() {
        let workbook = r#"<workbook xmlns:r="r"><sheets><sheet name="Cover" sheetId="1" r:id="rId1"/><sheet name="Data" sheetId="2" r:id="rId2"/></sheets></workbook>"#;
        let rels = r#"<Relationships><Relationship Id="rId1" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Target="/xl/worksheets/sheet2.xml"/><Relationship Id="rId3" Target="calcChain.xml"/></Relationships>"#;

        let sheets = sheet_relationships(workbook).unwrap();
        let targets = relationship_targets(rels).unwrap();
        assert_eq!(sheets[1], ("Data".to_string(), "rId2".to_string()));
        assert_eq!(resolve_target(&targets["rId1"]), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target(&targets["rId2"]), "xl/worksheets/sheet2.xml");

        let dropped = drop_elements(rels, b"Relationship", b"Target", |t| {
            t.ends_with("calcChain.xml")
        })
        .unwrap();
        let dropped = String::from_utf8(dropped).unwrap();
        assert!(!dropped.contains("calcChain"));
        assert!(dropped.contains("rId2"));
    }
}
