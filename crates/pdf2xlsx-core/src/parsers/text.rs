//! Line-level helpers shared by supplier parsers working on pdftotext output.

use crate::extraction::PageContent;

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Flatten all pages into normalized, non-empty lines in reading order.
pub fn normalized_lines(pages: &[PageContent]) -> Vec<String> {
    pages
        .iter()
        .flat_map(|p| p.lines.iter())
        .map(|l| normalize_ws(l))
        .filter(|l| !l.is_empty())
        .collect()
}

/// Detect if a line looks like a table header row: at least `min_hits` of
/// the given keywords occur in it (case-insensitive).
pub fn is_table_header(line: &str, keywords: &[&str], min_hits: usize) -> bool {
    let lower = line.to_lowercase();
    let count = keywords.iter().filter(|kw| lower.contains(*kw)).count();
    count >= min_hits
}
