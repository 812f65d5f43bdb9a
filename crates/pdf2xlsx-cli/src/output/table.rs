use pdf2xlsx_core::model::{Field, LineItem};

/// Render extracted line items as an aligned text table, one row per item.
pub fn format_items(items: &[LineItem]) -> String {
    if items.is_empty() {
        return "No line items found.".to_string();
    }

    let rows: Vec<Vec<String>> = items
        .iter()
        .map(|item| {
            Field::ALL
                .iter()
                .map(|&field| match item.value(field) {
                    Some(value) => value.to_string(),
                    None => "-".to_string(),
                })
                .collect()
        })
        .collect();

    let widths: Vec<usize> = Field::ALL
        .iter()
        .enumerate()
        .map(|(col, field)| {
            rows.iter()
                .map(|r| r[col].chars().count())
                .chain(std::iter::once(field.name().len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    let header: Vec<String> = Field::ALL
        .iter()
        .zip(&widths)
        .map(|(field, &w)| pad(field.name(), w, field.is_numeric()))
        .collect();
    out.push_str(header.join("  ").trim_end());
    out.push('\n');
    out.push_str(&"-".repeat(widths.iter().sum::<usize>() + 2 * (widths.len() - 1)));
    out.push('\n');

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .zip(Field::ALL.iter().zip(&widths))
            .map(|(cell, (field, &w))| pad(cell, w, field.is_numeric()))
            .collect();
        out.push_str(cells.join("  ").trim_end());
        out.push('\n');
    }

    out.push_str(&format!("\n{} item(s)", items.len()));
    out
}

fn pad(s: &str, width: usize, right: bool) -> String {
    if right {
        format!("{s:>width$}")
    } else {
        format!("{s:<width$}")
    }
}
