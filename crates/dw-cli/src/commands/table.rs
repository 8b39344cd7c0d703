//! Plain-text tables for command output.
//!
//! Columns are separated by two spaces with a dashed rule under the header.
//! A column whose cells are all numbers is right-aligned. Long cells are cut
//! to [`MAX_CELL_CHARS`] and end in `~`.

const MAX_CELL_CHARS: usize = 60;
const GAP: &str = "  ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Column {
    width: usize,
    numeric: bool,
}

/// Render `rows` under `headers`, one line per row, each ending in `\n`.
pub(crate) fn render(headers: &[&str], rows: &[Vec<String>]) -> String {
    let columns = layout(headers, rows);
    let mut out = String::new();

    push_line(&mut out, headers.iter().map(|h| h.to_string()), &columns);
    let rule: Vec<String> = columns.iter().map(|c| "-".repeat(c.width)).collect();
    out.push_str(&rule.join(GAP));
    out.push('\n');
    for row in rows {
        push_line(&mut out, row.iter().map(|cell| clip(cell)), &columns);
    }
    out
}

pub(crate) fn print(headers: &[&str], rows: &[Vec<String>]) {
    print!("{}", render(headers, rows));
}

fn layout(headers: &[&str], rows: &[Vec<String>]) -> Vec<Column> {
    headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            let cells = || rows.iter().filter_map(move |row| row.get(i));
            let widest = cells().map(|c| clip(c).chars().count()).max().unwrap_or(0);
            Column {
                width: widest.max(header.chars().count()),
                numeric: !rows.is_empty() && cells().all(|c| is_number(c)),
            }
        })
        .collect()
}

fn push_line(out: &mut String, cells: impl Iterator<Item = String>, columns: &[Column]) {
    let parts: Vec<String> = cells
        .zip(columns)
        .map(|(cell, column)| {
            if column.numeric {
                format!("{cell:>width$}", width = column.width)
            } else {
                format!("{cell:<width$}", width = column.width)
            }
        })
        .collect();
    out.push_str(parts.join(GAP).trim_end());
    out.push('\n');
}

fn clip(cell: &str) -> String {
    if cell.chars().count() <= MAX_CELL_CHARS {
        return cell.to_string();
    }
    let mut clipped: String = cell.chars().take(MAX_CELL_CHARS - 1).collect();
    clipped.push('~');
    clipped
}

fn is_number(cell: &str) -> bool {
    let digits = cell.strip_prefix('-').unwrap_or(cell);
    digits.chars().any(|c| c.is_ascii_digit())
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
}

#[cfg(test)]
#[path = "table_test.rs"]
mod tests;
