use super::*;

fn rows(cells: &[&[&str]]) -> Vec<Vec<String>> {
    cells
        .iter()
        .map(|row| row.iter().map(|c| c.to_string()).collect())
        .collect()
}

#[test]
fn text_left_numbers_right() {
    let out = render(
        &["NAME", "NODES"],
        &rows(&[&["shop", "12"], &["finance", "3"]]),
    );
    assert_eq!(
        out,
        "NAME     NODES\n\
         -------  -----\n\
         shop        12\n\
         finance      3\n"
    );
}

#[test]
fn widths_count_characters_not_bytes() {
    let out = render(&["CITY"], &rows(&[&["Zürich"], &["Oslo"]]));
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines[1], "------");
    assert_eq!(lines[2], "Zürich");
}

#[test]
fn header_only_table_keeps_header_widths() {
    let out = render(&["RESOURCE_TYPE", "COUNT"], &[]);
    assert_eq!(out, "RESOURCE_TYPE  COUNT\n-------------  -----\n");
}

#[test]
fn long_cells_are_cut() {
    let long = "x".repeat(100);
    let out = render(&["SQL"], &rows(&[&[long.as_str()]]));
    let last = out.lines().last().unwrap();
    assert_eq!(last.chars().count(), MAX_CELL_CHARS);
    assert!(last.ends_with('~'));
}

#[test]
fn null_and_words_are_not_numbers() {
    assert!(is_number("42"));
    assert!(is_number("-1.5"));
    assert!(!is_number("null"));
    assert!(!is_number("-"));
    assert!(!is_number("2024-01-01"));
}
