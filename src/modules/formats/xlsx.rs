//! SpreadsheetML (.xlsx) reading; writing goes through `rust_xlsxwriter`.

use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use rust_xlsxwriter::Workbook;

use super::Table;
use super::xml::{attribute, open_archive, read_entry};
use crate::error::{ConvertError, Result};

/// Reads the first worksheet of the workbook.
pub fn read_xlsx(path: &Path) -> Result<Table> {
    let mut archive = open_archive(path)?;

    let shared = match read_entry(&mut archive, "xl/sharedStrings.xml")? {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };

    let mut sheets: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let number = name
                .strip_prefix("xl/worksheets/sheet")?
                .strip_suffix(".xml")?
                .parse::<u32>()
                .ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    sheets.sort();

    let (_, first) = sheets
        .into_iter()
        .next()
        .ok_or_else(|| ConvertError::InvalidInput("workbook has no worksheets".to_string()))?;
    let xml = read_entry(&mut archive, &first)?
        .ok_or_else(|| ConvertError::InvalidInput(format!("missing {first}")))?;
    parse_sheet(&xml, &shared)
}

pub fn parse_shared_strings(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    // Phonetic runs (<rPh>) repeat the text and must be skipped.
    let mut in_phonetic = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"t" => in_text = !in_phonetic,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(t) if in_text => current.push_str(&t.unescape()?),
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(std::mem::take(&mut current)),
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

pub fn parse_sheet(xml: &str, shared: &[String]) -> Result<Table> {
    let mut reader = Reader::from_str(xml);
    let mut rows: Vec<Vec<String>> = Vec::new();

    let mut row_idx = 0usize;
    let mut col_idx = 0usize;
    let mut cell_type = String::new();
    let mut value = String::new();
    let mut in_value = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    row_idx = match attribute(&e, "r")?.and_then(|r| r.parse::<usize>().ok()) {
                        Some(r) if r > 0 => r - 1,
                        _ => rows.len(),
                    };
                    col_idx = 0;
                }
                b"c" => {
                    if let Some(reference) = attribute(&e, "r")? {
                        if let Some(col) = column_index(&reference) {
                            col_idx = col;
                        }
                    }
                    cell_type = attribute(&e, "t")?.unwrap_or_default();
                    value.clear();
                }
                b"v" | b"t" => in_value = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                if let Some(col) = attribute(&e, "r")?.as_deref().and_then(column_index) {
                    col_idx = col + 1;
                } else {
                    col_idx += 1;
                }
            }
            Event::Text(t) if in_value => value.push_str(&t.unescape()?),
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    let text = match cell_type.as_str() {
                        "s" => value
                            .trim()
                            .parse::<usize>()
                            .ok()
                            .and_then(|idx| shared.get(idx).cloned())
                            .unwrap_or_default(),
                        "b" => if value.trim() == "1" { "TRUE" } else { "FALSE" }.to_string(),
                        _ => value.clone(),
                    };
                    set_cell(&mut rows, row_idx, col_idx, text);
                    col_idx += 1;
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(Table::new(rows).normalized())
}

fn set_cell(rows: &mut Vec<Vec<String>>, row: usize, col: usize, text: String) {
    if rows.len() <= row {
        rows.resize(row + 1, Vec::new());
    }
    let cells = &mut rows[row];
    if cells.len() <= col {
        cells.resize(col + 1, String::new());
    }
    cells[col] = text;
}

// Worksheet limits of the xlsx format.
const MAX_ROWS: usize = 1_048_576;
const MAX_COLUMNS: usize = 16_384;

/// Zero-based column of an A1-style reference (`"AB12"` → 27). `None` past
/// the last worksheet column (XFD).
pub fn column_index(reference: &str) -> Option<usize> {
    let letters: String = reference.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    if letters.is_empty() {
        return None;
    }
    let mut index = 0usize;
    for c in letters.chars() {
        let digit = c.to_ascii_uppercase() as usize - 'A' as usize + 1;
        index = index.checked_mul(26)?.checked_add(digit)?;
    }
    (index <= MAX_COLUMNS).then(|| index - 1)
}

pub fn write_xlsx(table: &Table, path: &Path) -> Result<()> {
    if table.width() > MAX_COLUMNS || table.rows.len() > MAX_ROWS {
        return Err(ConvertError::InvalidInput(format!(
            "{} rows by {} columns does not fit in a worksheet ({MAX_ROWS} by {MAX_COLUMNS})",
            table.rows.len(),
            table.width()
        )));
    }

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (r, row) in table.rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            if cell.is_empty() {
                continue;
            }
            // Both fit: checked against the worksheet limits above.
            let (r, c) = (r as u32, c as u16);
            match cell.trim().parse::<f64>() {
                Ok(number) if number.is_finite() && r > 0 => {
                    worksheet.write_number(r, c, number)?;
                }
                _ => {
                    worksheet.write_string(r, c, cell)?;
                }
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_references() {
        assert_eq!(column_index("A1"), Some(0));
        assert_eq!(column_index("Z9"), Some(25));
        assert_eq!(column_index("AB12"), Some(27));
        assert_eq!(column_index("12"), None);
        assert_eq!(column_index("XFD1"), Some(MAX_COLUMNS - 1));
        assert_eq!(column_index("XFE1"), None);
        assert_eq!(column_index(&"Z".repeat(40)), None);
    }

    #[test]
    fn too_wide_tables_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.xlsx");
        let table = Table::new(vec![vec!["x".to_string(); MAX_COLUMNS + 1]]);
        let err = write_xlsx(&table, &path).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidInput(_)));
        assert!(!path.exists());
    }

    #[test]
    fn shared_strings_join_rich_runs() {
        let xml = r#"<sst><si><t>plain</t></si><si><r><t>rich </t></r><r><t>text</t></r><rPh><t>skip</t></rPh></si><si/></sst>"#;
        assert_eq!(parse_shared_strings(xml).unwrap(), vec!["plain", "rich text", ""]);
    }

    #[test]
    fn sheet_cells_resolve_types_and_gaps() {
        let shared = vec!["name".to_string(), "Ann".to_string()];
        let xml = r#"<worksheet><sheetData>
            <row r="1"><c r="A1" t="s"><v>0</v></c><c r="C1" t="inlineStr"><is><t>flag</t></is></c></row>
            <row r="3"><c r="A3" t="s"><v>1</v></c><c r="B3"><v>4.5</v></c><c r="C3" t="b"><v>1</v></c></row>
        </sheetData></worksheet>"#;
        let table = parse_sheet(xml, &shared).unwrap();
        assert_eq!(
            table.rows,
            vec![
                vec!["name", "", "flag"],
                vec!["", "", ""],
                vec!["Ann", "4.5", "TRUE"],
            ]
        );
    }

    #[test]
    fn written_workbook_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        let table = Table::new(vec![
            vec!["item".into(), "qty".into()],
            vec!["bolts".into(), "12".into()],
        ]);
        write_xlsx(&table, &path).unwrap();
        let back = read_xlsx(&path).unwrap();
        assert_eq!(back.rows[0], vec!["item", "qty"]);
        assert_eq!(back.rows[1][0], "bolts");
        assert_eq!(back.rows[1][1], "12");
    }
}
