//! OpenDocument packages: text (.odt), spreadsheet (.ods) and presentation
//! (.odp). All three share the same `content.xml` vocabulary, so one parser
//! serves them.

use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::pptx::Slide;
use super::xml::{attribute, escape, open_archive, read_entry, write_package};
use super::{Block, Table, TextDocument};
use crate::error::{ConvertError, Result};

const MIME_TEXT: &str = "application/vnd.oasis.opendocument.text";
const MIME_SPREADSHEET: &str = "application/vnd.oasis.opendocument.spreadsheet";

// Spreadsheets pad sheets with huge repeat counts of empty rows and cells.
const MAX_EMPTY_REPEAT: usize = 64;

pub fn read_odt(path: &Path) -> Result<TextDocument> {
    let pages = read_content(path)?;
    let mut doc = TextDocument::new();
    for block in pages.into_iter().flatten() {
        doc.blocks.push(block);
    }
    Ok(doc)
}

/// The first sheet of the spreadsheet.
pub fn read_ods(path: &Path) -> Result<Table> {
    let pages = read_content(path)?;
    Ok(pages
        .into_iter()
        .flatten()
        .find_map(|block| match block {
            Block::Table(table) => Some(table),
            _ => None,
        })
        .unwrap_or_default())
}

pub fn read_odp(path: &Path) -> Result<Vec<Slide>> {
    let pages = read_content(path)?;
    Ok(pages
        .into_iter()
        .map(|blocks| {
            let mut paragraphs = Vec::new();
            for block in blocks {
                match block {
                    Block::Heading { text, .. } | Block::Paragraph(text) => paragraphs.push(text),
                    Block::Table(table) => {
                        paragraphs.extend(table.rows.iter().map(|row| row.join("\t")));
                    }
                }
            }
            Slide { paragraphs }
        })
        .collect())
}

fn read_content(path: &Path) -> Result<Vec<Vec<Block>>> {
    let mut archive = open_archive(path)?;
    let xml = read_entry(&mut archive, "content.xml")?
        .ok_or_else(|| ConvertError::InvalidInput("missing content.xml".to_string()))?;
    parse_content(&xml)
}

struct TableState {
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    row_repeat: usize,
    cell: String,
    cell_repeat: usize,
}

impl TableState {
    fn new() -> Self {
        Self { rows: Vec::new(), row: Vec::new(), row_repeat: 1, cell: String::new(), cell_repeat: 1 }
    }

    fn push_cell(&mut self) {
        let text = std::mem::take(&mut self.cell);
        let repeat = if text.is_empty() { self.cell_repeat.min(MAX_EMPTY_REPEAT) } else { self.cell_repeat };
        for _ in 0..repeat {
            self.row.push(text.clone());
        }
    }

    fn push_row(&mut self) {
        let mut row = std::mem::take(&mut self.row);
        while row.last().is_some_and(String::is_empty) {
            row.pop();
        }
        let repeat = if row.is_empty() { self.row_repeat.min(MAX_EMPTY_REPEAT) } else { self.row_repeat };
        for _ in 0..repeat {
            self.rows.push(row.clone());
        }
    }
}

fn repeat_count(e: &BytesStart<'_>, name: &str) -> Result<usize> {
    Ok(attribute(e, name)?
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(1)
        .max(1))
}

/// Parses `content.xml` into blocks grouped by `draw:page`. Documents without
/// pages come back as a single group.
pub fn parse_content(xml: &str) -> Result<Vec<Vec<Block>>> {
    let mut reader = Reader::from_str(xml);
    let mut pages: Vec<Vec<Block>> = vec![Vec::new()];
    let mut saw_page = false;

    let mut para: Option<String> = None;
    let mut heading: Option<u8> = None;
    let mut para_depth = 0usize;
    let mut tables: Vec<TableState> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"page" => {
                    if saw_page || !pages[0].is_empty() {
                        pages.push(Vec::new());
                    }
                    saw_page = true;
                }
                b"h" | b"p" => {
                    para_depth += 1;
                    if para_depth == 1 {
                        para = Some(String::new());
                        heading = if e.local_name().as_ref() == b"h" {
                            Some(
                                attribute(&e, "text:outline-level")?
                                    .and_then(|v| v.parse::<u8>().ok())
                                    .unwrap_or(1),
                            )
                        } else {
                            None
                        };
                    }
                }
                b"table" => tables.push(TableState::new()),
                b"table-row" => {
                    if let Some(table) = tables.last_mut() {
                        table.row_repeat = repeat_count(&e, "table:number-rows-repeated")?;
                    }
                }
                b"table-cell" | b"covered-table-cell" => {
                    if let Some(table) = tables.last_mut() {
                        table.cell_repeat = repeat_count(&e, "table:number-columns-repeated")?;
                        table.cell.clear();
                    }
                }
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"s" => {
                    if let Some(text) = para.as_mut() {
                        let count = repeat_count(&e, "text:c")?;
                        text.push_str(&" ".repeat(count));
                    }
                }
                b"tab" => {
                    if let Some(text) = para.as_mut() {
                        text.push('\t');
                    }
                }
                b"line-break" => {
                    if let Some(text) = para.as_mut() {
                        text.push('\n');
                    }
                }
                b"table-cell" | b"covered-table-cell" => {
                    if let Some(table) = tables.last_mut() {
                        table.cell_repeat = repeat_count(&e, "table:number-columns-repeated")?;
                        table.push_cell();
                    }
                }
                _ => {}
            },
            Event::Text(t) => {
                if let Some(text) = para.as_mut() {
                    text.push_str(&t.unescape()?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"h" | b"p" => {
                    para_depth = para_depth.saturating_sub(1);
                    if para_depth == 0 {
                        let text = para.take().unwrap_or_default();
                        if let Some(table) = tables.last_mut() {
                            if !table.cell.is_empty() && !text.is_empty() {
                                table.cell.push('\n');
                            }
                            table.cell.push_str(&text);
                        } else if let Some(page) = pages.last_mut() {
                            match heading.take() {
                                Some(level) if !text.trim().is_empty() => {
                                    page.push(Block::Heading { level: level.clamp(1, 6), text });
                                }
                                _ if !text.trim().is_empty() => page.push(Block::Paragraph(text)),
                                _ => {}
                            }
                        }
                    }
                }
                b"table-cell" | b"covered-table-cell" => {
                    if let Some(table) = tables.last_mut() {
                        table.push_cell();
                    }
                }
                b"table-row" => {
                    if let Some(table) = tables.last_mut() {
                        table.push_row();
                    }
                }
                b"table" => {
                    if let Some(state) = tables.pop() {
                        let table = Table::new(state.rows).normalized();
                        if let Some(outer) = tables.last_mut() {
                            // Nested tables flatten into the enclosing cell.
                            let flat = table.rows.iter().map(|r| r.join("\t")).collect::<Vec<_>>();
                            outer.cell.push_str(&flat.join("\n"));
                        } else if !table.is_empty() {
                            if let Some(page) = pages.last_mut() {
                                page.push(Block::Table(table));
                            }
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(pages)
}

fn manifest(mime: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<manifest:manifest xmlns:manifest=\"urn:oasis:names:tc:opendocument:xmlns:manifest:1.0\" manifest:version=\"1.2\"><manifest:file-entry manifest:full-path=\"/\" manifest:media-type=\"{mime}\"/><manifest:file-entry manifest:full-path=\"content.xml\" manifest:media-type=\"text/xml\"/></manifest:manifest>"
    )
}

fn document_content(body_tag: &str, body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<office:document-content xmlns:office=\"urn:oasis:names:tc:opendocument:xmlns:office:1.0\" xmlns:text=\"urn:oasis:names:tc:opendocument:xmlns:text:1.0\" xmlns:table=\"urn:oasis:names:tc:opendocument:xmlns:table:1.0\" office:version=\"1.2\"><office:body><office:{body_tag}>{body}</office:{body_tag}></office:body></office:document-content>"
    )
}

fn write_odf(path: &Path, mime: &str, content: String) -> Result<()> {
    write_package(
        path,
        &[
            ("mimetype", mime.to_string(), true),
            ("META-INF/manifest.xml", manifest(mime), false),
            ("content.xml", content, false),
        ],
    )
}

fn inline_text(text: &str) -> String {
    text.split('\n')
        .map(|line| {
            line.split('\t')
                .map(|part| escape(part).into_owned())
                .collect::<Vec<_>>()
                .join("<text:tab/>")
        })
        .collect::<Vec<_>>()
        .join("<text:line-break/>")
}

fn table_xml(table: &Table, name: &str, typed_numbers: bool) -> String {
    let table = table.clone().normalized();
    let mut out = format!(
        "<table:table table:name=\"{}\"><table:table-column table:number-columns-repeated=\"{}\"/>",
        escape(name),
        table.width().max(1)
    );
    for (r, row) in table.rows.iter().enumerate() {
        out.push_str("<table:table-row>");
        for cell in row {
            let number = if typed_numbers && r > 0 { cell.trim().parse::<f64>().ok().filter(|n| n.is_finite()) } else { None };
            match number {
                Some(n) => out.push_str(&format!(
                    "<table:table-cell office:value-type=\"float\" office:value=\"{n}\"><text:p>{}</text:p></table:table-cell>",
                    inline_text(cell)
                )),
                None if cell.is_empty() => out.push_str("<table:table-cell/>"),
                None => out.push_str(&format!(
                    "<table:table-cell office:value-type=\"string\"><text:p>{}</text:p></table:table-cell>",
                    inline_text(cell)
                )),
            }
        }
        out.push_str("</table:table-row>");
    }
    out.push_str("</table:table>");
    out
}

pub fn write_odt(doc: &TextDocument, path: &Path) -> Result<()> {
    let mut body = String::new();
    let mut tables = 0;
    for block in &doc.blocks {
        match block {
            Block::Heading { level, text } => body.push_str(&format!(
                "<text:h text:outline-level=\"{level}\">{}</text:h>",
                inline_text(text)
            )),
            Block::Paragraph(text) => body.push_str(&format!("<text:p>{}</text:p>", inline_text(text))),
            Block::Table(table) => {
                tables += 1;
                body.push_str(&table_xml(table, &format!("Table{tables}"), false));
            }
        }
    }
    write_odf(path, MIME_TEXT, document_content("text", &body))
}

pub fn write_ods(table: &Table, path: &Path) -> Result<()> {
    let body = table_xml(table, "Sheet1", true);
    write_odf(path, MIME_SPREADSHEET, document_content("spreadsheet", &body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_elements() {
        let xml = r#"<office:document-content><office:body><office:text>
            <text:h text:outline-level="2">Plan</text:h>
            <text:p>a<text:s text:c="3"/>b<text:tab/>c<text:line-break/><text:span>d &amp; e</text:span></text:p>
            <text:p/>
        </office:text></office:body></office:document-content>"#;
        let pages = parse_content(xml).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(
            pages[0],
            vec![
                Block::Heading { level: 2, text: "Plan".into() },
                Block::Paragraph("a   b\tc\nd & e".into()),
            ]
        );
    }

    #[test]
    fn spreadsheet_repeats_are_expanded_and_capped() {
        let xml = r#"<office:spreadsheet><table:table table:name="S">
            <table:table-row><table:table-cell table:number-columns-repeated="2"><text:p>x</text:p></table:table-cell><table:table-cell table:number-columns-repeated="1000"/></table:table-row>
            <table:table-row table:number-rows-repeated="1048576"><table:table-cell table:number-columns-repeated="1024"/></table:table-row>
        </table:table></office:spreadsheet>"#;
        let pages = parse_content(xml).unwrap();
        assert_eq!(pages[0], vec![Block::Table(Table::new(vec![vec!["x".into(), "x".into()]]))]);
    }

    #[test]
    fn presentation_pages_split() {
        let xml = r#"<office:presentation>
            <draw:page><draw:frame><draw:text-box><text:p>One</text:p></draw:text-box></draw:frame></draw:page>
            <draw:page><draw:frame><draw:text-box><text:p>Two</text:p><text:p>Three</text:p></draw:text-box></draw:frame></draw:page>
        </office:presentation>"#;
        let pages = parse_content(xml).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1], vec![Block::Paragraph("Two".into()), Block::Paragraph("Three".into())]);
    }

    #[test]
    fn written_packages_read_back() {
        let dir = tempfile::tempdir().unwrap();

        let odt = dir.path().join("out.odt");
        let mut doc = TextDocument::new();
        doc.push_heading(1, "Notes");
        doc.push_paragraph("tab\there\nnext");
        write_odt(&doc, &odt).unwrap();
        assert_eq!(read_odt(&odt).unwrap(), doc);

        let ods = dir.path().join("out.ods");
        let table = Table::new(vec![vec!["k".into(), "n".into()], vec!["a".into(), "3".into()]]);
        write_ods(&table, &ods).unwrap();
        assert_eq!(read_ods(&ods).unwrap(), table);
        assert_eq!(crate::modules::format_detector::detect_format(&dir.path().join("out.ods")).as_deref(), Some("ods"));
    }
}
