//! WordprocessingML (.docx) packages.

use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;

use super::xml::{attribute, escape, open_archive, read_entry, write_package};
use super::{Block, Table, TextDocument};
use crate::error::{ConvertError, Result};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

pub fn read_docx(path: &Path) -> Result<TextDocument> {
    let mut archive = open_archive(path)?;
    let xml = read_entry(&mut archive, "word/document.xml")?
        .ok_or_else(|| ConvertError::InvalidInput("missing word/document.xml".to_string()))?;
    parse_document_xml(&xml)
}

pub fn parse_document_xml(xml: &str) -> Result<TextDocument> {
    let mut reader = Reader::from_str(xml);
    let mut doc = TextDocument::new();

    let mut para = String::new();
    let mut heading: Option<u8> = None;
    let mut in_run = false;
    let mut in_text = false;

    let mut table_depth = 0usize;
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => {
                    para.clear();
                    heading = None;
                }
                b"r" => in_run = true,
                b"t" => in_text = true,
                b"tbl" => {
                    table_depth += 1;
                    if table_depth == 1 {
                        rows.clear();
                    }
                }
                b"tr" if table_depth == 1 => row.clear(),
                b"tc" if table_depth == 1 => cell.clear(),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"pStyle" => {
                    heading = attribute(&e, "w:val")?.as_deref().and_then(heading_level);
                }
                b"tab" if in_run => para.push('\t'),
                b"br" | b"cr" if in_run => para.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => para.push_str(&t.unescape()?),
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"r" => in_run = false,
                b"p" => {
                    if table_depth > 0 {
                        if !cell.is_empty() && !para.is_empty() {
                            cell.push('\n');
                        }
                        cell.push_str(&para);
                    } else if let Some(level) = heading {
                        doc.push_heading(level, para.clone());
                    } else {
                        doc.push_paragraph(para.clone());
                    }
                    para.clear();
                }
                b"tc" if table_depth == 1 => row.push(std::mem::take(&mut cell)),
                b"tr" if table_depth == 1 => rows.push(std::mem::take(&mut row)),
                b"tbl" => {
                    table_depth = table_depth.saturating_sub(1);
                    if table_depth == 0 {
                        doc.push_table(Table::new(std::mem::take(&mut rows)).normalized());
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(doc)
}

/// Maps style ids such as `Heading2`, `heading 3` or `Title` to a level.
fn heading_level(style: &str) -> Option<u8> {
    let lower = style.to_lowercase();
    if lower == "title" {
        return Some(1);
    }
    let rest = lower.strip_prefix("heading")?.trim();
    rest.parse::<u8>().ok().filter(|level| (1..=6).contains(level))
}

pub fn write_docx(doc: &TextDocument, path: &Path) -> Result<()> {
    let mut body = String::new();
    for block in &doc.blocks {
        match block {
            Block::Heading { level, text } => {
                let size = match level {
                    1 => 36,
                    2 => 30,
                    _ => 26,
                };
                body.push_str(&format!(
                    "<w:p><w:pPr><w:pStyle w:val=\"Heading{level}\"/></w:pPr><w:r><w:rPr><w:b/><w:sz w:val=\"{size}\"/></w:rPr>{}</w:r></w:p>",
                    run_text(text)
                ));
            }
            Block::Paragraph(text) => {
                body.push_str(&format!("<w:p><w:r>{}</w:r></w:p>", run_text(text)));
            }
            Block::Table(table) => {
                body.push_str("<w:tbl><w:tblPr><w:tblStyle w:val=\"TableGrid\"/><w:tblW w:w=\"0\" w:type=\"auto\"/></w:tblPr>");
                for row in &table.rows {
                    body.push_str("<w:tr>");
                    for cell in row {
                        body.push_str(&format!("<w:tc><w:p><w:r>{}</w:r></w:p></w:tc>", run_text(cell)));
                    }
                    body.push_str("</w:tr>");
                }
                body.push_str("</w:tbl>");
            }
        }
    }

    let document = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{body}<w:sectPr/></w:body></w:document>"
    );

    write_package(
        path,
        &[
            ("[Content_Types].xml", CONTENT_TYPES.to_string(), false),
            ("_rels/.rels", ROOT_RELS.to_string(), false),
            ("word/document.xml", document, false),
        ],
    )
}

fn run_text(text: &str) -> String {
    text.split('\n')
        .map(|line| format!("<w:t xml:space=\"preserve\">{}</w:t>", escape(line)))
        .collect::<Vec<_>>()
        .join("<w:br/>")
}
