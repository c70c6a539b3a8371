//! Plain text, Markdown, HTML and RTF.

use std::fs;
use std::path::Path;

use rtf_parser::document::RtfDocument;

use super::{Block, Table, TextDocument};
use crate::error::{ConvertError, Result};

pub fn read_txt(path: &Path) -> Result<TextDocument> {
    let bytes = fs::read(path)?;
    Ok(parse_txt(&String::from_utf8_lossy(&bytes)))
}

/// Paragraphs are runs of non-blank lines.
pub fn parse_txt(content: &str) -> TextDocument {
    let mut doc = TextDocument::new();
    let mut current: Vec<&str> = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                doc.push_paragraph(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line.trim_end());
        }
    }
    if !current.is_empty() {
        doc.push_paragraph(current.join("\n"));
    }
    doc
}

pub fn write_txt(doc: &TextDocument, path: &Path) -> Result<()> {
    let mut out = doc.to_lines("\t").join("\n");
    out.push('\n');
    fs::write(path, out)?;
    Ok(())
}

pub fn read_md(path: &Path) -> Result<TextDocument> {
    let bytes = fs::read(path)?;
    Ok(parse_md(&String::from_utf8_lossy(&bytes)))
}

pub fn parse_md(content: &str) -> TextDocument {
    let mut doc = TextDocument::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let lines: Vec<&str> = content.lines().collect();
    let mut i = 0;

    let flush = |doc: &mut TextDocument, paragraph: &mut Vec<&str>| {
        if !paragraph.is_empty() {
            doc.push_paragraph(paragraph.join("\n"));
            paragraph.clear();
        }
    };

    while i < lines.len() {
        let line = lines[i].trim_end();

        if let Some((level, text)) = atx_heading(line) {
            flush(&mut doc, &mut paragraph);
            doc.push_heading(level, text);
            i += 1;
            continue;
        }

        if is_pipe_row(line) && lines.get(i + 1).is_some_and(|next| is_separator_row(next)) {
            flush(&mut doc, &mut paragraph);
            let mut rows = vec![split_pipe_row(line)];
            i += 2;
            while i < lines.len() && is_pipe_row(lines[i].trim_end()) {
                rows.push(split_pipe_row(lines[i].trim_end()));
                i += 1;
            }
            doc.push_table(Table::new(rows).normalized());
            continue;
        }

        if line.trim().is_empty() {
            flush(&mut doc, &mut paragraph);
        } else {
            paragraph.push(line);
        }
        i += 1;
    }
    flush(&mut doc, &mut paragraph);
    doc
}

fn atx_heading(line: &str) -> Option<(u8, &str)> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.is_empty() && !rest.starts_with(' ') {
        return None;
    }
    Some((level as u8, rest.trim().trim_end_matches('#').trim_end()))
}

fn is_pipe_row(line: &str) -> bool {
    let t = line.trim();
    t.starts_with('|') && t.len() > 1
}

fn is_separator_row(line: &str) -> bool {
    let t = line.trim();
    is_pipe_row(t)
        && t.contains('-')
        && t.chars().all(|c| matches!(c, '|' | '-' | ':' | ' '))
}

fn split_pipe_row(line: &str) -> Vec<String> {
    let t = line.trim().trim_start_matches('|');
    let t = if t.ends_with('|') && !t.ends_with("\\|") { &t[..t.len() - 1] } else { t };

    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut chars = t.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                cell.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut cell).trim().to_string()),
            _ => cell.push(c),
        }
    }
    cells.push(cell.trim().to_string());
    cells
}

pub fn write_md(doc: &TextDocument, path: &Path) -> Result<()> {
    let mut out = String::new();
    for block in &doc.blocks {
        match block {
            Block::Heading { level, text } => {
                out.push_str(&"#".repeat(*level as usize));
                out.push(' ');
                out.push_str(text);
                out.push('\n');
            }
            Block::Paragraph(text) => {
                out.push_str(text);
                out.push('\n');
            }
            Block::Table(table) => out.push_str(&md_table(table)),
        }
        out.push('\n');
    }
    fs::write(path, out)?;
    Ok(())
}

fn md_table(table: &Table) -> String {
    let table = table.clone().normalized();
    let cell = |s: &String| s.replace('|', "\\|").replace('\n', " ");
    let mut out = String::new();
    for (idx, row) in table.rows.iter().enumerate() {
        out.push_str("| ");
        out.push_str(&row.iter().map(cell).collect::<Vec<_>>().join(" | "));
        out.push_str(" |\n");
        if idx == 0 {
            out.push('|');
            out.push_str(&" --- |".repeat(row.len().max(1)));
            out.push('\n');
        }
    }
    out
}

pub fn write_html(doc: &TextDocument, title: &str, path: &Path) -> Result<()> {
    let mut out = String::from("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str(&format!("<title>{}</title>\n", html_escape(title)));
    out.push_str("</head>\n<body>\n");
    for block in &doc.blocks {
        match block {
            Block::Heading { level, text } => {
                out.push_str(&format!("<h{level}>{}</h{level}>\n", html_escape(text)));
            }
            Block::Paragraph(text) => {
                let body = text.lines().map(html_escape).collect::<Vec<_>>().join("<br>\n");
                out.push_str(&format!("<p>{body}</p>\n"));
            }
            Block::Table(table) => {
                out.push_str("<table>\n");
                for (idx, row) in table.rows.iter().enumerate() {
                    let tag = if idx == 0 { "th" } else { "td" };
                    out.push_str("<tr>");
                    for cell in row {
                        out.push_str(&format!("<{tag}>{}</{tag}>", html_escape(cell)));
                    }
                    out.push_str("</tr>\n");
                }
                out.push_str("</table>\n");
            }
        }
    }
    out.push_str("</body>\n</html>\n");
    fs::write(path, out)?;
    Ok(())
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn read_rtf(path: &Path) -> Result<TextDocument> {
    let bytes = fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes).to_string();
    let rtf = RtfDocument::try_from(content)
        .map_err(|e| ConvertError::Rtf(format!("{e:?}")))?;
    Ok(parse_txt(&rtf.get_text()))
}

pub fn write_rtf(doc: &TextDocument, path: &Path) -> Result<()> {
    let mut out = String::from("{\\rtf1\\ansi\\deff0{\\fonttbl{\\f0 Helvetica;}}\n\\f0\\fs22\n");
    for block in &doc.blocks {
        match block {
            Block::Heading { level, text } => {
                let size = match level {
                    1 => 36,
                    2 => 30,
                    _ => 26,
                };
                out.push_str(&format!("{{\\b\\fs{size} {}}}\\par\n", rtf_escape(text)));
            }
            Block::Paragraph(text) => {
                let body = text.lines().map(rtf_escape).collect::<Vec<_>>().join("\\line\n");
                out.push_str(&body);
                out.push_str("\\par\n");
            }
            Block::Table(table) => {
                for row in &table.rows {
                    let cells = row.iter().map(|c| rtf_escape(c)).collect::<Vec<_>>();
                    out.push_str(&cells.join("\\tab "));
                    out.push_str("\\par\n");
                }
            }
        }
        out.push_str("\\par\n");
    }
    out.push('}');
    fs::write(path, out)?;
    Ok(())
}

fn rtf_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '\t' => out.push_str("\\tab "),
            c if c.is_ascii() => out.push(c),
            c => {
                // \uN takes a signed 16-bit value; astral characters degrade to '?'.
                let code = c as u32;
                if code <= 0xFFFF {
                    out.push_str(&format!("\\u{}?", code as u16 as i16));
                } else {
                    out.push('?');
                }
            }
        }
    }
    out
}
