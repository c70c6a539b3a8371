//! PDF text extraction and generation via `lopdf`.

use std::path::Path;

use image::DynamicImage;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, StringFormat, dictionary};

use super::text::parse_txt;
use super::{Block, TextDocument};
use crate::error::Result;

// A4 in points.
const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 56.0;

const BODY_SIZE: f32 = 11.0;
const HEADING_SIZE: f32 = 16.0;
// Rough Helvetica advance per character, as a fraction of the font size.
const AVG_CHAR_WIDTH: f32 = 0.5;

pub fn read_pdf(path: &Path) -> Result<TextDocument> {
    let pdf = Document::load(path)?;
    let pages = pdf.get_pages();
    let multi_page = pages.len() > 1;

    let mut doc = TextDocument::new();
    for number in pages.keys() {
        let text = pdf.extract_text(&[*number])?;
        if multi_page {
            doc.push_heading(2, format!("Page {number}"));
        }
        doc.blocks.extend(parse_txt(&text).blocks);
    }
    Ok(doc)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum LineStyle {
    Body,
    Heading,
}

impl LineStyle {
    fn font(&self) -> &'static str {
        match self {
            LineStyle::Body => "F1",
            LineStyle::Heading => "F2",
        }
    }

    fn size(&self) -> f32 {
        match self {
            LineStyle::Body => BODY_SIZE,
            LineStyle::Heading => HEADING_SIZE,
        }
    }

    fn leading(&self) -> f32 {
        self.size() * 1.35
    }

    fn max_chars(&self) -> usize {
        ((PAGE_WIDTH - 2.0 * MARGIN) / (self.size() * AVG_CHAR_WIDTH)) as usize
    }
}

fn layout(doc: &TextDocument) -> Vec<(LineStyle, String)> {
    let mut lines = Vec::new();
    for block in &doc.blocks {
        match block {
            Block::Heading { text, .. } => {
                for line in wrap(text, LineStyle::Heading.max_chars()) {
                    lines.push((LineStyle::Heading, line));
                }
            }
            Block::Paragraph(text) => {
                for raw in text.lines() {
                    for line in wrap(raw, LineStyle::Body.max_chars()) {
                        lines.push((LineStyle::Body, line));
                    }
                }
            }
            Block::Table(table) => {
                for row in &table.rows {
                    for line in wrap(&row.join("  |  "), LineStyle::Body.max_chars()) {
                        lines.push((LineStyle::Body, line));
                    }
                }
            }
        }
        lines.push((LineStyle::Body, String::new()));
    }
    lines
}

/// Greedy word wrap; words longer than `width` are split.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word = word.to_string();
        while word.chars().count() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let split: String = word.chars().take(width).collect();
            word = word.chars().skip(width).collect();
            lines.push(split);
        }
        let needed = if current.is_empty() { word.chars().count() } else { current.chars().count() + 1 + word.chars().count() };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Encodes to WinAnsi for the standard Type1 fonts; unmapped characters
/// become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{A0}'..='\u{FF}' => c as u32 as u8,
            '€' => 0x80,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            _ => b'?',
        })
        .collect()
}

fn font(doc: &mut Document, base: &str) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    })
}

fn finish(mut doc: Document, pages_id: ObjectId, kids: Vec<Object>, path: &Path) -> Result<()> {
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    doc.save(path)?;
    Ok(())
}

pub fn write_text_pdf(text: &TextDocument, path: &Path) -> Result<()> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular = font(&mut doc, "Helvetica");
    let bold = font(&mut doc, "Helvetica-Bold");
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
    });

    let mut pages: Vec<Vec<Operation>> = Vec::new();
    let mut ops: Vec<Operation> = Vec::new();
    let mut y = PAGE_HEIGHT - MARGIN;

    for (style, line) in layout(text) {
        if y - style.leading() < MARGIN {
            pages.push(std::mem::take(&mut ops));
            y = PAGE_HEIGHT - MARGIN;
        }
        y -= style.leading();
        if line.is_empty() {
            continue;
        }
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new("Tf", vec![style.font().into(), style.size().into()]));
        ops.push(Operation::new("Td", vec![MARGIN.into(), y.into()]));
        ops.push(Operation::new("Tj", vec![Object::String(win_ansi(&line), StringFormat::Literal)]));
        ops.push(Operation::new("ET", vec![]));
    }
    if !ops.is_empty() || pages.is_empty() {
        pages.push(ops);
    }

    let mut kids = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    finish(doc, pages_id, kids, path)
}

/// Places the image on a single A4 page, scaled down to fit the margins.
pub fn write_image_pdf(image: &DynamicImage, path: &Path) -> Result<()> {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        rgb.into_raw(),
    ));
    let resources_id = doc.add_object(dictionary! {
        "XObject" => dictionary! {
            "Im1" => image_id,
        },
    });

    let avail_w = PAGE_WIDTH - 2.0 * MARGIN;
    let avail_h = PAGE_HEIGHT - 2.0 * MARGIN;
    let scale = (avail_w / width.max(1) as f32).min(avail_h / height.max(1) as f32).min(1.0);
    let draw_w = width as f32 * scale;
    let draw_h = height as f32 * scale;
    let x = (PAGE_WIDTH - draw_w) / 2.0;
    let y = (PAGE_HEIGHT - draw_h) / 2.0;

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new("cm", vec![draw_w.into(), 0.into(), 0.into(), draw_h.into(), x.into(), y.into()]),
            Operation::new("Do", vec!["Im1".into()]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
    });

    finish(doc, pages_id, vec![page_id.into()], path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_breaks_on_words_and_splits_long_ones() {
        assert_eq!(wrap("the quick brown fox", 9), vec!["the quick", "brown fox"]);
        assert_eq!(wrap("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap("", 10), vec![""]);
    }

    #[test]
    fn win_ansi_maps_latin1_and_punctuation() {
        assert_eq!(win_ansi("a é—€"), vec![b'a', b' ', 0xE9, 0x97, 0x80]);
        assert_eq!(win_ansi("中"), vec![b'?']);
    }

    #[test]
    fn long_documents_paginate() {
        let mut doc = TextDocument::new();
        for i in 0..120 {
            doc.push_paragraph(format!("Paragraph number {i}"));
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.pdf");
        write_text_pdf(&doc, &path).unwrap();

        let pdf = Document::load(&path).unwrap();
        assert!(pdf.get_pages().len() > 1);
    }

    #[test]
    fn text_pdf_is_readable() {
        let mut doc = TextDocument::new();
        doc.push_paragraph("Hello");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.pdf");
        write_text_pdf(&doc, &path).unwrap();

        let back = read_pdf(&path).unwrap();
        let lines = back.to_lines(" ").join("\n");
        assert!(lines.contains("Hello"), "{lines}");
    }

    #[test]
    fn image_pdf_has_one_page() {
        let img = DynamicImage::new_rgb8(40, 20);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img.pdf");
        write_image_pdf(&img, &path).unwrap();
        assert_eq!(Document::load(&path).unwrap().get_pages().len(), 1);
    }
}
