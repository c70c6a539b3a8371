//! PresentationML (.pptx) text extraction.

use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;

use super::TextDocument;
use super::xml::{open_archive, read_entry};
use crate::error::{ConvertError, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Slide {
    pub paragraphs: Vec<String>,
}

pub fn read_pptx(path: &Path) -> Result<Vec<Slide>> {
    let mut archive = open_archive(path)?;

    let mut names: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let number = name
                .strip_prefix("ppt/slides/slide")?
                .strip_suffix(".xml")?
                .parse::<u32>()
                .ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    if names.is_empty() {
        return Err(ConvertError::InvalidInput("presentation has no slides".to_string()));
    }
    // slide10 must follow slide9, not slide1.
    names.sort();

    let mut slides = Vec::with_capacity(names.len());
    for (_, name) in names {
        let xml = read_entry(&mut archive, &name)?.unwrap_or_default();
        slides.push(parse_slide(&xml)?);
    }
    Ok(slides)
}

pub fn parse_slide(xml: &str) -> Result<Slide> {
    let mut reader = Reader::from_str(xml);
    let mut slide = Slide::default();
    let mut para = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => para.clear(),
                b"t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"br" => para.push('\n'),
            Event::Text(t) if in_text => para.push_str(&t.unescape()?),
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    if !para.trim().is_empty() {
                        slide.paragraphs.push(std::mem::take(&mut para));
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(slide)
}

/// One level-2 heading per slide followed by its paragraphs.
pub fn slides_to_document(slides: &[Slide]) -> TextDocument {
    let mut doc = TextDocument::new();
    for (idx, slide) in slides.iter().enumerate() {
        doc.push_heading(2, format!("Slide {}", idx + 1));
        for paragraph in &slide.paragraphs {
            doc.push_paragraph(paragraph.clone());
        }
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::formats::Block;
    use std::io::Write;

    #[test]
    fn slide_paragraphs_collect_runs() {
        let xml = r#"<p:sld><p:cSld><p:spTree><p:sp><p:txBody>
            <a:p><a:r><a:t>Quarterly </a:t></a:r><a:r><a:t>results</a:t></a:r></a:p>
            <a:p><a:endParaRPr/></a:p>
            <a:p><a:r><a:t>up</a:t></a:r><a:br/><a:r><a:t>&lt;10%&gt;</a:t></a:r></a:p>
        </p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#;
        let slide = parse_slide(xml).unwrap();
        assert_eq!(slide.paragraphs, vec!["Quarterly results", "up\n<10%>"]);
    }

    #[test]
    fn slides_are_ordered_numerically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.pptx");
        let mut zip = zip::ZipWriter::new(std::fs::File::create(&path).unwrap());
        let options = zip::write::SimpleFileOptions::default();
        for (n, text) in [(10, "ten"), (2, "two"), (1, "one")] {
            zip.start_file(format!("ppt/slides/slide{n}.xml"), options).unwrap();
            write!(zip, "<p:sld><a:p><a:r><a:t>{text}</a:t></a:r></a:p></p:sld>").unwrap();
        }
        zip.start_file("ppt/slides/_rels/slide1.xml.rels", options).unwrap();
        zip.finish().unwrap();

        let slides = read_pptx(&path).unwrap();
        let texts: Vec<_> = slides.iter().map(|s| s.paragraphs[0].as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "ten"]);

        let doc = slides_to_document(&slides);
        assert_eq!(doc.blocks[0], Block::Heading { level: 2, text: "Slide 1".into() });
        assert_eq!(doc.blocks.len(), 6);
    }
}
