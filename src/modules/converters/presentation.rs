use std::path::Path;

use super::{ConvertOptions, ConvertOutcome, Converter, handles, prepare_output, write_document};
use crate::error::{ConvertError, Result};
use crate::modules::formats::pptx::{Slide, read_pptx, slides_to_document};
use crate::modules::formats::odf::read_odp;

const TARGETS: &[&str] = &["txt", "md", "html"];

pub(crate) fn read_slides(input: &Path, source: &str) -> Result<Vec<Slide>> {
    match source.to_lowercase().as_str() {
        "pptx" => read_pptx(input),
        "odp" => read_odp(input),
        other => Err(ConvertError::InvalidInput(format!("no presentation reader for .{other}"))),
    }
}

/// Slide text out to plain text, Markdown or HTML.
pub struct PresentationConverter {
    source: String,
    options: ConvertOptions,
}

impl PresentationConverter {
    pub fn new(source: &str, options: ConvertOptions) -> Self {
        Self { source: source.to_lowercase(), options }
    }
}

impl Converter for PresentationConverter {
    fn name(&self) -> &'static str {
        "presentation"
    }

    fn convert(&self, input: &Path, target: &str) -> Result<ConvertOutcome> {
        if !handles(TARGETS, target) {
            return Ok(ConvertOutcome::Declined);
        }
        let slides = read_slides(input, &self.source)?;
        let doc = slides_to_document(&slides);
        let output = prepare_output(input, target, &self.options)?;
        write_document(&doc, input, target, &output)?;
        Ok(ConvertOutcome::Converted(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;

    fn deck(path: &Path) {
        let mut zip = zip::ZipWriter::new(fs::File::create(path).unwrap());
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("ppt/slides/slide1.xml", options).unwrap();
        write!(zip, "<p:sld><a:p><a:r><a:t>Roadmap</a:t></a:r></a:p></p:sld>").unwrap();
        zip.finish().unwrap();
    }

    #[test]
    fn slides_to_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("deck.pptx");
        deck(&input);

        let converter = PresentationConverter::new("pptx", ConvertOptions::default());
        let ConvertOutcome::Converted(path) = converter.convert(&input, "md").unwrap() else {
            panic!("expected output");
        };
        let md = fs::read_to_string(path).unwrap();
        assert!(md.contains("## Slide 1"));
        assert!(md.contains("Roadmap"));
    }

    #[test]
    fn richer_targets_are_declined() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("deck.pptx");
        deck(&input);

        let converter = PresentationConverter::new("pptx", ConvertOptions::default());
        for target in ["docx", "pdf", "png"] {
            assert_eq!(converter.convert(&input, target).unwrap(), ConvertOutcome::Declined);
        }
    }
}
