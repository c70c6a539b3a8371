use std::path::Path;

use super::{
    ConvertOptions, ConvertOutcome, Converter, DOCUMENT_WRITERS, handles, prepare_output, read_document,
    write_document,
};
use crate::error::Result;

/// docx, odt, rtf, txt and md to any of the document writers.
pub struct DocumentConverter {
    source: String,
    options: ConvertOptions,
}

impl DocumentConverter {
    pub fn new(source: &str, options: ConvertOptions) -> Self {
        Self { source: source.to_lowercase(), options }
    }
}

impl Converter for DocumentConverter {
    fn name(&self) -> &'static str {
        "document"
    }

    fn convert(&self, input: &Path, target: &str) -> Result<ConvertOutcome> {
        if !handles(DOCUMENT_WRITERS, target) {
            return Ok(ConvertOutcome::Declined);
        }
        let doc = read_document(input, &self.source)?;
        let output = prepare_output(input, target, &self.options)?;
        write_document(&doc, input, target, &output)?;
        Ok(ConvertOutcome::Converted(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn markdown_to_html() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("notes.md");
        fs::write(&input, "# Plan\n\nShip it & celebrate\n").unwrap();

        let converter = DocumentConverter::new("md", ConvertOptions::default());
        let outcome = converter.convert(&input, "html").unwrap();
        let ConvertOutcome::Converted(path) = outcome else {
            panic!("expected output");
        };
        let html = fs::read_to_string(path).unwrap();
        assert!(html.contains("<h1>Plan</h1>"));
        assert!(html.contains("Ship it &amp; celebrate"));
    }

    #[test]
    fn image_targets_are_declined() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("notes.txt");
        fs::write(&input, "hello").unwrap();

        let converter = DocumentConverter::new("txt", ConvertOptions::default());
        assert_eq!(converter.convert(&input, "png").unwrap(), ConvertOutcome::Declined);
    }

    #[test]
    fn unreadable_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("broken.docx");
        fs::write(&input, "not a zip").unwrap();

        let converter = DocumentConverter::new("docx", ConvertOptions::default());
        assert!(converter.convert(&input, "txt").is_err());
    }
}
