use std::path::Path;

use super::{ConvertOptions, ConvertOutcome, Converter, handles, prepare_output, write_document};
use crate::error::Result;
use crate::modules::formats::pdf::read_pdf;

const TARGETS: &[&str] = &["txt", "md", "html"];

/// Extracted PDF text out to plain text, Markdown or HTML.
pub struct PdfConverter {
    options: ConvertOptions,
}

impl PdfConverter {
    pub fn new(options: ConvertOptions) -> Self {
        Self { options }
    }
}

impl Converter for PdfConverter {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn convert(&self, input: &Path, target: &str) -> Result<ConvertOutcome> {
        if !handles(TARGETS, target) {
            return Ok(ConvertOutcome::Declined);
        }
        let doc = read_pdf(input)?;
        let output = prepare_output(input, target, &self.options)?;
        write_document(&doc, input, target, &output)?;
        Ok(ConvertOutcome::Converted(output))
    }
}
