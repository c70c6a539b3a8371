use std::path::Path;

use super::{ConvertOptions, ConvertOutcome, Converter, handles, prepare_output};
use crate::error::Result;
use crate::modules::formats::raster::{open_image, save_image};

const TARGETS: &[&str] = &["jpg", "png", "bmp", "gif", "tiff", "webp", "ico"];

/// Raster to raster; PDF output goes through the cross converter.
pub struct ImageConverter {
    options: ConvertOptions,
}

impl ImageConverter {
    pub fn new(options: ConvertOptions) -> Self {
        Self { options }
    }
}

impl Converter for ImageConverter {
    fn name(&self) -> &'static str {
        "image"
    }

    fn convert(&self, input: &Path, target: &str) -> Result<ConvertOutcome> {
        if !handles(TARGETS, target) {
            return Ok(ConvertOutcome::Declined);
        }
        let img = open_image(input)?;
        let output = prepare_output(input, target, &self.options)?;
        save_image(&img, &output, target, self.options.jpeg_quality)?;
        Ok(ConvertOutcome::Converted(output))
    }
}
