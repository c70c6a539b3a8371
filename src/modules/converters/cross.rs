use std::path::Path;

use image::DynamicImage;
use tracing::debug;

use super::presentation::read_slides;
use super::{
    ConvertOptions, ConvertOutcome, Converter, DOCUMENT_WRITERS, TABLE_WRITERS, handles, prepare_output,
    read_document, read_table, write_document, write_table,
};
use crate::error::{ConvertError, Result};
use crate::modules::format_detector::{Category, get_file_category, is_readable};
use crate::modules::formats::pdf::{read_pdf, write_image_pdf};
use crate::modules::formats::pptx::slides_to_document;
use crate::modules::formats::raster::{image_format, open_image, render_text, save_image};
use crate::modules::formats::{Content, Table, TextDocument};

/// Converts between categories by reading the source into [`Content`] and
/// writing that with whichever writer owns the target.
pub struct CrossConverter {
    source: String,
    options: ConvertOptions,
}

impl CrossConverter {
    pub fn new(source: &str, options: ConvertOptions) -> Self {
        Self { source: source.to_lowercase(), options }
    }

    fn load(&self, input: &Path, category: Category) -> Result<Content> {
        Ok(match category {
            Category::Document => Content::Text(read_document(input, &self.source)?),
            Category::Spreadsheet => Content::Table(read_table(input, &self.source)?),
            Category::Presentation => Content::Text(slides_to_document(&read_slides(input, &self.source)?)),
            Category::Pdf => Content::Text(read_pdf(input)?),
            Category::Image => Content::Raster(open_image(input)?),
        })
    }
}

/// Whether content read from `category` has a writer for `target`.
fn reachable(category: Category, target: &str) -> bool {
    let is_image_target = image_format(target).is_some();
    match category {
        Category::Image => is_image_target || target.eq_ignore_ascii_case("pdf"),
        _ => is_image_target || handles(DOCUMENT_WRITERS, target) || handles(TABLE_WRITERS, target),
    }
}

fn into_table(content: Content) -> Result<Table> {
    match content {
        Content::Table(table) => Ok(table),
        Content::Text(doc) => Ok(Table::from_document(&doc)),
        Content::Raster(_) => Err(ConvertError::unsupported("image", "table")),
    }
}

fn rasterize(content: Content) -> Result<DynamicImage> {
    let lines = match content {
        Content::Raster(img) => return Ok(img),
        Content::Text(doc) => doc.to_lines("  |  "),
        Content::Table(table) => TextDocument::from_table(table).to_lines("  |  "),
    };
    Ok(DynamicImage::ImageRgba8(render_text(&lines)?))
}

impl Converter for CrossConverter {
    fn name(&self) -> &'static str {
        "cross"
    }

    fn convert(&self, input: &Path, target: &str) -> Result<ConvertOutcome> {
        let Some(category) = get_file_category(&self.source).filter(|_| is_readable(&self.source)) else {
            return Ok(ConvertOutcome::Declined);
        };
        if !reachable(category, target) {
            return Ok(ConvertOutcome::Declined);
        }

        let content = self.load(input, category)?;
        debug!(from = %self.source, to = target, kind = content.kind(), "cross conversion");
        let output = prepare_output(input, target, &self.options)?;

        if handles(TABLE_WRITERS, target) {
            write_table(&into_table(content)?, target, &output)?;
        } else if handles(DOCUMENT_WRITERS, target) {
            match content {
                Content::Raster(img) => write_image_pdf(&img, &output)?,
                Content::Text(doc) => write_document(&doc, input, target, &output)?,
                Content::Table(table) => write_document(&TextDocument::from_table(table), input, target, &output)?,
            }
        } else {
            save_image(&rasterize(content)?, &output, target, self.options.jpeg_quality)?;
        }

        Ok(ConvertOutcome::Converted(output))
    }
}
