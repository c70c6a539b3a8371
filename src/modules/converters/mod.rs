//! Category converters. Each one owns a reader for its source formats and
//! hands off to the shared writers below; targets outside its list are
//! declined so the cross converter can take over.

mod cross;
mod document;
mod image;
mod pdf;
mod presentation;
mod spreadsheet;

pub use cross::CrossConverter;
pub use document::DocumentConverter;
pub use image::ImageConverter;
pub use pdf::PdfConverter;
pub use presentation::PresentationConverter;
pub use spreadsheet::SpreadsheetConverter;

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConvertError, Result};
use crate::modules::format_detector::canonical_extension;
use crate::modules::formats::{Table, TextDocument, docx, odf, pdf as pdf_codec, sheet, text, xlsx};

#[derive(Debug, Clone, PartialEq)]
pub enum ConvertOutcome {
    Converted(PathBuf),
    /// The converter does not handle this target.
    Declined,
}

pub trait Converter: Send {
    fn name(&self) -> &'static str;
    fn convert(&self, input: &Path, target: &str) -> Result<ConvertOutcome>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    /// `None` writes next to the input file.
    pub output_dir: Option<PathBuf>,
    pub overwrite: bool,
    pub jpeg_quality: u8,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            output_dir: None,
            overwrite: false,
            jpeg_quality: 90,
        }
    }
}

pub(crate) fn handles(list: &[&str], target: &str) -> bool {
    let target = target.to_lowercase();
    let target = canonical_extension(&target);
    list.iter().any(|t| canonical_extension(t) == target)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// `<stem>.<target>` in the output directory, or `<stem> (N).<target>` with
/// the smallest free N when that name is taken. Never resolves to `input`.
pub fn output_path(input: &Path, target: &str, options: &ConvertOptions) -> PathBuf {
    let dir = options
        .output_dir
        .clone()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| input.parent().map(Path::to_path_buf).unwrap_or_default());
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let target = target.to_lowercase();

    let taken = |path: &Path| same_file(path, input) || (path.exists() && !options.overwrite);

    let candidate = dir.join(format!("{stem}.{target}"));
    if !taken(&candidate) {
        return candidate;
    }
    let mut n = 1u32;
    loop {
        let candidate = dir.join(format!("{stem} ({n}).{target}"));
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Resolves the output path and makes sure its directory exists.
pub(crate) fn prepare_output(input: &Path, target: &str, options: &ConvertOptions) -> Result<PathBuf> {
    let path = output_path(input, target, options);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(path)
}

pub(crate) const DOCUMENT_WRITERS: &[&str] = &["docx", "odt", "rtf", "txt", "md", "html", "pdf"];
pub(crate) const TABLE_WRITERS: &[&str] = &["csv", "tsv", "xlsx", "ods", "json", "yaml"];

pub(crate) fn read_document(input: &Path, source: &str) -> Result<TextDocument> {
    match source.to_lowercase().as_str() {
        "docx" => docx::read_docx(input),
        "odt" => odf::read_odt(input),
        "rtf" => text::read_rtf(input),
        "txt" => text::read_txt(input),
        "md" => text::read_md(input),
        other => Err(ConvertError::InvalidInput(format!("no document reader for .{other}"))),
    }
}

pub(crate) fn read_table(input: &Path, source: &str) -> Result<Table> {
    match source.to_lowercase().as_str() {
        "xlsx" => xlsx::read_xlsx(input),
        "ods" => odf::read_ods(input),
        ext @ ("csv" | "tsv") => sheet::read_delimited(input, sheet::delimiter_for(ext)),
        other => Err(ConvertError::InvalidInput(format!("no spreadsheet reader for .{other}"))),
    }
}

fn title_of(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Writes `doc` as one of [`DOCUMENT_WRITERS`].
pub(crate) fn write_document(doc: &TextDocument, input: &Path, target: &str, path: &Path) -> Result<()> {
    match target.to_lowercase().as_str() {
        "docx" => docx::write_docx(doc, path),
        "odt" => odf::write_odt(doc, path),
        "rtf" => text::write_rtf(doc, path),
        "txt" => text::write_txt(doc, path),
        "md" => text::write_md(doc, path),
        "html" => text::write_html(doc, &title_of(input), path),
        "pdf" => pdf_codec::write_text_pdf(doc, path),
        other => Err(ConvertError::unsupported("document", other)),
    }
}

/// Writes `table` as one of [`TABLE_WRITERS`].
pub(crate) fn write_table(table: &Table, target: &str, path: &Path) -> Result<()> {
    match target.to_lowercase().as_str() {
        ext @ ("csv" | "tsv") => sheet::write_delimited(table, path, sheet::delimiter_for(ext)),
        "xlsx" => xlsx::write_xlsx(table, path),
        "ods" => odf::write_ods(table, path),
        "json" => sheet::write_json(table, path),
        "yaml" => sheet::write_yaml(table, path),
        other => Err(ConvertError::unsupported("spreadsheet", other)),
    }
}
