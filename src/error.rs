use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConvertError>;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("RTF error: {0}")]
    Rtf(String),

    #[error("no usable font available for text rendering")]
    Font,

    #[error("conversion from .{from} to .{to} is not supported")]
    Unsupported { from: String, to: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ConvertError {
    pub fn unsupported(from: &str, to: &str) -> Self {
        ConvertError::Unsupported { from: from.to_string(), to: to.to_string() }
    }
}
