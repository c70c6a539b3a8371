use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

const SNIFF_LEN: u64 = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Document,
    Spreadsheet,
    Presentation,
    Pdf,
    Image,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Document => "Document",
            Category::Spreadsheet => "Spreadsheet",
            Category::Presentation => "Presentation",
            Category::Pdf => "PDF",
            Category::Image => "Image",
        }
    }

    pub fn all() -> [Category; 5] {
        [
            Category::Document,
            Category::Spreadsheet,
            Category::Presentation,
            Category::Pdf,
            Category::Image,
        ]
    }

    fn sources(&self) -> &'static [&'static str] {
        match self {
            Category::Document => &["doc", "docx", "odt", "rtf", "txt", "md"],
            Category::Spreadsheet => &["xls", "xlsx", "ods", "csv", "tsv"],
            Category::Presentation => &["ppt", "pptx", "odp"],
            Category::Pdf => &["pdf"],
            Category::Image => &["jpg", "jpeg", "png", "bmp", "gif", "tiff", "tif", "svg", "webp", "ico", "heic"],
        }
    }

    fn targets(&self) -> &'static [&'static str] {
        match self {
            Category::Document => &["docx", "odt", "rtf", "txt", "md", "html", "pdf", "png", "jpg"],
            Category::Spreadsheet => &["csv", "tsv", "xlsx", "ods", "json", "yaml", "html", "md", "txt", "pdf", "docx", "png"],
            Category::Presentation => &["txt", "md", "html", "docx", "odt", "rtf", "pdf", "png"],
            Category::Pdf => &["txt", "md", "html", "docx", "odt", "rtf"],
            Category::Image => &["jpg", "png", "bmp", "gif", "tiff", "webp", "ico", "pdf"],
        }
    }
}

// Recognized so the UI can name them, but no reader exists.
const UNREADABLE: &[&str] = &["doc", "xls", "ppt", "svg", "heic"];

/// Static extension-to-category table used for converter dispatch.
pub fn get_file_category(extension: &str) -> Option<Category> {
    let ext = extension.to_lowercase();
    Category::all()
        .into_iter()
        .find(|category| category.sources().contains(&ext.as_str()))
}

pub fn is_readable(extension: &str) -> bool {
    let ext = extension.to_lowercase();
    get_file_category(&ext).is_some() && !UNREADABLE.contains(&ext.as_str())
}

pub fn get_all_supported_source_formats() -> Vec<String> {
    Category::all()
        .iter()
        .flat_map(|category| category.sources().iter())
        .map(|ext| ext.to_string())
        .collect()
}

/// Targets reachable from `extension`, excluding the source format itself.
pub fn get_supported_target_formats(extension: &str) -> Vec<String> {
    let ext = extension.to_lowercase();
    if !is_readable(&ext) {
        return Vec::new();
    }
    let Some(category) = get_file_category(&ext) else {
        return Vec::new();
    };
    let source = canonical_extension(&ext);
    category
        .targets()
        .iter()
        .filter(|target| canonical_extension(target) != source)
        .map(|target| target.to_string())
        .collect()
}

/// Folds spelling variants (`jpeg`, `tif`) onto one name.
pub fn canonical_extension(extension: &str) -> &str {
    match extension {
        "jpeg" => "jpg",
        "tif" => "tiff",
        other => other,
    }
}

/// Detects the source format of `path`. A known extension wins; otherwise the
/// file content is sniffed.
pub fn detect_format(path: &Path) -> Option<String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase());

    if let Some(ext) = ext {
        if get_file_category(&ext).is_some() {
            return Some(ext);
        }
    }

    sniff_format(path)
}

fn sniff_format(path: &Path) -> Option<String> {
    let mut file = File::open(path).ok()?;
    let mut head = Vec::new();
    file.by_ref().take(SNIFF_LEN).read_to_end(&mut head).ok()?;

    if head.is_empty() {
        return None;
    }
    if head.starts_with(b"%PDF") {
        return Some("pdf".to_string());
    }
    if head.starts_with(b"{\\rtf") {
        return Some("rtf".to_string());
    }
    if head.starts_with(b"PK\x03\x04") {
        file.rewind().ok()?;
        return sniff_zip(file);
    }
    // OLE compound files (legacy Office) cannot be told apart by header alone.
    if head.starts_with(&[0xD0, 0xCF, 0x11, 0xE0]) {
        return None;
    }
    if let Ok(format) = image::guess_format(&head) {
        return image_extension(format).map(str::to_string);
    }
    if looks_like_text(&head) {
        return Some("txt".to_string());
    }
    None
}

fn sniff_zip(file: File) -> Option<String> {
    let mut archive = zip::ZipArchive::new(file).ok()?;

    if let Ok(mut entry) = archive.by_name("mimetype") {
        let mut mimetype = String::new();
        entry.read_to_string(&mut mimetype).ok()?;
        return match mimetype.trim() {
            "application/vnd.oasis.opendocument.text" => Some("odt".to_string()),
            "application/vnd.oasis.opendocument.spreadsheet" => Some("ods".to_string()),
            "application/vnd.oasis.opendocument.presentation" => Some("odp".to_string()),
            _ => None,
        };
    }

    let has = |name: &str| archive.file_names().any(|n| n == name);
    if has("word/document.xml") {
        Some("docx".to_string())
    } else if has("xl/workbook.xml") {
        Some("xlsx".to_string())
    } else if has("ppt/presentation.xml") {
        Some("pptx".to_string())
    } else {
        None
    }
}

fn image_extension(format: image::ImageFormat) -> Option<&'static str> {
    match format {
        image::ImageFormat::Jpeg => Some("jpg"),
        image::ImageFormat::Png => Some("png"),
        image::ImageFormat::Gif => Some("gif"),
        image::ImageFormat::Bmp => Some("bmp"),
        image::ImageFormat::Tiff => Some("tiff"),
        image::ImageFormat::WebP => Some("webp"),
        image::ImageFormat::Ico => Some("ico"),
        _ => None,
    }
}

fn looks_like_text(head: &[u8]) -> bool {
    if head.contains(&0) {
        return false;
    }
    match std::str::from_utf8(head) {
        Ok(_) => true,
        // A multi-byte character cut off by the sniff window is still text.
        Err(e) => e.error_len().is_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn extension_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "Photo.JPG", b"not really a jpeg");
        assert_eq!(detect_format(&path).as_deref(), Some("jpg"));
    }

    #[test]
    fn known_extension_wins_over_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "report.csv", b"%PDF-1.4 pretend");
        assert_eq!(detect_format(&path).as_deref(), Some("csv"));
    }

    #[test]
    fn sniffs_files_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = write_file(dir.path(), "scan", b"%PDF-1.7\n...");
        let rtf = write_file(dir.path(), "letter.bin", b"{\\rtf1\\ansi hello}");
        let png = write_file(dir.path(), "icon", &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0]);
        let text = write_file(dir.path(), "README", "plain words, ünïcode".as_bytes());
        let binary = write_file(dir.path(), "blob", &[0x00, 0x01, 0x02, 0xFF]);

        assert_eq!(detect_format(&pdf).as_deref(), Some("pdf"));
        assert_eq!(detect_format(&rtf).as_deref(), Some("rtf"));
        assert_eq!(detect_format(&png).as_deref(), Some("png"));
        assert_eq!(detect_format(&text).as_deref(), Some("txt"));
        assert_eq!(detect_format(&binary), None);
    }

    #[test]
    fn sniffs_office_containers() {
        let dir = tempfile::tempdir().unwrap();

        let docx = dir.path().join("mystery1");
        let mut zip = zip::ZipWriter::new(File::create(&docx).unwrap());
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("word/document.xml", options).unwrap();
        zip.write_all(b"<w:document/>").unwrap();
        zip.finish().unwrap();

        let ods = dir.path().join("mystery2");
        let mut zip = zip::ZipWriter::new(File::create(&ods).unwrap());
        zip.start_file("mimetype", options).unwrap();
        zip.write_all(b"application/vnd.oasis.opendocument.spreadsheet").unwrap();
        zip.finish().unwrap();

        assert_eq!(detect_format(&docx).as_deref(), Some("docx"));
        assert_eq!(detect_format(&ods).as_deref(), Some("ods"));
    }

    #[test]
    fn missing_or_empty_files_are_undetected() {
        let dir = tempfile::tempdir().unwrap();
        let empty = write_file(dir.path(), "empty", b"");
        assert_eq!(detect_format(&empty), None);
        assert_eq!(detect_format(&dir.path().join("nope")), None);
    }

    #[test]
    fn targets_exclude_source_and_its_aliases() {
        let targets = get_supported_target_formats("jpeg");
        assert!(!targets.contains(&"jpg".to_string()));
        assert!(targets.contains(&"png".to_string()));
        assert!(targets.contains(&"pdf".to_string()));

        let targets = get_supported_target_formats("TIF");
        assert!(!targets.contains(&"tiff".to_string()));
    }

    #[test]
    fn unreadable_formats_have_no_targets() {
        for ext in ["doc", "xls", "ppt", "svg", "heic", "exe"] {
            assert!(get_supported_target_formats(ext).is_empty(), "{ext}");
        }
        assert_eq!(get_file_category("doc"), Some(Category::Document));
        assert!(!is_readable("doc"));
    }

    #[test]
    fn every_source_has_a_category() {
        let sources = get_all_supported_source_formats();
        assert!(sources.contains(&"pptx".to_string()));
        assert!(sources.iter().all(|ext| get_file_category(ext).is_some()));
        assert_eq!(get_file_category("xlsx"), Some(Category::Spreadsheet));
        assert_eq!(get_file_category("pdf"), Some(Category::Pdf));
    }
}
