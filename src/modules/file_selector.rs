use std::path::{Path, PathBuf};

use tracing::debug;

use super::format_detector::{detect_format, get_all_supported_source_formats, get_supported_target_formats};

#[derive(Debug, Clone, PartialEq)]
pub enum SelectorEvent {
    /// `None` when the dialog was cancelled.
    FileSelected(Option<PathBuf>),
    TargetFormatsUpdated(Vec<String>),
}

pub trait FilePicker {
    fn pick_file(&mut self, extensions: &[String], start_dir: Option<&Path>) -> Option<PathBuf>;
}

/// Native open dialog.
pub struct RfdPicker;

impl FilePicker for RfdPicker {
    fn pick_file(&mut self, extensions: &[String], start_dir: Option<&Path>) -> Option<PathBuf> {
        let mut dialog = rfd::FileDialog::new()
            .set_title("Select File to Convert")
            .add_filter("All Supported Files", extensions)
            .add_filter("All Files", &["*"]);
        if let Some(dir) = start_dir.filter(|dir| dir.is_dir()) {
            dialog = dialog.set_directory(dir);
        }
        dialog.pick_file()
    }
}

#[derive(Debug, Default)]
pub struct FileSelector {
    current_source_file: Option<PathBuf>,
    last_directory: Option<PathBuf>,
}

impl FileSelector {
    pub fn new(last_directory: Option<PathBuf>) -> Self {
        Self { current_source_file: None, last_directory }
    }

    pub fn open_file_dialog(&mut self, picker: &mut dyn FilePicker) -> Vec<SelectorEvent> {
        let extensions = get_all_supported_source_formats();
        match picker.pick_file(&extensions, self.last_directory.as_deref()) {
            Some(path) => self.select_path(path),
            None => {
                self.current_source_file = None;
                vec![
                    SelectorEvent::FileSelected(None),
                    SelectorEvent::TargetFormatsUpdated(Vec::new()),
                ]
            }
        }
    }

    /// Same flow as a dialog pick; used for dropped and recent files.
    pub fn select_path(&mut self, path: PathBuf) -> Vec<SelectorEvent> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.last_directory = Some(parent.to_path_buf());
        }
        let targets = match detect_format(&path) {
            Some(ext) => get_supported_target_formats(&ext),
            None => Vec::new(),
        };
        debug!(path = %path.display(), targets = targets.len(), "file selected");
        self.current_source_file = Some(path.clone());
        vec![
            SelectorEvent::FileSelected(Some(path)),
            SelectorEvent::TargetFormatsUpdated(targets),
        ]
    }

    pub fn update_target_formats_from_source_ext(&self, source_extension: Option<&str>) -> SelectorEvent {
        let targets = match source_extension.filter(|ext| !ext.is_empty()) {
            Some(ext) => get_supported_target_formats(ext),
            None => Vec::new(),
        };
        SelectorEvent::TargetFormatsUpdated(targets)
    }

    pub fn current_source_file(&self) -> Option<&Path> {
        self.current_source_file.as_deref()
    }

    pub fn last_directory(&self) -> Option<&Path> {
        self.last_directory.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakePicker {
        answer: Option<PathBuf>,
        seen_dir: Option<PathBuf>,
        seen_extensions: Vec<String>,
    }

    impl FakePicker {
        fn returning(answer: Option<&str>) -> Self {
            Self { answer: answer.map(PathBuf::from), seen_dir: None, seen_extensions: Vec::new() }
        }
    }

    impl FilePicker for FakePicker {
        fn pick_file(&mut self, extensions: &[String], start_dir: Option<&Path>) -> Option<PathBuf> {
            self.seen_extensions = extensions.to_vec();
            self.seen_dir = start_dir.map(Path::to_path_buf);
            self.answer.clone()
        }
    }

    #[test]
    fn picking_a_file_emits_path_then_targets() {
        let mut selector = FileSelector::default();
        let mut picker = FakePicker::returning(Some("/docs/report.docx"));
        let events = selector.open_file_dialog(&mut picker);

        assert_eq!(events[0], SelectorEvent::FileSelected(Some(PathBuf::from("/docs/report.docx"))));
        let SelectorEvent::TargetFormatsUpdated(targets) = &events[1] else {
            panic!("expected targets");
        };
        assert!(targets.contains(&"pdf".to_string()));
        assert!(!targets.contains(&"docx".to_string()));
        assert_eq!(selector.current_source_file(), Some(Path::new("/docs/report.docx")));
        assert!(picker.seen_extensions.contains(&"xlsx".to_string()));
    }

    #[test]
    fn cancelling_clears_the_selection() {
        let mut selector = FileSelector::default();
        selector.select_path(PathBuf::from("/docs/a.txt"));

        let events = selector.open_file_dialog(&mut FakePicker::returning(None));
        assert_eq!(
            events,
            vec![SelectorEvent::FileSelected(None), SelectorEvent::TargetFormatsUpdated(vec![])]
        );
        assert_eq!(selector.current_source_file(), None);
    }

    #[test]
    fn dialog_starts_in_last_directory() {
        let mut selector = FileSelector::new(None);
        selector.select_path(PathBuf::from("/photos/cat.png"));

        let mut picker = FakePicker::returning(None);
        selector.open_file_dialog(&mut picker);
        assert_eq!(picker.seen_dir, Some(PathBuf::from("/photos")));
    }

    #[test]
    fn unknown_files_have_no_targets() {
        let mut selector = FileSelector::default();
        let events = selector.select_path(PathBuf::from("/nonexistent/blob"));
        assert_eq!(events[1], SelectorEvent::TargetFormatsUpdated(vec![]));
    }

    #[test]
    fn source_override_requeries_targets() {
        let selector = FileSelector::default();
        let SelectorEvent::TargetFormatsUpdated(targets) = selector.update_target_formats_from_source_ext(Some("csv"))
        else {
            panic!("expected targets");
        };
        assert!(targets.contains(&"json".to_string()));
        assert_eq!(
            selector.update_target_formats_from_source_ext(None),
            SelectorEvent::TargetFormatsUpdated(vec![])
        );
        assert_eq!(
            selector.update_target_formats_from_source_ext(Some("svg")),
            SelectorEvent::TargetFormatsUpdated(vec![])
        );
    }
}
