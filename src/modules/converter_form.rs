//! Selection and status state behind the converter window, kept apart from
//! egui so the transitions can be tested directly.

use std::path::PathBuf;

use super::conversion::{ConversionJob, ConversionResult};
use super::converters::ConvertOptions;
use super::file_selector::SelectorEvent;
use super::format_detector::{detect_format, get_all_supported_source_formats};

pub const AUTO_DETECTED: &str = "Auto-detected";
pub const SELECT_TARGET: &str = "Select target...";
pub const NO_CONVERSIONS: &str = "No supported conversions";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Busy,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    NoFile,
    NoTarget,
}

impl InputError {
    pub fn message(&self) -> &'static str {
        match self {
            InputError::NoFile => "Please select an input file.",
            InputError::NoTarget => "Please select a target format.",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    pub input_path: PathBuf,
    pub target_extension: String,
    pub source_override: Option<String>,
}

impl ConversionRequest {
    pub fn into_job(self, options: ConvertOptions) -> ConversionJob {
        ConversionJob {
            input_path: self.input_path,
            target_extension: self.target_extension,
            source_override: self.source_override,
            options,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConverterForm {
    pub file_path: Option<PathBuf>,
    /// Explicit user choice; `None` means "Auto-detected".
    pub source_selection: Option<String>,
    pub detected_source: Option<String>,
    pub targets: Vec<String>,
    pub selected_target: Option<String>,
    pub status: String,
    pub status_kind: StatusKind,
    pub target_placeholder: &'static str,
    pub converting: bool,
    source_formats: Vec<String>,
}

impl Default for ConverterForm {
    fn default() -> Self {
        Self::new()
    }
}

impl ConverterForm {
    pub fn new() -> Self {
        let mut source_formats = get_all_supported_source_formats();
        source_formats.sort();
        source_formats.dedup();
        Self {
            file_path: None,
            source_selection: None,
            detected_source: None,
            targets: Vec::new(),
            selected_target: None,
            status: "Ready.".to_string(),
            status_kind: StatusKind::Info,
            target_placeholder: SELECT_TARGET,
            converting: false,
            source_formats,
        }
    }

    pub fn source_formats(&self) -> &[String] {
        &self.source_formats
    }

    pub fn source_enabled(&self) -> bool {
        self.file_path.is_some() && !self.converting
    }

    pub fn target_enabled(&self) -> bool {
        self.file_path.is_some() && !self.targets.is_empty() && !self.converting
    }

    /// What the source combo shows.
    pub fn source_label(&self) -> &str {
        self.source_selection
            .as_deref()
            .or(self.detected_source.as_deref())
            .unwrap_or(AUTO_DETECTED)
    }

    /// What the target combo shows.
    pub fn target_label(&self) -> &str {
        self.selected_target.as_deref().unwrap_or(self.target_placeholder)
    }

    pub fn apply(&mut self, event: SelectorEvent) {
        match event {
            SelectorEvent::FileSelected(path) => self.on_file_selected(path),
            SelectorEvent::TargetFormatsUpdated(targets) => self.on_target_formats_updated(targets),
        }
    }

    pub fn on_file_selected(&mut self, path: Option<PathBuf>) {
        self.source_selection = None;
        match path {
            Some(path) => {
                self.detected_source = detect_format(&path);
                self.file_path = Some(path);
                self.set_status("File selected. Choose target format.", StatusKind::Info);
            }
            None => {
                self.file_path = None;
                self.detected_source = None;
                self.targets.clear();
                self.selected_target = None;
                self.target_placeholder = SELECT_TARGET;
                self.set_status("Ready.", StatusKind::Info);
            }
        }
    }

    pub fn on_target_formats_updated(&mut self, mut targets: Vec<String>) {
        targets.sort();
        self.target_placeholder = if targets.is_empty() { NO_CONVERSIONS } else { SELECT_TARGET };
        self.targets = targets;
        self.selected_target = None;
    }

    /// Records the source combo choice and returns the extension whose
    /// targets should now be listed.
    pub fn select_source(&mut self, selection: Option<String>) -> Option<String> {
        self.source_selection = selection;
        self.source_selection.clone().or_else(|| self.detected_source.clone())
    }

    pub fn select_target(&mut self, target: &str) {
        if self.targets.iter().any(|t| t == target) {
            self.selected_target = Some(target.to_string());
        }
    }

    pub fn can_convert(&self) -> bool {
        self.file_path.is_some() && self.selected_target.is_some() && !self.converting
    }

    pub fn start(&mut self) -> Result<ConversionRequest, InputError> {
        let input_path = self.file_path.clone().ok_or(InputError::NoFile)?;
        let target_extension = self.selected_target.clone().ok_or(InputError::NoTarget)?;
        self.converting = true;
        self.set_status("Conversion in progress...", StatusKind::Busy);
        Ok(ConversionRequest {
            input_path,
            target_extension,
            source_override: self.source_selection.clone(),
        })
    }

    pub fn on_conversion_finished(&mut self, result: &ConversionResult) {
        self.converting = false;
        if result.success {
            self.set_status("Conversion Complete!", StatusKind::Success);
        } else {
            self.set_status("Conversion Failed.", StatusKind::Error);
        }
    }

    fn set_status(&mut self, text: &str, kind: StatusKind) {
        self.status = text.to_string();
        self.status_kind = kind;
    }
}
