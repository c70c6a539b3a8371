pub mod conversion;
pub mod converter_form;
pub mod converters;
pub mod file_selector;
pub mod format_detector;
pub mod formats;
