use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use eframe::egui;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::modules::conversion::{ConversionEvent, ConversionResult, ConversionThread};
use super::modules::converter_form::{AUTO_DETECTED, ConverterForm, InputError, StatusKind};
use super::modules::converters::ConvertOptions;
use super::modules::file_selector::{FileSelector, RfdPicker, SelectorEvent};
use super::style::{self, Accent, ThemeMode};

const CONFIG_DIR: &str = "file_converter";
const MAX_RECENT_FILES: usize = 10;

fn config_path(file_name: &str) -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(CONFIG_DIR);
    path.push(file_name);
    path
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    fs::write(path, json)
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
struct RecentFile {
    path: PathBuf,
    timestamp: i64,
}

#[derive(Serialize, Deserialize, Default, Debug)]
struct RecentFiles {
    files: Vec<RecentFile>,
}

impl RecentFiles {
    fn load() -> Self {
        Self::load_from(&config_path("recent_files.json"))
    }

    fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|contents| serde_json::from_str(&contents).ok())
            .unwrap_or_default()
    }

    fn save(&self) {
        let _ = self.save_to(&config_path("recent_files.json"));
    }

    fn save_to(&self, path: &Path) -> io::Result<()> {
        write_json(self, path)
    }

    fn add_file(&mut self, path: PathBuf) {
        self.files.retain(|f| f.path != path);
        let timestamp = chrono::Utc::now().timestamp();
        self.files.insert(0, RecentFile { path, timestamp });
        self.files.truncate(MAX_RECENT_FILES);
    }

    fn remove_file(&mut self, path: &Path) {
        self.files.retain(|f| f.path != path);
    }

    fn files(&self) -> &[RecentFile] {
        &self.files
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub enum ThemePreference {
    System,
    Light,
    Dark,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
struct AppSettings {
    theme_preference: ThemePreference,
    output_dir: Option<PathBuf>,
    overwrite: bool,
    jpeg_quality: u8,
    last_directory: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            theme_preference: ThemePreference::System,
            output_dir: None,
            overwrite: false,
            jpeg_quality: 90,
            last_directory: None,
        }
    }
}

impl AppSettings {
    fn load() -> Self {
        Self::load_from(&config_path("app_settings.json"))
    }

    fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|contents| serde_json::from_str(&contents).ok())
            .unwrap_or_default()
    }

    fn save(&self) {
        let _ = self.save_to(&config_path("app_settings.json"));
    }

    fn save_to(&self, path: &Path) -> io::Result<()> {
        write_json(self, path)
    }

    fn convert_options(&self) -> ConvertOptions {
        ConvertOptions {
            output_dir: self.output_dir.clone(),
            overwrite: self.overwrite,
            jpeg_quality: self.jpeg_quality.clamp(1, 100),
        }
    }
}

fn system_theme(ctx: &egui::Context) -> ThemeMode {
    match ctx.theme() {
        egui::Theme::Dark => ThemeMode::Dark,
        egui::Theme::Light => ThemeMode::Light,
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub struct ConverterApp {
    theme_mode: ThemeMode,
    settings: AppSettings,
    recent_files: RecentFiles,
    selector: FileSelector,
    form: ConverterForm,
    conversion: Option<ConversionThread>,
    progress_text: String,
    result: Option<ConversionResult>,
    input_error: Option<InputError>,
}

impl ConverterApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let settings = AppSettings::load();

        let theme_mode = match settings.theme_preference {
            ThemePreference::System => system_theme(&cc.egui_ctx),
            ThemePreference::Light => ThemeMode::Light,
            ThemePreference::Dark => ThemeMode::Dark,
        };
        style::apply_theme(&cc.egui_ctx, theme_mode);

        Self {
            theme_mode,
            selector: FileSelector::new(settings.last_directory.clone()),
            settings,
            recent_files: RecentFiles::load(),
            form: ConverterForm::new(),
            conversion: None,
            progress_text: String::new(),
            result: None,
            input_error: None,
        }
    }

    fn is_converting(&self) -> bool {
        self.conversion.is_some()
    }

    fn apply_selector_events(&mut self, events: Vec<SelectorEvent>) {
        for event in events {
            if let SelectorEvent::FileSelected(Some(path)) = &event {
                self.recent_files.add_file(path.clone());
                self.recent_files.save();
                self.settings.last_directory = self.selector.last_directory().map(Path::to_path_buf);
                self.settings.save();
            }
            self.form.apply(event);
        }
    }

    fn browse(&mut self) {
        let events = self.selector.open_file_dialog(&mut RfdPicker);
        self.apply_selector_events(events);
    }

    fn open_path(&mut self, path: PathBuf) {
        if self.is_converting() {
            return;
        }
        let events = self.selector.select_path(path);
        self.apply_selector_events(events);
    }

    fn change_source(&mut self, selection: Option<String>) {
        let source = self.form.select_source(selection);
        let event = self.selector.update_target_formats_from_source_ext(source.as_deref());
        self.form.apply(event);
    }

    fn start_conversion(&mut self, ctx: &egui::Context) {
        match self.form.start() {
            Ok(request) => {
                let job = request.into_job(self.settings.convert_options());
                info!(input = %job.input_path.display(), to = %job.target_extension, "starting conversion");
                let repaint = ctx.clone();
                self.progress_text = "Converting...".to_string();
                self.conversion = Some(ConversionThread::spawn(job, move || repaint.request_repaint()));
            }
            Err(err) => self.input_error = Some(err),
        }
    }

    fn poll_conversion(&mut self) {
        let Some(conversion) = &mut self.conversion else {
            return;
        };
        for event in conversion.poll() {
            match event {
                ConversionEvent::Progress(text) => self.progress_text = text,
                ConversionEvent::Finished(result) => {
                    self.form.on_conversion_finished(&result);
                    self.result = Some(result);
                }
            }
        }
        if conversion.is_finished() {
            self.conversion = None;
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.iter().find_map(|f| f.path.clone()));
        if let Some(path) = dropped {
            self.open_path(path);
        }
    }

    fn set_theme(&mut self, ctx: &egui::Context, preference: ThemePreference) {
        self.settings.theme_preference = preference;
        self.settings.save();
        self.theme_mode = match preference {
            ThemePreference::System => system_theme(ctx),
            ThemePreference::Light => ThemeMode::Light,
            ThemePreference::Dark => ThemeMode::Dark,
        };
        style::apply_theme(ctx, self.theme_mode);
    }

    fn status_color(&self) -> egui::Color32 {
        let kind = match self.form.status_kind {
            StatusKind::Info => Accent::Info,
            StatusKind::Busy => Accent::Busy,
            StatusKind::Success => Accent::Success,
            StatusKind::Error => Accent::Error,
        };
        style::accent(self.theme_mode, kind)
    }

    fn top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.add_space(4.0);
            egui::MenuBar::new().ui(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.add_enabled(!self.is_converting(), egui::Button::new("Open...")).clicked() {
                        self.browse();
                        ui.close();
                    }

                    let mut open: Option<PathBuf> = None;
                    let mut remove: Option<PathBuf> = None;
                    ui.add_enabled_ui(!self.recent_files.files().is_empty(), |ui| {
                        ui.menu_button("Recent Files", |ui| {
                            for file in self.recent_files.files() {
                                ui.horizontal(|ui| {
                                    let label = file_label(&file.path);
                                    if ui.button(label).on_hover_text(file.path.display().to_string()).clicked() {
                                        open = Some(file.path.clone());
                                    }
                                    if ui.small_button("✕").on_hover_text("Remove from list").clicked() {
                                        remove = Some(file.path.clone());
                                    }
                                });
                            }
                        });
                    });
                    if let Some(path) = remove {
                        self.recent_files.remove_file(&path);
                        self.recent_files.save();
                    }
                    if let Some(path) = open {
                        if path.exists() {
                            self.open_path(path);
                        } else {
                            self.recent_files.remove_file(&path);
                            self.recent_files.save();
                        }
                        ui.close();
                    }

                    ui.separator();
                    if ui.button("Exit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                        ui.close();
                    }
                });

                ui.menu_button("View", |ui| {
                    ui.label("Theme:");
                    let current = self.settings.theme_preference;
                    for (preference, label) in [
                        (ThemePreference::System, "System"),
                        (ThemePreference::Light, "Light"),
                        (ThemePreference::Dark, "Dark"),
                    ] {
                        if ui.selectable_label(current == preference, label).clicked() {
                            self.set_theme(ctx, preference);
                            ui.close();
                        }
                    }
                });
            });
            ui.add_space(4.0);
        });
    }

    fn render_file_row(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let shown = self
                .selector
                .current_source_file()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            let mut read_only = shown.as_str();
            ui.add(
                egui::TextEdit::singleline(&mut read_only)
                    .hint_text("Select a file to convert...")
                    .desired_width(ui.available_width() - 90.0),
            );
            if ui.add_enabled(!self.is_converting(), egui::Button::new("Browse")).clicked() {
                self.browse();
            }
        });
    }

    fn render_format_row(&mut self, ui: &mut egui::Ui) {
        let mut source_choice: Option<Option<String>> = None;
        let mut target_choice: Option<String> = None;

        ui.horizontal(|ui| {
            ui.label("Source Format:");
            ui.add_enabled_ui(self.form.source_enabled(), |ui| {
                egui::ComboBox::from_id_salt("source_format")
                    .selected_text(self.form.source_label())
                    .width(130.0)
                    .show_ui(ui, |ui| {
                        if ui.selectable_label(self.form.source_selection.is_none(), AUTO_DETECTED).clicked() {
                            source_choice = Some(None);
                        }
                        for format in self.form.source_formats() {
                            let selected = self.form.source_selection.as_deref() == Some(format.as_str());
                            if ui.selectable_label(selected, format.as_str()).clicked() {
                                source_choice = Some(Some(format.clone()));
                            }
                        }
                    });
            });

            ui.add_space(20.0);

            ui.label("Target Format:");
            ui.add_enabled_ui(self.form.target_enabled(), |ui| {
                egui::ComboBox::from_id_salt("target_format")
                    .selected_text(self.form.target_label())
                    .width(130.0)
                    .show_ui(ui, |ui| {
                        for format in &self.form.targets {
                            let selected = self.form.selected_target.as_deref() == Some(format.as_str());
                            if ui.selectable_label(selected, format.as_str()).clicked() {
                                target_choice = Some(format.clone());
                            }
                        }
                    });
            });
        });

        if let Some(selection) = source_choice {
            self.change_source(selection);
        }
        if let Some(target) = target_choice {
            self.form.select_target(&target);
        }
    }

    fn render_options(&mut self, ui: &mut egui::Ui) {
        let label_color = style::muted_text(self.theme_mode);
        egui::CollapsingHeader::new("Options")
            .default_open(false)
            .show(ui, |ui| {
                let mut changed = false;

                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new("Output folder:").color(label_color));
                    let folder = self
                        .settings
                        .output_dir
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "Same as input file".to_string());
                    ui.label(folder);
                    if ui.button("Browse").clicked() {
                        let mut dialog = rfd::FileDialog::new().set_title("Select Output Folder");
                        if let Some(dir) = self.settings.output_dir.as_ref().filter(|d| d.is_dir()) {
                            dialog = dialog.set_directory(dir);
                        }
                        if let Some(dir) = dialog.pick_folder() {
                            self.settings.output_dir = Some(dir);
                            changed = true;
                        }
                    }
                    if ui.add_enabled(self.settings.output_dir.is_some(), egui::Button::new("Clear")).clicked() {
                        self.settings.output_dir = None;
                        changed = true;
                    }
                });

                changed |= ui
                    .checkbox(
                        &mut self.settings.overwrite,
                        egui::RichText::new("Overwrite existing files").color(label_color),
                    )
                    .changed();

                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new("JPEG Quality:").color(label_color));
                    changed |= ui
                        .add(egui::Slider::new(&mut self.settings.jpeg_quality, 1..=100).suffix("%"))
                        .changed();
                });

                if changed {
                    self.settings.save();
                }
            });
    }

    fn render_main(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.add_space(8.0);
        self.render_file_row(ui);
        ui.add_space(8.0);
        self.render_format_row(ui);
        ui.add_space(12.0);

        let can_convert = self.form.can_convert();
        let clicked = ui
            .add_enabled_ui(can_convert, |ui| style::primary_button(ui, "Convert"))
            .inner
            .clicked();
        if clicked {
            self.start_conversion(ctx);
        }

        ui.add_space(8.0);
        ui.vertical_centered(|ui| {
            ui.label(egui::RichText::new(&self.form.status).strong().color(self.status_color()));
        });

        ui.add_space(8.0);
        ui.add_enabled_ui(!self.is_converting(), |ui| self.render_options(ui));

        let hovering = ctx.input(|i| !i.raw.hovered_files.is_empty());
        if hovering {
            ui.vertical_centered(|ui| {
                ui.label(egui::RichText::new("Drop file to select it").color(style::muted_text(self.theme_mode)));
            });
        }
    }

    fn modal_overlay(&self, ctx: &egui::Context, id: &str) {
        let overlay_color = style::modal_colors(self.theme_mode).overlay;
        egui::Area::new(egui::Id::new(id))
            .fixed_pos(egui::pos2(0.0, 0.0))
            .order(egui::Order::Foreground)
            .interactable(true)
            .show(ctx, |ui| {
                let screen_rect = ctx.content_rect();
                ui.painter().rect_filled(screen_rect, 0.0, overlay_color);
                ui.allocate_rect(screen_rect, egui::Sense::click());
            });
    }

    fn modal_frame(&self) -> egui::Frame {
        let colors = style::modal_colors(self.theme_mode);
        egui::Frame::new()
            .fill(colors.background)
            .stroke(egui::Stroke::new(1.0, colors.border))
            .corner_radius(8.0)
            .inner_margin(24.0)
    }

    fn render_progress_modal(&mut self, ctx: &egui::Context) {
        if !self.is_converting() {
            return;
        }
        let text_color = style::modal_colors(self.theme_mode).text;
        self.modal_overlay(ctx, "progress_overlay");

        egui::Window::new("Converting File")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .order(egui::Order::Tooltip)
            .frame(self.modal_frame())
            .show(ctx, |ui| {
                ui.set_min_width(320.0);
                ui.vertical_centered(|ui| {
                    ui.add_space(8.0);
                    ui.spinner();
                    ui.add_space(8.0);
                    ui.label(egui::RichText::new(&self.progress_text).size(14.0).color(text_color));
                    ui.add_space(8.0);
                });
            });
    }

    fn render_result_modal(&mut self, ctx: &egui::Context) {
        let Some(result) = &self.result else {
            return;
        };
        let (heading, kind) = if result.success {
            ("Success", Accent::Success)
        } else {
            ("Error", Accent::Error)
        };
        let accent = style::accent(self.theme_mode, kind);
        let text_color = style::modal_colors(self.theme_mode).text;
        let message = result.message.clone();
        let folder = result
            .output
            .as_deref()
            .and_then(Path::parent)
            .map(|dir| format!("Saved in {}", dir.display()));
        let muted = style::muted_text(self.theme_mode);
        self.modal_overlay(ctx, "result_overlay");

        let mut close = false;
        egui::Window::new("Conversion Result")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .order(egui::Order::Tooltip)
            .frame(self.modal_frame())
            .show(ctx, |ui| {
                ui.set_max_width(440.0);
                ui.vertical_centered(|ui| {
                    ui.label(egui::RichText::new(heading).size(18.0).strong().color(accent));
                    ui.add_space(8.0);
                    ui.label(egui::RichText::new(message).size(13.0).color(text_color));
                    if let Some(folder) = folder {
                        ui.add_space(4.0);
                        ui.label(egui::RichText::new(folder).size(12.0).color(muted));
                    }
                    ui.add_space(16.0);
                    if style::secondary_button(ui, "OK", self.theme_mode).clicked() {
                        close = true;
                    }
                });
            });

        if close {
            self.result = None;
        }
    }

    fn render_input_error_modal(&mut self, ctx: &egui::Context) {
        let Some(err) = &self.input_error else {
            return;
        };
        let message = err.message();
        let accent = style::accent(self.theme_mode, Accent::Warning);
        self.modal_overlay(ctx, "input_error_overlay");

        let mut close = false;
        egui::Window::new("Input Error")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .order(egui::Order::Tooltip)
            .frame(self.modal_frame())
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.label(egui::RichText::new(message).size(14.0).color(accent));
                    ui.add_space(16.0);
                    if style::secondary_button(ui, "OK", self.theme_mode).clicked() {
                        close = true;
                    }
                });
            });

        if close {
            self.input_error = None;
        }
    }
}

impl eframe::App for ConverterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if matches!(self.settings.theme_preference, ThemePreference::System) {
            let current = system_theme(ctx);
            if self.theme_mode != current {
                self.theme_mode = current;
                style::apply_theme(ctx, self.theme_mode);
            }
        }

        self.poll_conversion();
        self.handle_dropped_files(ctx);

        self.top_bar(ctx);
        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_main(ui, ctx);
        });

        self.render_progress_modal(ctx);
        self.render_result_modal(ctx);
        self.render_input_error_modal(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_files_are_newest_first_and_capped() {
        let mut recent = RecentFiles::default();
        for i in 0..12 {
            recent.add_file(PathBuf::from(format!("/f/{i}.txt")));
        }
        recent.add_file(PathBuf::from("/f/5.txt"));

        let paths: Vec<_> = recent.files().iter().map(|f| f.path.clone()).collect();
        assert_eq!(paths.len(), MAX_RECENT_FILES);
        assert_eq!(paths[0], PathBuf::from("/f/5.txt"));
        assert_eq!(paths[1], PathBuf::from("/f/11.txt"));
        assert_eq!(paths.iter().filter(|p| p.ends_with("5.txt")).count(), 1);

        recent.remove_file(Path::new("/f/5.txt"));
        assert_eq!(recent.files()[0].path, PathBuf::from("/f/11.txt"));
    }

    #[test]
    fn recent_files_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/recent_files.json");
        let mut recent = RecentFiles::default();
        recent.add_file(PathBuf::from("/docs/a.docx"));
        recent.save_to(&path).unwrap();

        let loaded = RecentFiles::load_from(&path);
        assert_eq!(loaded.files(), recent.files());
    }

    #[test]
    fn partial_settings_fill_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app_settings.json");
        fs::write(&path, r#"{ "theme_preference": "Dark", "overwrite": true }"#).unwrap();

        let settings = AppSettings::load_from(&path);
        assert_eq!(settings.theme_preference, ThemePreference::Dark);
        assert!(settings.overwrite);
        assert_eq!(settings.jpeg_quality, 90);
        assert_eq!(settings.output_dir, None);
    }

    #[test]
    fn unreadable_settings_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app_settings.json");
        fs::write(&path, "not json").unwrap();
        assert_eq!(AppSettings::load_from(&path), AppSettings::default());
        assert_eq!(AppSettings::load_from(&dir.path().join("missing.json")), AppSettings::default());
    }

    #[test]
    fn settings_feed_convert_options() {
        let settings = AppSettings {
            output_dir: Some(PathBuf::from("/out")),
            overwrite: true,
            jpeg_quality: 0,
            ..Default::default()
        };
        let options = settings.convert_options();
        assert_eq!(options.output_dir, Some(PathBuf::from("/out")));
        assert!(options.overwrite);
        assert_eq!(options.jpeg_quality, 1);
    }
}
