mod app;
mod error;
mod modules;
mod style;

use eframe::egui;
use tracing_subscriber::EnvFilter;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("file_converter=info")),
        )
        .init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([640.0, 420.0])
            .with_min_inner_size([520.0, 360.0])
            .with_title("File Converter"),
        ..Default::default()
    };
    eframe::run_native(
        "File Converter",
        options,
        Box::new(|cc| Ok(Box::new(app::ConverterApp::new(cc)))),
    )
}
