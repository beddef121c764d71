mod app;
mod state;
mod ui;

use app::RustyTabulaApp;
use eframe::egui;
use rusty_tabula::config::AnalysisConfig;

fn main() -> eframe::Result {
    env_logger::init();
    let config = AnalysisConfig::from_env();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 820.0])
            .with_min_inner_size([640.0, 420.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Rusty Tabula – Spreadsheet Analysis",
        options,
        Box::new(|_cc| Ok(Box::new(RustyTabulaApp::new(config)))),
    )
}
