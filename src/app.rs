use eframe::egui;
use rusty_tabula::config::AnalysisConfig;

use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct RustyTabulaApp {
    pub state: AppState,
}

impl RustyTabulaApp {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            state: AppState::new(config),
        }
    }
}

impl eframe::App for RustyTabulaApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: columns, chart and training controls ----
        egui::SidePanel::left("control_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: data / statistics / chart ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::central_panel(ui, &mut self.state);
        });
    }
}
