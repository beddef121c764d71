use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use rusty_tabula::chart::ChartKind;
use rusty_tabula::i18n::Language;
use rusty_tabula::training::ModelKind;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – columns, chart form, training form
// ---------------------------------------------------------------------------

/// Render the left control panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    if !state.has_table() {
        ui.label(state.labels.get("no_file"));
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            column_picker(ui, state);
            ui.separator();
            chart_form(ui, state);
            ui.separator();
            training_form(ui, state);
        });
}

fn column_picker(ui: &mut Ui, state: &mut AppState) {
    let columns: Vec<(String, String)> = state
        .table
        .columns()
        .iter()
        .map(|c| (c.name().to_string(), c.kind().to_string()))
        .collect();
    let header = format!(
        "{}  ({}/{})",
        state.labels.get("columns"),
        state.selection.len(),
        columns.len()
    );

    egui::CollapsingHeader::new(RichText::new(header).strong())
        .id_salt("columns")
        .default_open(true)
        .show(ui, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button(state.labels.get("all")).clicked() {
                    state.select_all();
                }
                if ui.small_button(state.labels.get("none")).clicked() {
                    state.select_none();
                }
            });
            for (name, kind) in &columns {
                let mut checked = state.selection.contains(name);
                let text = RichText::new(format!("{name}  [{kind}]"));
                if ui.checkbox(&mut checked, text).changed() {
                    state.toggle_column(name);
                }
            }
        });
}

/// Combo box over `options` plus an empty "—" entry when `optional`.
fn column_combo(
    ui: &mut Ui,
    id: &str,
    label: &str,
    value: &mut Option<String>,
    options: &[String],
    optional: bool,
) -> bool {
    let mut changed = false;
    ui.horizontal(|ui: &mut Ui| {
        ui.label(label);
        egui::ComboBox::from_id_salt(id)
            .selected_text(value.as_deref().unwrap_or("—"))
            .show_ui(ui, |ui: &mut Ui| {
                if optional {
                    changed |= ui.selectable_value(value, None, "—").changed();
                }
                for opt in options {
                    changed |= ui
                        .selectable_value(value, Some(opt.clone()), opt.as_str())
                        .changed();
                }
            });
    });
    changed
}

fn chart_form(ui: &mut Ui, state: &mut AppState) {
    ui.strong(state.labels.get("chart"));
    let labels = state.labels.clone();
    let options = state.selection.names().to_vec();
    let mut changed = false;

    let form = &mut state.chart_form;
    egui::ComboBox::from_id_salt("chart_kind")
        .selected_text(form.kind.to_string())
        .show_ui(ui, |ui: &mut Ui| {
            for kind in ChartKind::ALL {
                changed |= ui
                    .selectable_value(&mut form.kind, kind, kind.to_string())
                    .changed();
            }
        });

    changed |= column_combo(ui, "chart_x", labels.get("x_axis"), &mut form.x, &options, false);
    if form.kind.needs_y() || form.kind == ChartKind::Box {
        let optional = form.kind == ChartKind::Box;
        changed |= column_combo(ui, "chart_y", labels.get("y_axis"), &mut form.y, &options, optional);
    }
    if form.kind.is_3d() {
        changed |= column_combo(ui, "chart_z", labels.get("z_axis"), &mut form.z, &options, true);
    }
    if form.kind == ChartKind::Histogram {
        ui.horizontal(|ui: &mut Ui| {
            ui.label(labels.get("bins"));
            changed |= ui
                .add(egui::DragValue::new(&mut form.bins).range(1..=200))
                .changed();
        });
    }

    if changed {
        state.rebuild_chart();
        state.view = crate::state::View::Chart;
    }

    ui.horizontal(|ui: &mut Ui| {
        if ui
            .add_enabled(state.chart.is_some(), egui::Button::new(labels.get("add_to_report")))
            .clicked()
        {
            state.queue_chart();
        }
        if !state.report_charts.is_empty() {
            ui.label(format!(
                "{} {}",
                state.report_charts.len(),
                labels.get("charts_in_report")
            ));
        }
    });
}

fn training_form(ui: &mut Ui, state: &mut AppState) {
    let labels = state.labels.clone();
    ui.strong(labels.get("train"));

    let numeric: Vec<String> = state
        .selection
        .names()
        .iter()
        .filter(|n| state.table.column(n).is_some_and(|c| c.is_numeric()))
        .cloned()
        .collect();

    let form = &mut state.training_form;
    column_combo(ui, "target", labels.get("target"), &mut form.target, &numeric, false);

    ui.label(labels.get("features"));
    for name in &numeric {
        if form.target.as_deref() == Some(name.as_str()) {
            continue;
        }
        let mut checked = form.features.contains(name);
        if ui.checkbox(&mut checked, name.as_str()).changed() {
            if checked {
                form.features.insert(name.clone());
            } else {
                form.features.remove(name);
            }
        }
    }
    if let Some(target) = &form.target {
        form.features.remove(target);
    }

    ui.horizontal(|ui: &mut Ui| {
        ui.label(labels.get("model"));
        egui::ComboBox::from_id_salt("model_kind")
            .selected_text(form.model.to_string())
            .show_ui(ui, |ui: &mut Ui| {
                for kind in ModelKind::ALL {
                    ui.selectable_value(&mut form.model, kind, kind.to_string());
                }
            });
    });

    if ui.button(labels.get("train")).clicked() {
        state.run_training();
    }

    if let Some(result) = &state.training {
        egui::Grid::new("metrics").striped(true).show(ui, |ui: &mut Ui| {
            for (key, value) in result.evaluation.entries() {
                ui.label(labels.get(key));
                ui.monospace(format!("{value:.4}"));
                ui.end_row();
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button(state.labels.get("file"), |ui: &mut Ui| {
            if ui.button(state.labels.get("open")).clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(state.has_table(), egui::Button::new(state.labels.get("export_report")))
                .clicked()
            {
                export_dialog(state);
                ui.close_menu();
            }
        });

        let mut language = state.language;
        egui::ComboBox::from_id_salt("language")
            .selected_text(language.name())
            .show_ui(ui, |ui: &mut Ui| {
                for lang in Language::ALL {
                    ui.selectable_value(&mut language, lang, lang.name());
                }
            });
        if language != state.language {
            state.set_language(language);
        }

        ui.separator();

        if state.has_table() {
            ui.label(format!(
                "{}: {} {}",
                state.source_name.as_deref().unwrap_or("table"),
                state.table.row_count(),
                state.labels.get("rows_loaded")
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open spreadsheet")
        .add_filter(
            "Supported files",
            &["xlsx", "xlsm", "xls", "xlsb", "ods", "parquet", "pq", "json", "csv"],
        )
        .add_filter("Excel / OpenDocument", &["xlsx", "xlsm", "xls", "xlsb", "ods"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .add_filter("CSV", &["csv"])
        .pick_file();

    if let Some(path) = file {
        state.open(&path);
    }
}

pub fn export_dialog(state: &mut AppState) {
    let folder = rfd::FileDialog::new()
        .set_title("Choose a folder for the report")
        .pick_folder();

    if let Some(dir) = folder {
        state.export_report(&dir);
    }
}
