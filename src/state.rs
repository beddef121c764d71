use std::collections::BTreeSet;
use std::path::Path;

use rusty_tabula::chart::{self, ChartData, ChartKind, ChartRequest, RasterRenderer};
use rusty_tabula::config::AnalysisConfig;
use rusty_tabula::data::{loader, ColumnSelection, Table};
use rusty_tabula::i18n::{Labels, Language};
use rusty_tabula::report::{self, ReportMetadata};
use rusty_tabula::stats::{self, Correlation, Description};
use rusty_tabula::training::{self, ModelKind, Training, TrainingRequest};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Data,
    Statistics,
    Correlation,
    Chart,
}

/// Chart controls in the side panel.
pub struct ChartForm {
    pub kind: ChartKind,
    pub x: Option<String>,
    pub y: Option<String>,
    pub z: Option<String>,
    pub bins: usize,
}

/// Training controls in the side panel.
pub struct TrainingForm {
    pub features: BTreeSet<String>,
    pub target: Option<String>,
    pub model: ModelKind,
}

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: AnalysisConfig,
    pub language: Language,
    pub labels: Labels,

    /// Active table; the empty table until a file loads.
    pub table: Table,
    pub source_name: Option<String>,
    pub selection: ColumnSelection,
    pub view: View,

    pub description: Option<Description>,
    pub correlation: Option<Correlation>,

    pub chart_form: ChartForm,
    pub chart: Option<ChartData>,
    /// Charts the user queued for the report.
    pub report_charts: Vec<ChartData>,

    pub training_form: TrainingForm,
    pub training: Option<Training>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: AnalysisConfig) -> Self {
        let bins = config.chart.histogram_bins;
        Self {
            config,
            language: Language::default(),
            labels: Labels::default(),
            table: Table::empty(),
            source_name: None,
            selection: ColumnSelection::default(),
            view: View::Data,
            description: None,
            correlation: None,
            chart_form: ChartForm {
                kind: ChartKind::Histogram,
                x: None,
                y: None,
                z: None,
                bins,
            },
            chart: None,
            report_charts: Vec::new(),
            training_form: TrainingForm {
                features: BTreeSet::new(),
                target: None,
                model: ModelKind::LinearRegression,
            },
            training: None,
            status_message: None,
        }
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
        self.labels = Labels::for_language(language);
    }

    pub fn has_table(&self) -> bool {
        self.table.column_count() > 0
    }

    /// Load a file and reset every derived view.
    pub fn open(&mut self, path: &Path) {
        match loader::load_file(path) {
            Ok(table) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned());
                self.set_table(table, name);
            }
            Err(e) => {
                log::error!("Failed to load {}: {e}", path.display());
                self.set_table(Table::empty(), None);
                self.status_message = Some(e.to_string());
            }
        }
    }

    pub fn set_table(&mut self, table: Table, source_name: Option<String>) {
        self.selection = ColumnSelection::all(&table);
        let first = table.column_names().into_iter().next();
        self.chart_form.x = first;
        self.chart_form.y = None;
        self.chart_form.z = None;
        self.training_form.features.clear();
        self.training_form.target = None;
        self.table = table;
        self.source_name = source_name;
        self.chart = None;
        self.report_charts.clear();
        self.training = None;
        self.status_message = None;
        self.refresh_stats();
    }

    pub fn toggle_column(&mut self, name: &str) {
        self.selection.toggle(&self.table, name);
        self.refresh_stats();
    }

    pub fn select_all(&mut self) {
        self.selection = ColumnSelection::all(&self.table);
        self.refresh_stats();
    }

    pub fn select_none(&mut self) {
        self.selection = ColumnSelection::default();
        self.refresh_stats();
    }

    /// The table restricted to the selected columns.
    pub fn selected_table(&self) -> Table {
        self.selection
            .apply(&self.table)
            .unwrap_or_else(|_| Table::empty())
    }

    fn refresh_stats(&mut self) {
        if !self.has_table() {
            self.description = None;
            self.correlation = None;
            return;
        }
        let selected = self.selected_table();
        self.description = Some(stats::describe(&selected));
        self.correlation = Some(stats::correlate(&selected));
    }

    pub fn rebuild_chart(&mut self) {
        let form = &self.chart_form;
        let request = ChartRequest {
            kind: form.kind,
            x: form.x.clone(),
            y: form.y.clone(),
            z: form.z.clone(),
            bins: Some(form.bins),
        };
        match chart::build(&self.table, &request, &self.config.chart) {
            Ok(chart) => {
                self.chart = Some(chart);
                self.status_message = None;
            }
            Err(e) => {
                self.chart = None;
                self.status_message = Some(e.to_string());
            }
        }
    }

    pub fn queue_chart(&mut self) {
        if let Some(chart) = &self.chart {
            self.report_charts.push(chart.clone());
        }
    }

    pub fn run_training(&mut self) {
        let Some(target) = self.training_form.target.clone() else {
            self.status_message = Some(format!("{}?", self.labels.get("target")));
            return;
        };
        let request = TrainingRequest::new(
            self.training_form.features.iter().cloned(),
            target,
            self.training_form.model,
        );
        match training::train(&self.table, &request, &self.config.training) {
            Ok(result) => {
                self.training = Some(result);
                self.status_message = None;
            }
            Err(e) => {
                self.training = None;
                self.status_message = Some(e.to_string());
            }
        }
    }

    /// Render the queued charts (or one default chart per selected column)
    /// into a report under `dir`.
    pub fn export_report(&mut self, dir: &Path) {
        let charts = if self.report_charts.is_empty() {
            chart::build_all(&self.table, &self.selection, &self.config.chart)
        } else {
            self.report_charts.clone()
        };
        let metadata = ReportMetadata {
            title: format!(
                "{} Data Analysis Report",
                self.source_name.as_deref().unwrap_or("Excel")
            ),
            ..ReportMetadata::default()
        };
        let renderer = RasterRenderer::new(&self.config.render);
        let document = report::export(&charts, &metadata, &renderer);

        self.status_message = match document.save(dir) {
            Ok(path) if document.skipped.is_empty() => Some(format!("Saved {}", path.display())),
            Ok(path) => Some(format!(
                "Saved {} ({} charts skipped)",
                path.display(),
                document.skipped.len()
            )),
            Err(e) => {
                log::error!("Failed to save report: {e:#}");
                Some(format!("Error: {e:#}"))
            }
        };
    }
}
