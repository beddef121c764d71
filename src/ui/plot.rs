use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column as GridColumn, TableBuilder};
use egui_plot::{Bar, BarChart, BoxElem, BoxPlot, BoxSpread, Legend, Line, Plot, PlotPoints, Points};
use rusty_tabula::chart::{oblique, ChartData, ChartKind, Series};
use rusty_tabula::color::{self, ColorMap, Rgb};
use rusty_tabula::stats::{ColumnSummary, Correlation, Description};

use crate::state::{AppState, View};

/// Number of colour bands used for the z axis of 3-D charts.
const Z_BANDS: usize = 8;

fn to_color32(c: Rgb) -> Color32 {
    Color32::from_rgb(c[0], c[1], c[2])
}

/// Formats a statistic, leaving NaN cells blank.
fn fmt_stat(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else {
        format!("{v:.4}")
    }
}

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

pub fn central_panel(ui: &mut Ui, state: &mut AppState) {
    if !state.has_table() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading(state.labels.get("no_file"));
        });
        return;
    }

    ui.horizontal(|ui: &mut Ui| {
        ui.selectable_value(&mut state.view, View::Data, state.labels.get("data"));
        ui.selectable_value(&mut state.view, View::Statistics, state.labels.get("statistics"));
        ui.selectable_value(&mut state.view, View::Correlation, state.labels.get("correlation"));
        ui.selectable_value(&mut state.view, View::Chart, state.labels.get("chart"));
    });
    ui.separator();

    match state.view {
        View::Data => data_view(ui, state),
        View::Statistics => statistics_view(ui, state),
        View::Correlation => correlation_view(ui, state),
        View::Chart => match &state.chart {
            Some(chart) => chart_view(ui, chart),
            None => {
                ui.label("Pick a chart type and columns in the side panel.");
            }
        },
    }
}

// ---------------------------------------------------------------------------
// Data preview
// ---------------------------------------------------------------------------

fn data_view(ui: &mut Ui, state: &AppState) {
    let table = state.selected_table();
    if table.column_count() == 0 {
        ui.label(state.labels.get("no_data"));
        return;
    }

    ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .columns(GridColumn::auto().at_least(60.0), table.column_count())
            .header(20.0, |mut header| {
                for col in table.columns() {
                    header.col(|ui: &mut Ui| {
                        ui.strong(col.name());
                    });
                }
            })
            .body(|body| {
                body.rows(18.0, table.row_count(), |mut row| {
                    let i = row.index();
                    for col in table.columns() {
                        row.col(|ui: &mut Ui| {
                            ui.label(col.display(i).unwrap_or_default());
                        });
                    }
                });
            });
    });
}

// ---------------------------------------------------------------------------
// Statistics / correlation grids
// ---------------------------------------------------------------------------

fn statistics_view(ui: &mut Ui, state: &AppState) {
    let stats = match &state.description {
        Some(Description::Stats(stats)) => stats,
        _ => {
            ui.label(state.labels.get("no_data"));
            return;
        }
    };

    const HEADERS: [&str; 13] = [
        "", "count", "missing", "mean", "std", "min", "25%", "50%", "75%", "max", "unique", "top",
        "freq",
    ];

    ScrollArea::both().show(ui, |ui: &mut Ui| {
        egui::Grid::new("describe")
            .striped(true)
            .spacing([16.0, 4.0])
            .show(ui, |ui: &mut Ui| {
                for h in HEADERS {
                    ui.strong(h);
                }
                ui.end_row();

                for (name, summary) in &stats.columns {
                    ui.strong(name);
                    let cells: Vec<String> = match summary {
                        ColumnSummary::Numeric(s) => {
                            let mut cells = vec![s.count.to_string(), s.missing.to_string()];
                            cells.extend(
                                [s.mean, s.std, s.min, s.q25, s.median, s.q75, s.max].map(fmt_stat),
                            );
                            cells.extend([String::new(), String::new(), String::new()]);
                            cells
                        }
                        ColumnSummary::Text(s) => {
                            let mut cells = vec![s.count.to_string(), s.missing.to_string()];
                            cells.extend(std::iter::repeat(String::new()).take(7));
                            cells.push(s.unique.to_string());
                            cells.push(s.top.clone().unwrap_or_default());
                            cells.push(s.freq.to_string());
                            cells
                        }
                    };
                    for cell in cells {
                        ui.monospace(cell);
                    }
                    ui.end_row();
                }
            });
    });
}

fn correlation_view(ui: &mut Ui, state: &AppState) {
    let matrix = match &state.correlation {
        Some(Correlation::Matrix(m)) => m,
        _ => {
            ui.label(state.labels.get("no_numeric"));
            return;
        }
    };

    ScrollArea::both().show(ui, |ui: &mut Ui| {
        egui::Grid::new("correlation")
            .striped(true)
            .spacing([16.0, 4.0])
            .show(ui, |ui: &mut Ui| {
                ui.label("");
                for name in &matrix.columns {
                    ui.strong(name);
                }
                ui.end_row();

                for (name, row) in matrix.columns.iter().zip(&matrix.values) {
                    ui.strong(name);
                    for &r in row {
                        // Strong correlations stand out; NaN stays grey.
                        let text = RichText::new(fmt_stat(r)).monospace();
                        let text = if r.is_finite() {
                            text.color(to_color32(color::gradient((r + 1.0) / 2.0)))
                        } else {
                            text.color(Color32::GRAY)
                        };
                        ui.label(text);
                    }
                    ui.end_row();
                }
            });
    });
}

// ---------------------------------------------------------------------------
// Chart
// ---------------------------------------------------------------------------

fn chart_view(ui: &mut Ui, chart: &ChartData) {
    ui.heading(&chart.title);

    let y_label = match &chart.series {
        Series::Histogram(_) | Series::Categories(_) => "Count".to_string(),
        _ if chart.kind.is_3d() => chart.z_label.clone().unwrap_or_default(),
        _ => chart.y_label.clone().unwrap_or_default(),
    };

    Plot::new("chart_plot")
        .legend(Legend::default())
        .x_axis_label(chart.x_label.clone())
        .y_axis_label(y_label)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| match &chart.series {
            Series::Histogram(bins) => {
                let bars: Vec<Bar> = bins
                    .iter()
                    .map(|b| {
                        Bar::new((b.start + b.end) / 2.0, b.count as f64)
                            .width(b.end - b.start)
                            .name(format!("{:.3} – {:.3}", b.start, b.end))
                    })
                    .collect();
                plot_ui.bar_chart(BarChart::new(bars).color(Color32::LIGHT_BLUE));
            }
            Series::Categories(cats) => {
                let labels: Vec<&str> = cats.iter().map(|c| c.label.as_str()).collect();
                let colors = ColorMap::new(&labels);
                let bars: Vec<Bar> = cats
                    .iter()
                    .enumerate()
                    .map(|(i, c)| {
                        Bar::new(i as f64, c.count as f64)
                            .width(0.8)
                            .name(&c.label)
                            .fill(to_color32(colors.color_for(&c.label)))
                    })
                    .collect();
                plot_ui.bar_chart(BarChart::new(bars));
            }
            Series::Points(points) => {
                let name = chart.y_label.clone().unwrap_or_default();
                if chart.kind == ChartKind::Line {
                    plot_ui.line(
                        Line::new(PlotPoints::new(points.clone()))
                            .name(&name)
                            .color(Color32::LIGHT_BLUE)
                            .width(1.5),
                    );
                } else {
                    plot_ui.points(
                        Points::new(PlotPoints::new(points.clone()))
                            .name(&name)
                            .color(Color32::LIGHT_BLUE)
                            .radius(2.5),
                    );
                }
            }
            Series::Points3d(points) => {
                let (lo, hi) = points
                    .iter()
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                        (lo.min(p[2]), hi.max(p[2]))
                    });
                let span = if hi > lo { hi - lo } else { 1.0 };

                if chart.kind == ChartKind::Line3d {
                    let path: Vec<[f64; 2]> = points.iter().map(|p| oblique(*p)).collect();
                    plot_ui.line(Line::new(PlotPoints::new(path)).color(Color32::GRAY));
                }

                let mut bands: Vec<Vec<[f64; 2]>> = vec![Vec::new(); Z_BANDS];
                for p in points {
                    let t = (p[2] - lo) / span;
                    let band = ((t * Z_BANDS as f64) as usize).min(Z_BANDS - 1);
                    bands[band].push(oblique(*p));
                }
                let radius = if chart.kind == ChartKind::Surface3d { 4.0 } else { 2.5 };
                for (i, band) in bands.into_iter().enumerate() {
                    if band.is_empty() {
                        continue;
                    }
                    let t = (i as f64 + 0.5) / Z_BANDS as f64;
                    let from = lo + span * i as f64 / Z_BANDS as f64;
                    let to = lo + span * (i + 1) as f64 / Z_BANDS as f64;
                    plot_ui.points(
                        Points::new(PlotPoints::new(band))
                            .name(format!("{from:.2} – {to:.2}"))
                            .color(to_color32(color::gradient(t)))
                            .radius(radius),
                    );
                }
            }
            Series::Boxes(boxes) => {
                let labels: Vec<&str> = boxes.iter().map(|b| b.label.as_str()).collect();
                let colors = ColorMap::new(&labels);
                let elems: Vec<BoxElem> = boxes
                    .iter()
                    .enumerate()
                    .map(|(i, b)| {
                        let spread = BoxSpread::new(
                            b.lower_whisker,
                            b.q1,
                            b.median,
                            b.q3,
                            b.upper_whisker,
                        );
                        BoxElem::new(i as f64, spread)
                            .name(&b.label)
                            .box_width(0.6)
                            .fill(to_color32(colors.color_for(&b.label)).gamma_multiply(0.5))
                    })
                    .collect();
                plot_ui.box_plot(BoxPlot::new(elems));

                let outliers: Vec<[f64; 2]> = boxes
                    .iter()
                    .enumerate()
                    .flat_map(|(i, b)| b.outliers.iter().map(move |&o| [i as f64, o]))
                    .collect();
                if !outliers.is_empty() {
                    plot_ui.points(
                        Points::new(PlotPoints::new(outliers))
                            .name("outliers")
                            .color(Color32::BLACK)
                            .radius(2.0),
                    );
                }
            }
        });
}
