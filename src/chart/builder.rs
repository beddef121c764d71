use std::collections::HashMap;

use super::{BoxSummary, CategoryCount, ChartData, ChartKind, ChartRequest, HistogramBin, Series};
use crate::config::ChartConfig;
use crate::data::{Column, ColumnSelection, Table};
use crate::error::{AnalysisError, Result};
use crate::stats::quantile;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Derive the series needed to draw `request` from `table`.
///
/// A kind whose required axis is unset fails with
/// [`AnalysisError::UnsupportedChart`]; an axis naming an unknown or
/// non-numeric column fails with [`AnalysisError::Validation`].
pub fn build(table: &Table, request: &ChartRequest, config: &ChartConfig) -> Result<ChartData> {
    let kind = request.kind;
    let x_name = request
        .x
        .as_deref()
        .ok_or_else(|| AnalysisError::unsupported(format!("{kind} chart requires an X column")))?;
    let y_name = request.y.as_deref();
    if kind.needs_y() && y_name.is_none() {
        let what = if kind.is_3d() { "3D" } else { "Scatter and line" };
        return Err(AnalysisError::unsupported(format!(
            "{what} chart requires a Y column"
        )));
    }
    if kind.is_3d() && request.z.is_none() {
        return Err(AnalysisError::unsupported("3D chart requires a Z column"));
    }

    let x = table.require(x_name)?;
    for name in [y_name, request.z.as_deref()].into_iter().flatten() {
        table.require(name)?;
    }
    let mut chart = ChartData {
        kind,
        title: String::new(),
        x_label: x_name.to_string(),
        y_label: y_name.map(str::to_string),
        z_label: None,
        series: Series::Points(Vec::new()),
    };

    match kind {
        ChartKind::Histogram => {
            let bins = request.bins.unwrap_or(config.histogram_bins);
            if bins == 0 {
                return Err(AnalysisError::validation("Histogram needs at least one bin"));
            }
            chart.title = format!("Histogram of {x_name}");
            chart.y_label = Some("count".to_string());
            chart.series = Series::Histogram(histogram(x_name, numeric(x, kind)?, bins)?);
        }
        ChartKind::Bar => {
            chart.title = format!("Bar chart of {x_name}");
            chart.y_label = Some("count".to_string());
            chart.series = Series::Categories(category_counts(x));
        }
        ChartKind::Box => {
            chart.series = match y_name {
                Some(y_name) => {
                    let y = numeric(table.require(y_name)?, kind)?;
                    chart.title = format!("Box plot of {y_name} by {x_name}");
                    Series::Boxes(grouped_boxes(x, y))
                }
                None => {
                    let values: Vec<f64> = numeric(x, kind)?.iter().flatten().copied().collect();
                    chart.title = format!("Box plot of {x_name}");
                    Series::Boxes(box_summary(x_name, values).into_iter().collect())
                }
            };
        }
        ChartKind::Scatter | ChartKind::Line => {
            let y_name = y_name.unwrap_or_default();
            let xs = numeric(x, kind)?;
            let ys = numeric(table.require(y_name)?, kind)?;
            chart.title = format!("{y_name} vs {x_name}");
            chart.series = Series::Points(
                xs.iter()
                    .zip(ys)
                    .filter_map(|(x, y)| Some([(*x)?, (*y)?]))
                    .collect(),
            );
        }
        ChartKind::Scatter3d | ChartKind::Line3d | ChartKind::Surface3d => {
            let y_name = y_name.unwrap_or_default();
            let z_name = request.z.as_deref().unwrap_or_default();
            let xs = numeric(x, kind)?;
            let ys = numeric(table.require(y_name)?, kind)?;
            let zs = numeric(table.require(z_name)?, kind)?;
            chart.title = format!("{kind} of {z_name} over {x_name} and {y_name}");
            chart.z_label = Some(z_name.to_string());
            chart.series = Series::Points3d(
                xs.iter()
                    .zip(ys)
                    .zip(zs)
                    .filter_map(|((x, y), z)| Some([(*x)?, (*y)?, (*z)?]))
                    .collect(),
            );
        }
    }

    Ok(chart)
}

/// One default chart per selected column: histogram for numbers, bar chart of
/// counts for text. Columns that fail are logged and skipped.
pub fn build_all(table: &Table, selection: &ColumnSelection, config: &ChartConfig) -> Vec<ChartData> {
    selection
        .names()
        .iter()
        .filter_map(|name| {
            ChartRequest::auto(table, name)
                .and_then(|req| build(table, &req, config))
                .map_err(|e| log::warn!("Skipping chart for '{name}': {e}"))
                .ok()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Series helpers
// ---------------------------------------------------------------------------

fn numeric(col: &Column, kind: ChartKind) -> Result<&[Option<f64>]> {
    col.as_numeric().ok_or_else(|| {
        AnalysisError::validation(format!(
            "{kind} chart needs a numeric column, but '{}' is text",
            col.name()
        ))
    })
}

/// Equal-width bins over `[min, max]`, last bin closed. A constant column
/// widens the range to `[v - 0.5, v + 0.5]`.
fn histogram(name: &str, values: &[Option<f64>], bins: usize) -> Result<Vec<HistogramBin>> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return Ok(Vec::new());
    }
    let mut lo = present.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;
    if !width.is_finite() || width == 0.0 {
        return Err(AnalysisError::unsupported(format!(
            "Histogram of '{name}' cannot bin values spanning {lo:e} to {hi:e}"
        )));
    }

    let mut counts = vec![0usize; bins];
    for v in &present {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    Ok(counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            start: lo + i as f64 * width,
            end: if i + 1 == bins { hi } else { lo + (i + 1) as f64 * width },
            count,
        })
        .collect())
}

/// Value → count in first-seen order; missing cells are skipped.
fn category_counts(col: &Column) -> Vec<CategoryCount> {
    let mut counts: Vec<CategoryCount> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for row in 0..col.len() {
        let Some(label) = col.display(row) else {
            continue;
        };
        match index.get(&label) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(label.clone(), counts.len());
                counts.push(CategoryCount { label, count: 1 });
            }
        }
    }
    counts
}

fn grouped_boxes(groups: &Column, values: &[Option<f64>]) -> Vec<BoxSummary> {
    let mut buckets: Vec<(String, Vec<f64>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for (row, value) in values.iter().enumerate() {
        let (Some(label), Some(v)) = (groups.display(row), value) else {
            continue;
        };
        match index.get(&label) {
            Some(&i) => buckets[i].1.push(*v),
            None => {
                index.insert(label.clone(), buckets.len());
                buckets.push((label, vec![*v]));
            }
        }
    }
    buckets
        .into_iter()
        .filter_map(|(label, values)| box_summary(&label, values))
        .collect()
}

/// Quartiles, 1.5·IQR whiskers and outliers; `None` for an empty group.
fn box_summary(label: &str, mut values: Vec<f64>) -> Option<BoxSummary> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let q1 = quantile(&values, 0.25);
    let median = quantile(&values, 0.5);
    let q3 = quantile(&values, 0.75);
    let reach = 1.5 * (q3 - q1);
    let (low_fence, high_fence) = (q1 - reach, q3 + reach);

    let inside = values.iter().copied().filter(|v| (low_fence..=high_fence).contains(v));
    let lower_whisker = inside.clone().fold(f64::INFINITY, f64::min);
    let upper_whisker = inside.fold(f64::NEG_INFINITY, f64::max);
    let outliers = values
        .iter()
        .copied()
        .filter(|v| !(low_fence..=high_fence).contains(v))
        .collect();

    Some(BoxSummary {
        label: label.to_string(),
        q1,
        median,
        q3,
        lower_whisker,
        upper_whisker,
        outliers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::new(vec![
            Column::numeric("x", vec![Some(1.0), Some(2.0), None, Some(4.0), Some(10.0)]),
            Column::numeric("y", vec![Some(2.0), Some(4.0), Some(6.0), None, Some(20.0)]),
            Column::numeric("z", vec![Some(0.0), Some(1.0), Some(0.0), Some(1.0), Some(0.0)]),
            Column::text(
                "city",
                vec![
                    Some("Oslo".into()),
                    Some("Lima".into()),
                    Some("Oslo".into()),
                    None,
                    Some("Lima".into()),
                ],
            ),
        ])
        .unwrap()
    }

    fn config() -> ChartConfig {
        ChartConfig::default()
    }

    #[test]
    fn scatter_3d_without_z_is_unsupported() {
        let req = ChartRequest::new(ChartKind::Scatter3d, "x").with_y("y");
        let err = build(&table(), &req, &config()).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::UnsupportedChart("3D chart requires a Z column".into())
        );
    }

    #[test]
    fn unknown_axis_is_a_validation_error() {
        let req = ChartRequest::new(ChartKind::Scatter, "x").with_y("nope");
        let err = build(&table(), &req, &config()).unwrap_err();
        assert!(matches!(err, AnalysisError::Validation(msg) if msg.contains("nope")));
    }

    #[test]
    fn histogram_defaults_to_ten_bins() {
        let chart = build(&table(), &ChartRequest::new(ChartKind::Histogram, "x"), &config()).unwrap();
        let Series::Histogram(bins) = chart.series else {
            panic!("expected histogram bins");
        };
        assert_eq!(bins.len(), 10);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 4);
        assert_eq!(bins[0].start, 1.0);
        assert_eq!(bins[9].end, 10.0);
        assert_eq!(bins[9].count, 1);
    }

    #[test]
    fn histogram_of_constant_column_widens_range() {
        let t = Table::new(vec![Column::numeric("c", vec![Some(3.0); 4])]).unwrap();
        let req = ChartRequest::new(ChartKind::Histogram, "c").with_bins(2);
        let Series::Histogram(bins) = build(&t, &req, &config()).unwrap().series else {
            panic!("expected histogram bins");
        };
        assert_eq!((bins[0].start, bins[1].end), (2.5, 3.5));
        assert_eq!(bins[1].count, 4);
    }

    #[test]
    fn histogram_rejects_text_columns() {
        let req = ChartRequest::new(ChartKind::Histogram, "city");
        assert!(matches!(
            build(&table(), &req, &config()),
            Err(AnalysisError::Validation(_))
        ));
    }

    #[test]
    fn bar_counts_keep_first_seen_order() {
        let chart = build(&table(), &ChartRequest::new(ChartKind::Bar, "city"), &config()).unwrap();
        assert_eq!(
            chart.series,
            Series::Categories(vec![
                CategoryCount { label: "Oslo".into(), count: 2 },
                CategoryCount { label: "Lima".into(), count: 2 },
            ])
        );
    }

    #[test]
    fn scatter_drops_rows_with_missing_values() {
        let req = ChartRequest::new(ChartKind::Scatter, "x").with_y("y");
        let chart = build(&table(), &req, &config()).unwrap();
        assert_eq!(
            chart.series,
            Series::Points(vec![[1.0, 2.0], [2.0, 4.0], [10.0, 20.0]])
        );
    }

    #[test]
    fn three_d_points_are_row_aligned() {
        let req = ChartRequest::new(ChartKind::Surface3d, "x").with_y("y").with_z("z");
        let chart = build(&table(), &req, &config()).unwrap();
        assert_eq!(chart.z_label.as_deref(), Some("z"));
        assert_eq!(
            chart.series,
            Series::Points3d(vec![[1.0, 2.0, 0.0], [2.0, 4.0, 1.0], [10.0, 20.0, 0.0]])
        );
    }

    #[test]
    fn box_plot_flags_outliers() {
        let t = Table::new(vec![Column::numeric(
            "v",
            vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(100.0)],
        )])
        .unwrap();
        let Series::Boxes(boxes) = build(&t, &ChartRequest::new(ChartKind::Box, "v"), &config())
            .unwrap()
            .series
        else {
            panic!("expected boxes");
        };
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].median, 3.0);
        assert_eq!(boxes[0].upper_whisker, 4.0);
        assert_eq!(boxes[0].outliers, vec![100.0]);
    }

    #[test]
    fn grouped_boxes_follow_first_seen_groups() {
        let req = ChartRequest::new(ChartKind::Box, "city").with_y("y");
        let Series::Boxes(boxes) = build(&table(), &req, &config()).unwrap().series else {
            panic!("expected boxes");
        };
        let labels: Vec<&str> = boxes.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["Oslo", "Lima"]);
    }

    #[test]
    fn default_charts_follow_column_kind() {
        let t = table();
        let selection = ColumnSelection::new(&t, ["x", "city"]).unwrap();
        let charts = build_all(&t, &selection, &config());
        let kinds: Vec<ChartKind> = charts.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![ChartKind::Histogram, ChartKind::Bar]);
        assert!(build_all(&t, &ColumnSelection::default(), &config()).is_empty());
    }

    #[test]
    fn unused_axes_must_still_exist() {
        let req = ChartRequest::new(ChartKind::Histogram, "x").with_y("nope");
        let err = build(&table(), &req, &config()).unwrap_err();
        assert!(matches!(err, AnalysisError::Validation(msg) if msg.contains("nope")));

        let req = ChartRequest::new(ChartKind::Bar, "city").with_z("ghost");
        let err = build(&table(), &req, &config()).unwrap_err();
        assert!(matches!(err, AnalysisError::Validation(msg) if msg.contains("ghost")));

        let req = ChartRequest::new(ChartKind::Scatter, "x").with_y("y").with_z("ghost");
        assert!(build(&table(), &req, &config()).is_err());
    }

    #[test]
    fn histogram_refuses_an_overflowing_range() {
        let t = Table::new(vec![Column::numeric("big", vec![Some(-1e308), Some(1e308)])]).unwrap();
        let req = ChartRequest::new(ChartKind::Histogram, "big");
        assert!(matches!(
            build(&t, &req, &config()),
            Err(AnalysisError::UnsupportedChart(_))
        ));
    }

    #[test]
    fn bar_counts_scale_to_many_distinct_labels() {
        let n = 60_000;
        let ids: Vec<Option<String>> = (0..n).map(|i| Some(format!("id-{}", i / 2))).collect();
        let t = Table::new(vec![Column::text("id", ids)]).unwrap();
        let chart = build(&t, &ChartRequest::new(ChartKind::Bar, "id"), &config()).unwrap();
        let Series::Categories(cats) = chart.series else {
            panic!("expected category counts");
        };
        assert_eq!(cats.len(), n / 2);
        assert_eq!(cats[0].label, "id-0");
        assert_eq!(cats[n / 2 - 1].label, format!("id-{}", n / 2 - 1));
        assert!(cats.iter().all(|c| c.count == 2));
    }
}
