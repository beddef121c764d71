//! Descriptive statistics and Pearson correlation over a [`Table`].
//!
//! Both entry points are pure functions of the table values. When there is
//! nothing to compute they return an explicit signal ([`Description::NoData`],
//! [`Correlation::NoNumericColumns`]) instead of an empty result, so the
//! presentation layer can show a message.

use std::collections::HashMap;

use serde::Serialize;

use crate::data::{Column, ColumnData, Table};

// ---------------------------------------------------------------------------
// describe
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    /// Non-missing cells.
    pub count: usize,
    pub missing: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1); NaN below two values.
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextSummary {
    pub count: usize,
    pub missing: usize,
    pub unique: usize,
    /// Most frequent value; the first one seen wins ties.
    pub top: Option<String>,
    pub freq: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnSummary {
    Numeric(NumericSummary),
    Text(TextSummary),
}

impl ColumnSummary {
    pub fn count(&self) -> usize {
        match self {
            ColumnSummary::Numeric(s) => s.count,
            ColumnSummary::Text(s) => s.count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptiveStats {
    pub row_count: usize,
    /// `(column name, summary)` in table order.
    pub columns: Vec<(String, ColumnSummary)>,
}

impl DescriptiveStats {
    pub fn get(&self, column: &str) -> Option<&ColumnSummary> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, s)| s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Description {
    NoData,
    Stats(DescriptiveStats),
}

pub fn describe(table: &Table) -> Description {
    if table.is_empty() {
        return Description::NoData;
    }
    let columns = table
        .columns()
        .iter()
        .map(|col| (col.name().to_string(), summarize(col)))
        .collect();
    Description::Stats(DescriptiveStats {
        row_count: table.row_count(),
        columns,
    })
}

fn summarize(col: &Column) -> ColumnSummary {
    match col.data() {
        ColumnData::Numeric(values) => {
            let mut present: Vec<f64> = values.iter().flatten().copied().collect();
            present.sort_by(f64::total_cmp);
            let count = present.len();
            let mean = mean(&present);
            let std = if count < 2 {
                f64::NAN
            } else {
                let ss: f64 = present.iter().map(|v| (v - mean).powi(2)).sum();
                (ss / (count - 1) as f64).sqrt()
            };
            ColumnSummary::Numeric(NumericSummary {
                count,
                missing: values.len() - count,
                mean,
                std,
                min: present.first().copied().unwrap_or(f64::NAN),
                q25: quantile(&present, 0.25),
                median: quantile(&present, 0.50),
                q75: quantile(&present, 0.75),
                max: present.last().copied().unwrap_or(f64::NAN),
            })
        }
        ColumnData::Text(values) => {
            let mut counts: HashMap<&str, usize> = HashMap::new();
            let mut order: Vec<&str> = Vec::new();
            for v in values.iter().flatten() {
                let n = counts.entry(v.as_str()).or_insert(0);
                if *n == 0 {
                    order.push(v.as_str());
                }
                *n += 1;
            }
            let mut top: Option<(&str, usize)> = None;
            for &v in &order {
                let n = counts[v];
                if top.map_or(true, |(_, best)| n > best) {
                    top = Some((v, n));
                }
            }
            let count = values.iter().flatten().count();
            ColumnSummary::Text(TextSummary {
                count,
                missing: values.len() - count,
                unique: order.len(),
                top: top.map(|(v, _)| v.to_string()),
                freq: top.map(|(_, n)| n).unwrap_or(0),
            })
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Linear-interpolation quantile over sorted values.
pub(crate) fn quantile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let idx = p * (sorted.len() - 1) as f64;
    let lo = idx.floor() as usize;
    let hi = idx.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = idx - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}

// ---------------------------------------------------------------------------
// correlate
// ---------------------------------------------------------------------------

/// Square Pearson matrix keyed by numeric column names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.values[i][j])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Correlation {
    NoNumericColumns,
    Matrix(CorrelationMatrix),
}

/// Pearson correlation over the numeric columns, using the rows where both
/// columns of a pair are present.
pub fn correlate(table: &Table) -> Correlation {
    let numeric: Vec<(&str, &[Option<f64>])> = table
        .columns()
        .iter()
        .filter_map(|c| c.as_numeric().map(|v| (c.name(), v)))
        .collect();
    if numeric.is_empty() {
        return Correlation::NoNumericColumns;
    }

    let n = numeric.len();
    let mut values = vec![vec![f64::NAN; n]; n];
    for i in 0..n {
        for j in i..n {
            let r = pearson(numeric[i].1, numeric[j].1);
            let r = if i == j && r.is_finite() { 1.0 } else { r };
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    Correlation::Matrix(CorrelationMatrix {
        columns: numeric.iter().map(|(name, _)| name.to_string()).collect(),
        values,
    })
}

fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> f64 {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }
    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx).powi(2);
        syy += (y - my).powi(2);
    }
    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(vec![
            Column::numeric("a", vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]),
            Column::numeric("b", vec![Some(2.0), Some(4.1), Some(5.9), Some(8.3)]),
            Column::numeric("c", vec![Some(9.0), Some(1.0), Some(4.0), Some(0.5)]),
            Column::text(
                "d",
                vec![Some("x".into()), Some("y".into()), Some("x".into()), Some("y".into())],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn count_matches_row_count_for_every_column() {
        let table = sample();
        let Description::Stats(stats) = describe(&table) else {
            panic!("expected stats");
        };
        for (_, summary) in &stats.columns {
            assert_eq!(summary.count(), table.row_count());
        }
    }

    #[test]
    fn numeric_summary_values() {
        let Description::Stats(stats) = describe(&sample()) else {
            panic!("expected stats");
        };
        let Some(ColumnSummary::Numeric(a)) = stats.get("a") else {
            panic!("a should be numeric");
        };
        assert_eq!(a.mean, 2.5);
        assert!((a.std - 1.290_994_448_7).abs() < 1e-9);
        assert_eq!((a.min, a.q25, a.median, a.q75, a.max), (1.0, 1.75, 2.5, 3.25, 4.0));
    }

    #[test]
    fn text_summary_prefers_first_seen_on_ties() {
        let Description::Stats(stats) = describe(&sample()) else {
            panic!("expected stats");
        };
        let Some(ColumnSummary::Text(d)) = stats.get("d") else {
            panic!("d should be text");
        };
        assert_eq!((d.unique, d.top.as_deref(), d.freq), (2, Some("x"), 2));
    }

    #[test]
    fn empty_table_has_no_data() {
        assert_eq!(describe(&Table::empty()), Description::NoData);
        let zero_rows = Table::new(vec![Column::numeric("a", vec![])]).unwrap();
        assert_eq!(describe(&zero_rows), Description::NoData);
    }

    #[test]
    fn correlation_is_symmetric_with_unit_diagonal() {
        let Correlation::Matrix(m) = correlate(&sample()) else {
            panic!("expected a matrix");
        };
        assert_eq!(m.columns, vec!["a", "b", "c"]);
        for c1 in &m.columns {
            assert!((m.get(c1, c1).unwrap() - 1.0).abs() < 1e-12);
            for c2 in &m.columns {
                assert_eq!(m.get(c1, c2), m.get(c2, c1));
            }
        }
        assert!(m.get("a", "b").unwrap() > 0.99);
    }

    #[test]
    fn text_only_tables_signal_no_numeric_columns() {
        let table = Table::new(vec![Column::text("d", vec![Some("x".into())])]).unwrap();
        assert_eq!(correlate(&table), Correlation::NoNumericColumns);
    }
}
