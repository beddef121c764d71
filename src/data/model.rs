use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::Serialize;

use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// CellValue – a single parsed cell, before column kinds are inferred
// ---------------------------------------------------------------------------

/// A dynamically-typed cell as produced by the format readers.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

/// Tokens read as missing values, matching the usual dataframe defaults.
const MISSING_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

impl CellValue {
    /// Whether the cell counts as missing for inference and statistics.
    pub fn is_missing(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Float(v) => v.is_nan(),
            CellValue::String(s) => MISSING_TOKENS.contains(&s.trim()),
            _ => false,
        }
    }

    /// Interpret the cell as a finite number, if it is one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) if v.is_finite() => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    /// Text rendering used when the cell lands in a text column.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::String(s) => s.clone(),
            CellValue::Integer(i) => i.to_string(),
            CellValue::Float(v) if v.fract() == 0.0 && v.abs() < 1e15 => {
                format!("{}", *v as i64)
            }
            CellValue::Float(v) => v.to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Null => String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Column
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Text,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Numeric => write!(f, "numeric"),
            ColumnKind::Text => write!(f, "text"),
        }
    }
}

/// Column storage; `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        let values = values
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect();
        Column {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    pub fn text(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Column {
            name: name.into(),
            data: ColumnData::Text(values),
        }
    }

    /// Infer the kind from raw cells: numeric iff every non-missing cell is a number.
    pub fn infer(name: impl Into<String>, cells: &[CellValue]) -> Self {
        let numeric = cells
            .iter()
            .filter(|c| !c.is_missing())
            .all(|c| c.as_f64().is_some());

        if numeric {
            let values = cells
                .iter()
                .map(|c| if c.is_missing() { None } else { c.as_f64() })
                .collect();
            Column::numeric(name, values)
        } else {
            let values = cells
                .iter()
                .map(|c| (!c.is_missing()).then(|| c.to_text()))
                .collect();
            Column::text(name, values)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn kind(&self) -> ColumnKind {
        match self.data {
            ColumnData::Numeric(_) => ColumnKind::Numeric,
            ColumnData::Text(_) => ColumnKind::Text,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.kind() == ColumnKind::Numeric
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Numeric cells, or `None` for a text column.
    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match &self.data {
            ColumnData::Numeric(v) => Some(v),
            ColumnData::Text(_) => None,
        }
    }

    /// Display string for one cell, or `None` when the cell is missing.
    pub fn display(&self, row: usize) -> Option<String> {
        match &self.data {
            ColumnData::Numeric(v) => v.get(row).copied().flatten().map(|x| x.to_string()),
            ColumnData::Text(v) => v.get(row).cloned().flatten(),
        }
    }
}

// ---------------------------------------------------------------------------
// Table – immutable, column-typed, row-aligned dataset
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Build a table, checking equal column lengths and unique names.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let row_count = columns.first().map(Column::len).unwrap_or(0);
        let mut seen = HashSet::new();
        for col in &columns {
            if col.len() != row_count {
                return Err(AnalysisError::validation(format!(
                    "Column '{}' has {} rows, expected {row_count}",
                    col.name(),
                    col.len()
                )));
            }
            if !seen.insert(col.name()) {
                return Err(AnalysisError::validation(format!(
                    "Duplicate column name '{}'",
                    col.name()
                )));
            }
        }
        Ok(Table { columns, row_count })
    }

    /// The canonical empty table returned when loading fails.
    pub fn empty() -> Self {
        Table::default()
    }

    /// Build a table from a header row and raw rows. Ragged rows are padded
    /// with missing cells; header names are made unique.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self> {
        let width = rows
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
            .max(headers.len());
        let names = unique_headers(headers, width);

        let columns = names
            .into_iter()
            .enumerate()
            .map(|(idx, name)| {
                let cells: Vec<CellValue> = rows
                    .iter()
                    .map(|row| row.get(idx).cloned().unwrap_or(CellValue::Null))
                    .collect();
                Column::infer(name, &cells)
            })
            .collect();
        Table::new(columns)
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// No rows or no columns.
    pub fn is_empty(&self) -> bool {
        self.row_count == 0 || self.columns.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name().to_string()).collect()
    }

    /// Look a column up, failing with a validation error naming it.
    pub fn require(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| AnalysisError::validation(format!("Unknown column '{name}'")))
    }

    /// A new table with only the named columns, in the order given.
    pub fn project(&self, names: &[String]) -> Result<Table> {
        let columns = names
            .iter()
            .map(|n| self.require(n).cloned())
            .collect::<Result<Vec<_>>>()?;
        let mut table = Table::new(columns)?;
        if table.columns.is_empty() {
            table.row_count = self.row_count;
        }
        Ok(table)
    }
}

/// Blank headers become `Unnamed: <idx>`, repeats get `.1`, `.2`, ... suffixes.
fn unique_headers(headers: Vec<String>, width: usize) -> Vec<String> {
    let mut taken: BTreeSet<String> = BTreeSet::new();
    let mut names = Vec::with_capacity(width);
    for idx in 0..width {
        let raw = headers
            .get(idx)
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| format!("Unnamed: {idx}"));
        let mut name = raw.clone();
        let mut suffix = 1;
        while taken.contains(&name) {
            name = format!("{raw}.{suffix}");
            suffix += 1;
        }
        taken.insert(name.clone());
        names.push(name);
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> CellValue {
        CellValue::String(v.to_string())
    }

    #[test]
    fn numeric_inference_ignores_missing_cells() {
        let col = Column::infer("a", &[s("1"), CellValue::Null, s(" 2.5 "), s("NA")]);
        assert_eq!(col.kind(), ColumnKind::Numeric);
        assert_eq!(col.as_numeric().unwrap(), &[Some(1.0), None, Some(2.5), None]);
    }

    #[test]
    fn one_word_makes_a_column_text() {
        let col = Column::infer("a", &[CellValue::Integer(1), s("two"), CellValue::Float(3.0)]);
        assert_eq!(col.kind(), ColumnKind::Text);
        assert_eq!(col.display(0).as_deref(), Some("1"));
        assert_eq!(col.display(2).as_deref(), Some("3"));
    }

    #[test]
    fn headers_are_made_unique() {
        let table = Table::from_rows(
            vec!["a".into(), "a".into(), "".into()],
            vec![vec![CellValue::Integer(1), CellValue::Integer(2), CellValue::Integer(3)]],
        )
        .unwrap();
        assert_eq!(table.column_names(), vec!["a", "a.1", "Unnamed: 2"]);
    }

    #[test]
    fn ragged_rows_are_padded() {
        let table = Table::from_rows(
            vec!["a".into(), "b".into()],
            vec![vec![CellValue::Integer(1)], vec![CellValue::Integer(2), s("x")]],
        )
        .unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column("b").unwrap().display(0), None);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let err = Table::new(vec![
            Column::numeric("a", vec![Some(1.0)]),
            Column::numeric("b", vec![Some(1.0), Some(2.0)]),
        ])
        .unwrap_err();
        assert!(matches!(err, AnalysisError::Validation(_)));
    }

    #[test]
    fn projection_is_a_new_table() {
        let table = Table::new(vec![
            Column::numeric("a", vec![Some(1.0)]),
            Column::text("b", vec![Some("x".into())]),
        ])
        .unwrap();
        let projected = table.project(&["b".to_string()]).unwrap();
        assert_eq!(projected.column_names(), vec!["b"]);
        assert_eq!(table.column_count(), 2);
        assert!(table.project(&["zzz".to_string()]).is_err());
    }
}
