use std::fmt;
use std::io::Cursor;
use std::path::Path;

use anyhow::{bail, Context};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{DataType, Float64Type};
use arrow::util::display::{ArrayFormatter, FormatOptions};
use calamine::{open_workbook_auto_from_rs, Data, DataType as _, Reader, Sheets};
use chrono::NaiveTime;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, Column, Table};
use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// Formats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// xlsx / xlsm / xls / xlsb / ods, handled by calamine.
    Workbook,
    Parquet,
    Json,
    Csv,
}

impl SourceFormat {
    /// Guess the format from the leading bytes.
    pub fn sniff(raw: &[u8]) -> Self {
        const ZIP: &[u8] = b"PK\x03\x04";
        const OLE: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];
        if raw.starts_with(ZIP) || raw.starts_with(OLE) {
            SourceFormat::Workbook
        } else if raw.starts_with(b"PAR1") {
            SourceFormat::Parquet
        } else if is_json_records(raw) {
            SourceFormat::Json
        } else {
            SourceFormat::Csv
        }
    }

    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Some(SourceFormat::Workbook),
            "parquet" | "pq" => Some(SourceFormat::Parquet),
            "json" => Some(SourceFormat::Json),
            "csv" | "txt" => Some(SourceFormat::Csv),
            _ => None,
        }
    }
}

/// `[` followed by `{` or `]`, so a CSV header such as `[unit],value` is not
/// mistaken for JSON.
fn is_json_records(raw: &[u8]) -> bool {
    raw.trim_ascii_start()
        .strip_prefix(b"[")
        .and_then(|rest| rest.trim_ascii_start().first())
        .is_some_and(|b| matches!(b, b'{' | b']'))
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceFormat::Workbook => "workbook",
            SourceFormat::Parquet => "parquet",
            SourceFormat::Json => "json",
            SourceFormat::Csv => "csv",
        };
        write!(f, "{name}")
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Parse an uploaded spreadsheet. Only the first sheet is read and row 1
/// holds the column headers.
pub fn load(raw: &[u8]) -> Result<Table> {
    load_as(raw, SourceFormat::sniff(raw))
}

/// Parse bytes in a known format.
pub fn load_as(raw: &[u8], format: SourceFormat) -> Result<Table> {
    let table = match format {
        SourceFormat::Workbook => load_workbook(raw),
        SourceFormat::Parquet => load_parquet(raw),
        SourceFormat::Json => load_json(raw),
        SourceFormat::Csv => load_csv(raw),
    }
    .map_err(AnalysisError::parse)?;

    log::info!(
        "Loaded {format} table: {} rows, {} columns",
        table.row_count(),
        table.column_count()
    );
    Ok(table)
}

/// Like [`load`], but hands back the empty table alongside the error so the
/// caller can keep going with an inert state.
pub fn load_or_empty(raw: &[u8]) -> (Table, Option<AnalysisError>) {
    match load(raw) {
        Ok(table) => (table, None),
        Err(e) => {
            log::error!("{e}");
            (Table::empty(), Some(e))
        }
    }
}

/// Load a table from disk. Dispatch by extension, sniffing unknown ones.
pub fn load_file(path: &Path) -> Result<Table> {
    let raw = std::fs::read(path)
        .with_context(|| format!("reading {}", path.display()))
        .map_err(AnalysisError::parse)?;
    let format = SourceFormat::from_extension(path).unwrap_or_else(|| SourceFormat::sniff(&raw));
    load_as(&raw, format)
}

// ---------------------------------------------------------------------------
// Workbook loader (calamine)
// ---------------------------------------------------------------------------

fn load_workbook(raw: &[u8]) -> anyhow::Result<Table> {
    let mut workbook: Sheets<_> =
        open_workbook_auto_from_rs(Cursor::new(raw.to_vec())).context("opening workbook")?;

    let sheet_names = workbook.sheet_names().to_vec();
    let first = sheet_names
        .first()
        .context("workbook contains no sheets")?;
    let range = workbook
        .worksheet_range(first)
        .with_context(|| format!("reading sheet '{first}'"))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Table::empty());
    };
    let headers = header_row
        .iter()
        .map(|cell| cell_from_data(cell).to_text())
        .collect();
    let body = rows
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect();

    Ok(Table::from_rows(headers, body)?)
}

fn cell_from_data(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Null,
        Data::String(s) => CellValue::String(s.clone()),
        Data::Float(n) => CellValue::Float(*n),
        Data::Int(n) => CellValue::Integer(*n),
        Data::Bool(b) => CellValue::Bool(*b),
        // Dates become ISO strings so they are not read back as serial numbers.
        Data::DateTime(_) => match cell.as_datetime() {
            Some(dt) if dt.time() == NaiveTime::MIN => {
                CellValue::String(dt.date().format("%Y-%m-%d").to_string())
            }
            Some(dt) => CellValue::String(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => CellValue::String(cell.to_string()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::String(s.clone()),
        // Error cells such as `#N/A` read as missing.
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(raw: &[u8]) -> anyhow::Result<Table> {
    if std::str::from_utf8(raw).is_err() {
        bail!("input is not a workbook, a Parquet file, or UTF-8 text");
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(raw);
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {}", row_no + 1))?;
        rows.push(
            record
                .iter()
                .map(|v| CellValue::String(v.to_string()))
                .collect(),
        );
    }

    Ok(Table::from_rows(headers, rows)?)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, as written by `df.to_json(orient='records')`:
///
/// ```json
/// [{ "age": 20, "city": "Oslo" }, { "age": 31, "city": "Lima" }]
/// ```
fn load_json(raw: &[u8]) -> anyhow::Result<Table> {
    let root: JsonValue = serde_json::from_slice(raw).context("parsing JSON")?;
    let records = root.as_array().context("expected top-level JSON array")?;

    let mut headers: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(JsonValue::as_object)
        .map(|obj| {
            headers
                .iter()
                .map(|h| obj.get(h).map(json_to_cell).unwrap_or(CellValue::Null))
                .collect()
        })
        .collect();

    Ok(Table::from_rows(headers, rows)?)
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Flat Parquet files as written by `df.to_parquet()` or Polars. Numeric
/// arrow types are widened to f64; everything else is formatted as text.
fn load_parquet(raw: &[u8]) -> anyhow::Result<Table> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(bytes::Bytes::from(raw.to_vec()))
        .context("reading parquet metadata")?;
    let names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut cells: Vec<Vec<CellValue>> = vec![Vec::new(); names.len()];
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for (idx, column) in batch.columns().iter().enumerate() {
            let values = arrow_cells(column)
                .with_context(|| format!("reading column '{}'", names[idx]))?;
            cells[idx].extend(values);
        }
    }

    let columns = names
        .iter()
        .zip(&cells)
        .map(|(name, values)| Column::infer(name.clone(), values))
        .collect();
    Ok(Table::new(columns)?)
}

fn arrow_cells(col: &ArrayRef) -> anyhow::Result<Vec<CellValue>> {
    if col.data_type().is_numeric() {
        let widened = arrow::compute::cast(col, &DataType::Float64).context("casting to f64")?;
        let values = widened
            .as_primitive_opt::<Float64Type>()
            .context("expected a Float64 array")?;
        return Ok(values
            .iter()
            .map(|v| v.map(CellValue::Float).unwrap_or(CellValue::Null))
            .collect());
    }

    if let Some(flags) = col.as_boolean_opt() {
        return Ok(flags
            .iter()
            .map(|v| v.map(CellValue::Bool).unwrap_or(CellValue::Null))
            .collect());
    }

    let formatter = ArrayFormatter::try_new(col.as_ref(), &FormatOptions::default())
        .context("formatting column")?;
    Ok((0..col.len())
        .map(|row| {
            if col.is_null(row) {
                CellValue::Null
            } else {
                CellValue::String(formatter.value(row).to_string())
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;
    use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

    use super::*;
    use crate::data::model::ColumnKind;

    fn xlsx_fixture() -> Vec<u8> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "age").unwrap();
        sheet.write_string(0, 1, "city").unwrap();
        for (row, (age, city)) in [(20.0, "Oslo"), (30.0, "Lima"), (40.0, "Oslo")]
            .into_iter()
            .enumerate()
        {
            sheet.write_number(row as u32 + 1, 0, age).unwrap();
            sheet.write_string(row as u32 + 1, 1, city).unwrap();
        }
        let second = workbook.add_worksheet();
        second.write_string(0, 0, "ignored").unwrap();
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn reads_first_sheet_of_xlsx() {
        let table = load(&xlsx_fixture()).unwrap();
        assert_eq!(table.column_names(), vec!["age", "city"]);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column("age").unwrap().kind(), ColumnKind::Numeric);
        assert_eq!(table.column("city").unwrap().kind(), ColumnKind::Text);
    }

    #[test]
    fn workbook_dates_load_as_iso_text() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        sheet.write_string(0, 0, "joined").unwrap();
        for (row, day) in [1u8, 2, 3].into_iter().enumerate() {
            let date = ExcelDateTime::from_ymd(2024, 1, day).unwrap();
            sheet
                .write_datetime_with_format(row as u32 + 1, 0, &date, &date_format)
                .unwrap();
        }
        let table = load(&workbook.save_to_buffer().unwrap()).unwrap();

        let joined = table.column("joined").unwrap();
        assert_eq!(joined.kind(), ColumnKind::Text);
        assert_eq!(joined.display(0).as_deref(), Some("2024-01-01"));
        assert_eq!(joined.display(2).as_deref(), Some("2024-01-03"));
    }

    #[test]
    fn bracketed_csv_header_is_not_json() {
        assert_eq!(SourceFormat::sniff(b"[unit],value\nkg,1\n"), SourceFormat::Csv);
        assert_eq!(SourceFormat::sniff(b" [ {\"a\": 1}]"), SourceFormat::Json);
        assert_eq!(SourceFormat::sniff(b"[]"), SourceFormat::Json);

        let table = load(b"[unit],value\nkg,1\n").unwrap();
        assert_eq!(table.column_names(), vec!["[unit]", "value"]);
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn malformed_workbook_is_a_parse_error() {
        let err = load(b"PK\x03\x04definitely not a zip archive").unwrap_err();
        assert!(matches!(err, AnalysisError::Parse(_)), "{err:?}");
    }

    #[test]
    fn failure_yields_the_empty_table() {
        let (table, err) = load_or_empty(&[0xD0, 0xCF, 0x11, 0xE0, 0x00, 0x01]);
        assert_eq!(table, Table::empty());
        assert!(matches!(err, Some(AnalysisError::Parse(_))));
    }

    #[test]
    fn binary_garbage_is_rejected() {
        let err = load(&[0xff, 0xfe, 0x00, 0x9f, 0x92]).unwrap_err();
        assert!(matches!(err, AnalysisError::Parse(_)));
    }

    #[test]
    fn csv_cells_are_typed_by_inference() {
        let table = load(b"x,label\n1,a\n2.5,b\n,c\n").unwrap();
        let x = table.column("x").unwrap();
        assert_eq!(x.as_numeric().unwrap(), &[Some(1.0), Some(2.5), None]);
        assert_eq!(table.column("label").unwrap().kind(), ColumnKind::Text);
    }

    #[test]
    fn json_records_union_their_keys() {
        let table = load(br#"[{"a": 1, "b": "x"}, {"a": 2.5}]"#).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column("b").unwrap().display(1), None);
        assert_eq!(table.column("a").unwrap().kind(), ColumnKind::Numeric);
    }

    #[test]
    fn reads_flat_parquet() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("score", DataType::Float64, true),
            Field::new("name", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(vec![1, 2])),
                Arc::new(Float64Array::from(vec![Some(0.5), None])),
                Arc::new(StringArray::from(vec![Some("a"), Some("b")])),
            ],
        )
        .unwrap();
        let mut buf = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buf, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let table = load(&buf).unwrap();
        assert_eq!(table.column("id").unwrap().as_numeric().unwrap(), &[Some(1.0), Some(2.0)]);
        assert_eq!(table.column("score").unwrap().as_numeric().unwrap(), &[Some(0.5), None]);
        assert_eq!(table.column("name").unwrap().kind(), ColumnKind::Text);
    }

    #[test]
    fn load_file_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "a\n1\n2\n").unwrap();
        let table = load_file(&path).unwrap();
        assert_eq!(table.row_count(), 2);
    }
}
