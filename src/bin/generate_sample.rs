//! Writes `sample_data.parquet` and `sample_data.csv`: a small employee
//! survey with numeric, text and missing cells for trying out the workbench.

use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Float64Builder, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rusty_tabula::config::DEFAULT_SEED;

const ROWS: usize = 200;
const CITIES: [(&str, f64); 4] = [
    ("Madrid", 1.00),
    ("Barcelona", 1.05),
    ("Seville", 0.85),
    ("Valencia", 0.90),
];

/// Box-Muller transform.
fn gauss(rng: &mut ChaCha8Rng, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.random::<f64>().max(1e-15);
    let u2: f64 = rng.random();
    mean + std_dev * (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

struct Row {
    id: i64,
    age: f64,
    years_employed: f64,
    city: &'static str,
    income: f64,
    satisfaction: Option<f64>,
}

fn generate(rng: &mut ChaCha8Rng) -> Vec<Row> {
    (0..ROWS)
        .map(|i| {
            let age = rng.random_range(21..66) as f64;
            let years_employed = (age - 21.0) * rng.random_range(0.3..0.9);
            let (city, cost) = CITIES[rng.random_range(0..CITIES.len())];
            let income = cost * (18_000.0 + 900.0 * age + 1_200.0 * years_employed)
                + gauss(rng, 0.0, 2_500.0);
            // Roughly one answer in ten is left blank.
            let satisfaction = (rng.random::<f64>() >= 0.1)
                .then(|| (gauss(rng, 6.5, 1.5) + income / 40_000.0).clamp(1.0, 10.0));
            Row {
                id: i as i64 + 1,
                age,
                years_employed: years_employed.round(),
                city,
                income: income.round(),
                satisfaction,
            }
        })
        .collect()
}

fn write_parquet(rows: &[Row], path: &str) -> Result<()> {
    let mut satisfaction = Float64Builder::with_capacity(rows.len());
    for r in rows {
        satisfaction.append_option(r.satisfaction);
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("age", DataType::Float64, false),
        Field::new("years_employed", DataType::Float64, false),
        Field::new("city", DataType::Utf8, false),
        Field::new("income", DataType::Float64, false),
        Field::new("satisfaction", DataType::Float64, true),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.id))),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.age))),
        Arc::new(Float64Array::from_iter_values(
            rows.iter().map(|r| r.years_employed),
        )),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.city))),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.income))),
        Arc::new(satisfaction.finish()),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn write_csv(rows: &[Row], path: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    writer.write_record(["id", "age", "years_employed", "city", "income", "satisfaction"])?;
    for r in rows {
        writer.write_record([
            r.id.to_string(),
            r.age.to_string(),
            r.years_employed.to_string(),
            r.city.to_string(),
            r.income.to_string(),
            r.satisfaction.map(|s| format!("{s:.1}")).unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(DEFAULT_SEED);
    let rows = generate(&mut rng);

    write_parquet(&rows, "sample_data.parquet")?;
    write_csv(&rows, "sample_data.csv")?;

    println!("Wrote {} rows to sample_data.parquet and sample_data.csv", rows.len());
    Ok(())
}
