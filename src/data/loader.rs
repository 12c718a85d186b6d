use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, AsArray};
use arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type, UInt16Type,
    UInt32Type, UInt64Type, UInt8Type,
};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::model::{Cell, ColumnLayout, Dataset};
use crate::estimator::CoefficientTable;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a listings dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one listing per line (the prepared dataset)
/// * `.json`    – `[{ "price": 1200, "state_CA": 1, ... }, ...]`
/// * `.parquet` – flat numeric / boolean / string columns
pub fn load_file(path: &Path, layout: &ColumnLayout) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let (headers, rows) = match ext.as_str() {
        "csv" => read_csv(path)?,
        "json" => read_json(path)?,
        "parquet" | "pq" => read_parquet(path)?,
        other => bail!("Unsupported file extension: .{other}"),
    };

    let dataset = Dataset::from_table(&headers, rows, layout)
        .with_context(|| format!("building dataset from '{}'", path.display()))?;

    log::info!(
        "Loaded {} listings from '{}' ({} indicator columns, {} amenities)",
        dataset.len(),
        path.display(),
        dataset.schema.indicator_columns.len(),
        dataset.schema.amenities.len()
    );
    for (group, malformed) in dataset.integrity_report() {
        log::warn!(
            "{malformed} listings do not have exactly one active '{}' column",
            group.prefix()
        );
    }

    Ok(dataset)
}

/// One line of the fitted-model coefficient file.
#[derive(Debug, Deserialize)]
struct CoefficientRecord {
    #[serde(rename = "Variables", alias = "variable")]
    variable: String,
    #[serde(rename = "Coeficientes", alias = "coefficient")]
    coefficient: f64,
}

/// Load the fitted-model coefficients (`Variables,Coeficientes` CSV).
pub fn load_coefficients(path: &Path) -> Result<CoefficientTable> {
    let mut reader = csv::Reader::from_path(path).context("opening coefficient CSV")?;
    let mut entries = Vec::new();
    for (row_no, result) in reader.deserialize::<CoefficientRecord>().enumerate() {
        let record = result.with_context(|| format!("coefficient CSV row {row_no}"))?;
        entries.push((record.variable, record.coefficient));
    }
    let table = CoefficientTable::from_entries(entries);
    log::info!(
        "Loaded {} coefficients ({} cities) from '{}'",
        table.len(),
        table.city_coefficients().len(),
        path.display()
    );
    Ok(table)
}

type RawTable = (Vec<String>, Vec<Vec<Cell>>);

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

fn read_csv(path: &Path) -> Result<RawTable> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        rows.push(record.iter().map(guess_cell_type).collect());
    }

    Ok((headers, rows))
}

fn guess_cell_type(s: &str) -> Cell {
    let s = s.trim();
    if s.is_empty() {
        return Cell::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Cell::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return Cell::Float(f);
    }
    match s {
        "true" | "True" => Cell::Bool(true),
        "false" | "False" => Cell::Bool(false),
        _ => Cell::Text(s.to_string()),
    }
}

// ---------------------------------------------------------------------------
// JSON reader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the default `df.to_json(orient='records')`.
///
/// Columns keep the key order of the records, first appearance wins.
fn read_json(path: &Path) -> Result<RawTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut headers: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(|rec| rec.as_object())
        .map(|obj| {
            headers
                .iter()
                .map(|h| obj.get(h).map(json_to_cell).unwrap_or(Cell::Null))
                .collect()
        })
        .collect();

    Ok((headers, rows))
}

fn json_to_cell(val: &JsonValue) -> Cell {
    match val {
        JsonValue::String(s) => guess_cell_type(s),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Cell::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Cell::Float(f)
            } else {
                Cell::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => Cell::Bool(*b),
        JsonValue::Null => Cell::Null,
        other => Cell::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet reader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one flat column per dataset column.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn read_parquet(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let columns = batch.columns();
        for row in 0..batch.num_rows() {
            let cells = columns
                .iter()
                .zip(&headers)
                .map(|(col, name)| extract_cell(col, row).with_context(|| format!("column '{name}'")))
                .collect::<Result<Vec<Cell>>>()?;
            rows.push(cells);
        }
    }

    Ok((headers, rows))
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> Result<Cell> {
    if col.is_null(row) {
        return Ok(Cell::Null);
    }
    let cell = match col.data_type() {
        DataType::Utf8 => col
            .as_string_opt::<i32>()
            .map(|s| guess_cell_type(s.value(row))),
        DataType::LargeUtf8 => col
            .as_string_opt::<i64>()
            .map(|s| guess_cell_type(s.value(row))),
        DataType::Int8 => col
            .as_primitive_opt::<Int8Type>()
            .map(|a| Cell::Integer(i64::from(a.value(row)))),
        DataType::Int16 => col
            .as_primitive_opt::<Int16Type>()
            .map(|a| Cell::Integer(i64::from(a.value(row)))),
        DataType::Int32 => col
            .as_primitive_opt::<Int32Type>()
            .map(|a| Cell::Integer(i64::from(a.value(row)))),
        DataType::Int64 => col
            .as_primitive_opt::<Int64Type>()
            .map(|a| Cell::Integer(a.value(row))),
        DataType::UInt8 => col
            .as_primitive_opt::<UInt8Type>()
            .map(|a| Cell::Integer(i64::from(a.value(row)))),
        DataType::UInt16 => col
            .as_primitive_opt::<UInt16Type>()
            .map(|a| Cell::Integer(i64::from(a.value(row)))),
        DataType::UInt32 => col
            .as_primitive_opt::<UInt32Type>()
            .map(|a| Cell::Integer(i64::from(a.value(row)))),
        DataType::UInt64 => col.as_primitive_opt::<UInt64Type>().map(|a| {
            let v = a.value(row);
            i64::try_from(v).map(Cell::Integer).unwrap_or(Cell::Float(v as f64))
        }),
        DataType::Float32 => col
            .as_primitive_opt::<Float32Type>()
            .map(|a| Cell::Float(f64::from(a.value(row)))),
        DataType::Float64 => col
            .as_primitive_opt::<Float64Type>()
            .map(|a| Cell::Float(a.value(row))),
        DataType::Boolean => col.as_boolean_opt().map(|a| Cell::Bool(a.value(row))),
        other => bail!("unsupported parquet column type {other}"),
    };
    cell.with_context(|| format!("column data does not match its type {}", col.data_type()))
}
