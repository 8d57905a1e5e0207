use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, AsArray};
use arrow::datatypes::{
    DataType, Date32Type, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type,
    TimeUnit, TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType, UInt16Type, UInt32Type, UInt8Type,
};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Column, Table, Value};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – comma-separated, first row is the header
/// * `.parquet` – flat schema of strings, numbers, booleans, dates, timestamps
/// * `.json`    – `[{ "col": value, ... }, ...]`
pub fn load_file(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => load_csv(path),
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

/// File name used as the table's key in a session.
pub fn table_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path).context("opening CSV")?;
    read_csv(file)
}

/// Parse CSV text: header row with column names, one record per line.
/// Each cell is typed on its own (see [`guess_value_type`]).
pub fn read_csv<R: Read>(input: R) -> Result<Table> {
    let mut reader = csv::Reader::from_reader(input);
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        for (col_idx, cells) in columns.iter_mut().enumerate() {
            cells.push(guess_value_type(record.get(col_idx).unwrap_or("")));
        }
    }

    let columns = headers
        .into_iter()
        .zip(columns)
        .map(|(name, mut values)| {
            widen_numeric(&mut values);
            Column::new(name, values)
        })
        .collect();
    Table::new(columns).context("building table from CSV")
}

/// Empty and the usual NA spellings are missing; then integer, float,
/// boolean, and text as the fallback.
pub fn guess_value_type(s: &str) -> Value {
    let s = s.trim();
    if matches!(s, "" | "NA" | "N/A" | "NaN" | "nan" | "null" | "NULL" | "None") {
        return Value::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return Value::Float(f);
    }
    match s {
        "true" | "True" | "TRUE" => Value::Bool(true),
        "false" | "False" | "FALSE" => Value::Bool(false),
        _ => Value::String(s.to_string()),
    }
}

/// A column holding both integer and float cells becomes all floats, so
/// `2` and `2.0` are the same key.
pub fn widen_numeric(values: &mut [Value]) {
    let has_float = values.iter().any(|v| matches!(v, Value::Float(_)));
    let has_integer = values.iter().any(|v| matches!(v, Value::Integer(_)));
    if !(has_float && has_integer) {
        return;
    }
    for v in values.iter_mut() {
        if let Value::Integer(i) = *v {
            *v = Value::Float(i as f64);
        }
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON (`df.to_json(orient='records')`). Keys missing from
/// a record become missing cells.
fn load_json(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    read_json(&text)
}

pub fn read_json(text: &str) -> Result<Table> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;
    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut names: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !names.contains(key) {
                names.push(key.clone());
            }
        }
    }

    let columns = names
        .into_iter()
        .map(|name| {
            let mut values: Vec<Value> = records
                .iter()
                .map(|rec| rec.get(&name).map_or(Value::Null, json_to_value))
                .collect();
            widen_numeric(&mut values);
            Column::new(name, values)
        })
        .collect();
    Table::new(columns).context("building table from JSON")
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Null => Value::Null,
        other => Value::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a flat Parquet file, one table column per field. Works with files
/// written by both **Pandas** (`df.to_parquet()`) and **Polars**.
fn load_parquet(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); names.len()];
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for (col_idx, cells) in columns.iter_mut().enumerate() {
            let array = batch.column(col_idx);
            for row in 0..batch.num_rows() {
                cells.push(extract_value(array, row)?);
            }
        }
    }

    let columns = names
        .into_iter()
        .zip(columns)
        .map(|(name, values)| Column::new(name, values))
        .collect();
    Table::new(columns).context("building table from parquet")
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_value(col: &Arc<dyn Array>, row: usize) -> Result<Value> {
    if col.is_null(row) {
        return Ok(Value::Null);
    }
    let value = match col.data_type() {
        DataType::Utf8 => Value::String(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Value::String(col.as_string::<i64>().value(row).to_string()),
        DataType::Int8 => Value::Integer(col.as_primitive::<Int8Type>().value(row).into()),
        DataType::Int16 => Value::Integer(col.as_primitive::<Int16Type>().value(row).into()),
        DataType::Int32 => Value::Integer(col.as_primitive::<Int32Type>().value(row).into()),
        DataType::Int64 => Value::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::UInt8 => Value::Integer(col.as_primitive::<UInt8Type>().value(row).into()),
        DataType::UInt16 => Value::Integer(col.as_primitive::<UInt16Type>().value(row).into()),
        DataType::UInt32 => Value::Integer(col.as_primitive::<UInt32Type>().value(row).into()),
        DataType::Float32 => Value::Float(col.as_primitive::<Float32Type>().value(row).into()),
        DataType::Float64 => Value::Float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => Value::Bool(col.as_boolean().value(row)),
        DataType::Date32 => col
            .as_primitive::<Date32Type>()
            .value_as_datetime(row)
            .map_or(Value::Null, Value::DateTime),
        DataType::Timestamp(unit, _) => {
            let dt = match unit {
                TimeUnit::Second => col
                    .as_primitive::<TimestampSecondType>()
                    .value_as_datetime(row),
                TimeUnit::Millisecond => col
                    .as_primitive::<TimestampMillisecondType>()
                    .value_as_datetime(row),
                TimeUnit::Microsecond => col
                    .as_primitive::<TimestampMicrosecondType>()
                    .value_as_datetime(row),
                TimeUnit::Nanosecond => col
                    .as_primitive::<TimestampNanosecondType>()
                    .value_as_datetime(row),
            };
            dt.map_or(Value::Null, Value::DateTime)
        }
        other => bail!("Unsupported parquet column type {other:?}"),
    };
    Ok(value)
}
