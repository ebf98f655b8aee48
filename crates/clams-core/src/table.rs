use std::fs::File;
use std::path::Path;

use clams_parser::{frame_from_records, TIMESTAMP_OUTPUT_FORMAT};
use csv::{ReaderBuilder, StringRecord};
use polars::prelude::*;

use crate::error::{PipelineError, Result};

/// Reads a stage table (plain CSV with a header row) with the same column
/// typing the raw-export parser applies.
pub fn read_table(path: &Path) -> Result<DataFrame> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|name| name.trim().to_string())
        .collect();

    let mut rows: Vec<StringRecord> = Vec::new();
    for record in reader.records() {
        rows.push(record?);
    }

    Ok(frame_from_records(&headers, &rows)?)
}

pub fn write_table(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_datetime_format(Some(TIMESTAMP_OUTPUT_FORMAT.to_string()))
        .finish(df)?;
    Ok(())
}

pub fn require_columns(df: &DataFrame, required: &[&str]) -> Result<()> {
    let missing: Vec<String> = required
        .iter()
        .filter(|name| df.column(name).is_err())
        .map(|name| name.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::MissingColumns { columns: missing })
    }
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

pub fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}

pub fn i64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>> {
    let column = df.column(name)?.cast(&DataType::Int64)?;
    Ok(column.i64()?.into_iter().collect())
}

pub fn str_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    Ok(column
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect())
}

/// Microseconds since the epoch for a datetime column.
pub fn timestamp_values(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>> {
    let column = df.column(name)?;
    if !matches!(column.dtype(), DataType::Datetime(_, _)) {
        return Err(PipelineError::Validation(format!(
            "column '{name}' is {} rather than a timestamp",
            column.dtype()
        )));
    }
    let micros = column
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?
        .cast(&DataType::Int64)?;
    Ok(micros.i64()?.into_iter().collect())
}

pub fn is_integer_column(df: &DataFrame, name: &str) -> bool {
    df.column(name)
        .map(|column| column.dtype().is_integer())
        .unwrap_or(false)
}

pub fn datetime_series(name: &str, micros: Vec<Option<i64>>) -> Result<Series> {
    Ok(Series::new(name.into(), micros)
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?)
}

pub fn take_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let idx = IdxCa::from_vec(
        "row_idx".into(),
        indices.iter().map(|&i| i as IdxSize).collect(),
    );
    Ok(df.take(&idx)?)
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
