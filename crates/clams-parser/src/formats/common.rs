use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord};
use polars::prelude::*;

use crate::model::SubjectId;

use super::schema::{ExportLayout, SUBJECT_ID_MARKER};

pub const TIMESTAMP_OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const TIMESTAMP_FORMATS: &[&str] = &[
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
];

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
}

/// Splits a single CSV line into trimmed fields, honouring quotes.
pub fn split_fields(line: &str) -> Vec<String> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());
    let mut record = StringRecord::new();
    match reader.read_record(&mut record) {
        Ok(true) => record.iter().map(|field| field.trim().to_string()).collect(),
        _ => Vec::new(),
    }
}

/// First `Subject ID` line in the preamble; the id is its second field.
pub fn find_subject_id<'a, I>(lines: I, layout: &ExportLayout) -> Option<SubjectId>
where
    I: IntoIterator<Item = &'a str>,
{
    lines
        .into_iter()
        .take(layout.preamble_lines)
        .find(|line| line.contains(SUBJECT_ID_MARKER))
        .and_then(|line| split_fields(line).get(1).cloned())
        .and_then(|raw| SubjectId::new(&raw).ok())
}

fn is_timestamp_column(name: &str) -> bool {
    name.starts_with("DATE/TIME")
}

fn is_missing(cell: &str) -> bool {
    let trimmed = cell.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan")
}

/// Builds a typed frame from string records. Timestamp columns become
/// microsecond datetimes, columns where every present cell is an integer
/// become Int64, all-numeric columns become Float64 and anything else stays a
/// string. Headers with an empty name are dropped.
pub fn frame_from_records(headers: &[String], rows: &[StringRecord]) -> PolarsResult<DataFrame> {
    let mut columns = Vec::with_capacity(headers.len());

    for (index, name) in headers.iter().enumerate() {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let cells: Vec<Option<&str>> = rows
            .iter()
            .map(|row| row.get(index).filter(|cell| !is_missing(cell)).map(str::trim))
            .collect();
        columns.push(infer_column(name, &cells)?);
    }

    DataFrame::new(columns)
}

fn infer_column(name: &str, cells: &[Option<&str>]) -> PolarsResult<Column> {
    if is_timestamp_column(name) {
        let micros: Vec<Option<i64>> = cells
            .iter()
            .map(|cell| {
                cell.and_then(parse_timestamp)
                    .map(|dt| dt.and_utc().timestamp_micros())
            })
            .collect();
        let series = Series::new(name.into(), micros)
            .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?;
        return Ok(series.into_column());
    }

    let present = || cells.iter().flatten();

    if present().all(|cell| cell.parse::<i64>().is_ok()) && present().next().is_some() {
        let values: Vec<Option<i64>> = cells
            .iter()
            .map(|cell| cell.and_then(|v| v.parse::<i64>().ok()))
            .collect();
        return Ok(Series::new(name.into(), values).into_column());
    }

    if present().all(|cell| cell.parse::<f64>().is_ok()) {
        let values: Vec<Option<f64>> = cells
            .iter()
            .map(|cell| cell.and_then(|v| v.parse::<f64>().ok()))
            .collect();
        return Ok(Series::new(name.into(), values).into_column());
    }

    let values: Vec<Option<String>> = cells
        .iter()
        .map(|cell| cell.map(str::to_string))
        .collect();
    Ok(Series::new(name.into(), values).into_column())
}
