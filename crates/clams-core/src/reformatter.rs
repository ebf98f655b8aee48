use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use polars::prelude::*;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::paths::{self, REFORMATTED_DIR};
use crate::report::StageReport;
use crate::table::{f64_values, i64_values, read_table, require_columns, str_values, write_table};

pub const NO_LABEL: &str = "NO_LABEL";

/// Animal ids sort numerically when they are integers, ahead of any
/// non-numeric ids.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum IdKey {
    Numeric(i64),
    Text(String),
}

impl IdKey {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<i64>() {
            Ok(value) => IdKey::Numeric(value),
            Err(_) => IdKey::Text(trimmed.to_string()),
        }
    }
}

type RowKey = (IdKey, String, i64);

/// Pivots a combined per-variable table into one row per (ID, GROUP_LABEL,
/// DAY) with a `<variable>_<hour>` column for each distinct 24 HOUR value.
pub fn pivot_variable_table(df: &DataFrame, variable: &str) -> Result<DataFrame> {
    require_columns(df, &["ID", "GROUP_LABEL", "DAY", "24 HOUR", variable])?;

    let ids = str_values(df, "ID")?;
    let labels = str_values(df, "GROUP_LABEL")?;
    let days = i64_values(df, "DAY")?;
    let hours = i64_values(df, "24 HOUR")?;
    let values = f64_values(df, variable)?;

    let mut hour_set: BTreeSet<i64> = BTreeSet::new();
    let mut cells: BTreeMap<RowKey, BTreeMap<i64, f64>> = BTreeMap::new();

    for row in 0..df.height() {
        let (Some(id), Some(day)) = (&ids[row], days[row]) else {
            continue;
        };
        let label = match labels[row].as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => NO_LABEL.to_string(),
        };
        let entry = cells.entry((IdKey::parse(id), label, day)).or_default();

        let Some(hour) = hours[row] else {
            continue;
        };
        hour_set.insert(hour);
        if let Some(value) = values[row] {
            entry.entry(hour).or_insert(value);
        }
    }

    let all_numeric = cells
        .keys()
        .all(|(id, _, _)| matches!(id, IdKey::Numeric(_)));
    let id_column = if all_numeric {
        Series::new(
            "ID".into(),
            cells
                .keys()
                .map(|(id, _, _)| match id {
                    IdKey::Numeric(value) => Some(*value),
                    IdKey::Text(_) => None,
                })
                .collect::<Vec<_>>(),
        )
    } else {
        Series::new(
            "ID".into(),
            cells
                .keys()
                .map(|(id, _, _)| match id {
                    IdKey::Numeric(value) => value.to_string(),
                    IdKey::Text(text) => text.clone(),
                })
                .collect::<Vec<_>>(),
        )
    };

    let mut columns = vec![
        id_column.into_column(),
        Series::new(
            "GROUP_LABEL".into(),
            cells
                .keys()
                .map(|(_, label, _)| label.clone())
                .collect::<Vec<_>>(),
        )
        .into_column(),
        Series::new(
            "DAY".into(),
            cells.keys().map(|(_, _, day)| *day).collect::<Vec<_>>(),
        )
        .into_column(),
    ];

    for hour in &hour_set {
        let column: Vec<Option<f64>> = cells.values().map(|row| row.get(hour).copied()).collect();
        columns.push(Series::new(format!("{variable}_{hour}").into(), column).into_column());
    }

    Ok(DataFrame::new(columns)?)
}

/// Reformats every combined table in `combined_dir` into
/// `<combined_dir>/Reformatted/reformatted_<file>`.
pub fn reformat_directory(combined_dir: &Path) -> Result<StageReport> {
    let output_dir = paths::prepare_stage_dir(&combined_dir.join(REFORMATTED_DIR), combined_dir)?;
    let mut report = StageReport::new("reformat", combined_dir, &output_dir);

    for path in paths::list_csv_files(combined_dir)? {
        let pivoted = read_table(&path).and_then(|df| {
            let variable = df
                .get_column_names()
                .last()
                .map(|name| name.to_string())
                .ok_or_else(|| PipelineError::Validation("table has no columns".to_string()))?;
            pivot_variable_table(&df, &variable)
        });

        match pivoted {
            Ok(mut df) => {
                let target = output_dir.join(paths::reformatted_file_name(&paths::file_name(&path)));
                write_table(&mut df, &target)?;
                info!(file = %path.display(), rows = df.height(), "Reformatted table");
                report.record_written(target);
            }
            Err(err) => report.record_skipped(&path, err.to_string()),
        }
    }

    Ok(report)
}
