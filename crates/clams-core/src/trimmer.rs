use std::path::Path;

use clams_parser::columns::{ACCCO2, ACCO2, DATE_TIME, FEED1_ACC, LED_LIGHTNESS, WHEEL_ACC};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::paths::{self, TRIMMED_DIR};
use crate::report::StageReport;
use crate::table::{
    f64_values, read_table, require_columns, round_to, take_rows, timestamp_values, write_table,
};

const MICROS_PER_HOUR: f64 = 3_600.0 * 1_000_000.0;

/// Running counters re-zeroed at the cut.
pub const ACCUMULATIVE_COLUMNS: [&str; 4] = [ACCO2, ACCCO2, FEED1_ACC, WHEEL_ACC];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartPhase {
    #[default]
    Light,
    Dark,
}

impl StartPhase {
    /// Dark is recorded as an LED LIGHTNESS of exactly zero.
    pub fn matches(&self, led_lightness: Option<f64>) -> bool {
        let is_dark = led_lightness == Some(0.0);
        match self {
            StartPhase::Dark => is_dark,
            StartPhase::Light => !is_dark,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimParams {
    pub trim_hours: f64,
    pub keep_hours: f64,
    pub start_phase: StartPhase,
}

fn hours_to_micros(hours: f64) -> i64 {
    (hours * MICROS_PER_HOUR).round() as i64
}

/// Index of the first row after the LED run containing `idx`. Rows without
/// an LED reading neither end a run nor start one.
fn skip_led_run(led: &[Option<f64>], mut idx: usize) -> Option<usize> {
    let mut current = led[idx];
    while idx < led.len() {
        match (current, led[idx]) {
            (_, None) => {}
            (None, Some(level)) => current = Some(level),
            (Some(run), Some(level)) if run != level => return Some(idx),
            _ => {}
        }
        idx += 1;
    }
    None
}

/// Row where the retained window begins: past the warm-up, at a light/dark
/// transition whose new phase matches the requested start.
pub fn find_cut_index(timestamps: &[i64], led: &[Option<f64>], params: &TrimParams) -> Result<usize> {
    let insufficient = |what: &str| {
        PipelineError::InsufficientData(format!(
            "{what} (trim {}h, start {:?})",
            params.trim_hours, params.start_phase
        ))
    };

    let first = *timestamps
        .first()
        .ok_or_else(|| insufficient("no timestamped rows"))?;
    let threshold = first + hours_to_micros(params.trim_hours);

    let provisional = timestamps
        .iter()
        .position(|&ts| ts >= threshold)
        .ok_or_else(|| insufficient("recording ends before the trim window"))?;

    let mut idx = skip_led_run(led, provisional)
        .ok_or_else(|| insufficient("no light/dark transition after the trim window"))?;

    if !params.start_phase.matches(led[idx]) {
        idx = skip_led_run(led, idx)
            .ok_or_else(|| insufficient("no transition into the requested phase"))?;
    }

    Ok(idx)
}

pub fn trim_frame(df: &DataFrame, params: &TrimParams) -> Result<DataFrame> {
    let mut required = vec![DATE_TIME, LED_LIGHTNESS];
    required.extend(ACCUMULATIVE_COLUMNS);
    require_columns(df, &required)?;

    let raw_ts = timestamp_values(df, DATE_TIME)?;
    let timestamped: Vec<usize> = (0..raw_ts.len()).filter(|&i| raw_ts[i].is_some()).collect();
    let df = if timestamped.len() == raw_ts.len() {
        df.clone()
    } else {
        debug!(dropped = raw_ts.len() - timestamped.len(), "Dropping rows without a timestamp");
        take_rows(df, &timestamped)?
    };

    let timestamps: Vec<i64> = timestamp_values(&df, DATE_TIME)?.into_iter().flatten().collect();
    let led = f64_values(&df, LED_LIGHTNESS)?;
    let cut = find_cut_index(&timestamps, &led, params)?;

    let mut trimmed = df.clone();
    for name in ACCUMULATIVE_COLUMNS {
        let values = f64_values(&df, name)?;
        let baseline = values[cut - 1];
        let rebased: Vec<Option<f64>> = values
            .iter()
            .map(|value| match (value, baseline) {
                (Some(v), Some(b)) => Some(round_to(v - b, 2)),
                _ => None,
            })
            .collect();
        trimmed.with_column(Series::new(name.into(), rebased))?;
    }

    let end = timestamps[cut] + hours_to_micros(params.keep_hours);
    let keep: Vec<usize> = (cut..timestamps.len())
        .filter(|&i| timestamps[i] <= end)
        .collect();

    take_rows(&trimmed, &keep)
}

pub fn trim_directory(
    input_dir: &Path,
    output_root: &Path,
    params: &TrimParams,
) -> Result<StageReport> {
    let output_dir = paths::prepare_stage_dir(&output_root.join(TRIMMED_DIR), input_dir)?;
    let mut report = StageReport::new("trim", input_dir, &output_dir);

    for path in paths::list_csv_files(input_dir)? {
        let trimmed = read_table(&path).and_then(|df| {
            let before = df.height();
            trim_frame(&df, params).map(|out| (before, out))
        });
        match trimmed {
            Ok((before, mut df)) => {
                let target = output_dir.join(paths::trimmed_file_name(&paths::file_stem(&path)));
                write_table(&mut df, &target)?;
                info!(file = %path.display(), rows_in = before, rows_out = df.height(), "Trimmed file");
                report.record_written(target);
            }
            Err(err) => report.record_skipped(&path, err.to_string()),
        }
    }

    Ok(report)
}
