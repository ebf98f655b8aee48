use std::collections::HashMap;
use std::path::Path;

use clams_parser::columns::*;
use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::paths::{self, binned_dir_name};
use crate::report::StageReport;
use crate::table::{
    datetime_series, f64_values, has_column, i64_values, is_integer_column, read_table,
    require_columns, round_to, timestamp_values, write_table,
};

const MICROS_PER_HOUR: f64 = 3_600.0 * 1_000_000.0;
const OUTPUT_DECIMALS: i32 = 4;

/// Instrument columns with no downstream use.
pub const DROPPED_COLUMNS: [&str; 12] = [
    "STATUS1",
    "O2IN",
    "O2OUT",
    "DO2",
    "CO2IN",
    "CO2OUT",
    "DCO2",
    "XTOT",
    "YTOT",
    "LED HUE",
    "LED SATURATION",
    "BIN",
];

pub const REQUIRED_COLUMNS: [&str; 17] = [
    INTERVAL,
    CHAN,
    DATE_TIME,
    VO2,
    ACCO2,
    VCO2,
    ACCCO2,
    RER,
    FLOW,
    PRESSURE,
    FEED1,
    FEED1_ACC,
    WHEEL,
    WHEEL_ACC,
    XAMB,
    YAMB,
    LED_LIGHTNESS,
];

pub const OPTIONAL_COLUMNS: [&str; 3] = [HEAT, ENCLOSURE_TEMP, ENCLOSURE_SETPOINT];

pub const OUTPUT_COLUMNS: [&str; 26] = [
    CHAN,
    "INTERVAL_start",
    "INTERVAL_end",
    "DATE/TIME_start",
    "DATE/TIME_end",
    "DURATION",
    VO2,
    ACCO2,
    VCO2,
    ACCCO2,
    RER,
    HEAT,
    FLOW,
    PRESSURE,
    FEED1,
    FEED1_ACC,
    AMB,
    AMB_ACC,
    WHEEL,
    WHEEL_ACC,
    ENCLOSURE_TEMP,
    ENCLOSURE_SETPOINT,
    LED_LIGHTNESS,
    "DAY",
    "HOUR",
    "24 HOUR",
];

/// State carried while walking one light phase in time order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinCursor {
    pub index: usize,
    pub anchor_micros: i64,
}

impl BinCursor {
    pub fn start(first_micros: i64) -> Self {
        Self {
            index: 0,
            anchor_micros: first_micros,
        }
    }

    /// Opens a new bin anchored at `ts` once the current one spans `width`.
    pub fn advance(self, ts: i64, width_micros: i64) -> Self {
        if ts - self.anchor_micros >= width_micros {
            Self {
                index: self.index + 1,
                anchor_micros: ts,
            }
        } else {
            self
        }
    }
}

/// Bin index for each timestamp of a single light phase, in the given order.
pub fn assign_bins(timestamps: &[i64], width_micros: i64) -> Vec<usize> {
    let Some(&first) = timestamps.first() else {
        return Vec::new();
    };
    timestamps
        .iter()
        .scan(BinCursor::start(first), |cursor, &ts| {
            *cursor = cursor.advance(ts, width_micros);
            Some(cursor.index)
        })
        .collect()
}

#[derive(Clone, Copy)]
enum Aggregate {
    Last,
    Sum,
    Mean,
}

fn aggregate(values: &[Option<f64>], rows: &[usize], how: Aggregate) -> Option<f64> {
    let present = rows.iter().filter_map(|&i| values[i]);
    match how {
        Aggregate::Last => present.last(),
        Aggregate::Sum => Some(present.sum()),
        Aggregate::Mean => {
            let (total, count) = present.fold((0.0, 0usize), |(t, c), v| (t + v, c + 1));
            (count > 0).then(|| total / count as f64)
        }
    }
}

fn first_present<T: Copy>(values: &[Option<T>], rows: &[usize]) -> Option<T> {
    rows.iter().find_map(|&i| values[i])
}

fn last_present<T: Copy>(values: &[Option<T>], rows: &[usize]) -> Option<T> {
    rows.iter().rev().find_map(|&i| values[i])
}

struct BinGroup {
    led: f64,
    bin: usize,
    rows: Vec<usize>,
}

struct BinRow {
    group: usize,
    interval_start: Option<i64>,
    interval_end: Option<i64>,
    start: i64,
    end: i64,
}

fn rounded(values: impl IntoIterator<Item = Option<f64>>) -> Vec<Option<f64>> {
    values
        .into_iter()
        .map(|v| v.map(|v| round_to(v, OUTPUT_DECIMALS)))
        .collect()
}

/// Aggregates one animal's trimmed rows into `bin_hours`-wide bins per light
/// phase.
pub fn bin_frame(df: &DataFrame, bin_hours: u32) -> Result<DataFrame> {
    if bin_hours == 0 {
        return Err(PipelineError::InvalidParameter(
            "bin width must be a positive number of hours".to_string(),
        ));
    }

    let mut df = df.clone();
    for name in DROPPED_COLUMNS {
        if has_column(&df, name) {
            df.drop_in_place(name)?;
        }
    }
    require_columns(&df, &REQUIRED_COLUMNS)?;

    let timestamps = timestamp_values(&df, DATE_TIME)?;
    let led = f64_values(&df, LED_LIGHTNESS)?;
    let intervals = i64_values(&df, INTERVAL)?;
    let chan = i64_values(&df, CHAN)?;

    let xamb = f64_values(&df, XAMB)?;
    let yamb = f64_values(&df, YAMB)?;
    let amb: Vec<Option<f64>> = xamb
        .iter()
        .zip(&yamb)
        .map(|(x, y)| Some((*x)? + (*y)?))
        .collect();
    let mut running = 0.0;
    let amb_acc: Vec<Option<f64>> = amb
        .iter()
        .map(|value| {
            value.map(|v| {
                running += v;
                running
            })
        })
        .collect();

    // Partition by light level in first-appearance order, rows kept in time order.
    let mut phase_order: Vec<u64> = Vec::new();
    let mut phases: HashMap<u64, (f64, Vec<usize>)> = HashMap::new();
    for row in 0..df.height() {
        let (Some(level), Some(_)) = (led[row], timestamps[row]) else {
            continue;
        };
        let key = level.to_bits();
        phases
            .entry(key)
            .or_insert_with(|| {
                phase_order.push(key);
                (level, Vec::new())
            })
            .1
            .push(row);
    }

    let width = (f64::from(bin_hours) * MICROS_PER_HOUR) as i64;
    let mut groups: Vec<BinGroup> = Vec::new();
    let mut group_of: HashMap<(u64, usize), usize> = HashMap::new();
    let mut row_group: Vec<Option<usize>> = vec![None; df.height()];
    for key in &phase_order {
        let (level, rows) = &phases[key];
        let mut ordered = rows.clone();
        ordered.sort_by_key(|&row| timestamps[row]);
        let phase_ts: Vec<i64> = ordered.iter().filter_map(|&row| timestamps[row]).collect();
        for (row, bin) in ordered.iter().zip(assign_bins(&phase_ts, width)) {
            let group = *group_of.entry((*key, bin)).or_insert_with(|| {
                groups.push(BinGroup {
                    led: *level,
                    bin,
                    rows: Vec::new(),
                });
                groups.len() - 1
            });
            row_group[*row] = Some(group);
        }
    }
    for (row, group) in row_group.iter().enumerate() {
        if let Some(group) = group {
            groups[*group].rows.push(row);
        }
    }

    let mut bins: Vec<BinRow> = Vec::with_capacity(groups.len());
    for (index, group) in groups.iter().enumerate() {
        let (Some(start), Some(end)) = (
            first_present(&timestamps, &group.rows),
            last_present(&timestamps, &group.rows),
        ) else {
            continue;
        };
        if end == start {
            debug!(led = group.led, bin = group.bin, "Dropping zero-duration bin");
            continue;
        }
        bins.push(BinRow {
            group: index,
            interval_start: first_present(&intervals, &group.rows),
            interval_end: last_present(&intervals, &group.rows),
            start,
            end,
        });
    }
    bins.sort_by_key(|b| b.interval_start.unwrap_or(i64::MAX));

    let per_day = 12.0 / f64::from(bin_hours);
    let per_cycle = (24 / bin_hours).max(1) as usize;
    let bin_hours_i = i64::from(bin_hours);

    let gather = |values: &[Option<f64>], how: Aggregate| -> Vec<Option<f64>> {
        rounded(
            bins.iter()
                .map(|b| aggregate(values, &groups[b.group].rows, how)),
        )
    };

    let mut columns: Vec<Column> = Vec::with_capacity(OUTPUT_COLUMNS.len());
    columns.push(
        Series::new(
            CHAN.into(),
            bins.iter()
                .map(|b| last_present(&chan, &groups[b.group].rows))
                .collect::<Vec<_>>(),
        )
        .into_column(),
    );
    columns.push(
        Series::new(
            "INTERVAL_start".into(),
            bins.iter().map(|b| b.interval_start).collect::<Vec<_>>(),
        )
        .into_column(),
    );
    columns.push(
        Series::new(
            "INTERVAL_end".into(),
            bins.iter().map(|b| b.interval_end).collect::<Vec<_>>(),
        )
        .into_column(),
    );
    columns.push(
        datetime_series(
            "DATE/TIME_start",
            bins.iter().map(|b| Some(b.start)).collect(),
        )?
        .into_column(),
    );
    columns.push(
        datetime_series("DATE/TIME_end", bins.iter().map(|b| Some(b.end)).collect())?
            .into_column(),
    );
    columns.push(
        Series::new(
            "DURATION".into(),
            rounded(
                bins.iter()
                    .map(|b| Some((b.end - b.start) as f64 / MICROS_PER_HOUR)),
            ),
        )
        .into_column(),
    );

    for name in &OUTPUT_COLUMNS[6..22] {
        let name = *name;
        let values = match name {
            AMB => gather(&amb, Aggregate::Sum),
            AMB_ACC => gather(&amb_acc, Aggregate::Last),
            FEED1 | WHEEL => gather(&f64_values(&df, name)?, Aggregate::Sum),
            ACCO2 | ACCCO2 | FEED1_ACC | WHEEL_ACC => {
                gather(&f64_values(&df, name)?, Aggregate::Last)
            }
            _ if OPTIONAL_COLUMNS.contains(&name) && !has_column(&df, name) => {
                vec![None; bins.len()]
            }
            _ => gather(&f64_values(&df, name)?, Aggregate::Mean),
        };
        columns.push(Series::new(name.into(), values).into_column());
    }

    let led_values: Vec<Option<f64>> = bins.iter().map(|b| Some(groups[b.group].led)).collect();
    let led_series = if is_integer_column(&df, LED_LIGHTNESS) {
        Series::new(
            LED_LIGHTNESS.into(),
            led_values
                .iter()
                .map(|v| v.map(|v| v as i64))
                .collect::<Vec<_>>(),
        )
    } else {
        Series::new(LED_LIGHTNESS.into(), rounded(led_values))
    };
    columns.push(led_series.into_column());

    let day: Vec<i64> = bins
        .iter()
        .map(|b| (groups[b.group].bin as f64 / per_day).floor() as i64 + 1)
        .collect();
    let hour: Vec<i64> = (0..bins.len())
        .map(|pos| (pos as i64 + 1) * bin_hours_i)
        .collect();
    let hour_24: Vec<i64> = (0..bins.len())
        .map(|pos| ((pos % per_cycle) as i64 + 1) * bin_hours_i)
        .collect();
    columns.push(Series::new("DAY".into(), day).into_column());
    columns.push(Series::new("HOUR".into(), hour).into_column());
    columns.push(Series::new("24 HOUR".into(), hour_24).into_column());

    Ok(DataFrame::new(columns)?)
}

pub fn bin_directory(input_dir: &Path, output_root: &Path, bin_hours: u32) -> Result<StageReport> {
    if bin_hours == 0 {
        return Err(PipelineError::InvalidParameter(
            "bin width must be a positive number of hours".to_string(),
        ));
    }
    if 12 % bin_hours != 0 {
        warn!(bin_hours, "Bin width does not divide 12 hours; DAY labels will straddle phases");
    }

    let output_dir = paths::prepare_stage_dir(
        &output_root.join(binned_dir_name(bin_hours)),
        input_dir,
    )?;
    let mut report = StageReport::new(format!("bin_{bin_hours}h"), input_dir, &output_dir);

    for path in paths::list_csv_files(input_dir)? {
        match read_table(&path).and_then(|df| bin_frame(&df, bin_hours)) {
            Ok(mut binned) => {
                let target = output_dir.join(paths::binned_file_name(
                    &paths::file_stem(&path),
                    bin_hours,
                ));
                write_table(&mut binned, &target)?;
                info!(file = %path.display(), bins = binned.height(), "Binned file");
                report.record_written(target);
            }
            Err(err) => report.record_skipped(&path, err.to_string()),
        }
    }

    Ok(report)
}
