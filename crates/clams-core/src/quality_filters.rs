use std::path::Path;

use clams_parser::columns::{FLOW, O2IN, PRESSURE, RER, VCO2, VO2};
use polars::prelude::*;
use tracing::info;

use crate::error::Result;
use crate::paths::{self, QC_FILTERED_DIR};
use crate::report::StageReport;
use crate::table::{read_table, require_columns, write_table};

/// Lowest inlet O2 percentage accepted as a plausible reference reading.
pub const MIN_O2IN_PERCENT: f64 = 20.85;

pub const REQUIRED_COLUMNS: [&str; 6] = [VO2, VCO2, RER, FLOW, PRESSURE, O2IN];

#[derive(Debug)]
pub struct QualityOutcome {
    pub df: DataFrame,
    pub dropped: usize,
}

fn numeric(name: &str) -> Expr {
    col(name).cast(DataType::Float64)
}

/// Keeps rows with non-zero gas, flow and pressure readings, a positive VO2
/// and a plausible inlet O2. A missing value in any of these columns drops the
/// row.
pub fn apply_quality_filters(df: &DataFrame) -> Result<QualityOutcome> {
    require_columns(df, &REQUIRED_COLUMNS)?;

    let keep = numeric(VO2)
        .neq(lit(0.0))
        .and(numeric(VCO2).neq(lit(0.0)))
        .and(numeric(RER).neq(lit(0.0)))
        .and(numeric(FLOW).neq(lit(0.0)))
        .and(numeric(PRESSURE).neq(lit(0.0)))
        .and(numeric(O2IN).gt_eq(lit(MIN_O2IN_PERCENT)))
        .and(numeric(VO2).gt(lit(0.0)));

    let filtered = df.clone().lazy().filter(keep).collect()?;
    let dropped = df.height() - filtered.height();

    Ok(QualityOutcome {
        df: filtered,
        dropped,
    })
}

pub fn filter_directory(input_dir: &Path, output_root: &Path) -> Result<StageReport> {
    let output_dir = paths::prepare_stage_dir(&output_root.join(QC_FILTERED_DIR), input_dir)?;
    let mut report = StageReport::new("quality_filter", input_dir, &output_dir);

    for path in paths::list_csv_files(input_dir)? {
        let outcome = read_table(&path).and_then(|df| apply_quality_filters(&df));
        match outcome {
            Ok(mut outcome) => {
                let target = output_dir.join(paths::file_name(&path));
                write_table(&mut outcome.df, &target)?;
                info!(
                    file = %path.display(),
                    kept = outcome.df.height(),
                    dropped = outcome.dropped,
                    "Applied quality filters"
                );
                report.dropped_rows += outcome.dropped;
                report.record_written(target);
            }
            Err(err) => report.record_skipped(&path, err.to_string()),
        }
    }

    Ok(report)
}
