use std::path::Path;

use clams_parser::columns::{
    ACCCO2, ACCO2, AMB, AMB_ACC, FEED1, FEED1_ACC, RER, VCO2, VO2, WHEEL, WHEEL_ACC,
};
use polars::prelude::*;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::experiment_config::ExperimentConfig;
use crate::paths;
use crate::report::StageReport;
use crate::table::{f64_values, i64_values, read_table, require_columns, write_table};

pub const OUTPUT_VARIABLES: [&str; 11] = [
    ACCCO2, ACCO2, FEED1_ACC, FEED1, RER, AMB, AMB_ACC, VCO2, VO2, WHEEL_ACC, WHEEL,
];

pub const KEY_COLUMNS: [&str; 5] = ["ID", "GROUP_LABEL", "DAY", "HOUR", "24 HOUR"];

/// Rows of every animal, tagged with id and group label.
#[derive(Debug, Default)]
pub struct CombinedTable {
    ids: Vec<String>,
    labels: Vec<String>,
    day: Vec<Option<i64>>,
    hour: Vec<Option<i64>>,
    hour_24: Vec<Option<i64>>,
    values: Vec<Vec<Option<f64>>>,
}

impl CombinedTable {
    pub fn new() -> Self {
        Self {
            values: vec![Vec::new(); OUTPUT_VARIABLES.len()],
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Appends one animal's binned rows. Every column is read before anything
    /// is appended so a bad file leaves the table untouched.
    pub fn append(&mut self, id: &str, label: &str, binned: &DataFrame) -> Result<()> {
        let mut required: Vec<&str> = KEY_COLUMNS[2..].to_vec();
        required.extend(OUTPUT_VARIABLES);
        require_columns(binned, &required)?;

        let day = i64_values(binned, "DAY")?;
        let hour = i64_values(binned, "HOUR")?;
        let hour_24 = i64_values(binned, "24 HOUR")?;
        let variables = OUTPUT_VARIABLES
            .iter()
            .map(|name| f64_values(binned, name))
            .collect::<Result<Vec<_>>>()?;

        let rows = binned.height();
        self.ids.extend(std::iter::repeat(id.to_string()).take(rows));
        self.labels.extend(std::iter::repeat(label.to_string()).take(rows));
        self.day.extend(day);
        self.hour.extend(hour);
        self.hour_24.extend(hour_24);
        for (column, values) in self.values.iter_mut().zip(variables) {
            column.extend(values);
        }
        Ok(())
    }

    pub fn variable_frame(&self, variable: &str) -> Result<DataFrame> {
        let position = OUTPUT_VARIABLES
            .iter()
            .position(|name| *name == variable)
            .ok_or_else(|| PipelineError::Validation(format!("unknown variable '{variable}'")))?;

        let columns = vec![
            Series::new("ID".into(), self.ids.clone()).into_column(),
            Series::new("GROUP_LABEL".into(), self.labels.clone()).into_column(),
            Series::new("DAY".into(), self.day.clone()).into_column(),
            Series::new("HOUR".into(), self.hour.clone()).into_column(),
            Series::new("24 HOUR".into(), self.hour_24.clone()).into_column(),
            Series::new(variable.into(), self.values[position].clone()).into_column(),
        ];
        Ok(DataFrame::new(columns)?)
    }
}

/// Joins every binned file in `binned_dir` with its group label and writes
/// one `<variable>.csv` per output variable into `combined_dir`.
pub fn combine_directory(
    binned_dir: &Path,
    combined_dir: &Path,
    config: &ExperimentConfig,
) -> Result<StageReport> {
    let output_dir = paths::prepare_stage_dir(combined_dir, binned_dir)?;
    let mut report = StageReport::new("combine", binned_dir, &output_dir);
    let mut table = CombinedTable::new();

    for path in paths::list_csv_files(binned_dir)? {
        let name = paths::file_name(&path);
        let Some(id) = paths::animal_id_from_file_name(&name) else {
            report.record_skipped(&path, "file name carries no _ID<id> tag");
            continue;
        };
        let label = config.label_for(&id).unwrap_or("");

        match read_table(&path).and_then(|df| table.append(&id, label, &df)) {
            Ok(()) => info!(file = %name, id = %id, label, "Combined file"),
            Err(err) => report.record_skipped(&path, err.to_string()),
        }
    }

    for variable in OUTPUT_VARIABLES {
        let mut frame = table.variable_frame(variable)?;
        let target = output_dir.join(format!("{variable}.csv"));
        write_table(&mut frame, &target)?;
        report.record_written(target);
    }
    info!(rows = table.len(), dir = %output_dir.display(), "Wrote combined tables");

    Ok(report)
}
