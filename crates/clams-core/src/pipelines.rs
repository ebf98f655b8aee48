use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::binner::bin_directory;
use crate::cleaner::clean_directory;
use crate::combiner::combine_directory;
use crate::error::{PipelineError, Result};
use crate::experiment_config::{default_config_path, ExperimentConfig};
use crate::merger::{merge_directory, RunOrdering};
use crate::outputs::{hash_inputs, write_manifest, RunManifest};
use crate::paths::{self, combined_dir_name, AGGREGATED_DIR, QC_FILTERED_DIR, TRIMMED_DIR};
use crate::quality_filters::filter_directory;
use crate::reformatter::reformat_directory;
use crate::report::StageReport;
use crate::trimmer::{trim_directory, StartPhase, TrimParams};

/// Bin widths that tile a 24-hour cycle exactly.
pub const SUPPORTED_BIN_HOURS: [u32; 8] = [1, 2, 3, 4, 6, 8, 12, 24];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineParams {
    pub trim_hours: f64,
    pub keep_hours: f64,
    pub start_phase: StartPhase,
    pub bin_hours: Vec<u32>,
    pub merge: bool,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            trim_hours: 0.0,
            keep_hours: 24.0,
            start_phase: StartPhase::Light,
            bin_hours: vec![1],
            merge: false,
        }
    }
}

impl PipelineParams {
    pub fn validate(&self) -> Result<()> {
        if !self.trim_hours.is_finite() || self.trim_hours < 0.0 {
            return Err(PipelineError::InvalidParameter(format!(
                "trim_hours must be zero or more, got {}",
                self.trim_hours
            )));
        }
        if !self.keep_hours.is_finite() || self.keep_hours <= 0.0 {
            return Err(PipelineError::InvalidParameter(format!(
                "keep_hours must be positive, got {}",
                self.keep_hours
            )));
        }
        if self.bin_hours.is_empty() {
            return Err(PipelineError::InvalidParameter(
                "at least one bin width is required".to_string(),
            ));
        }
        for &bin in &self.bin_hours {
            if bin == 0 || 24 % bin != 0 {
                return Err(PipelineError::InvalidParameter(format!(
                    "bin_hours must divide 24 hours evenly (one of {SUPPORTED_BIN_HOURS:?}), got {bin}"
                )));
            }
        }
        Ok(())
    }

    pub fn trim_params(&self) -> TrimParams {
        TrimParams {
            trim_hours: self.trim_hours,
            keep_hours: self.keep_hours,
            start_phase: self.start_phase,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineInputs {
    /// Directory holding the raw exports.
    pub working_dir: PathBuf,
    /// Root under which every stage directory is created.
    pub output_root: PathBuf,
    /// Explicit config path; otherwise `<working_dir>/config/experiment_config.csv`
    /// is used when it exists.
    pub experiment_config: Option<PathBuf>,
    pub merge_order: RunOrdering,
}

impl PipelineInputs {
    pub fn new(working_dir: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            output_root: output_root.into(),
            experiment_config: None,
            merge_order: RunOrdering::Detected,
        }
    }
}

/// Loads the experiment config before any stage runs; a config that exists
/// but cannot be read fails the whole run.
pub fn resolve_experiment_config(inputs: &PipelineInputs) -> Result<ExperimentConfig> {
    if let Some(path) = &inputs.experiment_config {
        return ExperimentConfig::load(path);
    }

    let default_path = default_config_path(&inputs.working_dir);
    if default_path.is_file() {
        return ExperimentConfig::load(&default_path);
    }

    warn!(
        expected = %default_path.display(),
        "No experiment config found; every animal will be unlabeled"
    );
    Ok(ExperimentConfig::empty())
}

/// Runs merge (optional), clean, quality filter, trim, and then bin, combine
/// and reformat once per requested bin width.
pub fn run_pipeline(inputs: &PipelineInputs, params: &PipelineParams) -> Result<RunManifest> {
    let started_at = Utc::now();
    params.validate()?;
    let config = resolve_experiment_config(inputs)?;

    let raw_files = paths::list_csv_files(&inputs.working_dir)?;
    if raw_files.is_empty() {
        return Err(PipelineError::Validation(format!(
            "no CSV exports found in {}",
            inputs.working_dir.display()
        )));
    }
    let digests = hash_inputs(&raw_files)?;

    let root = inputs.output_root.as_path();
    fs::create_dir_all(root)?;
    info!(
        files = raw_files.len(),
        output = %root.display(),
        config_entries = config.entries().len(),
        "Starting pipeline run"
    );

    let mut stages: Vec<StageReport> = Vec::new();

    let clean_input = if params.merge {
        let merge_config = (!config.is_empty()).then_some(&config);
        stages.push(merge_directory(
            &inputs.working_dir,
            root,
            merge_config,
            &inputs.merge_order,
        )?);
        root.join(AGGREGATED_DIR)
    } else {
        inputs.working_dir.clone()
    };

    stages.push(clean_directory(&clean_input, root)?);
    stages.push(filter_directory(&root.join(paths::CLEANED_DIR), root)?);
    stages.push(trim_directory(
        &root.join(QC_FILTERED_DIR),
        root,
        &params.trim_params(),
    )?);

    for &bin_hours in &params.bin_hours {
        stages.extend(run_bin_width(root, bin_hours, &config)?);
    }

    let manifest = RunManifest {
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        started_at,
        finished_at: Utc::now(),
        working_dir: inputs.working_dir.clone(),
        output_root: inputs.output_root.clone(),
        experiment_config: config.source().map(Path::to_path_buf),
        parameters: params.clone(),
        inputs: digests,
        stages,
    };
    let manifest_path = write_manifest(root, &manifest)?;
    info!(
        manifest = %manifest_path.display(),
        written = manifest.files_written(),
        skipped = manifest.files_skipped(),
        "Pipeline run finished"
    );

    Ok(manifest)
}

fn run_bin_width(
    root: &Path,
    bin_hours: u32,
    config: &ExperimentConfig,
) -> Result<Vec<StageReport>> {
    let binned = bin_directory(&root.join(TRIMMED_DIR), root, bin_hours)?;
    let combined_dir = root.join(combined_dir_name(bin_hours));
    let combined = combine_directory(&binned.output_dir, &combined_dir, config)?;
    let reformatted = reformat_directory(&combined_dir)?;
    Ok(vec![binned, combined, reformatted])
}
