// crates/clams-cli/src/commands/run.rs

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clams_core::{
    run_pipeline, PipelineInputs, PipelineParams, RunManifest, RunOrdering, StartPhase,
};
use clap::{Args, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Table};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PhaseArg {
    Light,
    Dark,
}

impl From<PhaseArg> for StartPhase {
    fn from(value: PhaseArg) -> Self {
        match value {
            PhaseArg::Light => StartPhase::Light,
            PhaseArg::Dark => StartPhase::Dark,
        }
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Directory containing the raw CLAMS CSV exports.
    #[arg(short, long)]
    pub dir: PathBuf,
    /// Output root; defaults to a fresh `run_<timestamp>` directory inside `--dir`.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// TOML file with pipeline parameters. Flags given here take precedence.
    #[arg(long)]
    pub params: Option<PathBuf>,
    /// Hours discarded from the start of each recording.
    #[arg(long)]
    pub trim_hours: Option<f64>,
    /// Hours retained after the light/dark cut.
    #[arg(long)]
    pub keep_hours: Option<f64>,
    /// Phase the retained window starts in.
    #[arg(long, value_enum)]
    pub start: Option<PhaseArg>,
    /// Bin width in hours; repeat for several widths.
    #[arg(long = "bin-hours")]
    pub bin_hours: Vec<u32>,
    /// Experiment config CSV (ID, GROUP_LABEL).
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Stitch fragmented runs by Subject ID before cleaning.
    #[arg(long)]
    pub merge: bool,
    /// Explicit fragment order for merging, by file name.
    #[arg(long = "merge-order", num_args = 1..)]
    pub merge_order: Vec<PathBuf>,
}

fn load_params(args: &RunArgs) -> Result<PipelineParams> {
    let mut params = match &args.params {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read parameter file {}", path.display()))?;
            toml::from_str::<PipelineParams>(&content)
                .with_context(|| format!("invalid parameter file {}", path.display()))?
        }
        None => PipelineParams::default(),
    };

    if let Some(trim) = args.trim_hours {
        params.trim_hours = trim;
    }
    if let Some(keep) = args.keep_hours {
        params.keep_hours = keep;
    }
    if let Some(start) = args.start {
        params.start_phase = start.into();
    }
    if !args.bin_hours.is_empty() {
        params.bin_hours = args.bin_hours.clone();
    }
    if args.merge {
        params.merge = true;
    }
    Ok(params)
}

fn default_output_root(working_dir: &Path) -> PathBuf {
    working_dir.join(format!("run_{}", Local::now().format("%Y-%m-%d_%H-%M-%S")))
}

pub fn handle_run_command(args: RunArgs) -> Result<()> {
    let params = load_params(&args)?;
    params.validate()?;

    let output_root = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_root(&args.dir));
    let mut inputs = PipelineInputs::new(&args.dir, output_root);
    inputs.experiment_config = args.config.clone();
    if !args.merge_order.is_empty() {
        inputs.merge_order = RunOrdering::Explicit(args.merge_order.clone());
    }

    println!("Processing CLAMS exports in {}", args.dir.display());
    let manifest = run_pipeline(&inputs, &params)?;
    print_summary(&manifest);
    Ok(())
}

fn print_summary(manifest: &RunManifest) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Stage", "Files written", "Files skipped", "Rows dropped"]);
    for stage in &manifest.stages {
        table.add_row(vec![
            stage.stage.clone(),
            stage.written.len().to_string(),
            stage.skipped.len().to_string(),
            stage.dropped_rows.to_string(),
        ]);
    }
    println!("{table}");

    for stage in &manifest.stages {
        for skipped in &stage.skipped {
            println!(
                "  skipped [{}] {}: {}",
                stage.stage,
                skipped.path.display(),
                skipped.reason
            );
        }
    }
    println!("\nOutputs written to {}", manifest.output_root.display());
}
