use std::path::PathBuf;

use anyhow::Result;
use clams_core::experiment_config::{default_config_path, ExperimentConfig};
use clams_core::merger::{merge_directory, RunOrdering};
use clap::Args;

#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Directory containing the raw CLAMS CSV exports.
    #[arg(short, long)]
    pub dir: PathBuf,
    /// Root under which `Aggregated_Runs` is created; defaults to `--dir`.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Only merge animals listed in this experiment config.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Explicit fragment order, by file name.
    #[arg(long, num_args = 1..)]
    pub order: Vec<PathBuf>,
}

pub fn handle_merge_command(args: MergeArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => Some(ExperimentConfig::load(path)?),
        None => {
            let default_path = default_config_path(&args.dir);
            if default_path.is_file() {
                Some(ExperimentConfig::load(&default_path)?)
            } else {
                None
            }
        }
    };
    let ordering = if args.order.is_empty() {
        RunOrdering::Detected
    } else {
        RunOrdering::Explicit(args.order.clone())
    };

    let output_root = args.output.clone().unwrap_or_else(|| args.dir.clone());
    let report = merge_directory(&args.dir, &output_root, config.as_ref(), &ordering)?;

    println!(
        "Merged into {}: {} written, {} skipped",
        report.output_dir.display(),
        report.written.len(),
        report.skipped.len()
    );
    for skipped in &report.skipped {
        println!("  skipped {}: {}", skipped.path.display(), skipped.reason);
    }
    Ok(())
}
