// crates/clams-cli/src/main.rs

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;
use commands::config::{handle_config_command, ConfigCommands};
use commands::merge::{handle_merge_command, MergeArgs};
use commands::run::{handle_run_command, RunArgs};

/// Cleans, trims, bins and recombines CLAMS metabolic-cage exports.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Emit log events as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Runs the full pipeline over a directory of raw exports.
    Run(RunArgs),
    /// Only stitches fragmented runs into one file per animal.
    Merge(MergeArgs),
    /// Manage the experiment config (ID to group label).
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match cli.command {
        Commands::Run(args) => handle_run_command(args),
        Commands::Merge(args) => handle_merge_command(args),
        Commands::Config { command } => handle_config_command(command),
    }
}
