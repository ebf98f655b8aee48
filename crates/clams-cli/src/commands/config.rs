use std::path::{Path, PathBuf};

use anyhow::Result;
use clams_core::experiment_config::{
    append_config_entry, default_config_path, init_config_file, ExperimentConfig,
};
use comfy_table::{presets::UTF8_FULL, Table};
use tracing::info;

#[derive(clap::Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write an empty config with the `ID,GROUP_LABEL` header.
    Init {
        #[arg(short, long)]
        dir: PathBuf,
        #[arg(long)]
        path: Option<PathBuf>,
        /// Replace an existing config.
        #[arg(long)]
        force: bool,
    },
    /// Append an animal and its group label.
    Add {
        #[arg(short, long)]
        dir: PathBuf,
        #[arg(long)]
        path: Option<PathBuf>,
        #[arg(long)]
        id: String,
        #[arg(long)]
        label: String,
    },
    /// Print the configured animals.
    Show {
        #[arg(short, long)]
        dir: PathBuf,
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

fn resolve(dir: &Path, path: Option<PathBuf>) -> PathBuf {
    path.unwrap_or_else(|| default_config_path(dir))
}

pub fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Init { dir, path, force } => {
            let path = resolve(&dir, path);
            init_config_file(&path, force)?;
            info!(path = %path.display(), "Initialised experiment config");
            println!("Experiment config created at {}", path.display());
        }
        ConfigCommands::Add {
            dir,
            path,
            id,
            label,
        } => {
            let path = resolve(&dir, path);
            append_config_entry(&path, &id, &label)?;
            println!("Added ID {} with label '{}' to {}", id.trim(), label.trim(), path.display());
        }
        ConfigCommands::Show { dir, path } => {
            let path = resolve(&dir, path);
            let config = ExperimentConfig::load(&path)?;
            let mut table = Table::new();
            table.load_preset(UTF8_FULL).set_header(vec!["ID", "GROUP_LABEL"]);
            for entry in config.entries() {
                table.add_row(vec![entry.id.clone(), entry.group_label.clone()]);
            }
            println!("{table}");
        }
    }
    Ok(())
}
