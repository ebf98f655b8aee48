use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};

pub const CONFIG_HEADER: [&str; 2] = ["ID", "GROUP_LABEL"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "GROUP_LABEL", alias = "GROUP LABEL", default)]
    pub group_label: String,
}

/// Mapping from animal id to cohort label, loaded once per run.
#[derive(Debug, Clone, Default)]
pub struct ExperimentConfig {
    source: Option<PathBuf>,
    entries: Vec<ConfigEntry>,
}

impl ExperimentConfig {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<ConfigEntry>) -> Self {
        Self {
            source: None,
            entries,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let config_error = |message: String| PipelineError::Config {
            path: path.to_path_buf(),
            message,
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|err| config_error(err.to_string()))?;

        let headers = reader
            .headers()
            .map_err(|err| config_error(err.to_string()))?
            .clone();
        if !headers.iter().any(|h| h == "ID") {
            return Err(config_error("missing 'ID' column".to_string()));
        }
        if !headers.iter().any(|h| h == "GROUP_LABEL" || h == "GROUP LABEL") {
            return Err(config_error("missing 'GROUP_LABEL' column".to_string()));
        }

        let mut entries = Vec::new();
        for (row, record) in reader.deserialize::<ConfigEntry>().enumerate() {
            let entry = record.map_err(|err| config_error(format!("row {}: {err}", row + 2)))?;
            if entry.id.is_empty() {
                debug!(row = row + 2, "Ignoring config row without an ID");
                continue;
            }
            entries.push(entry);
        }

        Ok(Self {
            source: Some(path.to_path_buf()),
            entries,
        })
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn entries(&self) -> &[ConfigEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entry_for(id).is_some()
    }

    /// Group label of the first entry matching `id`.
    pub fn label_for(&self, id: &str) -> Option<&str> {
        self.entry_for(id).map(|entry| entry.group_label.as_str())
    }

    fn entry_for(&self, id: &str) -> Option<&ConfigEntry> {
        self.entries.iter().find(|entry| ids_match(&entry.id, id))
    }
}

/// Ids are compared trimmed, and numerically when both sides are integers.
pub fn ids_match(left: &str, right: &str) -> bool {
    let (left, right) = (left.trim(), right.trim());
    match (left.parse::<i64>(), right.parse::<i64>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => left == right,
    }
}

pub fn default_config_path(working_dir: &Path) -> PathBuf {
    working_dir.join("config").join("experiment_config.csv")
}

/// Writes a config containing only the header row.
pub fn init_config_file(path: &Path, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        return Err(PipelineError::Config {
            path: path.to_path_buf(),
            message: "file already exists".to_string(),
        });
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(CONFIG_HEADER)?;
    writer.flush()?;
    Ok(())
}

pub fn append_config_entry(path: &Path, id: &str, group_label: &str) -> Result<()> {
    let id = id.trim();
    if id.is_empty() {
        return Err(PipelineError::Validation("config ID must not be empty".to_string()));
    }
    if !path.exists() {
        init_config_file(path, false)?;
    }

    let existing = ExperimentConfig::load(path)?;
    if let Some(label) = existing.label_for(id) {
        warn!(id, existing = label, "ID already configured; the first entry keeps precedence");
    }

    let needs_newline = fs::read(path)?.last().is_some_and(|byte| *byte != b'\n');
    let mut file = OpenOptions::new().append(true).open(path)?;
    if needs_newline {
        std::io::Write::write_all(&mut file, b"\n")?;
    }
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer.write_record([id, group_label.trim()])?;
    writer.flush()?;
    Ok(())
}
