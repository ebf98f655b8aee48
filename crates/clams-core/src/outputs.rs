use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::paths::MANIFEST_FILE;
use crate::pipelines::PipelineParams;
use crate::report::StageReport;

#[derive(Debug, Clone, Serialize)]
pub struct InputDigest {
    pub path: PathBuf,
    pub blake3: String,
    pub bytes: u64,
}

/// Reproducibility record written next to a run's stage directories.
#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub tool_version: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub working_dir: PathBuf,
    pub output_root: PathBuf,
    pub experiment_config: Option<PathBuf>,
    pub parameters: PipelineParams,
    pub inputs: Vec<InputDigest>,
    pub stages: Vec<StageReport>,
}

impl RunManifest {
    pub fn files_written(&self) -> usize {
        self.stages.iter().map(|stage| stage.written.len()).sum()
    }

    pub fn files_skipped(&self) -> usize {
        self.stages.iter().map(|stage| stage.skipped.len()).sum()
    }
}

pub fn hash_file(path: &Path) -> Result<InputDigest> {
    let bytes = fs::read(path)?;
    Ok(InputDigest {
        path: path.to_path_buf(),
        blake3: blake3::hash(&bytes).to_hex().to_string(),
        bytes: bytes.len() as u64,
    })
}

pub fn hash_inputs(files: &[PathBuf]) -> Result<Vec<InputDigest>> {
    files.iter().map(|path| hash_file(path)).collect()
}

pub fn write_manifest(output_root: &Path, manifest: &RunManifest) -> Result<PathBuf> {
    let path = output_root.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(manifest)?;
    fs::write(&path, json)?;
    Ok(path)
}
