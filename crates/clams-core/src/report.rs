use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// What one stage produced: files written, files it had to leave out, and
/// rows discarded along the way.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: String,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub written: Vec<PathBuf>,
    pub skipped: Vec<SkippedFile>,
    pub dropped_rows: usize,
}

impl StageReport {
    pub fn new(stage: impl Into<String>, input_dir: &Path, output_dir: &Path) -> Self {
        Self {
            stage: stage.into(),
            input_dir: input_dir.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            written: Vec::new(),
            skipped: Vec::new(),
            dropped_rows: 0,
        }
    }

    pub fn record_written(&mut self, path: PathBuf) {
        self.written.push(path);
    }

    pub fn record_skipped(&mut self, path: &Path, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(stage = %self.stage, file = %path.display(), %reason, "Skipping file");
        self.skipped.push(SkippedFile {
            path: path.to_path_buf(),
            reason,
        });
    }
}
