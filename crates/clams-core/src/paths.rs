use std::fs;
use std::path::{Path, PathBuf};

use clams_parser::SubjectId;
use glob::{glob_with, MatchOptions, Pattern};

use crate::error::{PipelineError, Result};

pub const AGGREGATED_DIR: &str = "Aggregated_Runs";
pub const CLEANED_DIR: &str = "Cleaned";
pub const QC_FILTERED_DIR: &str = "QC_Filtered";
pub const TRIMMED_DIR: &str = "Trimmed";
pub const REFORMATTED_DIR: &str = "Reformatted";
pub const MANIFEST_FILE: &str = "run_manifest.json";

pub fn binned_dir_name(bin_hours: u32) -> String {
    format!("{bin_hours}hour_bins_Binned")
}

pub fn combined_dir_name(bin_hours: u32) -> String {
    format!("{bin_hours}hour_bins_Combined")
}

/// Removes any previous contents of a stage directory and recreates it empty.
/// Refuses an output directory that is, or contains, the stage's input.
pub fn prepare_stage_dir(path: &Path, input_dir: &Path) -> Result<PathBuf> {
    if path.exists() {
        if let Ok(input) = fs::canonicalize(input_dir) {
            let output = fs::canonicalize(path)?;
            if input.starts_with(&output) {
                return Err(PipelineError::InvalidParameter(format!(
                    "stage output {} would overwrite its input {}",
                    path.display(),
                    input_dir.display()
                )));
            }
        }
        fs::remove_dir_all(path)?;
    }
    fs::create_dir_all(path)?;
    Ok(path.to_path_buf())
}

/// Regular files directly inside `dir` whose extension is `csv` in any case,
/// sorted by path.
pub fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let dir_str = dir.to_str().ok_or_else(|| {
        PipelineError::Validation(format!("directory path {} is not valid UTF-8", dir.display()))
    })?;
    let pattern = format!("{}/*.csv", Pattern::escape(dir_str));
    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };

    let mut files: Vec<PathBuf> = glob_with(&pattern, options)?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    Ok(files)
}

pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn cleaned_file_name(stem: &str, subject_token: &str) -> String {
    format!("{stem}_ID{subject_token}.csv")
}

pub fn merged_file_name(seed_stem: &str) -> String {
    format!("{seed_stem}_merged.csv")
}

pub fn trimmed_file_name(stem: &str) -> String {
    format!("{stem}_trimmed.csv")
}

pub fn binned_file_name(stem: &str, bin_hours: u32) -> String {
    format!("{stem}_{bin_hours}hour_bins.csv")
}

pub fn reformatted_file_name(table_file: &str) -> String {
    format!("reformatted_{table_file}")
}

/// Animal id embedded by the cleaner as `_ID<token>`; the last occurrence
/// wins and the token is decoded back to the original Subject ID.
pub fn animal_id_from_file_name(name: &str) -> Option<String> {
    let start = name.rfind("_ID")? + "_ID".len();
    let token: String = name[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '%')
        .collect();
    if token.is_empty() {
        return None;
    }
    SubjectId::from_file_token(&token).map(|id| id.as_str().to_string())
}
