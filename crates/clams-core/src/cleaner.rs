use std::fs;
use std::path::{Path, PathBuf};

use clams_parser::{parse_clams_file, SubjectId};
use tracing::info;

use crate::error::Result;
use crate::paths::{self, CLEANED_DIR};
use crate::report::StageReport;
use crate::table::write_table;

#[derive(Debug, Clone)]
pub struct CleanedFile {
    pub output: PathBuf,
    pub subject_id: SubjectId,
    pub rows: usize,
    pub malformed_rows: usize,
}

/// Strips the export preamble and formatting rows from one raw file and writes
/// the data table as `<stem>_ID<subject>.csv` in `output_dir`.
pub fn clean_file(path: &Path, output_dir: &Path) -> Result<CleanedFile> {
    let content = fs::read_to_string(path)?;
    let mut parsed = parse_clams_file(&content)?;

    let subject_id = parsed.subject_id().clone();
    let output = output_dir.join(paths::cleaned_file_name(
        &paths::file_stem(path),
        &subject_id.file_token(),
    ));
    write_table(&mut parsed.df, &output)?;

    Ok(CleanedFile {
        output,
        subject_id,
        rows: parsed.df.height(),
        malformed_rows: parsed.malformed_rows,
    })
}

pub fn clean_directory(input_dir: &Path, output_root: &Path) -> Result<StageReport> {
    let output_dir = paths::prepare_stage_dir(&output_root.join(CLEANED_DIR), input_dir)?;
    let mut report = StageReport::new("clean", input_dir, &output_dir);

    for path in paths::list_csv_files(input_dir)? {
        match clean_file(&path, &output_dir) {
            Ok(cleaned) => {
                info!(
                    file = %path.display(),
                    subject = %cleaned.subject_id,
                    rows = cleaned.rows,
                    "Cleaned export"
                );
                report.dropped_rows += cleaned.malformed_rows;
                report.record_written(cleaned.output);
            }
            Err(err) => report.record_skipped(&path, err.to_string()),
        }
    }

    Ok(report)
}
