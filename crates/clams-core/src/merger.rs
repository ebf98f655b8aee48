use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::NaiveDateTime;
use clams_parser::{
    columns, find_subject_id, parse_timestamp, split_fields, ExportLayout, SubjectId, OXYMAX_V1,
};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::experiment_config::ExperimentConfig;
use crate::paths::{self, AGGREGATED_DIR};
use crate::report::StageReport;

/// How the fragments of one animal's run are put in sequence.
#[derive(Debug, Clone, Default)]
pub enum RunOrdering {
    /// Files listed by the caller come first, in the listed order, matched by
    /// file name. Unlisted fragments follow in detected order.
    Explicit(Vec<PathBuf>),
    /// Acquisition time of each file's first data row, falling back to file
    /// modification time when a fragment has no readable first timestamp.
    #[default]
    Detected,
}

#[derive(Debug)]
struct RunFragment {
    path: PathBuf,
    content: String,
    first_timestamp: Option<NaiveDateTime>,
    modified: Option<SystemTime>,
}

impl RunFragment {
    fn lines(&self) -> Vec<&str> {
        self.content.lines().collect()
    }
}

/// Stitches fragmented exports of the same animal into one file per animal
/// under `<output_root>/Aggregated_Runs`.
pub fn merge_directory(
    input_dir: &Path,
    output_root: &Path,
    config: Option<&ExperimentConfig>,
    ordering: &RunOrdering,
) -> Result<StageReport> {
    let output_dir = paths::prepare_stage_dir(&output_root.join(AGGREGATED_DIR), input_dir)?;
    let mut report = StageReport::new("merge", input_dir, &output_dir);
    let layout = OXYMAX_V1;

    let mut groups: BTreeMap<SubjectId, Vec<RunFragment>> = BTreeMap::new();
    for path in paths::list_csv_files(input_dir)? {
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                report.record_skipped(&path, format!("unreadable: {err}"));
                continue;
            }
        };

        let Some(subject) = find_subject_id(content.lines(), &layout) else {
            report.record_skipped(&path, "no Subject ID in the metadata block");
            continue;
        };

        if let Some(config) = config {
            if !config.contains(subject.as_str()) {
                report.record_skipped(
                    &path,
                    format!("Subject ID {subject} is not in the experiment config"),
                );
                continue;
            }
        }

        let first_timestamp = first_data_timestamp(&content, &layout);
        let modified = fs::metadata(&path).and_then(|meta| meta.modified()).ok();
        groups.entry(subject).or_default().push(RunFragment {
            path,
            content,
            first_timestamp,
            modified,
        });
    }

    for (subject, mut fragments) in groups {
        order_fragments(&subject, &mut fragments, ordering);

        if fragments.len() == 1 {
            let fragment = &fragments[0];
            let target = output_dir.join(paths::file_name(&fragment.path));
            fs::copy(&fragment.path, &target)?;
            info!(subject = %subject, file = %target.display(), "Copied single-file run");
            report.record_written(target);
            continue;
        }

        let merged = stitch_fragments(&subject, &fragments, &layout);
        let target = output_dir.join(paths::merged_file_name(&paths::file_stem(
            &fragments[0].path,
        )));
        fs::write(&target, merged)?;
        info!(
            subject = %subject,
            fragments = fragments.len(),
            file = %target.display(),
            "Merged fragmented run"
        );
        report.record_written(target);
    }

    Ok(report)
}

fn order_fragments(subject: &SubjectId, fragments: &mut [RunFragment], ordering: &RunOrdering) {
    if fragments.len() < 2 {
        return;
    }

    if fragments.iter().all(|f| f.first_timestamp.is_some()) {
        fragments.sort_by_key(|f| f.first_timestamp);
    } else {
        if matches!(ordering, RunOrdering::Detected) {
            warn!(
                subject = %subject,
                "Some fragments have no readable first timestamp; ordering by modification time"
            );
        }
        fragments.sort_by_key(|f| f.modified);
    }

    if let RunOrdering::Explicit(order) = ordering {
        fragments.sort_by_key(|f| {
            order
                .iter()
                .position(|listed| listed.file_name() == f.path.file_name())
                .unwrap_or(usize::MAX)
        });
    }
}

fn first_data_timestamp(content: &str, layout: &ExportLayout) -> Option<NaiveDateTime> {
    let lines: Vec<&str> = content.lines().collect();
    let header = split_fields(lines.get(layout.header_line_index())?);
    let ts_index = header.iter().position(|c| c == columns::DATE_TIME)?;
    lines
        .iter()
        .skip(layout.data_start_line())
        .find(|line| !line.trim().is_empty())
        .and_then(|line| split_fields(line).get(ts_index).and_then(|v| parse_timestamp(v)))
}

fn interval_index(lines: &[&str], layout: &ExportLayout) -> Option<usize> {
    let header = split_fields(lines.get(layout.header_line_index())?);
    header.iter().position(|c| c == columns::INTERVAL)
}

fn parse_interval(line: &str, index: usize) -> Option<i64> {
    split_fields(line)
        .get(index)
        .and_then(|value| value.trim().parse::<i64>().ok())
}

/// Seed file verbatim, then each later fragment's data rows for as long as
/// INTERVAL keeps counting up by one.
fn stitch_fragments(subject: &SubjectId, fragments: &[RunFragment], layout: &ExportLayout) -> String {
    let seed = &fragments[0];
    let mut merged = seed.content.clone();
    if !merged.ends_with('\n') {
        merged.push('\n');
    }

    let seed_lines = seed.lines();
    let mut last_interval = interval_index(&seed_lines, layout).and_then(|index| {
        seed_lines
            .iter()
            .skip(layout.data_start_line())
            .filter_map(|line| parse_interval(line, index))
            .last()
    });

    for fragment in &fragments[1..] {
        let lines = fragment.lines();
        let body = lines
            .iter()
            .skip(layout.header_skip())
            .filter(|line| !line.trim().is_empty());

        let Some(index) = interval_index(&lines, layout) else {
            warn!(
                subject = %subject,
                file = %fragment.path.display(),
                "No INTERVAL column; appending every row without continuity checks"
            );
            for line in body {
                merged.push_str(line);
                merged.push('\n');
            }
            continue;
        };

        let mut accepted = 0usize;
        let mut previous: Option<i64> = None;
        for line in body {
            let Some(interval) = parse_interval(line, index) else {
                break;
            };
            match previous {
                None => {
                    if let Some(last) = last_interval {
                        if interval != last + 1 {
                            warn!(
                                subject = %subject,
                                file = %fragment.path.display(),
                                expected = last + 1,
                                found = interval,
                                "INTERVAL does not continue from the previous fragment"
                            );
                        }
                    }
                }
                Some(prev) if interval != prev + 1 => {
                    debug!(
                        file = %fragment.path.display(),
                        at = interval,
                        "INTERVAL break; dropping the rest of this fragment"
                    );
                    break;
                }
                Some(_) => {}
            }
            merged.push_str(line);
            merged.push('\n');
            previous = Some(interval);
            accepted += 1;
        }

        if previous.is_some() {
            last_interval = previous;
        }
        debug!(file = %fragment.path.display(), rows = accepted, "Appended fragment rows");
    }

    merged
}
