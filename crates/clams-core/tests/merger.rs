mod common;

use std::fs;
use std::path::Path;

use chrono::Duration;
use clams_core::experiment_config::{ConfigEntry, ExperimentConfig};
use clams_core::merger::{merge_directory, RunOrdering};
use clams_core::table::i64_values;
use clams_parser::parse_clams_file;

use common::{experiment_start, raw_export, raw_export_intervals, write_file};

fn config(ids: &[&str]) -> ExperimentConfig {
    ExperimentConfig::from_entries(
        ids.iter()
            .map(|id| ConfigEntry {
                id: id.to_string(),
                group_label: "cohort".to_string(),
            })
            .collect(),
    )
}

fn fragmented_inputs(dir: &Path) {
    let start = experiment_start();
    // first fragment by acquisition time, though it sorts second by name
    write_file(
        dir,
        "run_part1.csv",
        &raw_export_intervals(Some("101"), start, &[1, 2, 3, 4]),
    );
    write_file(
        dir,
        "run_part0.csv",
        &raw_export_intervals(Some("101"), start + Duration::hours(2), &[5, 6, 7, 9, 10]),
    );
    write_file(dir, "other.csv", &raw_export("202", 4));
    write_file(dir, "single.csv", &raw_export("303", 6));
}

fn intervals_of(path: &Path) -> Vec<i64> {
    let parsed = parse_clams_file(&fs::read_to_string(path).unwrap()).expect("merged output parses");
    i64_values(&parsed.df, "INTERVAL")
        .unwrap()
        .into_iter()
        .flatten()
        .collect()
}

#[test]
fn stitches_fragments_until_interval_break() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let input = tmp.path().join("raw");
    fragmented_inputs(&input);

    let report = merge_directory(
        &input,
        tmp.path(),
        Some(&config(&["101", "303"])),
        &RunOrdering::Detected,
    )
    .expect("merge");

    assert_eq!(report.written.len(), 2);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].path.ends_with("other.csv"));

    let merged = tmp.path().join("Aggregated_Runs").join("run_part1_merged.csv");
    assert_eq!(intervals_of(&merged), vec![1, 2, 3, 4, 5, 6, 7]);
}

#[test]
fn single_file_runs_are_copied_verbatim() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let input = tmp.path().join("raw");
    fragmented_inputs(&input);

    merge_directory(&input, tmp.path(), None, &RunOrdering::Detected).expect("merge");

    let original = fs::read(input.join("single.csv")).unwrap();
    let copied = fs::read(tmp.path().join("Aggregated_Runs").join("single.csv")).unwrap();
    assert_eq!(original, copied);
    assert!(tmp.path().join("Aggregated_Runs").join("other.csv").is_file());
}

#[test]
fn explicit_order_overrides_acquisition_time() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let input = tmp.path().join("raw");
    fragmented_inputs(&input);

    let ordering = RunOrdering::Explicit(vec!["run_part0.csv".into(), "run_part1.csv".into()]);
    merge_directory(&input, tmp.path(), Some(&config(&["101"])), &ordering).expect("merge");

    // seed keeps all of its rows; the continuation contributes its consecutive run
    let merged = tmp.path().join("Aggregated_Runs").join("run_part0_merged.csv");
    assert_eq!(intervals_of(&merged), vec![5, 6, 7, 9, 10, 1, 2, 3, 4]);
}

#[test]
fn files_without_subject_id_are_skipped() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let input = tmp.path().join("raw");
    write_file(
        &input,
        "anonymous.csv",
        &raw_export_intervals(None, experiment_start(), &[1, 2]),
    );

    let report = merge_directory(&input, tmp.path(), None, &RunOrdering::Detected).expect("merge");
    assert!(report.written.is_empty());
    assert_eq!(report.skipped.len(), 1);
}

#[test]
fn fragment_without_interval_column_is_appended_whole() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let input = tmp.path().join("raw");
    let start = experiment_start();
    write_file(
        &input,
        "run_a.csv",
        &raw_export_intervals(Some("101"), start, &[1, 2, 3, 4]),
    );
    let continuation = raw_export_intervals(Some("101"), start + Duration::hours(2), &[5, 9, 3])
        .replacen("INTERVAL,", "INDEX,", 1);
    write_file(&input, "run_b.csv", &continuation);

    let report = merge_directory(&input, tmp.path(), None, &RunOrdering::Detected).expect("merge");
    assert_eq!(report.written.len(), 1);

    // read back under the seed's header, so the first field lands in INTERVAL
    let merged = tmp.path().join("Aggregated_Runs").join("run_a_merged.csv");
    assert_eq!(intervals_of(&merged), vec![1, 2, 3, 4, 5, 9, 3]);
}
