mod common;

use clams_core::cleaner::{clean_directory, clean_file};
use clams_core::table::{read_table, timestamp_values};
use clams_core::PipelineError;
use polars::prelude::*;

use common::{raw_export, raw_export_intervals, write_file};

#[test]
fn cleaned_file_keeps_every_data_row() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let raw = write_file(tmp.path(), "Cage 3.CSV", &raw_export("101", 10));
    let out_dir = tmp.path().join("out");
    std::fs::create_dir_all(&out_dir).unwrap();

    let cleaned = clean_file(&raw, &out_dir).expect("clean");
    assert_eq!(cleaned.output, out_dir.join("Cage 3_ID101.csv"));
    assert_eq!(cleaned.rows, 10);
    assert_eq!(cleaned.subject_id.as_str(), "101");

    let table = read_table(&cleaned.output).expect("cleaned table");
    assert_eq!(table.height(), 10);
    assert_eq!(table.get_column_names()[0].as_str(), "INTERVAL");
    assert!(matches!(
        table.column("DATE/TIME").unwrap().dtype(),
        DataType::Datetime(_, _)
    ));
    assert_eq!(timestamp_values(&table, "DATE/TIME").unwrap().iter().flatten().count(), 10);
}

#[test]
fn clean_stage_reports_unusable_exports() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let raw_dir = tmp.path().join("raw");
    write_file(&raw_dir, "a.csv", &raw_export("7", 5));
    write_file(
        &raw_dir,
        "no_subject.csv",
        &raw_export_intervals(None, common::experiment_start(), &[1, 2]),
    );
    write_file(&raw_dir, "notes.csv", "just,a,table\n1,2,3\n");
    write_file(&raw_dir, "readme.txt", "not a csv");

    let report = clean_directory(&raw_dir, tmp.path()).expect("clean stage");
    assert_eq!(report.written.len(), 1);
    assert_eq!(report.skipped.len(), 2);
    assert!(tmp.path().join("Cleaned").join("a_ID7.csv").is_file());
}

#[test]
fn stage_refuses_to_replace_its_own_input() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let raw_dir = tmp.path().join("Cleaned");
    let raw = write_file(&raw_dir, "a.csv", &raw_export("7", 5));

    let err = clean_directory(&raw_dir, tmp.path()).expect_err("output would replace the input");
    assert!(matches!(err, PipelineError::InvalidParameter(_)));
    assert!(raw.is_file());

    let err = clean_directory(&raw_dir, &raw_dir.join("..")).expect_err("same directory via ..");
    assert!(matches!(err, PipelineError::InvalidParameter(_)));
    assert!(raw.is_file());
}

#[test]
fn subject_ids_with_separators_survive_the_file_name() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let raw_dir = tmp.path().join("raw");
    write_file(&raw_dir, "a.csv", &raw_export("M_7", 5));

    let report = clean_directory(&raw_dir, tmp.path()).expect("clean stage");
    assert_eq!(report.written.len(), 1);
    let name = report.written[0].file_name().unwrap().to_string_lossy().into_owned();
    assert_eq!(name, "a_IDM%5F7.csv");
    assert_eq!(
        clams_core::paths::animal_id_from_file_name(&name).as_deref(),
        Some("M_7")
    );
}
