mod common;

use clams_core::combiner::{combine_directory, CombinedTable, OUTPUT_VARIABLES};
use clams_core::experiment_config::{ConfigEntry, ExperimentConfig};
use clams_core::reformatter::{pivot_variable_table, reformat_directory, IdKey};
use clams_core::table::{f64_values, i64_values, read_table, str_values};
use polars::prelude::*;

fn combined_vo2() -> DataFrame {
    df![
        "ID" => ["101", "101", "101", "7", "7", "7"],
        "GROUP_LABEL" => ["A", "A", "A", "", "", ""],
        "DAY" => [1i64, 1, 1, 1, 1, 1],
        "HOUR" => [8i64, 16, 24, 8, 16, 24],
        "24 HOUR" => [8i64, 16, 24, 8, 16, 24],
        "VO2" => [3000.0, 3100.0, 3200.0, 2800.0, 2900.0, 3000.0],
    ]
    .expect("df")
}

#[test]
fn pivots_one_row_per_animal_day() {
    let pivoted = pivot_variable_table(&combined_vo2(), "VO2").expect("pivot");
    let names: Vec<String> = pivoted
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    assert_eq!(names, ["ID", "GROUP_LABEL", "DAY", "VO2_8", "VO2_16", "VO2_24"]);
    assert_eq!(pivoted.height(), 2);

    // numeric ids sort by value, so 7 precedes 101
    assert_eq!(i64_values(&pivoted, "ID").unwrap(), vec![Some(7), Some(101)]);
    let labels = str_values(&pivoted, "GROUP_LABEL").unwrap();
    assert_eq!(labels, vec![Some("NO_LABEL".to_string()), Some("A".to_string())]);
    assert_eq!(
        f64_values(&pivoted, "VO2_16").unwrap(),
        vec![Some(2900.0), Some(3100.0)]
    );
}

#[test]
fn first_value_wins_for_repeated_hours() {
    let df = df![
        "ID" => ["5", "5"],
        "GROUP_LABEL" => ["B", "B"],
        "DAY" => [2i64, 2],
        "24 HOUR" => [12i64, 12],
        "RER" => [0.8, 0.95],
    ]
    .expect("df");
    let pivoted = pivot_variable_table(&df, "RER").expect("pivot");
    assert_eq!(f64_values(&pivoted, "RER_12").unwrap(), vec![Some(0.8)]);
}

#[test]
fn id_keys_order_numbers_before_text() {
    let mut keys = vec![IdKey::parse("M2"), IdKey::parse("10"), IdKey::parse(" 9 ")];
    keys.sort();
    assert_eq!(
        keys,
        vec![
            IdKey::Numeric(9),
            IdKey::Numeric(10),
            IdKey::Text("M2".to_string())
        ]
    );
}

#[test]
fn combined_table_leaves_bad_files_out() {
    let mut table = CombinedTable::new();
    let incomplete = df![
        "DAY" => [1i64],
        "HOUR" => [6i64],
        "24 HOUR" => [6i64],
    ]
    .expect("df");
    assert!(table.append("1", "A", &incomplete).is_err());
    assert!(table.is_empty());
}

fn binned_fixture(rows: usize) -> String {
    let mut header: Vec<&str> = vec!["DAY", "HOUR", "24 HOUR"];
    header.extend(OUTPUT_VARIABLES);
    let mut content = header.join(",");
    content.push('\n');
    for row in 0..rows {
        let hour = (row + 1) * 6;
        let mut fields = vec!["1".to_string(), hour.to_string(), hour.to_string()];
        fields.extend(OUTPUT_VARIABLES.iter().map(|_| format!("{}.5", row)));
        content.push_str(&fields.join(","));
        content.push('\n');
    }
    content
}

#[test]
fn combine_then_reformat_directory() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let binned = tmp.path().join("6hour_bins_Binned");
    common::write_file(&binned, "a_ID101_trimmed_6hour_bins.csv", &binned_fixture(4));
    common::write_file(&binned, "b_ID102_trimmed_6hour_bins.csv", &binned_fixture(4));
    common::write_file(&binned, "untagged.csv", &binned_fixture(1));

    let config = ExperimentConfig::from_entries(vec![ConfigEntry {
        id: "101".to_string(),
        group_label: "control".to_string(),
    }]);
    let combined_dir = tmp.path().join("6hour_bins_Combined");
    let report = combine_directory(&binned, &combined_dir, &config).expect("combine");
    assert_eq!(report.written.len(), OUTPUT_VARIABLES.len());
    assert_eq!(report.skipped.len(), 1);

    let acc = read_table(&combined_dir.join("FEED1 ACC.csv")).expect("combined table");
    let names: Vec<String> = acc.get_column_names().iter().map(|n| n.to_string()).collect();
    assert_eq!(names, ["ID", "GROUP_LABEL", "DAY", "HOUR", "24 HOUR", "FEED1 ACC"]);
    assert_eq!(acc.height(), 8);

    let report = reformat_directory(&combined_dir).expect("reformat");
    assert_eq!(report.written.len(), OUTPUT_VARIABLES.len());
    let wide = read_table(
        &combined_dir
            .join("Reformatted")
            .join("reformatted_FEED1 ACC.csv"),
    )
    .expect("reformatted table");
    assert_eq!(wide.height(), 2);
    assert_eq!(wide.width(), 3 + 4);
    assert_eq!(
        f64_values(&wide, "FEED1 ACC_24").unwrap(),
        vec![Some(3.5), Some(3.5)]
    );
}
