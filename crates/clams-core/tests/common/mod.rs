#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate, NaiveDateTime};

pub const HEADER: &str = "INTERVAL,CHAN,DATE/TIME,VO2,O2IN,O2OUT,DO2,ACCO2,VCO2,CO2IN,CO2OUT,DCO2,ACCCO2,RER,HEAT,FLOW,STATUS1,PRESSURE,FEED1,FEED1 ACC,XTOT,XAMB,YTOT,YAMB,WHEEL,WHEEL ACC,ENCLOSURE TEMP,ENCLOSURE SETPOINT,LED LIGHTNESS,LED HUE,LED SATURATION,";

pub const ROW_MINUTES: i64 = 30;
pub const WHEEL_PER_ROW: f64 = 2.0;
pub const FEED_PER_ROW: f64 = 0.25;
pub const AMB_PER_ROW: f64 = 4.0;

pub fn experiment_start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(7, 0, 0)
        .unwrap()
}

/// LED level for a row: 12 hours lit, 12 hours dark, starting lit.
pub fn led_for(elapsed_minutes: i64) -> i64 {
    if (elapsed_minutes / (12 * 60)) % 2 == 0 {
        100
    } else {
        0
    }
}

fn preamble(subject: Option<&str>) -> Vec<String> {
    let mut lines = vec![
        "Oxymax Windows V 5.66.7 Build 20 Customer #: 15,Columbus Instruments".to_string(),
        "File,C:\\Oxymax\\exports\\cohort.CDTA".to_string(),
        "Group/Cage,0101".to_string(),
    ];
    if let Some(subject) = subject {
        lines.push(format!("Subject ID,{subject}"));
    }
    lines.push("Subject Mass,25.1".to_string());
    while lines.len() < 22 {
        lines.push(format!("Parameter {},setting", lines.len()));
    }
    lines
}

/// Raw export whose rows carry the given INTERVAL numbers, 30 minutes apart
/// from `start`.
pub fn raw_export_intervals(subject: Option<&str>, start: NaiveDateTime, intervals: &[i64]) -> String {
    let mut lines = preamble(subject);
    lines.push(HEADER.to_string());
    lines.push(",,,ml/kg/hr,%,%,%,liters,ml/kg/hr,%,%,%,liters,,kcal/hr,lpm,,mmhg,g,g,counts,counts,counts,counts,counts,counts,C,C,%,,,".to_string());
    lines.push("=====,".to_string());

    for (row, interval) in intervals.iter().enumerate() {
        let step = row as i64;
        let elapsed = step * ROW_MINUTES;
        let ts = start + Duration::minutes(elapsed);
        let acc = (step + 1) as f64;
        lines.push(format!(
            "{interval},1,{ts},{vo2},20.93,20.50,0.43,{acco2},2700.0,0.05,0.50,0.45,{accco2},0.90,0.50,0.60,0,760,{feed},{feed_acc},10,3,5,1,{wheel},{wheel_acc},22.5,22.0,{led},0,0,",
            ts = ts.format("%m/%d/%Y %I:%M:%S %p"),
            vo2 = 3000.0 + step as f64,
            acco2 = 1.5 * acc,
            accco2 = 1.25 * acc,
            feed = FEED_PER_ROW,
            feed_acc = FEED_PER_ROW * acc,
            wheel = WHEEL_PER_ROW,
            wheel_acc = WHEEL_PER_ROW * acc,
            led = led_for(elapsed),
        ));
    }
    lines.join("\r\n") + "\r\n"
}

pub fn raw_export(subject: &str, rows: usize) -> String {
    let intervals: Vec<i64> = (1..=rows as i64).collect();
    raw_export_intervals(Some(subject), experiment_start(), &intervals)
}

pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    fs::create_dir_all(dir).expect("create fixture dir");
    let path = dir.join(name);
    fs::write(&path, content).expect("write fixture");
    path
}

pub fn write_config(dir: &Path, rows: &[(&str, &str)]) -> PathBuf {
    let mut content = String::from("ID,GROUP_LABEL\n");
    for (id, label) in rows {
        content.push_str(&format!("{id},{label}\n"));
    }
    write_file(&dir.join("config"), "experiment_config.csv", &content)
}
