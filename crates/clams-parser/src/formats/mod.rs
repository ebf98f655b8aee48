mod common;
mod oxymax_csv;
pub mod schema;

pub use common::{
    find_subject_id, frame_from_records, parse_timestamp, split_fields, TIMESTAMP_OUTPUT_FORMAT,
};
pub use oxymax_csv::OxymaxCsvParser;
