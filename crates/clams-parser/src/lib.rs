pub mod errors;
pub mod formats;
pub mod model;
mod registry;

pub use errors::{ParserAttempt, ParserError};
pub use formats::schema::{columns, ExportLayout, OXYMAX_V1, SUBJECT_ID_MARKER};
pub use formats::{
    find_subject_id, frame_from_records, parse_timestamp, split_fields, OxymaxCsvParser,
    TIMESTAMP_OUTPUT_FORMAT,
};
pub use model::{ParsedRunFile, RunHeader, SubjectId};
pub use registry::{
    parse_clams_file, parse_with_parsers, read_run_header, read_run_header_with_parsers,
    ClamsParser,
};
