use csv::{ReaderBuilder, StringRecord};

use crate::errors::ParserError;
use crate::model::{ParsedRunFile, RunHeader};
use crate::registry::ClamsParser;

use super::schema::{columns, ExportLayout, OXYMAX_V1, SUBJECT_ID_MARKER};
use super::{find_subject_id, frame_from_records, split_fields};

/// Oxymax/CLAMS CSV export: metadata preamble, one header row, formatting
/// rows, then one row per measurement interval.
#[derive(Debug, Clone, Copy)]
pub struct OxymaxCsvParser {
    layout: ExportLayout,
}

impl Default for OxymaxCsvParser {
    fn default() -> Self {
        Self { layout: OXYMAX_V1 }
    }
}

impl OxymaxCsvParser {
    const NAME: &'static str = "CLAMS_OXYMAX";

    pub fn with_layout(layout: ExportLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ExportLayout {
        &self.layout
    }

    fn header_from_lines(&self, lines: &[&str]) -> Result<RunHeader, ParserError> {
        let header_index = self.layout.header_line_index();
        let Some(header_line) = lines.get(header_index) else {
            return Err(ParserError::FormatMismatch {
                parser: Self::NAME,
                reason: format!(
                    "expected a column header on line {}, file has {} lines",
                    header_index + 1,
                    lines.len()
                ),
            });
        };

        let columns = split_fields(header_line);
        for required in [columns::INTERVAL, columns::DATE_TIME] {
            if !columns.iter().any(|column| column == required) {
                return Err(ParserError::FormatMismatch {
                    parser: Self::NAME,
                    reason: format!(
                        "line {} is not a {} column header (no '{required}')",
                        header_index + 1,
                        self.layout.name
                    ),
                });
            }
        }

        let mut seen = std::collections::HashSet::new();
        if let Some(duplicate) = columns
            .iter()
            .filter(|column| !column.is_empty())
            .find(|column| !seen.insert(column.as_str()))
        {
            return Err(ParserError::InvalidHeader {
                parser: Self::NAME,
                row_index: header_index,
                message: format!("duplicate column '{duplicate}'"),
            });
        }

        let subject_id = find_subject_id(lines.iter().copied(), &self.layout).ok_or(
            ParserError::MissingSubjectId {
                parser: Self::NAME,
                marker: SUBJECT_ID_MARKER,
            },
        )?;

        Ok(RunHeader {
            layout: self.layout,
            subject_id,
            columns,
        })
    }
}

impl ClamsParser for OxymaxCsvParser {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn read_header(&self, content: &str) -> Result<RunHeader, ParserError> {
        let lines: Vec<&str> = content.lines().collect();
        self.header_from_lines(&lines)
    }

    fn parse(&self, content: &str) -> Result<ParsedRunFile, ParserError> {
        let lines: Vec<&str> = content.lines().collect();
        let header = self.header_from_lines(&lines)?;

        let body = lines[self.layout.header_line_index() + 1..]
            .iter()
            .filter(|line| !line.trim().is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("\n");

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(body.as_bytes());

        let mut rows: Vec<StringRecord> = Vec::new();
        let mut malformed_rows = 0usize;
        for (index, record) in reader.records().enumerate() {
            let record = record.map_err(|source| ParserError::Csv {
                parser: Self::NAME,
                source,
            })?;
            if index < self.layout.formatting_rows {
                continue;
            }
            if record.len() != header.columns.len() {
                malformed_rows += 1;
                continue;
            }
            rows.push(record);
        }

        if rows.is_empty() {
            return Err(ParserError::EmptyData { parser: Self::NAME });
        }

        let df = frame_from_records(&header.columns, &rows).map_err(|err| {
            ParserError::Validation {
                parser: Self::NAME,
                message: err.to_string(),
            }
        })?;

        Ok(ParsedRunFile {
            header,
            df,
            malformed_rows,
        })
    }
}
