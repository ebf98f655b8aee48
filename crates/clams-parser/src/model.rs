use std::fmt;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::formats::schema::ExportLayout;

/// Animal identifier taken from the `Subject ID` line of an export.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err("subject id is empty".to_string());
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Form of the id that is safe to embed in a file name. ASCII
    /// alphanumerics and `-` are kept; every other byte is written as `%XX`,
    /// so the token never contains the `_` separator used by downstream file
    /// names and [`SubjectId::from_file_token`] restores the id exactly.
    pub fn file_token(&self) -> String {
        let mut token = String::with_capacity(self.0.len());
        for byte in self.0.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' {
                token.push(char::from(byte));
            } else {
                token.push_str(&format!("%{byte:02X}"));
            }
        }
        token
    }

    pub fn from_file_token(token: &str) -> Option<Self> {
        let bytes = token.as_bytes();
        let mut decoded = Vec::with_capacity(bytes.len());
        let mut idx = 0;
        while idx < bytes.len() {
            if bytes[idx] == b'%' {
                let hex = bytes.get(idx + 1..idx + 3)?;
                if !hex.iter().all(u8::is_ascii_hexdigit) {
                    return None;
                }
                let hex = std::str::from_utf8(hex).ok()?;
                decoded.push(u8::from_str_radix(hex, 16).ok()?);
                idx += 3;
            } else {
                decoded.push(bytes[idx]);
                idx += 1;
            }
        }
        let raw = String::from_utf8(decoded).ok()?;
        SubjectId::new(&raw).ok()
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for SubjectId {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        SubjectId::new(value)
    }
}

/// Everything above the data rows: which layout matched, the animal, and the
/// column names of the tabular body.
#[derive(Debug, Clone)]
pub struct RunHeader {
    pub layout: ExportLayout,
    pub subject_id: SubjectId,
    pub columns: Vec<String>,
}

impl RunHeader {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }
}

#[derive(Debug, Clone)]
pub struct ParsedRunFile {
    pub header: RunHeader,
    pub df: DataFrame,
    /// Body rows discarded because their field count did not match the header.
    pub malformed_rows: usize,
}

impl ParsedRunFile {
    pub fn subject_id(&self) -> &SubjectId {
        &self.header.subject_id
    }
}
