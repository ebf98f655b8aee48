use crate::errors::{ParserAttempt, ParserError};
use crate::formats::OxymaxCsvParser;
use crate::model::{ParsedRunFile, RunHeader};

pub trait ClamsParser {
    fn name(&self) -> &'static str;
    fn read_header(&self, content: &str) -> Result<RunHeader, ParserError>;
    fn parse(&self, content: &str) -> Result<ParsedRunFile, ParserError>;
}

pub fn parse_clams_file(content: &str) -> Result<ParsedRunFile, ParserError> {
    let oxymax = OxymaxCsvParser::default();
    let parsers: [&dyn ClamsParser; 1] = [&oxymax];
    parse_with_parsers(content, &parsers)
}

pub fn read_run_header(content: &str) -> Result<RunHeader, ParserError> {
    let oxymax = OxymaxCsvParser::default();
    let parsers: [&dyn ClamsParser; 1] = [&oxymax];
    read_run_header_with_parsers(content, &parsers)
}

pub fn parse_with_parsers(
    content: &str,
    parsers: &[&dyn ClamsParser],
) -> Result<ParsedRunFile, ParserError> {
    first_match(parsers, |parser| parser.parse(content))
}

pub fn read_run_header_with_parsers(
    content: &str,
    parsers: &[&dyn ClamsParser],
) -> Result<RunHeader, ParserError> {
    first_match(parsers, |parser| parser.read_header(content))
}

fn first_match<T>(
    parsers: &[&dyn ClamsParser],
    mut attempt: impl FnMut(&dyn ClamsParser) -> Result<T, ParserError>,
) -> Result<T, ParserError> {
    let mut attempts = Vec::new();

    for parser in parsers {
        match attempt(*parser) {
            Ok(parsed) => return Ok(parsed),
            Err(ParserError::FormatMismatch { reason, .. }) => {
                attempts.push(ParserAttempt::new(parser.name(), reason));
            }
            Err(err) => return Err(err),
        }
    }

    Err(ParserError::NoMatchingParser { attempts })
}
