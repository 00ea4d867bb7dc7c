use crate::errors::{ParserAttempt, ParserError};
use crate::formats::{MesonetCsvParser, PicarroDatParser, Toa5Parser};
use crate::model::RawTable;

pub trait RawFileParser {
    fn name(&self) -> &'static str;
    fn parse(&self, content: &str) -> Result<RawTable, ParserError>;
}

pub fn parse_raw_file(content: &str) -> Result<RawTable, ParserError> {
    let toa5 = Toa5Parser;
    let mesonet = MesonetCsvParser;
    let picarro = PicarroDatParser;
    let parsers: [&dyn RawFileParser; 3] = [&toa5, &picarro, &mesonet];
    parse_with_parsers(content, &parsers)
}

pub fn parse_with_parsers(
    content: &str,
    parsers: &[&dyn RawFileParser],
) -> Result<RawTable, ParserError> {
    let mut attempts = Vec::new();

    for parser in parsers {
        match parser.parse(content) {
            Ok(parsed) => return Ok(parsed),
            Err(ParserError::FormatMismatch { reason, .. }) => {
                attempts.push(ParserAttempt::new(parser.name(), reason));
            }
            Err(err) => return Err(err),
        }
    }

    Err(ParserError::NoMatchingParser { attempts })
}
