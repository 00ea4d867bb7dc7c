use csv::StringRecord;

use crate::errors::ParserError;
use crate::model::{FileMetadata, RawTable};
use crate::registry::RawFileParser;

use super::common::looks_numeric;
use super::{build_raw_dataframe, parse_optional_f64, parse_timestamp_micros, ColumnData, ColumnValues};

/// Campbell Scientific TOA5 table files: one metadata row, one column-name
/// row, one units row, one record-type row, then data. Column names are kept
/// exactly as written; the catalog's standardization layer owns renaming.
pub struct Toa5Parser;

impl Default for Toa5Parser {
    fn default() -> Self {
        Self
    }
}

impl Toa5Parser {
    const NAME: &'static str = "TOA5";

    fn parse_file_metadata(header: &StringRecord) -> Result<FileMetadata, ParserError> {
        if header.len() < 8 {
            return Err(ParserError::FormatMismatch {
                parser: Self::NAME,
                reason: format!("expected at least 8 header fields, found {}", header.len()),
            });
        }

        let file_format = header.get(0).unwrap_or_default();
        if !file_format.eq_ignore_ascii_case("toa5") {
            return Err(ParserError::FormatMismatch {
                parser: Self::NAME,
                reason: format!("unsupported file format '{file_format}'"),
            });
        }

        Ok(FileMetadata::new(
            "TOA5",
            clean_optional(header.get(1)),
            clean_optional(header.get(2)),
            clean_optional(header.get(5)),
            clean_optional(header.get(7)),
        ))
    }
}

fn clean_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

impl RawFileParser for Toa5Parser {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(&self, content: &str) -> Result<RawTable, ParserError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(content.as_bytes());

        let mut records = reader.records();

        let header = records
            .next()
            .ok_or(ParserError::FormatMismatch {
                parser: Self::NAME,
                reason: "file missing metadata header".to_string(),
            })?
            .map_err(|err| ParserError::Csv {
                parser: Self::NAME,
                source: err,
            })?;
        let metadata = Self::parse_file_metadata(&header)?;

        let columns = records
            .next()
            .ok_or(ParserError::FormatMismatch {
                parser: Self::NAME,
                reason: "file missing column header row".to_string(),
            })?
            .map_err(|err| ParserError::Csv {
                parser: Self::NAME,
                source: err,
            })?;

        let first_column = columns.get(0).unwrap_or_default();
        if !first_column.eq_ignore_ascii_case("timestamp") {
            return Err(ParserError::FormatMismatch {
                parser: Self::NAME,
                reason: format!("first column '{first_column}' is not a TOA5 timestamp"),
            });
        }

        let units = records
            .next()
            .ok_or(ParserError::FormatMismatch {
                parser: Self::NAME,
                reason: "file missing units row".to_string(),
            })?
            .map_err(|err| ParserError::Csv {
                parser: Self::NAME,
                source: err,
            })?;

        let record_types = records
            .next()
            .ok_or(ParserError::FormatMismatch {
                parser: Self::NAME,
                reason: "file missing record-type row".to_string(),
            })?
            .map_err(|err| ParserError::Csv {
                parser: Self::NAME,
                source: err,
            })?;

        if units.len() != columns.len() || record_types.len() != columns.len() {
            return Err(ParserError::InvalidHeader {
                parser: Self::NAME,
                row_index: 3,
                message: "header rows have inconsistent column counts".to_string(),
            });
        }

        let mut data: Vec<ColumnData> = Vec::with_capacity(columns.len());
        data.push(ColumnData::timestamp(first_column.trim()));

        let mut row_count = 0usize;

        for (row_idx, record) in records.enumerate() {
            let record = record.map_err(|err| ParserError::Csv {
                parser: Self::NAME,
                source: err,
            })?;
            // account for four header rows (1-indexed)
            let line_index = row_idx + 5;

            if record.len() != columns.len() {
                return Err(ParserError::DataRow {
                    parser: Self::NAME,
                    line_index,
                    message: format!(
                        "expected {} columns but found {}",
                        columns.len(),
                        record.len()
                    ),
                });
            }

            if row_count == 0 {
                for idx in 1..columns.len() {
                    let name = columns.get(idx).unwrap_or_default().trim();
                    let sample = record.get(idx).unwrap_or_default();
                    if looks_numeric(sample) {
                        data.push(ColumnData::float(name));
                    } else {
                        data.push(ColumnData::str(name));
                    }
                }
            }

            for (idx, column) in data.iter_mut().enumerate() {
                let name = columns.get(idx).unwrap_or_default();
                let value = record.get(idx).unwrap_or_default();
                match &mut column.values {
                    ColumnValues::TimestampMicros(values) => {
                        values.push(Some(parse_timestamp_micros(
                            Self::NAME,
                            value,
                            line_index,
                        )?));
                    }
                    ColumnValues::Float(values) => {
                        values.push(parse_optional_f64(Self::NAME, value, line_index, name)?);
                    }
                    ColumnValues::Str(values) => {
                        let trimmed = value.trim();
                        values.push(if trimmed.is_empty() {
                            None
                        } else {
                            Some(trimmed.to_string())
                        });
                    }
                }
            }

            row_count += 1;
        }

        if row_count == 0 {
            return Err(ParserError::EmptyData { parser: Self::NAME });
        }

        let df = build_raw_dataframe(Self::NAME, data, row_count)?;

        Ok(RawTable {
            file_metadata: metadata,
            df,
        })
    }
}
