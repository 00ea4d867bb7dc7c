use crate::errors::ParserError;
use crate::model::{FileMetadata, RawTable};
use crate::registry::RawFileParser;

use super::common::looks_numeric;
use super::{build_raw_dataframe, parse_optional_f64, ColumnData, ColumnValues};

/// Analyzer `.dat` output: columns separated by runs of spaces, one header
/// row, `EPOCH_TIME` in fractional seconds since the Unix epoch. Not csv
/// territory; the rows are tokenized directly.
pub struct PicarroDatParser;

impl Default for PicarroDatParser {
    fn default() -> Self {
        Self
    }
}

impl PicarroDatParser {
    const NAME: &'static str = "PICARRO_DAT";
    const TIME_COLUMN: &'static str = "EPOCH_TIME";
}

impl RawFileParser for PicarroDatParser {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(&self, content: &str) -> Result<RawTable, ParserError> {
        let mut lines = content.lines().enumerate();

        let (_, header_line) = lines.next().ok_or(ParserError::FormatMismatch {
            parser: Self::NAME,
            reason: "file is empty".to_string(),
        })?;

        let columns: Vec<&str> = header_line.split_whitespace().collect();
        if columns.is_empty() || header_line.contains(',') {
            return Err(ParserError::FormatMismatch {
                parser: Self::NAME,
                reason: "header is not space-delimited".to_string(),
            });
        }
        if !columns.contains(&Self::TIME_COLUMN) {
            return Err(ParserError::FormatMismatch {
                parser: Self::NAME,
                reason: format!("header has no '{}' column", Self::TIME_COLUMN),
            });
        }

        let mut data: Vec<ColumnData> = Vec::with_capacity(columns.len());
        let mut row_count = 0usize;

        for (line_idx, line) in lines {
            if line.trim().is_empty() {
                continue;
            }
            let line_index = line_idx + 1;

            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() != columns.len() {
                return Err(ParserError::DataRow {
                    parser: Self::NAME,
                    line_index,
                    message: format!(
                        "expected {} columns but found {}",
                        columns.len(),
                        tokens.len()
                    ),
                });
            }

            if row_count == 0 {
                for (name, sample) in columns.iter().zip(tokens.iter()) {
                    if looks_numeric(sample) {
                        data.push(ColumnData::float(*name));
                    } else {
                        data.push(ColumnData::str(*name));
                    }
                }
            }

            for (idx, column) in data.iter_mut().enumerate() {
                let value = tokens[idx];
                match &mut column.values {
                    ColumnValues::Float(values) => {
                        values.push(parse_optional_f64(
                            Self::NAME,
                            value,
                            line_index,
                            columns[idx],
                        )?);
                    }
                    ColumnValues::Str(values) => {
                        values.push(Some(value.to_string()));
                    }
                    ColumnValues::TimestampMicros(_) => {
                        unreachable!("picarro has no micros column")
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
            file_metadata: FileMetadata::bare("PICARRO_DAT"),
            df,
        })
    }
}
