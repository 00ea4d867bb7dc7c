use crate::errors::ParserError;
use crate::model::{FileMetadata, RawTable};
use crate::registry::RawFileParser;

use super::common::looks_numeric;
use super::{build_raw_dataframe, parse_optional_f64, ColumnData, ColumnValues};

/// Flat station CSV: a single header row naming a `Date_Time` column in local
/// wall-clock time, then one record per line. The time string stays a string
/// here; timezone resolution belongs to the standardization layer, which
/// knows the site.
pub struct MesonetCsvParser;

impl Default for MesonetCsvParser {
    fn default() -> Self {
        Self
    }
}

impl MesonetCsvParser {
    const NAME: &'static str = "MESONET_CSV";
    const TIME_COLUMN: &'static str = "Date_Time";
}

impl RawFileParser for MesonetCsvParser {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parse(&self, content: &str) -> Result<RawTable, ParserError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(content.as_bytes());

        let mut records = reader.records();

        let columns = records
            .next()
            .ok_or(ParserError::FormatMismatch {
                parser: Self::NAME,
                reason: "file missing header row".to_string(),
            })?
            .map_err(|err| ParserError::Csv {
                parser: Self::NAME,
                source: err,
            })?;

        if !columns.iter().any(|name| name.trim() == Self::TIME_COLUMN) {
            return Err(ParserError::FormatMismatch {
                parser: Self::NAME,
                reason: format!("header has no '{}' column", Self::TIME_COLUMN),
            });
        }

        let mut data: Vec<ColumnData> = Vec::with_capacity(columns.len());
        let mut row_count = 0usize;

        for (row_idx, record) in records.enumerate() {
            let record = record.map_err(|err| ParserError::Csv {
                parser: Self::NAME,
                source: err,
            })?;
            let line_index = row_idx + 2;

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
                for idx in 0..columns.len() {
                    let name = columns.get(idx).unwrap_or_default().trim();
                    let sample = record.get(idx).unwrap_or_default();
                    if name == Self::TIME_COLUMN || !looks_numeric(sample) {
                        data.push(ColumnData::str(name));
                    } else {
                        data.push(ColumnData::float(name));
                    }
                }
            }

            for (idx, column) in data.iter_mut().enumerate() {
                let name = columns.get(idx).unwrap_or_default();
                let value = record.get(idx).unwrap_or_default();
                match &mut column.values {
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
                    ColumnValues::TimestampMicros(_) => unreachable!("mesonet has no micros column"),
                }
            }

            row_count += 1;
        }

        if row_count == 0 {
            return Err(ParserError::EmptyData { parser: Self::NAME });
        }

        let df = build_raw_dataframe(Self::NAME, data, row_count)?;

        Ok(RawTable {
            file_metadata: FileMetadata::bare("MESONET_CSV"),
            df,
        })
    }
}
