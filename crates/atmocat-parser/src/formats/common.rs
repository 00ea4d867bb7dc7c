use chrono::NaiveDateTime;
use polars::prelude::*;

use crate::errors::ParserError;

/// Accumulated values for one raw column. Timestamp columns become
/// `Datetime(Microseconds, None)` series; everything else stays as parsed.
#[derive(Debug, Clone)]
pub enum ColumnValues {
    Float(Vec<Option<f64>>),
    Str(Vec<Option<String>>),
    TimestampMicros(Vec<Option<i64>>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Float(v) => v.len(),
            ColumnValues::Str(v) => v.len(),
            ColumnValues::TimestampMicros(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct ColumnData {
    pub name: String,
    pub values: ColumnValues,
}

impl ColumnData {
    pub fn float(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::Float(Vec::new()),
        }
    }

    pub fn str(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::Str(Vec::new()),
        }
    }

    pub fn timestamp(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::TimestampMicros(Vec::new()),
        }
    }
}

pub(crate) fn build_raw_dataframe(
    parser: &'static str,
    columns: Vec<ColumnData>,
    row_count: usize,
) -> Result<DataFrame, ParserError> {
    let mut cols: Vec<Column> = Vec::with_capacity(columns.len());
    for column in columns {
        if column.values.len() != row_count {
            return Err(ParserError::Validation {
                parser,
                message: format!(
                    "column '{}' had {} rows, expected {row_count}",
                    column.name,
                    column.values.len()
                ),
            });
        }
        let series = match column.values {
            ColumnValues::Float(values) => Series::new(column.name.as_str().into(), values),
            ColumnValues::Str(values) => {
                let utf8: Vec<Option<&str>> = values.iter().map(|v| v.as_deref()).collect();
                Series::new(column.name.as_str().into(), utf8)
            }
            ColumnValues::TimestampMicros(values) => {
                Series::new(column.name.as_str().into(), values)
                    .cast(&DataType::Datetime(TimeUnit::Microseconds, None))
                    .map_err(|err| ParserError::Validation {
                        parser,
                        message: format!(
                            "failed to cast column '{}' to datetime: {err}",
                            column.name
                        ),
                    })?
            }
        };
        cols.push(series.into());
    }

    DataFrame::new(cols).map_err(|err| ParserError::Validation {
        parser,
        message: format!("failed to build raw dataframe: {err}"),
    })
}

pub(crate) fn parse_timestamp_micros(
    parser: &'static str,
    value: &str,
    line_index: usize,
) -> Result<i64, ParserError> {
    static FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];
    let trimmed = value.trim().trim_matches('"');
    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(dt.and_utc().timestamp_micros());
        }
    }
    Err(ParserError::DataRow {
        parser,
        line_index,
        message: format!("invalid timestamp '{trimmed}'"),
    })
}

// -9999 is the missing-value sentinel used across the archive formats.
const MISSING_SENTINEL: f64 = -9999.0;

pub(crate) fn parse_optional_f64(
    parser: &'static str,
    value: &str,
    line_index: usize,
    column: &str,
) -> Result<Option<f64>, ParserError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }

    match trimmed.parse::<f64>() {
        Ok(parsed) => {
            if (parsed - MISSING_SENTINEL).abs() < f64::EPSILON {
                Ok(None)
            } else {
                Ok(Some(parsed))
            }
        }
        Err(err) => Err(ParserError::DataRow {
            parser,
            line_index,
            message: format!("failed to parse column '{column}' as float: {err}"),
        }),
    }
}

/// A token is numeric-looking when the column should be accumulated as floats
/// rather than strings. Missing markers count as numeric so a leading gap does
/// not turn a data column into text.
pub(crate) fn looks_numeric(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") || trimmed.parse::<f64>().is_ok()
}
