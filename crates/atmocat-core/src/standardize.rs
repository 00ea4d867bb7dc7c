//! The per-group standardization contract: rename raw columns to canonical
//! names, rescale units, and coerce time to `time_utc`. Raw names never
//! survive this layer; unmapped columns are dropped or kept under a
//! `raw_{group}_` prefix, never silently renamed.

use std::collections::HashSet;

use chrono::{LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use polars::prelude::*;
use thiserror::Error;

use crate::error::{CatalogError, Result};
use crate::schema::{self, TIME_COLUMN};

/// Per-file standardization failure; fatal for that file only.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StandardizationError(pub String);

/// One raw-to-canonical column translation: canonical = raw * scale + offset.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    pub raw: String,
    pub canonical: &'static str,
    pub scale: f64,
    pub offset: f64,
}

impl ColumnMap {
    pub fn direct(raw: impl Into<String>, canonical: &'static str) -> Self {
        Self::scaled(raw, canonical, 1.0, 0.0)
    }

    pub fn scaled(raw: impl Into<String>, canonical: &'static str, scale: f64, offset: f64) -> Self {
        Self {
            raw: raw.into(),
            canonical,
            scale,
            offset,
        }
    }
}

/// A group's complete translation table. Total over the raw columns the
/// group claims to support; validated against the canonical schema at
/// construction.
#[derive(Debug, Clone, Default)]
pub struct ColumnMapping {
    entries: Vec<ColumnMap>,
}

impl ColumnMapping {
    pub fn new(entries: Vec<ColumnMap>) -> Result<Self> {
        let mut raw_seen = HashSet::new();
        let mut canonical_seen = HashSet::new();
        for entry in &entries {
            if entry.canonical == TIME_COLUMN {
                return Err(CatalogError::Config(format!(
                    "column '{}' may not map onto '{TIME_COLUMN}'; time comes from the group's time spec",
                    entry.raw
                )));
            }
            if !schema::is_canonical(entry.canonical) {
                return Err(CatalogError::Config(format!(
                    "mapping target '{}' is not a canonical column",
                    entry.canonical
                )));
            }
            if !raw_seen.insert(entry.raw.as_str()) {
                return Err(CatalogError::Config(format!(
                    "raw column '{}' mapped twice",
                    entry.raw
                )));
            }
            if !canonical_seen.insert(entry.canonical) {
                return Err(CatalogError::Config(format!(
                    "canonical column '{}' produced twice",
                    entry.canonical
                )));
            }
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ColumnMap] {
        &self.entries
    }

    pub fn canonical_targets(&self) -> Vec<&'static str> {
        self.entries.iter().map(|entry| entry.canonical).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// How a raw table encodes observation time.
#[derive(Debug, Clone)]
pub enum TimeSpec {
    /// A parsed naive-UTC datetime column.
    Datetime { column: &'static str },
    /// Local wall-clock strings, resolved through the site's IANA zone.
    /// Ambiguous fall-back times take the first occurrence; spring-forward
    /// gap times are dropped.
    LocalString {
        column: &'static str,
        formats: &'static [&'static str],
    },
    /// Fractional seconds since the Unix epoch.
    EpochSeconds { column: &'static str },
}

impl TimeSpec {
    pub fn column(&self) -> &'static str {
        match self {
            TimeSpec::Datetime { column } => column,
            TimeSpec::LocalString { column, .. } => column,
            TimeSpec::EpochSeconds { column } => column,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmappedPolicy {
    Drop,
    Passthrough,
}

/// Applies a group's standardization contract to one raw table. The output
/// schema is always `time_utc` followed by every mapping target (null-filled
/// when the raw column is absent from this file), plus pass-through columns
/// when the policy keeps them. Rows without a resolvable timestamp are
/// dropped.
pub fn standardize_frame(
    group: &str,
    df: &DataFrame,
    mapping: &ColumnMapping,
    time_spec: &TimeSpec,
    timezone: Tz,
    policy: UnmappedPolicy,
) -> std::result::Result<DataFrame, StandardizationError> {
    let time_micros = resolve_time_micros(df, time_spec, timezone)?;

    if df.height() > 0 && time_micros.iter().all(Option::is_none) {
        return Err(StandardizationError(format!(
            "no usable timestamps in column '{}'",
            time_spec.column()
        )));
    }

    let keep: Vec<bool> = time_micros.iter().map(Option::is_some).collect();
    let filtered = if keep.iter().all(|flag| *flag) {
        df.clone()
    } else {
        let mask = BooleanChunked::from_slice("keep".into(), &keep);
        df.filter(&mask)
            .map_err(|err| StandardizationError(format!("failed to drop timeless rows: {err}")))?
    };

    let times: Vec<i64> = time_micros.into_iter().flatten().collect();
    let time_series = Series::new(TIME_COLUMN.into(), times)
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))
        .map_err(|err| StandardizationError(format!("failed to cast {TIME_COLUMN}: {err}")))?;

    let mut columns: Vec<Column> = vec![time_series.into()];
    let mut consumed: HashSet<String> = HashSet::new();
    consumed.insert(time_spec.column().to_string());

    for entry in mapping.entries() {
        consumed.insert(entry.raw.clone());
        let dtype = schema::canonical_column(entry.canonical)
            .map(|column| column.kind.dtype())
            .unwrap_or(DataType::Float64);

        let series = match filtered.column(&entry.raw) {
            Ok(column) => {
                let casted = column.cast(&DataType::Float64).map_err(|err| {
                    StandardizationError(format!(
                        "raw column '{}' is not numeric: {err}",
                        entry.raw
                    ))
                })?;
                let values = casted.f64().map_err(|err| {
                    StandardizationError(format!("raw column '{}': {err}", entry.raw))
                })?;
                let converted: Float64Chunked = values
                    .into_iter()
                    .map(|value| value.map(|x| x * entry.scale + entry.offset))
                    .collect();
                let mut series = converted.into_series();
                series.rename(entry.canonical.into());
                series.cast(&dtype).map_err(|err| {
                    StandardizationError(format!(
                        "failed to cast '{}' to canonical dtype: {err}",
                        entry.canonical
                    ))
                })?
            }
            Err(_) => Series::full_null(entry.canonical.into(), filtered.height(), &dtype),
        };
        columns.push(series.into());
    }

    if policy == UnmappedPolicy::Passthrough {
        let names: Vec<String> = filtered
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect();
        for name in names {
            if consumed.contains(&name) {
                continue;
            }
            let column = filtered
                .column(&name)
                .map_err(|err| StandardizationError(err.to_string()))?;
            let mut series = column.as_materialized_series().clone();
            series.rename(format!("raw_{group}_{}", name.to_ascii_lowercase()).into());
            columns.push(series.into());
        }
    }

    DataFrame::new(columns)
        .map_err(|err| StandardizationError(format!("failed to assemble canonical frame: {err}")))
}

fn resolve_time_micros(
    df: &DataFrame,
    time_spec: &TimeSpec,
    timezone: Tz,
) -> std::result::Result<Vec<Option<i64>>, StandardizationError> {
    let missing = |column: &str| {
        StandardizationError(format!("timestamp column '{column}' missing from raw table"))
    };

    match time_spec {
        TimeSpec::Datetime { column } => {
            let values = df
                .column(column)
                .map_err(|_| missing(column))?
                .datetime()
                .map_err(|err| StandardizationError(format!("column '{column}': {err}")))?;
            Ok((0..df.height()).map(|idx| values.get(idx)).collect())
        }
        TimeSpec::LocalString { column, formats } => {
            let values = df
                .column(column)
                .map_err(|_| missing(column))?
                .str()
                .map_err(|err| StandardizationError(format!("column '{column}': {err}")))?;
            Ok((0..df.height())
                .map(|idx| {
                    values
                        .get(idx)
                        .and_then(|value| parse_local_micros(value, formats, timezone))
                })
                .collect())
        }
        TimeSpec::EpochSeconds { column } => {
            let values = df
                .column(column)
                .map_err(|_| missing(column))?
                .f64()
                .map_err(|err| StandardizationError(format!("column '{column}': {err}")))?;
            Ok((0..df.height())
                .map(|idx| {
                    values
                        .get(idx)
                        .map(|seconds| (seconds * 1_000_000.0).round() as i64)
                })
                .collect())
        }
    }
}

fn parse_local_micros(value: &str, formats: &[&str], timezone: Tz) -> Option<i64> {
    let trimmed = value.trim();
    for fmt in formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            let resolved = match timezone.from_local_datetime(&naive) {
                LocalResult::Single(dt) => Some(dt),
                LocalResult::Ambiguous(first, _) => Some(first),
                LocalResult::None => None,
            };
            return resolved.map(|dt| dt.with_timezone(&Utc).timestamp_micros());
        }
    }
    None
}
