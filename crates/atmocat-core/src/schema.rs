//! Canonical observation columns. Every `column_mapping` target must name a
//! column registered here; raw group-specific names never cross this
//! boundary.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use polars::prelude::*;

/// Canonical timestamp column: UTC instants, microsecond resolution.
pub const TIME_COLUMN: &str = "time_utc";

/// Canonical QC flag column. Negative values mark rejected observations.
pub const QAQC_COLUMN: &str = "qaqc_flag";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Timestamp,
    Observation,
    Flag,
}

impl ColumnKind {
    pub fn dtype(&self) -> DataType {
        match self {
            ColumnKind::Timestamp => DataType::Datetime(TimeUnit::Microseconds, None),
            ColumnKind::Observation => DataType::Float64,
            ColumnKind::Flag => DataType::Int64,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CanonicalColumn {
    pub name: &'static str,
    pub unit: &'static str,
    pub kind: ColumnKind,
    pub description: &'static str,
}

static CANONICAL_COLUMNS: Lazy<Vec<CanonicalColumn>> = Lazy::new(|| {
    vec![
        CanonicalColumn {
            name: TIME_COLUMN,
            unit: "",
            kind: ColumnKind::Timestamp,
            description: "Observation timestamp, UTC",
        },
        CanonicalColumn {
            name: "co2_concentration",
            unit: "ppm",
            kind: ColumnKind::Observation,
            description: "Carbon dioxide dry-air mole fraction",
        },
        CanonicalColumn {
            name: "ch4_concentration",
            unit: "ppm",
            kind: ColumnKind::Observation,
            description: "Methane dry-air mole fraction",
        },
        CanonicalColumn {
            name: "co_concentration",
            unit: "ppb",
            kind: ColumnKind::Observation,
            description: "Carbon monoxide mole fraction",
        },
        CanonicalColumn {
            name: "o3_concentration",
            unit: "ppb",
            kind: ColumnKind::Observation,
            description: "Ozone mole fraction",
        },
        CanonicalColumn {
            name: "no2_concentration",
            unit: "ppb",
            kind: ColumnKind::Observation,
            description: "Nitrogen dioxide mole fraction",
        },
        CanonicalColumn {
            name: "pm25_concentration",
            unit: "ug/m3",
            kind: ColumnKind::Observation,
            description: "PM2.5 mass concentration",
        },
        CanonicalColumn {
            name: "temperature_c",
            unit: "degC",
            kind: ColumnKind::Observation,
            description: "Ambient air temperature",
        },
        CanonicalColumn {
            name: "relative_humidity_pct",
            unit: "%",
            kind: ColumnKind::Observation,
            description: "Relative humidity",
        },
        CanonicalColumn {
            name: "pressure_hpa",
            unit: "hPa",
            kind: ColumnKind::Observation,
            description: "Station pressure",
        },
        CanonicalColumn {
            name: QAQC_COLUMN,
            unit: "",
            kind: ColumnKind::Flag,
            description: "QC flag, negative values rejected",
        },
    ]
});

static BY_NAME: Lazy<HashMap<&'static str, usize>> = Lazy::new(|| {
    CANONICAL_COLUMNS
        .iter()
        .enumerate()
        .map(|(idx, column)| (column.name, idx))
        .collect()
});

pub fn all_canonical_columns() -> &'static [CanonicalColumn] {
    CANONICAL_COLUMNS.as_slice()
}

pub fn canonical_column(name: &str) -> Option<&'static CanonicalColumn> {
    BY_NAME.get(name).map(|idx| &CANONICAL_COLUMNS[*idx])
}

pub fn is_canonical(name: &str) -> bool {
    BY_NAME.contains_key(name)
}

/// Builds a zero-row frame whose columns are the given canonical names with
/// their registered dtypes. Unregistered names (pass-through columns) fall
/// back to Float64.
pub fn empty_observation_frame(names: &[&str]) -> PolarsResult<DataFrame> {
    let columns: Vec<Column> = names
        .iter()
        .map(|name| {
            let dtype = canonical_column(name)
                .map(|column| column.kind.dtype())
                .unwrap_or(DataType::Float64);
            Series::new_empty((*name).into(), &dtype).into()
        })
        .collect();
    DataFrame::new(columns)
}
