// crates/atmocat-core/src/error.rs

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use atmocat_parser::ParserError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Site,
    Group,
    Instrument,
    Variable,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Site => "site",
            EntityKind::Group => "group",
            EntityKind::Instrument => "instrument",
            EntityKind::Variable => "variable",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("unknown {kind} '{code}'")]
    UnknownEntity { kind: EntityKind, code: String },

    #[error("unreadable file {path}: {source}")]
    UnreadableFile {
        path: PathBuf,
        #[source]
        source: ParserError,
    },

    #[error("standardization failed for {path}: {message}")]
    Standardization { path: PathBuf, message: String },

    #[error("invalid time range: start {start} is after stop {stop}")]
    InvalidTimeRange { start: String, stop: String },

    #[error("invalid time string '{0}'")]
    InvalidTimeString(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
