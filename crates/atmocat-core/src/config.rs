//! Catalog manifest. Sites, instruments, groups, and merge priorities are
//! declared in TOML and loaded once at Laboratory construction.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;

#[derive(Debug, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub sites: Vec<SiteEntry>,
    #[serde(default)]
    pub groups: Vec<GroupEntry>,
    #[serde(default)]
    pub priority: Vec<PriorityEntry>,
}

#[derive(Debug, Deserialize)]
pub struct SiteEntry {
    pub code: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation_m: f64,
    /// IANA zone name, e.g. "America/Denver".
    pub timezone: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub instruments: Vec<InstrumentEntry>,
}

#[derive(Debug, Deserialize)]
pub struct InstrumentEntry {
    pub code: String,
    pub group: String,
    pub variables: Vec<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub calibration_note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GroupEntry {
    pub code: String,
    pub root: PathBuf,
    #[serde(default)]
    pub passthrough_unmapped: bool,
}

/// Per-variable group precedence for `get_obs` merges. Groups not listed
/// fall back to registration order.
#[derive(Debug, Deserialize)]
pub struct PriorityEntry {
    pub variable: String,
    pub groups: Vec<String>,
}

fn default_active() -> bool {
    true
}

impl CatalogConfig {
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }
}
