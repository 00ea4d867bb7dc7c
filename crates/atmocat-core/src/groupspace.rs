//! The per-group capability contract. Each research group's data space
//! supplies a path layout, a native-format reader, and a standardization
//! contract; the Laboratory treats every group uniformly through this trait.

use std::path::{Path, PathBuf};

use polars::prelude::DataFrame;

use atmocat_parser::RawFileParser;

use crate::config::GroupEntry;
use crate::error::{CatalogError, EntityKind, Result};
use crate::groups::{AtmosSpace, GaslabSpace, MesonetSpace};
use crate::registry::{Instrument, Site};
use crate::resolver::{self, FileLayout, PathVars};
use crate::standardize::{
    standardize_frame, ColumnMapping, StandardizationError, TimeSpec, UnmappedPolicy,
};
use crate::timerange::TimeRange;

/// Archive processing levels, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DataLevel {
    Raw,
    Qaqc,
    Calibrated,
    Final,
}

impl DataLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataLevel::Raw => "raw",
            DataLevel::Qaqc => "qaqc",
            DataLevel::Calibrated => "calibrated",
            DataLevel::Final => "final",
        }
    }

    /// Highest level first; groups with leveled layouts read the best
    /// available.
    pub const DESCENDING: [DataLevel; 4] = [
        DataLevel::Final,
        DataLevel::Calibrated,
        DataLevel::Qaqc,
        DataLevel::Raw,
    ];
}

pub trait GroupSpace: Send + Sync {
    fn name(&self) -> &str;
    fn root(&self) -> &Path;
    fn layout(&self, instrument: &Instrument) -> FileLayout;
    fn column_mapping(&self, instrument: &Instrument) -> &ColumnMapping;
    fn time_spec(&self) -> &TimeSpec;
    fn unmapped_policy(&self) -> UnmappedPolicy;

    /// Parses one file in the group's native format into a raw table.
    fn read(&self, path: &Path) -> Result<DataFrame>;

    /// Existing files for the query, ascending chronological order.
    fn resolve_paths(
        &self,
        site: &Site,
        instrument: &Instrument,
        range: &TimeRange,
    ) -> Result<Vec<PathBuf>> {
        let layout = self.layout(instrument);
        let vars = PathVars {
            site: &site.code,
            instrument: &instrument.code,
            lvl: None,
        };
        resolver::resolve(self.root(), &layout, &vars, range)
    }

    fn standardize(
        &self,
        site: &Site,
        instrument: &Instrument,
        df: &DataFrame,
    ) -> std::result::Result<DataFrame, StandardizationError> {
        standardize_frame(
            self.name(),
            df,
            self.column_mapping(instrument),
            self.time_spec(),
            site.timezone,
            self.unmapped_policy(),
        )
    }
}

/// Constructs the concrete space for a configured group. New group
/// conventions register here; catalog and query logic stay untouched.
pub fn build_group_space(entry: &GroupEntry) -> Result<Box<dyn GroupSpace>> {
    match entry.code.to_ascii_lowercase().as_str() {
        "atmos" => Ok(Box::new(AtmosSpace::new(entry)?)),
        "mesonet" => Ok(Box::new(MesonetSpace::new(entry)?)),
        "gaslab" => Ok(Box::new(GaslabSpace::new(entry)?)),
        _ => Err(CatalogError::UnknownEntity {
            kind: EntityKind::Group,
            code: entry.code.clone(),
        }),
    }
}

pub(crate) fn read_with<P: RawFileParser>(parser: &P, path: &Path) -> Result<DataFrame> {
    let content = std::fs::read_to_string(path)?;
    let parsed = parser
        .parse(&content)
        .map_err(|source| CatalogError::UnreadableFile {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(parsed.df)
}
