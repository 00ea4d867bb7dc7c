//! The laboratory analyzer group: yearly whitespace-delimited analyzer
//! dumps keyed by epoch seconds. Filenames embed the analyzer serial, so
//! the layout carries a wildcard.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use polars::prelude::DataFrame;

use atmocat_parser::formats::PicarroDatParser;

use crate::config::GroupEntry;
use crate::error::Result;
use crate::groupspace::{read_with, GroupSpace};
use crate::registry::Instrument;
use crate::resolver::{FileLayout, Granularity};
use crate::standardize::{ColumnMap, ColumnMapping, TimeSpec, UnmappedPolicy};

pub struct GaslabSpace {
    code: String,
    root: PathBuf,
    policy: UnmappedPolicy,
    time_spec: TimeSpec,
    mappings: HashMap<&'static str, ColumnMapping>,
    default_mapping: ColumnMapping,
}

impl GaslabSpace {
    pub fn new(entry: &GroupEntry) -> Result<Self> {
        let mut mappings = HashMap::new();
        mappings.insert(
            "picarro",
            ColumnMapping::new(vec![
                ColumnMap::direct("CO2_dry", "co2_concentration"),
                ColumnMap::direct("CH4_dry", "ch4_concentration"),
            ])?,
        );
        mappings.insert(
            "co",
            ColumnMapping::new(vec![ColumnMap::direct("CO_ppb", "co_concentration")])?,
        );

        Ok(Self {
            code: entry.code.clone(),
            root: entry.root.clone(),
            policy: if entry.passthrough_unmapped {
                UnmappedPolicy::Passthrough
            } else {
                UnmappedPolicy::Drop
            },
            time_spec: TimeSpec::EpochSeconds {
                column: "EPOCH_TIME",
            },
            mappings,
            default_mapping: ColumnMapping::default(),
        })
    }
}

impl GroupSpace for GaslabSpace {
    fn name(&self) -> &str {
        &self.code
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn layout(&self, _instrument: &Instrument) -> FileLayout {
        FileLayout {
            template: "{instrument}/{SITE}_*_{YYYY}.dat".to_string(),
            granularity: Granularity::Yearly,
        }
    }

    fn column_mapping(&self, instrument: &Instrument) -> &ColumnMapping {
        self.mappings
            .get(instrument.code.to_ascii_lowercase().as_str())
            .unwrap_or(&self.default_mapping)
    }

    fn time_spec(&self) -> &TimeSpec {
        &self.time_spec
    }

    fn unmapped_policy(&self) -> UnmappedPolicy {
        self.policy
    }

    fn read(&self, path: &Path) -> Result<DataFrame> {
        read_with(&PicarroDatParser, path)
    }
}
