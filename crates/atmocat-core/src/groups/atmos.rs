//! The university trace-gas group: Campbell TOA5 datalogger tables, monthly
//! files, naive-UTC timestamps, and a leveled archive
//! (raw/qaqc/calibrated/final).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use polars::prelude::DataFrame;

use atmocat_parser::formats::Toa5Parser;

use crate::config::GroupEntry;
use crate::error::Result;
use crate::groupspace::{read_with, DataLevel, GroupSpace};
use crate::registry::{Instrument, Site};
use crate::resolver::{self, FileLayout, Granularity, PathVars};
use crate::standardize::{ColumnMap, ColumnMapping, TimeSpec, UnmappedPolicy};
use crate::timerange::TimeRange;

pub struct AtmosSpace {
    code: String,
    root: PathBuf,
    policy: UnmappedPolicy,
    time_spec: TimeSpec,
    mappings: HashMap<&'static str, ColumnMapping>,
    default_mapping: ColumnMapping,
}

impl AtmosSpace {
    pub fn new(entry: &GroupEntry) -> Result<Self> {
        let mut mappings = HashMap::new();
        mappings.insert(
            "co2",
            ColumnMapping::new(vec![
                ColumnMap::direct("CO2_ppm", "co2_concentration"),
                ColumnMap::direct("CH4_ppm", "ch4_concentration"),
                ColumnMap::direct("QAQC_Flag", "qaqc_flag"),
            ])?,
        );
        mappings.insert(
            "o3",
            ColumnMapping::new(vec![
                ColumnMap::direct("O3_ppb", "o3_concentration"),
                ColumnMap::direct("QAQC_Flag", "qaqc_flag"),
            ])?,
        );
        mappings.insert(
            "met",
            ColumnMapping::new(vec![
                ColumnMap::direct("AirT_C", "temperature_c"),
                ColumnMap::direct("RH_pct", "relative_humidity_pct"),
                ColumnMap::direct("Press_hPa", "pressure_hpa"),
                ColumnMap::direct("QAQC_Flag", "qaqc_flag"),
            ])?,
        );

        Ok(Self {
            code: entry.code.clone(),
            root: entry.root.clone(),
            policy: if entry.passthrough_unmapped {
                UnmappedPolicy::Passthrough
            } else {
                UnmappedPolicy::Drop
            },
            time_spec: TimeSpec::Datetime {
                column: "TIMESTAMP",
            },
            mappings,
            default_mapping: ColumnMapping::default(),
        })
    }
}

impl GroupSpace for AtmosSpace {
    fn name(&self) -> &str {
        &self.code
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn layout(&self, _instrument: &Instrument) -> FileLayout {
        FileLayout {
            template: "{site}/{instrument}/{lvl}/{SITE}_{instrument}_{YYYY}_{MM}.dat".to_string(),
            granularity: Granularity::Monthly,
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

    // The archive keeps one directory per processing level; serve the
    // highest level that has any files for the query.
    fn resolve_paths(
        &self,
        site: &Site,
        instrument: &Instrument,
        range: &TimeRange,
    ) -> Result<Vec<PathBuf>> {
        let layout = self.layout(instrument);
        for lvl in DataLevel::DESCENDING {
            let vars = PathVars {
                site: &site.code,
                instrument: &instrument.code,
                lvl: Some(lvl.as_str()),
            };
            let paths = resolver::resolve(&self.root, &layout, &vars, range)?;
            if !paths.is_empty() {
                return Ok(paths);
            }
        }
        Ok(Vec::new())
    }

    fn read(&self, path: &Path) -> Result<DataFrame> {
        read_with(&Toa5Parser, path)
    }
}
