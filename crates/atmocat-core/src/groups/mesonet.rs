//! The regional mesonet: flat daily CSV files in local wall-clock time.
//! Imperial units are converted at the standardization boundary.

use std::path::{Path, PathBuf};

use polars::prelude::DataFrame;

use atmocat_parser::formats::MesonetCsvParser;

use crate::config::GroupEntry;
use crate::error::Result;
use crate::groupspace::{read_with, GroupSpace};
use crate::registry::Instrument;
use crate::resolver::{FileLayout, Granularity};
use crate::standardize::{ColumnMap, ColumnMapping, TimeSpec, UnmappedPolicy};

// degF -> degC and inHg -> hPa as canonical = raw * scale + offset.
const FAHRENHEIT_SCALE: f64 = 5.0 / 9.0;
const FAHRENHEIT_OFFSET: f64 = -160.0 / 9.0;
const INHG_TO_HPA: f64 = 33.8639;

pub struct MesonetSpace {
    code: String,
    root: PathBuf,
    policy: UnmappedPolicy,
    time_spec: TimeSpec,
    mapping: ColumnMapping,
}

impl MesonetSpace {
    pub fn new(entry: &GroupEntry) -> Result<Self> {
        // One station file carries every instrument's columns, so a single
        // mapping covers the whole group.
        let mapping = ColumnMapping::new(vec![
            ColumnMap::direct("ozone_ppbv", "o3_concentration"),
            ColumnMap::direct("PM_25_concentration", "pm25_concentration"),
            ColumnMap::scaled("air_temp_F", "temperature_c", FAHRENHEIT_SCALE, FAHRENHEIT_OFFSET),
            ColumnMap::direct("relative_humidity", "relative_humidity_pct"),
            ColumnMap::scaled("altimeter_inHg", "pressure_hpa", INHG_TO_HPA, 0.0),
            ColumnMap::direct("qc_flag", "qaqc_flag"),
        ])?;

        Ok(Self {
            code: entry.code.clone(),
            root: entry.root.clone(),
            policy: if entry.passthrough_unmapped {
                UnmappedPolicy::Passthrough
            } else {
                UnmappedPolicy::Drop
            },
            time_spec: TimeSpec::LocalString {
                column: "Date_Time",
                formats: &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"],
            },
            mapping,
        })
    }
}

impl GroupSpace for MesonetSpace {
    fn name(&self) -> &str {
        &self.code
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn layout(&self, _instrument: &Instrument) -> FileLayout {
        FileLayout {
            template: "{site}/{YYYY}/{MM}/{site}_{YYYY}{MM}{DD}.csv".to_string(),
            granularity: Granularity::Daily,
        }
    }

    fn column_mapping(&self, _instrument: &Instrument) -> &ColumnMapping {
        &self.mapping
    }

    fn time_spec(&self) -> &TimeSpec {
        &self.time_spec
    }

    fn unmapped_policy(&self) -> UnmappedPolicy {
        self.policy
    }

    fn read(&self, path: &Path) -> Result<DataFrame> {
        read_with(&MesonetCsvParser, path)
    }
}
