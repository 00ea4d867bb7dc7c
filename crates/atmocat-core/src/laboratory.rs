//! The process-wide catalog facade. Built once from configuration,
//! immutable afterwards; every query walks registry -> resolver -> group
//! space and merges per-file tables into one canonical observation table.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use polars::prelude::*;
use tracing::{debug, warn};

use crate::config::CatalogConfig;
use crate::error::{CatalogError, EntityKind, Result};
use crate::groupspace::{build_group_space, GroupSpace};
use crate::registry::{Instrument, Site, SiteRegistry};
use crate::schema::{self, QAQC_COLUMN, TIME_COLUMN};
use crate::timerange::TimeRange;

/// One archive file excluded from a query result, with the reason. Partial
/// failure is expected; these are reported, never fatal.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// A standardized, time-sorted query result. `df` always carries the full
/// canonical schema for the query, even when empty.
#[derive(Debug, Clone)]
pub struct ObservationTable {
    pub df: DataFrame,
    pub skipped: Vec<SkippedFile>,
}

impl ObservationTable {
    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }
}

pub struct Laboratory {
    registry: SiteRegistry,
    /// Registration order doubles as the fallback merge precedence.
    groups: Vec<(String, Box<dyn GroupSpace>)>,
    priority: HashMap<String, Vec<String>>,
}

impl std::fmt::Debug for Laboratory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Laboratory")
            .field("registry", &self.registry)
            .field(
                "groups",
                &self.groups.iter().map(|(code, _)| code).collect::<Vec<_>>(),
            )
            .field("priority", &self.priority)
            .finish()
    }
}

impl Laboratory {
    pub fn from_config(config: CatalogConfig) -> Result<Self> {
        let mut groups: Vec<(String, Box<dyn GroupSpace>)> = Vec::new();
        for entry in &config.groups {
            let key = entry.code.to_ascii_lowercase();
            if groups.iter().any(|(code, _)| *code == key) {
                return Err(CatalogError::Config(format!(
                    "duplicate group code '{}'",
                    entry.code
                )));
            }
            groups.push((key, build_group_space(entry)?));
        }

        let mut entries = Vec::new();
        for site_entry in config.sites {
            let timezone: chrono_tz::Tz = site_entry.timezone.parse().map_err(|_| {
                CatalogError::Config(format!(
                    "site '{}' has invalid timezone '{}'",
                    site_entry.code, site_entry.timezone
                ))
            })?;

            let mut instruments = Vec::new();
            for instrument in site_entry.instruments {
                let group_key = instrument.group.to_ascii_lowercase();
                if !groups.iter().any(|(code, _)| *code == group_key) {
                    return Err(CatalogError::Config(format!(
                        "instrument '{}' at site '{}' references unregistered group '{}'",
                        instrument.code, site_entry.code, instrument.group
                    )));
                }
                for variable in &instrument.variables {
                    if !schema::is_canonical(variable) {
                        return Err(CatalogError::Config(format!(
                            "instrument '{}' at site '{}' reports unknown variable '{}'",
                            instrument.code, site_entry.code, variable
                        )));
                    }
                }
                instruments.push(Instrument {
                    code: instrument.code,
                    group: group_key,
                    variables: instrument.variables,
                    model: instrument.model,
                    calibration_note: instrument.calibration_note,
                });
            }

            let site = Site {
                code: site_entry.code,
                name: site_entry.name,
                latitude: site_entry.latitude,
                longitude: site_entry.longitude,
                elevation_m: site_entry.elevation_m,
                timezone,
                active: site_entry.active,
                instruments,
            };
            entries.push((site, site_entry.aliases));
        }
        let registry = SiteRegistry::build(entries)?;

        let mut priority = HashMap::new();
        for entry in config.priority {
            if !schema::is_canonical(&entry.variable) {
                return Err(CatalogError::Config(format!(
                    "priority entry names unknown variable '{}'",
                    entry.variable
                )));
            }
            let order: Vec<String> = entry
                .groups
                .iter()
                .map(|code| code.to_ascii_lowercase())
                .collect();
            priority.insert(entry.variable, order);
        }

        Ok(Self {
            registry,
            groups,
            priority,
        })
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        Self::from_config(CatalogConfig::from_toml_str(toml_str)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_config(CatalogConfig::from_path(path)?)
    }

    pub fn get_site(&self, code: &str) -> Result<&Site> {
        self.registry.get_site(code)
    }

    pub fn sites(&self) -> &[Site] {
        self.registry.sites()
    }

    fn group_space(&self, code: &str) -> Result<&dyn GroupSpace> {
        let key = code.to_ascii_lowercase();
        self.groups
            .iter()
            .find(|(registered, _)| *registered == key)
            .map(|(_, space)| space.as_ref())
            .ok_or_else(|| CatalogError::UnknownEntity {
                kind: EntityKind::Group,
                code: code.to_string(),
            })
    }

    /// Reads one (site, group, instrument) series over the range. Unreadable
    /// or unstandardizable files are skipped and reported; duplicate
    /// timestamps keep the row from the most recently modified source file,
    /// ties broken first-seen in resolution order.
    pub fn read_data(
        &self,
        site_code: &str,
        group: &str,
        instrument_code: &str,
        range: &TimeRange,
    ) -> Result<ObservationTable> {
        let site = self.registry.get_site(site_code)?;
        let space = self.group_space(group)?;
        let instrument = site.instrument(instrument_code)?;
        if !instrument.group.eq_ignore_ascii_case(group) {
            return Err(CatalogError::UnknownEntity {
                kind: EntityKind::Instrument,
                code: format!("{instrument_code} (group '{group}')"),
            });
        }

        let paths = space.resolve_paths(site, instrument, range)?;
        debug!(
            "resolved {} file(s) for {}/{}/{} over {}",
            paths.len(),
            site.code,
            space.name(),
            instrument.code,
            range
        );

        let mut skipped = Vec::new();
        let mut frames: Vec<(SystemTime, DataFrame)> = Vec::new();

        for path in &paths {
            let raw = match space.read(path) {
                Ok(df) => df,
                Err(err) => {
                    warn!("skipping {}: {err}", path.display());
                    skipped.push(SkippedFile {
                        path: path.clone(),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            let standardized = match space.standardize(site, instrument, &raw) {
                Ok(df) => df,
                Err(err) => {
                    warn!("skipping {}: {err}", path.display());
                    skipped.push(SkippedFile {
                        path: path.clone(),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            let clipped = clip_to_range(&standardized, range)?;
            if clipped.height() == 0 {
                continue;
            }

            let mtime = fs::metadata(path)
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            frames.push((mtime, clipped));
        }

        let mut expected = vec![TIME_COLUMN];
        expected.extend(space.column_mapping(instrument).canonical_targets());

        let df = merge_frames(frames, &expected)?;
        Ok(ObservationTable { df, skipped })
    }

    /// The primary analysis query: every observation of `variable` at the
    /// site, merged across the groups that measure it. Where groups overlap
    /// in time, the configured per-variable priority wins; groups without a
    /// priority entry rank by registration order.
    pub fn get_obs(
        &self,
        site_code: &str,
        variable: &str,
        range: &TimeRange,
        groups: Option<&[&str]>,
    ) -> Result<ObservationTable> {
        let site = self.registry.get_site(site_code)?;
        if !schema::is_canonical(variable) || variable == TIME_COLUMN {
            return Err(CatalogError::UnknownEntity {
                kind: EntityKind::Variable,
                code: variable.to_string(),
            });
        }

        let filter: Option<Vec<String>> = match groups {
            Some(codes) => {
                let mut keys = Vec::with_capacity(codes.len());
                for code in codes {
                    self.group_space(code)?;
                    keys.push(code.to_ascii_lowercase());
                }
                Some(keys)
            }
            None => None,
        };

        let mut instruments: Vec<&Instrument> = site.instruments_measuring(variable);
        if let Some(keys) = &filter {
            instruments.retain(|instrument| keys.iter().any(|key| *key == instrument.group));
        }
        instruments.sort_by_key(|instrument| self.group_rank(variable, &instrument.group));

        let mut skipped = Vec::new();
        let mut frames: Vec<DataFrame> = Vec::new();

        for instrument in &instruments {
            let table = self.read_data(&site.code, &instrument.group, &instrument.code, range)?;
            skipped.extend(table.skipped);
            if table.df.height() == 0 {
                continue;
            }
            match select_variable(&table.df, variable) {
                Ok(selected) => frames.push(selected),
                // The group's mapping never produces this variable; the
                // instrument declaration was optimistic. Nothing to merge.
                Err(_) => debug!(
                    "instrument {}/{} produced no '{variable}' column",
                    instrument.group, instrument.code
                ),
            }
        }

        let expected = [TIME_COLUMN, variable, QAQC_COLUMN];
        if frames.is_empty() {
            return Ok(ObservationTable {
                df: schema::empty_observation_frame(&expected)?,
                skipped,
            });
        }

        let mut merged = frames[0].clone();
        for frame in frames.iter().skip(1) {
            merged.vstack_mut(frame)?;
        }
        let deduped = keep_first_per_timestamp(&merged)?;
        let sorted = deduped.sort([TIME_COLUMN], SortMultipleOptions::default())?;

        Ok(ObservationTable {
            df: sorted,
            skipped,
        })
    }

    fn group_rank(&self, variable: &str, group: &str) -> (usize, usize) {
        let registration = self
            .groups
            .iter()
            .position(|(code, _)| code == group)
            .unwrap_or(usize::MAX);
        match self.priority.get(variable) {
            Some(order) => match order.iter().position(|code| code == group) {
                Some(idx) => (idx, registration),
                None => (order.len(), registration),
            },
            None => (0, registration),
        }
    }
}

fn clip_to_range(df: &DataFrame, range: &TimeRange) -> Result<DataFrame> {
    if df.height() == 0 || (range.start().is_none() && range.stop().is_none()) {
        return Ok(df.clone());
    }

    let times = df.column(TIME_COLUMN)?.datetime()?;
    let start = range.start().map(|t| t.timestamp_micros());
    let stop = range.stop().map(|t| t.timestamp_micros());

    let mask: BooleanChunked = (0..df.height())
        .map(|idx| {
            Some(match times.get(idx) {
                Some(t) => {
                    start.map_or(true, |bound| bound <= t) && stop.map_or(true, |bound| t <= bound)
                }
                None => false,
            })
        })
        .collect();

    Ok(df.filter(&mask)?)
}

/// Stacks per-file frames into one table: newest source file first so the
/// stable dedup keeps its rows, then sorted by time. Pass-through columns
/// may differ between files; frames are aligned to the union schema before
/// stacking.
fn merge_frames(mut frames: Vec<(SystemTime, DataFrame)>, expected: &[&str]) -> Result<DataFrame> {
    if frames.is_empty() {
        return Ok(schema::empty_observation_frame(expected)?);
    }

    // sort_by is stable: equal mtimes keep resolution (first-seen) order
    frames.sort_by(|a, b| b.0.cmp(&a.0));

    let mut union: Vec<String> = expected.iter().map(|name| name.to_string()).collect();
    let mut dtypes: HashMap<String, DataType> = HashMap::new();
    for name in expected {
        let dtype = schema::canonical_column(name)
            .map(|column| column.kind.dtype())
            .unwrap_or(DataType::Float64);
        dtypes.insert(name.to_string(), dtype);
    }
    for (_, frame) in &frames {
        for column in frame.get_columns() {
            let name = column.name().to_string();
            if !union.iter().any(|existing| *existing == name) {
                union.push(name.clone());
            }
            dtypes.entry(name).or_insert_with(|| column.dtype().clone());
        }
    }

    let mut merged: Option<DataFrame> = None;
    for (_, frame) in &frames {
        let aligned = align_frame(frame, &union, &dtypes)?;
        merged = Some(match merged {
            None => aligned,
            Some(mut acc) => {
                acc.vstack_mut(&aligned)?;
                acc
            }
        });
    }
    let merged = merged.ok_or_else(|| CatalogError::Config("no frames to merge".to_string()))?;

    let deduped = keep_first_per_timestamp(&merged)?;
    let sorted = deduped.sort([TIME_COLUMN], SortMultipleOptions::default())?;
    Ok(sorted)
}

/// Drops all but the first row per timestamp, preserving row order. Stacking
/// order encodes precedence, so "first" is always the preferred row.
fn keep_first_per_timestamp(df: &DataFrame) -> Result<DataFrame> {
    let times = df.column(TIME_COLUMN)?.datetime()?;
    let mut seen = HashSet::with_capacity(df.height());
    let mask: BooleanChunked = (0..df.height())
        .map(|idx| {
            Some(match times.get(idx) {
                Some(t) => seen.insert(t),
                None => false,
            })
        })
        .collect();
    Ok(df.filter(&mask)?)
}

fn align_frame(
    frame: &DataFrame,
    union: &[String],
    dtypes: &HashMap<String, DataType>,
) -> Result<DataFrame> {
    let columns: Vec<Column> = union
        .iter()
        .map(|name| match frame.column(name) {
            Ok(column) => Ok(column.clone()),
            Err(_) => {
                let dtype = dtypes.get(name).cloned().unwrap_or(DataType::Float64);
                Ok(Series::full_null(name.as_str().into(), frame.height(), &dtype).into())
            }
        })
        .collect::<Result<_>>()?;
    Ok(DataFrame::new(columns)?)
}

fn select_variable(df: &DataFrame, variable: &str) -> Result<DataFrame> {
    let time = df.column(TIME_COLUMN)?.clone();
    let value = df.column(variable)?.clone();
    let qaqc = match df.column(QAQC_COLUMN) {
        Ok(column) => column.clone(),
        Err(_) => Series::full_null(QAQC_COLUMN.into(), df.height(), &DataType::Int64).into(),
    };
    Ok(DataFrame::new(vec![time, value, qaqc])?)
}
