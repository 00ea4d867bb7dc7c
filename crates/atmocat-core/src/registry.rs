// crates/atmocat-core/src/registry.rs

use std::collections::HashMap;

use chrono_tz::Tz;

use crate::error::{CatalogError, EntityKind, Result};

/// A measurement device deployed at a site, owned by one research group.
#[derive(Debug, Clone)]
pub struct Instrument {
    pub code: String,
    pub group: String,
    /// Canonical variable columns this instrument reports.
    pub variables: Vec<String>,
    pub model: Option<String>,
    pub calibration_note: Option<String>,
}

/// A fixed monitoring location. Immutable once the catalog is constructed.
#[derive(Debug, Clone)]
pub struct Site {
    pub code: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation_m: f64,
    pub timezone: Tz,
    pub active: bool,
    pub instruments: Vec<Instrument>,
}

impl Site {
    pub fn instrument(&self, code: &str) -> Result<&Instrument> {
        self.instruments
            .iter()
            .find(|instrument| instrument.code.eq_ignore_ascii_case(code))
            .ok_or_else(|| CatalogError::UnknownEntity {
                kind: EntityKind::Instrument,
                code: code.to_string(),
            })
    }

    /// Instruments reporting the given canonical variable, in registration
    /// order.
    pub fn instruments_measuring(&self, variable: &str) -> Vec<&Instrument> {
        self.instruments
            .iter()
            .filter(|instrument| instrument.variables.iter().any(|v| v == variable))
            .collect()
    }
}

/// Case-insensitive site lookup with historical alias resolution.
#[derive(Debug, Clone, Default)]
pub struct SiteRegistry {
    sites: Vec<Site>,
    index: HashMap<String, usize>,
}

impl SiteRegistry {
    pub fn build(entries: Vec<(Site, Vec<String>)>) -> Result<Self> {
        let mut sites: Vec<Site> = Vec::with_capacity(entries.len());
        let mut index = HashMap::new();

        for (site, aliases) in entries {
            let idx = sites.len();
            let code_key = site.code.to_ascii_lowercase();
            if index.insert(code_key, idx).is_some() {
                return Err(CatalogError::Config(format!(
                    "duplicate site code '{}'",
                    site.code
                )));
            }
            for alias in aliases {
                let alias_key = alias.to_ascii_lowercase();
                if let Some(existing) = index.insert(alias_key, idx) {
                    if existing != idx {
                        return Err(CatalogError::Config(format!(
                            "site alias '{alias}' already refers to '{}'",
                            sites[existing].code
                        )));
                    }
                }
            }
            sites.push(site);
        }

        Ok(Self { sites, index })
    }

    pub fn get_site(&self, code: &str) -> Result<&Site> {
        self.index
            .get(&code.trim().to_ascii_lowercase())
            .map(|idx| &self.sites[*idx])
            .ok_or_else(|| CatalogError::UnknownEntity {
                kind: EntityKind::Site,
                code: code.to_string(),
            })
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }
}
