//! Filesystem path resolution. Expands a query range into a group's
//! partition granularity, renders its path template, and keeps the
//! candidates that exist on disk. Read-only; file contents are never opened
//! here.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};

use crate::error::{CatalogError, Result};
use crate::timerange::TimeRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Yearly,
    Monthly,
    Daily,
}

/// A group's file-partitioning convention: one path template plus the period
/// each file covers. Templates substitute `{site}`, `{SITE}`,
/// `{instrument}`, `{lvl}`, `{YYYY}`, `{MM}`, `{DD}`; a rendered path may
/// contain `*` wildcards (e.g. analyzer serial numbers), resolved by
/// globbing.
#[derive(Debug, Clone)]
pub struct FileLayout {
    pub template: String,
    pub granularity: Granularity,
}

#[derive(Debug, Clone, Copy)]
pub struct PathVars<'a> {
    pub site: &'a str,
    pub instrument: &'a str,
    pub lvl: Option<&'a str>,
}

// Earliest partition probed for open-ended ranges; nothing in the archive
// predates it.
const ARCHIVE_EPOCH_YEAR: i32 = 1990;

fn archive_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(ARCHIVE_EPOCH_YEAR, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Existing files for the query, in ascending chronological partition order.
/// Within one globbed partition, paths sort lexicographically. Deterministic
/// for a fixed filesystem state.
pub fn resolve(
    root: &Path,
    layout: &FileLayout,
    vars: &PathVars<'_>,
    range: &TimeRange,
) -> Result<Vec<PathBuf>> {
    let (start, stop) = range.bounds_or(archive_epoch(), Utc::now());
    if start > stop {
        return Ok(Vec::new());
    }

    let mut out = Vec::new();
    for (year, month, day) in partitions(start, stop, layout.granularity) {
        let rendered = render_template(&layout.template, vars, year, month, day);
        let candidate = root.join(rendered);
        let candidate_str = candidate.to_string_lossy();
        if candidate_str.contains('*') || candidate_str.contains('?') {
            let matches = glob::glob(&candidate_str)
                .map_err(|err| CatalogError::Config(format!("bad path template: {err}")))?;
            let mut found: Vec<PathBuf> = matches.flatten().filter(|p| p.is_file()).collect();
            found.sort();
            out.extend(found);
        } else if candidate.is_file() {
            out.push(candidate);
        }
    }

    Ok(out)
}

fn partitions(
    start: DateTime<Utc>,
    stop: DateTime<Utc>,
    granularity: Granularity,
) -> Vec<(i32, u32, u32)> {
    match granularity {
        Granularity::Yearly => (start.year()..=stop.year()).map(|year| (year, 1, 1)).collect(),
        Granularity::Monthly => {
            let mut out = Vec::new();
            let (mut year, mut month) = (start.year(), start.month());
            loop {
                out.push((year, month, 1));
                if (year, month) >= (stop.year(), stop.month()) {
                    break;
                }
                if month == 12 {
                    year += 1;
                    month = 1;
                } else {
                    month += 1;
                }
            }
            out
        }
        Granularity::Daily => {
            let mut out = Vec::new();
            let mut date = start.date_naive();
            let last = stop.date_naive();
            while date <= last {
                out.push((date.year(), date.month(), date.day()));
                date += Duration::days(1);
            }
            out
        }
    }
}

fn render_template(
    template: &str,
    vars: &PathVars<'_>,
    year: i32,
    month: u32,
    day: u32,
) -> String {
    template
        .replace("{site}", &vars.site.to_ascii_lowercase())
        .replace("{SITE}", &vars.site.to_ascii_uppercase())
        .replace("{instrument}", vars.instrument)
        .replace("{lvl}", vars.lvl.unwrap_or(""))
        .replace("{YYYY}", &format!("{year:04}"))
        .replace("{MM}", &format!("{month:02}"))
        .replace("{DD}", &format!("{day:02}"))
}
