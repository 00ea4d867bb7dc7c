//! Query time ranges. A range may be open on either side; a partial ISO8601
//! string ("2020", "2020-03", "2020-03-14", "2020-03-14T05") denotes the
//! whole period it names.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use crate::error::{CatalogError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start: Option<DateTime<Utc>>,
    stop: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// Both bounds optional; fails when both are given and start > stop.
    pub fn new(start: Option<DateTime<Utc>>, stop: Option<DateTime<Utc>>) -> Result<Self> {
        if let (Some(a), Some(b)) = (start, stop) {
            if a > b {
                return Err(CatalogError::InvalidTimeRange {
                    start: a.to_string(),
                    stop: b.to_string(),
                });
            }
        }
        Ok(Self { start, stop })
    }

    /// The entire observation period.
    pub fn all() -> Self {
        Self {
            start: None,
            stop: None,
        }
    }

    /// Parses a partial ISO8601 string into the range covering that period.
    pub fn parse(string: &str) -> Result<Self> {
        let start = parse_iso(string, false)?;
        let stop = parse_iso(string, true)?;
        Ok(Self {
            start: Some(start),
            stop: Some(stop),
        })
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    pub fn stop(&self) -> Option<DateTime<Utc>> {
        self.stop
    }

    /// Inclusive on both specified bounds.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        match (self.start, self.stop) {
            (None, None) => true,
            (Some(start), None) => start <= instant,
            (None, Some(stop)) => instant <= stop,
            (Some(start), Some(stop)) => start <= instant && instant <= stop,
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        match (self.start, self.stop) {
            (Some(start), Some(stop)) => Some(stop - start),
            _ => None,
        }
    }

    /// Concrete bounds for partition enumeration, with defaults for open
    /// sides.
    pub fn bounds_or(
        &self,
        default_start: DateTime<Utc>,
        default_stop: DateTime<Utc>,
    ) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            self.start.unwrap_or(default_start),
            self.stop.unwrap_or(default_stop),
        )
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start, self.stop) {
            (None, None) => write!(f, "Entire observation period"),
            (None, Some(stop)) => write!(f, "Before {stop}"),
            (Some(start), None) => write!(f, "After {start}"),
            (Some(start), Some(stop)) => write!(f, "{start} to {stop}"),
        }
    }
}

/// Components of a partial ISO8601 time string, coarsest first.
struct IsoComponents {
    year: i32,
    month: Option<u32>,
    day: Option<u32>,
    hour: Option<u32>,
}

/// Parses a partial ISO8601 string. With `inclusive` set, returns the start
/// of the period following the coarsest unspecified component, so that
/// "2020-03" expands to [2020-03-01T00:00, 2020-04-01T00:00].
pub fn parse_iso(string: &str, inclusive: bool) -> Result<DateTime<Utc>> {
    let components = split_components(string)
        .ok_or_else(|| CatalogError::InvalidTimeString(string.to_string()))?;

    let IsoComponents {
        year,
        month,
        day,
        hour,
    } = components;

    let date = NaiveDate::from_ymd_opt(year, month.unwrap_or(1), day.unwrap_or(1))
        .ok_or_else(|| CatalogError::InvalidTimeString(string.to_string()))?;
    let naive = date
        .and_hms_opt(hour.unwrap_or(0), 0, 0)
        .ok_or_else(|| CatalogError::InvalidTimeString(string.to_string()))?;
    let start = Utc.from_utc_datetime(&naive);

    if !inclusive {
        return Ok(start);
    }

    let stop = if month.is_none() {
        let next = NaiveDate::from_ymd_opt(year + 1, 1, 1)
            .ok_or_else(|| CatalogError::InvalidTimeString(string.to_string()))?;
        Utc.from_utc_datetime(&next.and_hms_opt(0, 0, 0).unwrap_or(naive))
    } else if day.is_none() {
        let (yyyy, mm) = match month {
            Some(12) => (year + 1, 1),
            Some(m) => (year, m + 1),
            None => unreachable!("month checked above"),
        };
        let next = NaiveDate::from_ymd_opt(yyyy, mm, 1)
            .ok_or_else(|| CatalogError::InvalidTimeString(string.to_string()))?;
        Utc.from_utc_datetime(&next.and_hms_opt(0, 0, 0).unwrap_or(naive))
    } else if hour.is_none() {
        start + Duration::days(1)
    } else {
        start + Duration::hours(1)
    };

    Ok(stop)
}

fn split_components(string: &str) -> Option<IsoComponents> {
    let s = string.trim();
    if s.len() < 4 || !s.is_char_boundary(4) {
        return None;
    }
    let (year_str, mut rest) = s.split_at(4);
    if !year_str.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let year: i32 = year_str.parse().ok()?;

    let month = take_two_digits(&mut rest, &['-']);
    let day = take_two_digits(&mut rest, &['-']);
    let hour = take_hour(&mut rest);

    // Tolerate a trailing ":MM" after the hour; anything else is malformed.
    if let Some(stripped) = rest.strip_prefix(':') {
        if hour.is_none() || stripped.len() != 2 || !stripped.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        rest = "";
    }
    if !rest.is_empty() {
        return None;
    }

    Some(IsoComponents {
        year,
        month,
        day,
        hour,
    })
}

fn take_two_digits(rest: &mut &str, separators: &[char]) -> Option<u32> {
    let mut s = *rest;
    if let Some(stripped) = s.strip_prefix(separators) {
        s = stripped;
    }
    if s.len() < 2 || !s.is_char_boundary(2) {
        return None;
    }
    let (digits, remainder) = s.split_at(2);
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    *rest = remainder;
    digits.parse().ok()
}

fn take_hour(rest: &mut &str) -> Option<u32> {
    let s = rest.strip_prefix(['T', ' '])?;
    let digit_count = s.chars().take_while(|c| c.is_ascii_digit()).count();
    if digit_count == 0 || digit_count > 2 {
        return None;
    }
    let (digits, remainder) = s.split_at(digit_count);
    *rest = remainder;
    digits.parse().ok()
}
