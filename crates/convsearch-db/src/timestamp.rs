//! Normalization of message creation times.
//!
//! Exports store `create_time` either as a Unix epoch number or as an
//! ISO-8601-like string, and the format is not uniform across rows. Everything
//! here reduces both shapes to epoch seconds (`f64`) for range comparison.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use rusqlite::types::ValueRef;

/// Shown in place of a timestamp when the stored value is NULL.
pub const NO_TIME: &str = "(no time)";

/// Added to a bare-date end bound so the whole end day is included.
const END_OF_DAY_SECS: f64 = 86_400.0 - 0.001;

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

static BARE_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid bare date pattern"));

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M%:z",
    "%Y-%m-%d %H:%M%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// A stored `create_time` value.
#[derive(Debug, Clone, PartialEq)]
pub enum Timestamp {
    Numeric(f64),
    Textual(String),
    Absent,
}

impl Timestamp {
    pub fn from_sql(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Self::Absent,
            ValueRef::Integer(i) => Self::Numeric(i as f64),
            ValueRef::Real(f) => Self::Numeric(f),
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                Self::Textual(String::from_utf8_lossy(bytes).into_owned())
            }
        }
    }

    /// Epoch seconds for range comparison, or `None` when the value cannot
    /// be interpreted. Text is tried as a plain number before date parsing.
    pub fn comparable(&self) -> Option<f64> {
        match self {
            Self::Numeric(value) => Some(*value),
            Self::Textual(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return None;
                }
                parse_epoch(trimmed).or_else(|| parse_datetime(trimmed))
            }
            Self::Absent => None,
        }
    }

    /// Display form: `YYYY-MM-DD HH:MM` (UTC) for anything numeric, the raw
    /// stored text otherwise. Date strings are shown as stored.
    pub fn display(&self) -> String {
        match self {
            Self::Numeric(value) => format_epoch(*value).unwrap_or_else(|| value.to_string()),
            Self::Textual(raw) => parse_epoch(raw.trim())
                .and_then(format_epoch)
                .unwrap_or_else(|| raw.clone()),
            Self::Absent => NO_TIME.to_string(),
        }
    }
}

/// Inclusive creation-time window built from caller-supplied bounds.
///
/// Bounds that fail to parse are dropped, which widens the window instead of
/// rejecting the request.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DateRange {
    pub start: Option<f64>,
    pub end: Option<f64>,
}

impl DateRange {
    pub fn from_bounds(start: Option<&str>, end: Option<&str>) -> Self {
        let start_ts = start.and_then(parse_datetime);
        let end_ts = end.and_then(|raw| {
            let ts = parse_datetime(raw)?;
            if is_bare_date(raw.trim()) {
                Some(ts + END_OF_DAY_SECS)
            } else {
                Some(ts)
            }
        });

        Self {
            start: start_ts,
            end: end_ts,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// A row without a usable time never satisfies an active bound.
    pub fn contains(&self, ts: Option<f64>) -> bool {
        if let Some(start) = self.start {
            match ts {
                None => return false,
                Some(t) if t < start => return false,
                _ => {}
            }
        }
        if let Some(end) = self.end {
            match ts {
                None => return false,
                Some(t) if t > end => return false,
                _ => {}
            }
        }
        true
    }
}

pub fn is_bare_date(value: &str) -> bool {
    BARE_DATE.is_match(value)
}

/// Parses a date or date-time string into epoch seconds.
///
/// A bare `YYYY-MM-DD` is midnight UTC. A trailing `Z`, or no offset at all,
/// means UTC. Explicit `+HH:MM`/`-HH:MM` offsets are honored.
pub fn parse_datetime(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if is_bare_date(value) {
        let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
        return Some(to_epoch(date.and_hms_opt(0, 0, 0)?.and_utc()));
    }

    let value = value.strip_suffix('Z').unwrap_or(value);

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Some(to_epoch(dt.with_timezone(&Utc)));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(to_epoch(naive.and_utc()));
        }
    }

    None
}

fn parse_epoch(value: &str) -> Option<f64> {
    value.parse::<f64>().ok()
}

fn to_epoch(dt: DateTime<Utc>) -> f64 {
    dt.timestamp_micros() as f64 / 1_000_000.0
}

fn format_epoch(secs: f64) -> Option<String> {
    if !secs.is_finite() {
        return None;
    }
    let micros = (secs * 1_000_000.0).round() as i64;
    DateTime::from_timestamp_micros(micros).map(|dt| dt.format(DISPLAY_FORMAT).to_string())
}
