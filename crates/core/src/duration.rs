//! Compact duration strings ("1h", "2d", "1M") as exact second counts
//!
//! Calendar units are fixed approximations, not calendar-aware:
//! a month (`M`) is always 30 days and a year (`y`) is always 365 days.

use crate::{Error, Result, Timestamp};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;
const MONTH: u64 = 30 * DAY;
const YEAR: u64 = 365 * DAY;

/// Units accepted for frequencies and retention tiers, largest first
const POLICY_UNITS: &[(char, u64)] = &[
    ('y', YEAR),
    ('M', MONTH),
    ('w', WEEK),
    ('d', DAY),
    ('h', HOUR),
];

/// Units accepted for the global check interval
const INTERVAL_UNITS: &[(char, u64)] = &[
    ('y', YEAR),
    ('M', MONTH),
    ('w', WEEK),
    ('d', DAY),
    ('h', HOUR),
    ('m', MINUTE),
    ('s', 1),
];

/// An exact, non-negative elapsed time in whole seconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration {
    secs: u64,
}

impl Duration {
    pub const ZERO: Duration = Duration { secs: 0 };

    pub const fn from_secs(secs: u64) -> Self {
        Self { secs }
    }

    pub const fn from_hours(hours: u64) -> Self {
        Self { secs: hours * HOUR }
    }

    pub const fn from_days(days: u64) -> Self {
        Self { secs: days * DAY }
    }

    pub const fn as_secs(&self) -> u64 {
        self.secs
    }

    /// Parse a policy duration: `<positive integer><h|d|w|M|y>`
    ///
    /// Units are case-sensitive: `M` is a 30-day month, and there is no
    /// minute unit in this grammar.
    pub fn parse(text: &str) -> Result<Self> {
        parse_with(text, POLICY_UNITS, "h|d|w|M|y")
    }

    /// Parse a check interval: the policy grammar plus `m` (minutes) and `s` (seconds)
    pub fn parse_interval(text: &str) -> Result<Self> {
        parse_with(text, INTERVAL_UNITS, "s|m|h|d|w|M|y")
    }

    /// Elapsed time from `earlier` to `later`, clamped at zero
    pub fn between(earlier: Timestamp, later: Timestamp) -> Self {
        let secs = (later - earlier).num_seconds().max(0);
        Self::from_secs(secs as u64)
    }

    pub fn saturating_add(self, other: Duration) -> Self {
        Self::from_secs(self.secs.saturating_add(other.secs))
    }

    pub fn to_std(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.secs)
    }

    pub fn to_chrono(&self) -> chrono::TimeDelta {
        i64::try_from(self.secs)
            .ok()
            .and_then(chrono::TimeDelta::try_seconds)
            .unwrap_or(chrono::TimeDelta::MAX)
    }
}

fn parse_with(text: &str, units: &[(char, u64)], unit_names: &'static str) -> Result<Duration> {
    let invalid = || Error::InvalidDurationFormat {
        input: text.to_string(),
        units: unit_names,
    };

    let unit = text.chars().last().ok_or_else(invalid)?;
    let digits = &text[..text.len() - unit.len_utf8()];

    // Reject signs, whitespace and empty magnitudes before u64 parsing sees them
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let multiplier = units
        .iter()
        .find(|(name, _)| *name == unit)
        .map(|&(_, secs)| secs)
        .ok_or_else(invalid)?;

    let value: u64 = digits.parse().map_err(|_| invalid())?;
    if value == 0 {
        return Err(invalid());
    }

    value
        .checked_mul(multiplier)
        .map(Duration::from_secs)
        .ok_or_else(invalid)
}

impl FromStr for Duration {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.secs == 0 {
            return write!(f, "0s");
        }
        let (unit, secs) = INTERVAL_UNITS
            .iter()
            .find(|(_, secs)| self.secs % secs == 0)
            .copied()
            .unwrap_or(('s', 1));
        write!(f, "{}{}", self.secs / secs, unit)
    }
}

impl Serialize for Duration {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
