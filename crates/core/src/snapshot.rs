//! Managed snapshot identity
//!
//! A snapshot is managed when its short name (the part after `@`) is exactly
//! `{prefix}_{YYYYMMDD}_{HHMMSS}` in UTC. Anything else is invisible to snapkeep.

use crate::{Duration, Error, Result, Timestamp};
use chrono::{NaiveDateTime, TimeZone, Utc};
use serde::Serialize;

/// Timestamp layout embedded in managed snapshot names
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// `YYYYMMDD_HHMMSS`
const TIMESTAMP_LEN: usize = 15;

/// Build the short snapshot name for a snapshot taken at `at`
pub fn format_snapshot_name(prefix: &str, at: Timestamp) -> String {
    format!("{}_{}", prefix, at.format(TIMESTAMP_FORMAT))
}

/// An existing snapshot created under the configured prefix
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ManagedSnapshot {
    /// Dataset the snapshot belongs to (`tank/data`)
    pub dataset_name: String,
    /// Full snapshot name (`tank/data@autosnap_20240101_120000`)
    pub full_name: String,
    /// Creation time parsed from the name
    pub created_at: Timestamp,
}

impl ManagedSnapshot {
    /// Recognise a snapshot from its full name
    ///
    /// Returns `Ok(None)` for snapshots that do not carry the prefix (they are
    /// not ours), and `UnparsableSnapshotName` for names that carry the prefix
    /// but no valid timestamp.
    pub fn parse(full_name: &str, prefix: &str) -> Result<Option<Self>> {
        let Some((dataset, short)) = full_name.split_once('@') else {
            return Ok(None);
        };
        if dataset.is_empty() {
            return Ok(None);
        }

        let Some(stamp) = short
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('_'))
        else {
            return Ok(None);
        };

        let created_at = parse_timestamp(stamp).ok_or_else(|| Error::UnparsableSnapshotName {
            full_name: full_name.to_string(),
        })?;

        Ok(Some(Self {
            dataset_name: dataset.to_string(),
            full_name: full_name.to_string(),
            created_at,
        }))
    }

    /// Age at `now`; zero for snapshots stamped in the future
    pub fn age(&self, now: Timestamp) -> Duration {
        Duration::between(self.created_at, now)
    }

    /// The part after `@`
    pub fn short_name(&self) -> &str {
        self.full_name
            .split_once('@')
            .map(|(_, short)| short)
            .unwrap_or(&self.full_name)
    }

    /// Whether this snapshot lives on `dataset` (or, with `descendants`, below it)
    pub fn belongs_to(&self, dataset: &str, descendants: bool) -> bool {
        if self.dataset_name == dataset {
            return true;
        }
        descendants
            && self
                .dataset_name
                .strip_prefix(dataset)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

fn parse_timestamp(stamp: &str) -> Option<Timestamp> {
    // chrono's numeric specifiers accept variable widths, so pin the shape first
    let bytes = stamp.as_bytes();
    let well_formed = bytes.len() == TIMESTAMP_LEN
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| if i == 8 { *b == b'_' } else { b.is_ascii_digit() });
    if !well_formed {
        return None;
    }

    let naive = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;
    Some(Utc.from_utc_datetime(&naive))
}
