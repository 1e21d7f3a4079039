//! Error taxonomy for policy construction and snapshot parsing

use crate::Duration;

/// Errors raised by the core types
///
/// `InvalidDurationFormat`, `InvalidRetentionPolicy` and `InvalidDatasetPolicy`
/// are configuration-time errors. `UnparsableSnapshotName` is per-snapshot and
/// never fatal: the snapshot is simply left out of scheduling and retention.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid duration format {input:?} (expected <positive integer><{units}>)")]
    InvalidDurationFormat { input: String, units: &'static str },

    #[error("invalid retention policy: age threshold {threshold} appears more than once")]
    InvalidRetentionPolicy { threshold: Duration },

    #[error("invalid dataset policy: {reason}")]
    InvalidDatasetPolicy { reason: String },

    #[error("unparsable snapshot name {full_name:?}: timestamp must be YYYYMMDD_HHMMSS")]
    UnparsableSnapshotName { full_name: String },
}
