//! Snapshot frequency checks

use sk_core::{DatasetPolicy, Duration, Timestamp};

/// Whether `policy` wants a new snapshot at `now`
///
/// Level-triggered: the answer depends only on the inputs, so a tick that was
/// missed (host suspended, slow backend) is caught up by the next one. With no
/// managed snapshot observed the dataset is due immediately. A last snapshot
/// stamped in the future is not due.
pub fn due(policy: &DatasetPolicy, last_snapshot_at: Option<Timestamp>, now: Timestamp) -> bool {
    if !policy.enabled() {
        return false;
    }

    match last_snapshot_at {
        None => true,
        Some(last) if last > now => false,
        Some(last) => Duration::between(last, now) >= policy.frequency(),
    }
}

/// When the next snapshot becomes due, if the dataset is enabled
pub fn next_due_at(policy: &DatasetPolicy, last_snapshot_at: Option<Timestamp>) -> Option<Timestamp> {
    if !policy.enabled() {
        return None;
    }
    last_snapshot_at.and_then(|last| last.checked_add_signed(policy.frequency().to_chrono()))
}
