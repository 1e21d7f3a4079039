//! Per-dataset planning: one evaluation per dataset per tick
//!
//! `evaluate` turns a policy, the observed snapshot names and the current time
//! into a [`Plan`]. It keeps no state between calls: the last snapshot time and
//! the expiry set are rebuilt from the listing every time, so a restarted
//! daemon picks up exactly where the snapshot names say it left off.

use crate::retention::expired;
use crate::schedule::due;
use serde::{Serialize, Serializer};
use sk_core::{format_snapshot_name, DatasetPolicy, Error, ManagedSnapshot, Timestamp};
use tracing::debug;

/// What the executor should do for one dataset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Actions {
    /// Take a new snapshot
    pub create: bool,
    /// Take it recursively (children included)
    pub recursive: bool,
    /// Managed snapshots past retention, oldest first
    pub destroy: Vec<ManagedSnapshot>,
}

impl Actions {
    pub fn is_empty(&self) -> bool {
        !self.create && self.destroy.is_empty()
    }
}

/// Result of evaluating one dataset at one instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub dataset: String,
    pub evaluated_at: Timestamp,
    /// Newest managed snapshot of the dataset itself
    pub last_snapshot_at: Option<Timestamp>,
    /// Managed snapshots considered for retention
    pub managed: usize,
    pub actions: Actions,
    /// Names that carried the prefix but no valid timestamp
    #[serde(serialize_with = "serialize_errors")]
    pub ignored: Vec<Error>,
}

impl Plan {
    /// Short name for the snapshot this plan would create
    pub fn snapshot_name(&self, prefix: &str) -> String {
        format_snapshot_name(prefix, self.evaluated_at)
    }
}

/// Decide what to do for `policy` at `now`, given every snapshot name the
/// backend reported
///
/// Names of other datasets and names without the prefix are skipped silently.
/// For recursive policies, retention also covers snapshots of descendant
/// datasets, while the schedule only looks at the dataset's own snapshots.
/// Creation and destruction are independent and may both be requested.
pub fn evaluate<S: AsRef<str>>(
    policy: &DatasetPolicy,
    prefix: &str,
    observed: &[S],
    now: Timestamp,
) -> Plan {
    let mut managed = Vec::new();
    let mut ignored = Vec::new();

    for name in observed {
        let name = name.as_ref();
        if !in_scope(name, policy) {
            continue;
        }
        match ManagedSnapshot::parse(name, prefix) {
            Ok(Some(snapshot)) => managed.push(snapshot),
            Ok(None) => {}
            Err(err) => ignored.push(err),
        }
    }

    // Listing order is backend-specific; fix it so plans are reproducible
    managed.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.full_name.cmp(&b.full_name))
    });

    let last_snapshot_at = managed
        .iter()
        .filter(|snapshot| snapshot.dataset_name == policy.name())
        .map(|snapshot| snapshot.created_at)
        .max();

    let create = due(policy, last_snapshot_at, now);
    let destroy = expired(&managed, policy.retention(), now);

    debug!(
        dataset = policy.name(),
        managed = managed.len(),
        ignored = ignored.len(),
        create,
        destroy = destroy.len(),
        "evaluated dataset"
    );

    Plan {
        dataset: policy.name().to_string(),
        evaluated_at: now,
        last_snapshot_at,
        managed: managed.len(),
        actions: Actions {
            create,
            recursive: policy.recursive(),
            destroy,
        },
        ignored,
    }
}

/// Whether a full snapshot name belongs to the policy's dataset (or subtree)
fn in_scope(full_name: &str, policy: &DatasetPolicy) -> bool {
    let Some((dataset, _)) = full_name.split_once('@') else {
        return false;
    };
    if dataset == policy.name() {
        return true;
    }
    policy.recursive()
        && dataset
            .strip_prefix(policy.name())
            .is_some_and(|rest| rest.starts_with('/'))
}

fn serialize_errors<S: Serializer>(errors: &[Error], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(errors.iter().map(ToString::to_string))
}
