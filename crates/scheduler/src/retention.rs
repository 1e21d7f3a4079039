//! Tiered, age-based retention

use sk_core::{Duration, ManagedSnapshot, RetentionPolicy, Timestamp};

/// Whether a snapshot of the given age has outlived its applicable tier
///
/// Snapshots younger than the smallest threshold have no applicable tier and
/// are never expired; an empty policy never expires anything.
pub fn is_expired(age: Duration, policy: &RetentionPolicy) -> bool {
    policy
        .applicable_tier(age)
        .is_some_and(|tier| age > tier.expiry_age())
}

/// Snapshots that must be destroyed at `now`, in input order
///
/// Recomputed from scratch on every call: ages move with `now`.
pub fn expired<'a>(
    snapshots: impl IntoIterator<Item = &'a ManagedSnapshot>,
    policy: &RetentionPolicy,
    now: Timestamp,
) -> Vec<ManagedSnapshot> {
    if policy.is_empty() {
        return Vec::new();
    }

    snapshots
        .into_iter()
        .filter(|snapshot| is_expired(snapshot.age(now), policy))
        .cloned()
        .collect()
}
