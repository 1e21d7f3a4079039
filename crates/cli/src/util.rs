//! Shared formatting helpers for CLI output

use sk_core::Timestamp;

/// Format `ts` relative to `now` ("3 hours ago", "in 20 minutes")
pub fn format_relative_time(ts: Timestamp, now: Timestamp) -> String {
    let delta = now - ts;
    let seconds = delta.num_seconds();
    let (amount, future) = if seconds >= 0 {
        (seconds, false)
    } else {
        (-seconds, true)
    };

    let span = if amount < 60 {
        format!("{} seconds", amount)
    } else if amount < 3600 {
        format!("{} minutes", amount / 60)
    } else if amount < 86400 {
        format!("{} hours", amount / 3600)
    } else if amount < 604800 {
        format!("{} days", amount / 86400)
    } else {
        format!("{} weeks", amount / 604800)
    };

    if future {
        format!("in {}", span)
    } else {
        format!("{} ago", span)
    }
}

/// Format timestamp as absolute UTC time ("2024-01-03 14:30:00 UTC")
pub fn format_absolute_time(ts: Timestamp) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone, Utc};

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, 3, 14, 30, 0).unwrap()
    }

    #[test]
    fn test_format_relative_time() {
        assert_eq!(format_relative_time(now(), now()), "0 seconds ago");
        assert_eq!(format_relative_time(now() - TimeDelta::hours(3), now()), "3 hours ago");
        assert_eq!(format_relative_time(now() - TimeDelta::days(2), now()), "2 days ago");
        assert_eq!(format_relative_time(now() - TimeDelta::days(21), now()), "3 weeks ago");
        assert_eq!(
            format_relative_time(now() + TimeDelta::minutes(20), now()),
            "in 20 minutes"
        );
    }

    #[test]
    fn test_format_absolute_time() {
        assert_eq!(format_absolute_time(now()), "2024-01-03 14:30:00 UTC");
    }
}
