//! History entries and time ranges for querying them.

use std::time::Duration;

use crate::TagValue;

/// One stored reading in a tag's history.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HistoryEntry {
    /// Unix timestamp in milliseconds.
    pub timestamp_ms: u64,
    pub value: TagValue,
    /// Whether this reading was flagged as a change of state.
    pub active: bool,
}

impl HistoryEntry {
    pub fn new(timestamp_ms: u64, value: TagValue, active: bool) -> Self {
        Self {
            timestamp_ms,
            value,
            active,
        }
    }
}

/// An inclusive `[start_ms, end_ms]` window over Unix millisecond timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeRange {
    pub start_ms: u64,
    pub end_ms: u64,
}

impl TimeRange {
    pub fn new(start_ms: u64, end_ms: u64) -> Self {
        Self { start_ms, end_ms }
    }

    /// The range covering all timestamps.
    pub fn all() -> Self {
        Self::new(0, u64::MAX)
    }

    /// The `window` ending at `now_ms`.
    pub fn last(window: Duration, now_ms: u64) -> Self {
        let span = window.as_millis().min(u64::MAX as u128) as u64;
        Self::new(now_ms.saturating_sub(span), now_ms)
    }

    /// Named presets: `1h`, `6h`, `24h` and `7d`, ending at `now_ms`.
    ///
    /// Unknown names fall back to the last hour.
    pub fn preset(name: &str, now_ms: u64) -> Self {
        const HOUR: u64 = 60 * 60;
        let secs = match name {
            "6h" => 6 * HOUR,
            "24h" => 24 * HOUR,
            "7d" => 7 * 24 * HOUR,
            _ => HOUR,
        };
        Self::last(Duration::from_secs(secs), now_ms)
    }

    /// Returns true if the timestamp falls inside the range (both ends inclusive).
    pub fn contains(&self, timestamp_ms: u64) -> bool {
        self.start_ms <= timestamp_ms && timestamp_ms <= self.end_ms
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_is_inclusive() {
        let range = TimeRange::new(10, 20);
        assert!(range.contains(10));
        assert!(range.contains(20));
        assert!(!range.contains(9));
        assert!(!range.contains(21));
    }

    #[test]
    fn last_saturates_at_epoch() {
        let range = TimeRange::last(Duration::from_secs(10), 5_000);
        assert_eq!(range.start_ms, 0);
        assert_eq!(range.end_ms, 5_000);
    }

    #[test]
    fn presets() {
        let now = 10 * 24 * 60 * 60 * 1000;
        assert_eq!(TimeRange::preset("1h", now).start_ms, now - 3_600_000);
        assert_eq!(TimeRange::preset("6h", now).start_ms, now - 6 * 3_600_000);
        assert_eq!(TimeRange::preset("24h", now).start_ms, now - 24 * 3_600_000);
        assert_eq!(TimeRange::preset("7d", now).start_ms, now - 7 * 24 * 3_600_000);
        assert_eq!(TimeRange::preset("bogus", now), TimeRange::preset("1h", now));
    }
}
