//! MonitoringSnapshot - the complete published state of one poll cycle.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::{now_ms, AlertEvaluation, HistoryEntry, Tag, TagId, TagValue};

/// Whether the monitored system is producing fresh samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RunStatus {
    #[default]
    Running,
    Paused,
}

impl RunStatus {
    pub fn is_paused(&self) -> bool {
        matches!(self, RunStatus::Paused)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Running => f.write_str("running"),
            RunStatus::Paused => f.write_str("paused"),
        }
    }
}

/// A point-in-time view of everything being monitored.
///
/// Snapshots are immutable. A new one replaces the previous one as a whole,
/// so a reader always sees a consistent set of values, history and alerts.
///
/// # Example
///
/// ```rust
/// use tagwatch_types::{MonitoringSnapshot, Tag};
///
/// let snapshot = MonitoringSnapshot::builder()
///     .timestamp_ms(1_703_160_000_000)
///     .tag(Tag::builder("speed").float(12.5).build())
///     .build();
///
/// assert_eq!(snapshot.len(), 1);
/// assert!(!snapshot.status.is_paused());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MonitoringSnapshot {
    /// Publication counter; the initial empty snapshot is 0.
    pub sequence: u64,

    /// Unix timestamp in milliseconds when this snapshot was taken.
    pub timestamp_ms: u64,

    /// Tag selection the snapshot was produced for.
    pub selection: BTreeSet<TagId>,

    /// Monitored tags with their current values, keyed by id.
    pub tags: BTreeMap<TagId, Tag>,

    /// History per monitored tag, oldest entry first.
    pub history: BTreeMap<TagId, Vec<HistoryEntry>>,

    /// Currently triggered alerts, in rule order.
    pub alerts: Vec<AlertEvaluation>,

    pub status: RunStatus,
}

impl MonitoringSnapshot {
    /// Create a builder for constructing snapshots.
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::new()
    }

    /// Check if the snapshot has no monitored tags.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Number of monitored tags.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn get(&self, tag_id: &str) -> Option<&Tag> {
        self.tags.get(tag_id)
    }

    /// Current value of every monitored tag.
    pub fn values(&self) -> BTreeMap<TagId, TagValue> {
        self.tags
            .iter()
            .map(|(id, tag)| (id.clone(), tag.value))
            .collect()
    }

    /// The most recent history entry of a tag.
    pub fn latest_entry(&self, tag_id: &str) -> Option<&HistoryEntry> {
        self.history.get(tag_id).and_then(|entries| entries.last())
    }

    /// Copy of this snapshot with a different run status, published as the next sequence.
    pub fn with_status(&self, status: RunStatus) -> Self {
        Self {
            sequence: self.sequence + 1,
            status,
            ..self.clone()
        }
    }
}

/// Builder for constructing `MonitoringSnapshot` instances.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    sequence: u64,
    timestamp_ms: Option<u64>,
    selection: BTreeSet<TagId>,
    tags: BTreeMap<TagId, Tag>,
    history: BTreeMap<TagId, Vec<HistoryEntry>>,
    alerts: Vec<AlertEvaluation>,
    status: RunStatus,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Set a specific timestamp (milliseconds since Unix epoch).
    pub fn timestamp_ms(mut self, ts: u64) -> Self {
        self.timestamp_ms = Some(ts);
        self
    }

    pub fn selection(mut self, selection: BTreeSet<TagId>) -> Self {
        self.selection = selection;
        self
    }

    /// Add a monitored tag. The tag is also added to the selection.
    pub fn tag(mut self, tag: Tag) -> Self {
        self.selection.insert(tag.id.clone());
        self.tags.insert(tag.id.clone(), tag);
        self
    }

    pub fn history(mut self, tag_id: impl Into<TagId>, entries: Vec<HistoryEntry>) -> Self {
        self.history.insert(tag_id.into(), entries);
        self
    }

    pub fn alerts(mut self, alerts: Vec<AlertEvaluation>) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn status(mut self, status: RunStatus) -> Self {
        self.status = status;
        self
    }

    pub fn build(self) -> MonitoringSnapshot {
        MonitoringSnapshot {
            sequence: self.sequence,
            timestamp_ms: self.timestamp_ms.unwrap_or_else(now_ms),
            selection: self.selection,
            tags: self.tags,
            history: self.history,
            alerts: self.alerts,
            status: self.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AlertRule;

    fn sample_snapshot() -> MonitoringSnapshot {
        MonitoringSnapshot::builder()
            .sequence(3)
            .timestamp_ms(1_703_160_000_000)
            .tag(Tag::builder("level").float(42.0).build())
            .tag(Tag::builder("pump").bit(true).build())
            .history(
                "level",
                vec![
                    HistoryEntry::new(1, TagValue::Number(40.0), false),
                    HistoryEntry::new(2, TagValue::Number(42.0), true),
                ],
            )
            .alerts(vec![AlertEvaluation {
                rule: AlertRule::greater_than("level", 40.0, "high"),
                value: TagValue::Number(42.0),
                triggered: true,
            }])
            .build()
    }

    #[test]
    fn builder_collects_tags_and_selection() {
        let snapshot = sample_snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.selection.len(), 2);
        assert_eq!(snapshot.timestamp_ms, 1_703_160_000_000);
        assert_eq!(snapshot.status, RunStatus::Running);
    }

    #[test]
    fn values_and_latest_entry() {
        let snapshot = sample_snapshot();
        let values = snapshot.values();
        assert_eq!(values.get("pump"), Some(&TagValue::Bool(true)));
        assert_eq!(snapshot.latest_entry("level").map(|e| e.active), Some(true));
        assert!(snapshot.latest_entry("pump").is_none());
    }

    #[test]
    fn with_status_bumps_sequence_and_keeps_data() {
        let snapshot = sample_snapshot();
        let paused = snapshot.with_status(RunStatus::Paused);
        assert_eq!(paused.sequence, 4);
        assert!(paused.status.is_paused());
        assert_eq!(paused.tags, snapshot.tags);
        assert_eq!(paused.alerts, snapshot.alerts);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_roundtrip() {
        let snapshot = sample_snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: MonitoringSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snapshot, parsed);
    }
}
