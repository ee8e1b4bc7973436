//! Bounded per-tag history.

use std::collections::{HashMap, VecDeque};

use tagwatch_types::{HistoryEntry, TagId, TagValue, TimeRange, MAX_HISTORY};

/// Decides whether a new reading counts as a change of state.
///
/// The buffer stores whatever flag it is given; this trait is how the
/// monitor computes it before appending.
pub trait ActivityDetector: Send + Sync + std::fmt::Debug {
    fn is_active(&self, previous: Option<&HistoryEntry>, value: &TagValue) -> bool;
}

/// Marks a reading active when its value differs from the previous entry.
///
/// The first reading of a tag is never active.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeDetector;

impl ActivityDetector for ChangeDetector {
    fn is_active(&self, previous: Option<&HistoryEntry>, value: &TagValue) -> bool {
        previous.is_some_and(|prev| prev.value != *value)
    }
}

/// Fixed-capacity ring of entries per tag, oldest first.
///
/// Rings are created lazily on first append and pre-sized to the capacity,
/// so a long-running session does not reallocate. When a ring is full the
/// oldest entry is evicted.
#[derive(Debug)]
pub struct HistoryBuffer {
    capacity: usize,
    rings: HashMap<TagId, VecDeque<HistoryEntry>>,
}

impl HistoryBuffer {
    /// Create a buffer holding at most `capacity` entries per tag.
    ///
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            rings: HashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append an entry, evicting the oldest one if the tag is at capacity.
    pub fn append(&mut self, tag_id: &str, value: TagValue, timestamp_ms: u64, active: bool) {
        let capacity = self.capacity;
        let ring = self
            .rings
            .entry(tag_id.to_string())
            .or_insert_with(|| VecDeque::with_capacity(capacity));

        if ring.len() == capacity {
            ring.pop_front();
        }
        ring.push_back(HistoryEntry::new(timestamp_ms, value, active));
    }

    /// Entries of a tag whose timestamp falls inside `range`, oldest first.
    pub fn query(&self, tag_id: &str, range: TimeRange) -> Vec<HistoryEntry> {
        self.rings
            .get(tag_id)
            .map(|ring| {
                ring.iter()
                    .filter(|e| range.contains(e.timestamp_ms))
                    .copied()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All entries of a tag, oldest first.
    pub fn entries(&self, tag_id: &str) -> Vec<HistoryEntry> {
        self.rings
            .get(tag_id)
            .map(|ring| ring.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn latest(&self, tag_id: &str) -> Option<&HistoryEntry> {
        self.rings.get(tag_id).and_then(|ring| ring.back())
    }

    /// Number of stored entries for a tag.
    pub fn len(&self, tag_id: &str) -> usize {
        self.rings.get(tag_id).map_or(0, VecDeque::len)
    }

    /// Number of tags with at least one entry.
    pub fn tag_count(&self) -> usize {
        self.rings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(MAX_HISTORY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(v: f64) -> TagValue {
        TagValue::Number(v)
    }

    #[test]
    fn append_creates_ring_lazily() {
        let mut buffer = HistoryBuffer::default();
        assert!(buffer.is_empty());
        assert_eq!(buffer.len("a"), 0);

        buffer.append("a", num(1.0), 10, false);
        assert_eq!(buffer.len("a"), 1);
        assert_eq!(buffer.tag_count(), 1);
        assert_eq!(buffer.capacity(), MAX_HISTORY);
    }

    #[test]
    fn length_never_exceeds_capacity() {
        let mut buffer = HistoryBuffer::new(5);
        for i in 0..50 {
            buffer.append("a", num(i as f64), i, false);
            assert!(buffer.len("a") <= 5);
        }
        assert_eq!(buffer.len("a"), 5);
    }

    #[test]
    fn full_ring_evicts_index_zero() {
        let mut buffer = HistoryBuffer::new(3);
        for i in 0..3 {
            buffer.append("a", num(i as f64), i, false);
        }
        let before = buffer.entries("a");
        assert_eq!(before[0].timestamp_ms, 0);

        buffer.append("a", num(3.0), 3, false);
        let after = buffer.entries("a");
        assert_eq!(after.len(), 3);
        assert_eq!(after[0], before[1]);
        assert_eq!(after[1], before[2]);
        assert_eq!(after[2].timestamp_ms, 3);
    }

    #[test]
    fn eviction_is_per_tag() {
        let mut buffer = HistoryBuffer::new(2);
        buffer.append("a", num(1.0), 1, false);
        buffer.append("b", num(1.0), 1, false);
        buffer.append("a", num(2.0), 2, false);
        buffer.append("a", num(3.0), 3, false);

        assert_eq!(buffer.len("a"), 2);
        assert_eq!(buffer.entries("b")[0].timestamp_ms, 1);
    }

    #[test]
    fn query_is_inclusive_and_ordered() {
        let mut buffer = HistoryBuffer::default();
        for ts in [100, 200, 300, 400] {
            buffer.append("a", num(ts as f64), ts, false);
        }

        let hits = buffer.query("a", TimeRange::new(200, 300));
        let stamps: Vec<u64> = hits.iter().map(|e| e.timestamp_ms).collect();
        assert_eq!(stamps, vec![200, 300]);

        assert!(buffer.query("a", TimeRange::new(500, 600)).is_empty());
        assert!(buffer.query("missing", TimeRange::all()).is_empty());
    }

    #[test]
    fn buffer_stores_the_flag_it_is_given() {
        let mut buffer = HistoryBuffer::default();
        buffer.append("a", num(1.0), 1, true);
        buffer.append("a", num(1.0), 2, false);

        assert!(buffer.entries("a")[0].active);
        assert!(!buffer.latest("a").unwrap().active);
    }

    #[test]
    fn zero_capacity_holds_one_entry() {
        let mut buffer = HistoryBuffer::new(0);
        buffer.append("a", num(1.0), 1, false);
        buffer.append("a", num(2.0), 2, false);
        assert_eq!(buffer.len("a"), 1);
        assert_eq!(buffer.latest("a").unwrap().value, num(2.0));
    }

    #[test]
    fn change_detector() {
        let detector = ChangeDetector;
        let prev = HistoryEntry::new(1, TagValue::Bool(false), false);

        assert!(!detector.is_active(None, &TagValue::Bool(true)));
        assert!(detector.is_active(Some(&prev), &TagValue::Bool(true)));
        assert!(!detector.is_active(Some(&prev), &TagValue::Bool(false)));
    }
}
