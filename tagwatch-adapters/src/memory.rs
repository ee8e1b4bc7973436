//! In-memory tag source.
//!
//! Holds a catalog in process. Values are changed directly through the
//! source, which makes it suitable for demos and for driving the monitor
//! in tests without a control system.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tagwatch_types::{now_ms, Sample, Tag, TagId, TagValue};

use crate::{collect_samples, SourceError, TagFilter, TagSource};

/// A tag source backed by an in-memory catalog.
///
/// # Example
///
/// ```
/// use tagwatch_adapters::{MemoryTagSource, Tag, TagValue};
///
/// let source = MemoryTagSource::new("plant-sim");
/// source.insert(Tag::builder("level").float(40.0).build());
/// source.set_value("level", TagValue::Number(42.0));
/// assert_eq!(source.fetch_count(), 0);
/// ```
#[derive(Debug)]
pub struct MemoryTagSource {
    tags: RwLock<BTreeMap<TagId, Tag>>,
    reachable: AtomicBool,
    fetches: AtomicU64,
    fetch_delay: RwLock<Option<Duration>>,
    description: String,
}

impl MemoryTagSource {
    /// Create an empty source described as `memory: {name}`.
    pub fn new(name: &str) -> Self {
        Self {
            tags: RwLock::new(BTreeMap::new()),
            reachable: AtomicBool::new(true),
            fetches: AtomicU64::new(0),
            fetch_delay: RwLock::new(None),
            description: format!("memory: {name}"),
        }
    }

    /// Create a source pre-populated with tags.
    pub fn with_tags(name: &str, tags: impl IntoIterator<Item = Tag>) -> Self {
        let source = Self::new(name);
        for tag in tags {
            source.insert(tag);
        }
        source
    }

    /// Add or replace a tag.
    pub fn insert(&self, tag: Tag) {
        self.tags.write().insert(tag.id.clone(), tag);
    }

    /// Remove a tag. Later fetches will report it missing.
    pub fn remove(&self, id: &str) -> Option<Tag> {
        self.tags.write().remove(id)
    }

    /// Change the current value of a tag. Returns false if the tag is unknown.
    pub fn set_value(&self, id: &str, value: TagValue) -> bool {
        match self.tags.write().get_mut(id) {
            Some(tag) => {
                tag.value = value;
                true
            }
            None => false,
        }
    }

    /// Simulate the upstream going away (or coming back).
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Delay every value fetch by `delay`, to simulate a slow upstream.
    pub fn set_fetch_delay(&self, delay: Option<Duration>) {
        *self.fetch_delay.write() = delay;
    }

    /// Number of `fetch_values` calls made so far.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }

    fn ensure_reachable(&self) -> Result<(), SourceError> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SourceError::Unreachable(format!(
                "{} is offline",
                self.description
            )))
        }
    }
}

#[async_trait]
impl TagSource for MemoryTagSource {
    async fn list_tags(&self, filter: &TagFilter) -> Result<Vec<Tag>, SourceError> {
        self.ensure_reachable()?;
        Ok(self
            .tags
            .read()
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect())
    }

    async fn fetch_values(
        &self,
        ids: &BTreeSet<TagId>,
    ) -> Result<BTreeMap<TagId, Sample>, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let delay = *self.fetch_delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.ensure_reachable()?;

        let captured = now_ms();
        let samples: Vec<Sample> = self
            .tags
            .read()
            .values()
            .filter(|t| ids.contains(&t.id))
            .map(|t| Sample::of_tag(t, captured))
            .collect();

        collect_samples(ids, samples)
    }

    fn description(&self) -> &str {
        &self.description
    }
}
