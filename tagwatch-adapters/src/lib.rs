//! # tagwatch-adapters
//!
//! Tag source clients: the request/response boundary between the monitor and
//! the control system that owns the tags.
//!
//! Every source implements [`TagSource`], which can list the tag catalog and
//! fetch current values for a set of tag ids. Sources hold no monitoring state
//! and never retry; retry policy belongs to the caller.
//!
//! ## Supported Sources
//!
//! - **Factory I/O** (`factoryio` feature) - The Factory I/O Web API over HTTP
//! - **File** - A JSON tag list re-read on every call, for offline replay
//! - **Memory** - An in-process catalog, for demos and tests
//!
//! ## Quick Start (Factory I/O)
//!
//! ```rust,no_run
//! # #[cfg(feature = "factoryio")]
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use std::collections::BTreeSet;
//! use tagwatch_adapters::{factoryio::FactoryIoClient, TagFilter, TagSource};
//!
//! let client = FactoryIoClient::builder()
//!     .endpoint("http://localhost:7410/api")
//!     .build()?;
//!
//! let catalog = client.list_tags(&TagFilter::default()).await?;
//! let ids: BTreeSet<String> = catalog.iter().take(3).map(|t| t.id.clone()).collect();
//! let samples = client.fetch_values(&ids).await?;
//! println!("Fetched {} samples", samples.len());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod file;
pub mod memory;

#[cfg(feature = "factoryio")]
pub mod factoryio;

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;

pub use error::SourceError;
pub use file::FileTagSource;
pub use memory::MemoryTagSource;

// Re-export types for convenience
pub use tagwatch_types::{Direction, Sample, Tag, TagId, TagValue, ValueKind};

/// A request/response client for a tag-owning control system.
#[async_trait]
pub trait TagSource: Send + Sync + std::fmt::Debug {
    /// Fetch the tag catalog, narrowed by `filter`.
    async fn list_tags(&self, filter: &TagFilter) -> Result<Vec<Tag>, SourceError>;

    /// Fetch current values for the requested tag ids.
    ///
    /// If the response omits some ids, returns [`SourceError::PartialResult`]
    /// carrying the samples that did arrive.
    async fn fetch_values(
        &self,
        ids: &BTreeSet<TagId>,
    ) -> Result<BTreeMap<TagId, Sample>, SourceError>;

    /// Returns a human-readable description of the source.
    fn description(&self) -> &str;
}

/// Catalog filter. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    /// Case-insensitive substring of the tag name.
    pub name: Option<String>,
    pub kind: Option<ValueKind>,
    pub direction: Option<Direction>,
}

impl TagFilter {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn kind(mut self, kind: ValueKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Returns true if the tag passes the filter.
    pub fn matches(&self, tag: &Tag) -> bool {
        let name_ok = self.name.as_ref().map_or(true, |needle| {
            tag.name.to_lowercase().contains(&needle.to_lowercase())
        });
        let kind_ok = self.kind.map_or(true, |k| tag.kind == k);
        let direction_ok = self.direction.map_or(true, |d| tag.direction == d);
        name_ok && kind_ok && direction_ok
    }
}

/// Turn the samples received for `requested` into a fetch result.
///
/// Samples for ids that were not requested are dropped. If any requested id
/// has no sample, the result is a [`SourceError::PartialResult`].
pub fn collect_samples(
    requested: &BTreeSet<TagId>,
    samples: impl IntoIterator<Item = Sample>,
) -> Result<BTreeMap<TagId, Sample>, SourceError> {
    let samples: BTreeMap<TagId, Sample> = samples
        .into_iter()
        .filter(|s| requested.contains(&s.tag_id))
        .map(|s| (s.tag_id.clone(), s))
        .collect();

    let missing: Vec<TagId> = requested
        .iter()
        .filter(|id| !samples.contains_key(*id))
        .cloned()
        .collect();

    if missing.is_empty() {
        Ok(samples)
    } else {
        Err(SourceError::PartialResult { samples, missing })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> BTreeSet<TagId> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn filter_matches_name_case_insensitively() {
        let tag = Tag::builder("1").name("Conveyor Speed").float(1.0).build();
        assert!(TagFilter::default().name("conveyor").matches(&tag));
        assert!(!TagFilter::default().name("pump").matches(&tag));
    }

    #[test]
    fn filter_combines_kind_and_direction() {
        let tag = Tag::builder("1")
            .name("Sensor")
            .bit(true)
            .direction(Direction::Input)
            .build();
        assert!(TagFilter::default().kind(ValueKind::Bit).matches(&tag));
        assert!(!TagFilter::default().kind(ValueKind::Float).matches(&tag));
        assert!(!TagFilter::default()
            .kind(ValueKind::Bit)
            .direction(Direction::Output)
            .matches(&tag));
    }

    #[test]
    fn collect_samples_complete() {
        let requested = ids(&["a", "b"]);
        let result = collect_samples(
            &requested,
            vec![Sample::new("a", 1.0, 10), Sample::new("b", true, 10)],
        )
        .unwrap();
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn collect_samples_reports_missing_ids() {
        let requested = ids(&["a", "b"]);
        let err = collect_samples(&requested, vec![Sample::new("a", 1.0, 10)]).unwrap_err();
        match err {
            SourceError::PartialResult { samples, missing } => {
                assert!(samples.contains_key("a"));
                assert_eq!(missing, vec!["b".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn collect_samples_ignores_unrequested_ids() {
        let requested = ids(&["a"]);
        let result = collect_samples(
            &requested,
            vec![Sample::new("a", 1.0, 10), Sample::new("zzz", 2.0, 10)],
        )
        .unwrap();
        assert_eq!(result.keys().collect::<Vec<_>>(), vec!["a"]);
    }
}
