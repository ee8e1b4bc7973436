//! # tagwatch-engine
//!
//! Real-time tag monitoring: polls a [`TagSource`](tagwatch_adapters::TagSource)
//! for a selection of tags, keeps a bounded history per tag, evaluates threshold
//! rules and detects when the upstream stops producing data.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tagwatch_adapters::{MemoryTagSource, Tag, TagFilter};
//! use tagwatch_engine::{Monitor, StatusSummary};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = Arc::new(MemoryTagSource::with_tags(
//!         "demo",
//!         [Tag::builder("1").name("Emitter").bit(true).build()],
//!     ));
//!
//!     let monitor = Monitor::builder(source).build();
//!     monitor.refresh_catalog(&TagFilter::default()).await?;
//!     monitor.set_selection(["1"])?;
//!
//!     // Start background polling (non-blocking)
//!     let _handle = monitor.start();
//!
//!     let mut snapshots = monitor.subscribe();
//!     while snapshots.changed().await.is_ok() {
//!         let snapshot = snapshots.borrow_and_update().clone();
//!         println!("{}", StatusSummary::from_snapshot(&snapshot));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Atomic snapshots**: readers get an `Arc` to a complete snapshot, never a partial one
//! - **Bounded history**: fixed-capacity ring per tag with FIFO eviction
//! - **Stateless alerts**: rules are re-evaluated on every tick
//! - **Staleness detection**: independent of poll success or failure
//! - **Groups**: named tag collections usable as a selection

pub mod alerts;
pub mod error;
pub mod export;
pub mod groups;
pub mod history;
pub mod monitor;
pub mod staleness;
pub mod summary;

pub use alerts::AlertEngine;
pub use error::{MonitorError, SelectionError};
pub use export::Export;
pub use groups::GroupRegistry;
pub use history::{ActivityDetector, ChangeDetector, HistoryBuffer};
pub use monitor::{Monitor, MonitorBuilder, MonitorHandle, TickOutcome};
pub use staleness::StalenessDetector;
pub use summary::{StatusLevel, StatusSummary};

// Re-export types for convenience
pub use tagwatch_types::{
    AlertEvaluation, AlertRule, Comparison, Group, GroupId, HistoryEntry, MonitoringSnapshot,
    RunStatus, TimeRange, MAX_HISTORY,
};
