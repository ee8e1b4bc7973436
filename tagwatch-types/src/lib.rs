//! # tagwatch-types
//!
//! Core types for real-time tag monitoring. These are the values shared by
//! the tag source adapters, the monitoring engine and its consumers.
//!
//! ## Design Goals
//!
//! - **No required dependencies**: Types work without any serialization framework
//! - **Optional serialization**: Enable the `serde` feature for JSON and friends
//! - **Wire compatible**: With `serde`, [`Tag`] reads the Factory I/O Web API format
//! - **Immutable snapshots**: [`MonitoringSnapshot`] is replaced, never patched
//!
//! ## Features
//!
//! - `serde`: Serialization via serde
//!
//! ## Example
//!
//! ```rust
//! use tagwatch_types::{AlertRule, MonitoringSnapshot, Tag, TagValue};
//!
//! let snapshot = MonitoringSnapshot::builder()
//!     .tag(Tag::builder("tank.level").name("Tank level").float(42.0).build())
//!     .tag(Tag::builder("pump.run").name("Pump running").bit(true).build())
//!     .build();
//!
//! let rule = AlertRule::greater_than("tank.level", 40.0, "Tank level high");
//! let value = snapshot.get("tank.level").map(|t| t.value);
//! assert_eq!(value, Some(TagValue::Number(42.0)));
//! assert!(rule.matches(&TagValue::Number(42.0)));
//! ```

mod alert;
mod group;
mod history;
mod snapshot;
mod tag;

pub use alert::*;
pub use group::*;
pub use history::*;
pub use snapshot::*;
pub use tag::*;

/// Default maximum number of history entries kept per tag.
pub const MAX_HISTORY: usize = 100;
