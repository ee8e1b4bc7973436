//! Error types for the monitoring engine.

use tagwatch_adapters::SourceError;
use tagwatch_types::TagId;
use thiserror::Error;

/// Why a selection request was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("selection is empty")]
    Empty,

    #[error("unknown tag id(s): {}", .0.join(", "))]
    UnknownTags(Vec<TagId>),

    #[error("unknown group: {0}")]
    UnknownGroup(String),
}

/// Errors returned by [`Monitor`](crate::Monitor) operations.
///
/// Fetch failures inside the poll loop never surface here; they are logged
/// and show up only as staleness.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("invalid selection: {0}")]
    InvalidSelection(#[from] SelectionError),

    #[error(transparent)]
    Source(#[from] SourceError),
}
