//! Error types for tag sources.

use std::collections::BTreeMap;

use tagwatch_types::{Sample, TagId};
use thiserror::Error;

/// Errors that can occur when reading from a tag source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source could not be reached at all.
    #[error("Tag source unreachable: {0}")]
    Unreachable(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// The source answered with an error status.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Some requested tags were absent from the response.
    ///
    /// The samples that did arrive are carried along so callers can still use them.
    #[error("Partial result: {} tag(s) missing", missing.len())]
    PartialResult {
        samples: BTreeMap<TagId, Sample>,
        missing: Vec<TagId>,
    },
}

impl SourceError {
    /// Returns true if the network call could not complete.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, SourceError::Unreachable(_) | SourceError::Timeout)
    }
}

#[cfg(feature = "factoryio")]
impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout
        } else if err.is_connect() {
            SourceError::Unreachable(err.to_string())
        } else if err.is_decode() {
            SourceError::Parse(err.to_string())
        } else {
            SourceError::Http(err.to_string())
        }
    }
}
