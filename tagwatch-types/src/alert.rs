//! Threshold alert rules and their evaluation results.

use core::fmt;
use core::str::FromStr;

use crate::{TagId, TagValue};

/// Comparison applied between a tag value and a rule threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Comparison {
    GreaterThan,
    LessThan,
    Equal,
}

impl Comparison {
    /// Apply the comparison.
    ///
    /// `GreaterThan` and `LessThan` coerce the value to a number (booleans
    /// become 0/1). `Equal` compares the native value: a boolean tag never
    /// equals a numeric threshold.
    pub fn check(&self, value: &TagValue, threshold: f64) -> bool {
        match self {
            Comparison::GreaterThan => value.as_number() > threshold,
            Comparison::LessThan => value.as_number() < threshold,
            Comparison::Equal => match value {
                TagValue::Number(n) => *n == threshold,
                TagValue::Bool(_) => false,
            },
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::GreaterThan => ">",
            Comparison::LessThan => "<",
            Comparison::Equal => "==",
        }
    }
}

impl FromStr for Comparison {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "greater_than" | "gt" | ">" => Ok(Self::GreaterThan),
            "less_than" | "lt" | "<" => Ok(Self::LessThan),
            "equal" | "eq" | "==" => Ok(Self::Equal),
            other => Err(format!("unknown comparison: {other}")),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GreaterThan => write!(f, "greater_than"),
            Self::LessThan => write!(f, "less_than"),
            Self::Equal => write!(f, "equal"),
        }
    }
}

/// A user-defined threshold rule on one tag.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AlertRule {
    pub tag_id: TagId,
    pub comparison: Comparison,
    pub threshold: f64,
    pub message: String,
}

impl AlertRule {
    pub fn new(
        tag_id: impl Into<TagId>,
        comparison: Comparison,
        threshold: f64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            tag_id: tag_id.into(),
            comparison,
            threshold,
            message: message.into(),
        }
    }

    pub fn greater_than(tag_id: impl Into<TagId>, threshold: f64, message: impl Into<String>) -> Self {
        Self::new(tag_id, Comparison::GreaterThan, threshold, message)
    }

    pub fn less_than(tag_id: impl Into<TagId>, threshold: f64, message: impl Into<String>) -> Self {
        Self::new(tag_id, Comparison::LessThan, threshold, message)
    }

    pub fn equal(tag_id: impl Into<TagId>, threshold: f64, message: impl Into<String>) -> Self {
        Self::new(tag_id, Comparison::Equal, threshold, message)
    }

    /// Returns true if `value` satisfies this rule.
    pub fn matches(&self, value: &TagValue) -> bool {
        self.comparison.check(value, self.threshold)
    }
}

impl fmt::Display for AlertRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}: {}",
            self.tag_id,
            self.comparison.symbol(),
            self.threshold,
            self.message
        )
    }
}

/// The outcome of evaluating one rule against the current value of its tag.
///
/// Recomputed on every poll and never stored.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AlertEvaluation {
    pub rule: AlertRule,
    pub value: TagValue,
    pub triggered: bool,
}
