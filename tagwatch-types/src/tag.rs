//! Tags and samples - the data points exposed by the control system.

use core::fmt;

/// Unique identifier of a tag as assigned by the control system.
pub type TagId = String;

/// Declared value kind of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueKind {
    /// Boolean (digital) tag.
    Bit,
    /// Integer register.
    Int,
    /// Floating point register.
    Float,
}

impl ValueKind {
    /// The spelling used by the upstream API.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Bit => "Bit",
            ValueKind::Int => "Int",
            ValueKind::Float => "Float",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the tag is read from or written to the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Input => "Input",
            Direction::Output => "Output",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current value of a tag.
///
/// Bit tags carry a `Bool`, numeric tags a `Number`. On the wire the value
/// is a bare JSON boolean or number.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum TagValue {
    Bool(bool),
    Number(f64),
}

impl TagValue {
    /// Numeric view of the value. Booleans coerce to `0.0` / `1.0`.
    pub fn as_number(&self) -> f64 {
        match *self {
            TagValue::Bool(true) => 1.0,
            TagValue::Bool(false) => 0.0,
            TagValue::Number(n) => n,
        }
    }

    /// The value kind this value most naturally belongs to.
    pub fn inferred_kind(&self) -> ValueKind {
        match *self {
            TagValue::Bool(_) => ValueKind::Bit,
            TagValue::Number(n) if n.fract() == 0.0 => ValueKind::Int,
            TagValue::Number(_) => ValueKind::Float,
        }
    }
}

impl Default for TagValue {
    fn default() -> Self {
        TagValue::Bool(false)
    }
}

impl From<bool> for TagValue {
    fn from(value: bool) -> Self {
        TagValue::Bool(value)
    }
}

impl From<f64> for TagValue {
    fn from(value: f64) -> Self {
        TagValue::Number(value)
    }
}

impl From<i64> for TagValue {
    fn from(value: i64) -> Self {
        TagValue::Number(value as f64)
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Bool(b) => write!(f, "{b}"),
            TagValue::Number(n) => write!(f, "{n}"),
        }
    }
}

/// A named, typed data point of the control system.
///
/// Tags are owned by the upstream system; this is a read-mostly copy
/// refreshed from the catalog and from each poll.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub address: u32,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: ValueKind,
    #[cfg_attr(feature = "serde", serde(rename = "kind"))]
    pub direction: Direction,
    pub value: TagValue,
    /// Failure simulation: the point is forced permanently off.
    #[cfg_attr(feature = "serde", serde(default))]
    pub open_circuit: bool,
    /// Failure simulation: the point is forced permanently on.
    #[cfg_attr(feature = "serde", serde(default))]
    pub short_circuit: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub is_forced: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub forced_value: TagValue,
}

impl Tag {
    /// Create a builder for a tag with the given id.
    pub fn builder(id: impl Into<TagId>) -> TagBuilder {
        TagBuilder::new(id)
    }

    /// Placeholder record for a tag known only by id and a sampled value.
    pub fn placeholder(id: impl Into<TagId>, value: TagValue) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            address: 0,
            kind: value.inferred_kind(),
            direction: Direction::Input,
            value,
            open_circuit: false,
            short_circuit: false,
            is_forced: false,
            forced_value: TagValue::default(),
        }
    }

    /// Returns true if any failure override (open/short circuit, force) is applied.
    pub fn has_failure_override(&self) -> bool {
        self.open_circuit || self.short_circuit || self.is_forced
    }
}

/// Builder for `Tag`.
#[derive(Debug)]
pub struct TagBuilder {
    tag: Tag,
}

impl TagBuilder {
    pub fn new(id: impl Into<TagId>) -> Self {
        Self {
            tag: Tag::placeholder(id, TagValue::Bool(false)),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.tag.name = name.into();
        self
    }

    pub fn address(mut self, address: u32) -> Self {
        self.tag.address = address;
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.tag.direction = direction;
        self
    }

    /// Make this a bit tag with the given value.
    pub fn bit(mut self, value: bool) -> Self {
        self.tag.kind = ValueKind::Bit;
        self.tag.value = TagValue::Bool(value);
        self
    }

    /// Make this an integer tag with the given value.
    pub fn int(mut self, value: i64) -> Self {
        self.tag.kind = ValueKind::Int;
        self.tag.value = TagValue::from(value);
        self
    }

    /// Make this a float tag with the given value.
    pub fn float(mut self, value: f64) -> Self {
        self.tag.kind = ValueKind::Float;
        self.tag.value = TagValue::Number(value);
        self
    }

    pub fn open_circuit(mut self) -> Self {
        self.tag.open_circuit = true;
        self
    }

    pub fn short_circuit(mut self) -> Self {
        self.tag.short_circuit = true;
        self
    }

    pub fn forced(mut self, value: impl Into<TagValue>) -> Self {
        self.tag.is_forced = true;
        self.tag.forced_value = value.into();
        self
    }

    pub fn build(self) -> Tag {
        self.tag
    }
}

/// Failure-simulation flags of a tag as reported by the upstream system.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct FailureOverrides {
    pub open_circuit: bool,
    pub short_circuit: bool,
    pub is_forced: bool,
    pub forced_value: TagValue,
}

impl FailureOverrides {
    /// The flags currently set on `tag`.
    pub fn of(tag: &Tag) -> Self {
        Self {
            open_circuit: tag.open_circuit,
            short_circuit: tag.short_circuit,
            is_forced: tag.is_forced,
            forced_value: tag.forced_value,
        }
    }

    /// Overwrite the flags of `tag`.
    pub fn apply_to(&self, tag: &mut Tag) {
        tag.open_circuit = self.open_circuit;
        tag.short_circuit = self.short_circuit;
        tag.is_forced = self.is_forced;
        tag.forced_value = self.forced_value;
    }
}

/// One timestamped value reading for a tag. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample {
    pub tag_id: TagId,
    pub value: TagValue,
    /// Unix timestamp in milliseconds when the value was captured.
    pub timestamp_ms: u64,
    /// Failure flags read together with the value, when the source reports them.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub overrides: Option<FailureOverrides>,
}

impl Sample {
    pub fn new(tag_id: impl Into<TagId>, value: impl Into<TagValue>, timestamp_ms: u64) -> Self {
        Self {
            tag_id: tag_id.into(),
            value: value.into(),
            timestamp_ms,
            overrides: None,
        }
    }

    /// A sample of a full tag record, carrying its value and failure flags.
    pub fn of_tag(tag: &Tag, timestamp_ms: u64) -> Self {
        Self::new(tag.id.clone(), tag.value, timestamp_ms)
            .with_overrides(FailureOverrides::of(tag))
    }

    pub fn with_overrides(mut self, overrides: FailureOverrides) -> Self {
        self.overrides = Some(overrides);
        self
    }
}

/// Get current timestamp in milliseconds since Unix epoch.
pub fn now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
