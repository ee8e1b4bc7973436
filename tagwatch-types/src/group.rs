//! User-defined named collections of tags.

use std::collections::BTreeSet;

use crate::TagId;

/// Generated identifier of a group.
pub type GroupId = String;

/// A named, non-exclusive collection of tag ids.
///
/// The same tag may belong to any number of groups.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub tag_ids: BTreeSet<TagId>,
}

impl Group {
    pub fn new(id: impl Into<GroupId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tag_ids: BTreeSet::new(),
        }
    }

    pub fn contains(&self, tag_id: &str) -> bool {
        self.tag_ids.contains(tag_id)
    }

    pub fn len(&self) -> usize {
        self.tag_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tag_ids.is_empty()
    }
}
