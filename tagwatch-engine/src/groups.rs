//! Named, non-exclusive collections of tag ids.

use std::collections::BTreeSet;

use tagwatch_types::{Group, GroupId, TagId};
use uuid::Uuid;

/// CRUD store for groups.
///
/// Membership is advisory: removing something that is not there is a no-op,
/// and a tag may belong to any number of groups.
#[derive(Debug, Clone, Default)]
pub struct GroupRegistry {
    // Creation order.
    groups: Vec<Group>,
}

impl GroupRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty group and return its new id.
    ///
    /// Names are labels, so duplicates are allowed.
    pub fn create(&mut self, name: impl Into<String>) -> GroupId {
        let id = Uuid::now_v7().to_string();
        self.groups.push(Group::new(id.clone(), name));
        tracing::debug!(group_id = %id, "Created group");
        id
    }

    /// Remove a group. Unknown ids are ignored.
    pub fn delete(&mut self, id: &str) {
        self.groups.retain(|g| g.id != id);
    }

    /// Add a tag to a group. No-op when the group does not exist.
    pub fn add_tag(&mut self, id: &str, tag_id: impl Into<TagId>) {
        if let Some(group) = self.find_mut(id) {
            group.tag_ids.insert(tag_id.into());
        }
    }

    /// Remove a tag from a group. No-op when either is absent.
    pub fn remove_tag(&mut self, id: &str, tag_id: &str) {
        if let Some(group) = self.find_mut(id) {
            group.tag_ids.remove(tag_id);
        }
    }

    /// Rename a group. No-op when the group does not exist.
    pub fn rename(&mut self, id: &str, name: impl Into<String>) {
        if let Some(group) = self.find_mut(id) {
            group.name = name.into();
        }
    }

    /// Look up a group by id.
    pub fn get(&self, id: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    /// All groups, oldest first.
    pub fn list(&self) -> &[Group] {
        &self.groups
    }

    /// Tag ids of a group, or `None` if the group does not exist.
    pub fn tags_of(&self, id: &str) -> Option<BTreeSet<TagId>> {
        self.get(id).map(|g| g.tag_ids.clone())
    }

    /// Ids of every group containing `tag_id`.
    pub fn groups_containing(&self, tag_id: &str) -> Vec<GroupId> {
        self.groups
            .iter()
            .filter(|g| g.contains(tag_id))
            .map(|g| g.id.clone())
            .collect()
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Group> {
        self.groups.iter_mut().find(|g| g.id == id)
    }
}
