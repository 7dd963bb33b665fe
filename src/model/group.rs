//! Credential groups (folders).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::times::AuditTimes;

/// A group holding entries and subgroups.
///
/// Parent and children are id references into the owning
/// [`Tree`](crate::model::Tree); a group belongs to exactly one parent
/// at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub uuid: Uuid,
    pub name: String,
    pub notes: String,
    pub icon_id: Option<u32>,
    pub times: AuditTimes,
    /// UUID of the parent group, `None` for the root or while detached.
    pub(crate) parent: Option<Uuid>,
    /// Child group UUIDs, in declaration order.
    pub(crate) children: Vec<Uuid>,
    /// Entry UUIDs, in declaration order.
    pub(crate) entries: Vec<Uuid>,
}

impl Group {
    pub fn new(name: &str) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.to_string(),
            notes: String::new(),
            icon_id: None,
            times: AuditTimes::new(),
            parent: None,
            children: Vec::new(),
            entries: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<Uuid> {
        self.parent
    }

    pub fn children(&self) -> &[Uuid] {
        &self.children
    }

    pub fn entries(&self) -> &[Uuid] {
        &self.entries
    }

    pub fn rename(&mut self, name: &str) {
        self.name = name.to_string();
        self.times.mark_modified();
    }

    /// Add a child group id.  No-op if already present.
    pub(crate) fn add_child(&mut self, child: Uuid) {
        if !self.children.contains(&child) {
            self.children.push(child);
            self.times.mark_modified();
        }
    }

    /// Remove a child group id.  Returns whether anything was removed.
    pub(crate) fn remove_child(&mut self, child: Uuid) -> bool {
        match self.children.iter().position(|u| *u == child) {
            Some(pos) => {
                self.children.remove(pos);
                self.times.mark_modified();
                true
            }
            None => false,
        }
    }

    /// Add an entry id.  No-op if already present.
    pub(crate) fn add_entry(&mut self, entry: Uuid) {
        if !self.entries.contains(&entry) {
            self.entries.push(entry);
            self.times.mark_modified();
        }
    }

    /// Remove an entry id.  Returns whether anything was removed.
    pub(crate) fn remove_entry(&mut self, entry: Uuid) -> bool {
        match self.entries.iter().position(|u| *u == entry) {
            Some(pos) => {
                self.entries.remove(pos);
                self.times.mark_modified();
                true
            }
            None => false,
        }
    }
}
