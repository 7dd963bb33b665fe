//! The credential tree arena.
//!
//! Groups and entries live in id-keyed maps; parent/child links are
//! `Uuid` references in both directions, never owning pointers.  Every
//! node belongs to at most one parent; re-parenting requires an
//! explicit detach first.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::entry::Entry;
use crate::model::group::Group;

/// One database's worth of groups and entries, rooted at a single group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    root: Uuid,
    groups: BTreeMap<Uuid, Group>,
    entries: BTreeMap<Uuid, Entry>,
}

impl Tree {
    /// Create a tree with a fresh root group named `name`.
    pub fn new(name: &str) -> Self {
        let root = Group::new(name);
        let root_id = root.uuid;

        let mut groups = BTreeMap::new();
        groups.insert(root_id, root);

        Self {
            root: root_id,
            groups,
            entries: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> Uuid {
        self.root
    }

    pub fn group(&self, id: Uuid) -> Option<&Group> {
        self.groups.get(&id)
    }

    pub fn group_mut(&mut self, id: Uuid) -> Option<&mut Group> {
        self.groups.get_mut(&id)
    }

    pub fn entry(&self, id: Uuid) -> Option<&Entry> {
        self.entries.get(&id)
    }

    pub fn entry_mut(&mut self, id: Uuid) -> Option<&mut Entry> {
        self.entries.get_mut(&id)
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Child groups of `id` in declaration order.
    pub fn child_groups(&self, id: Uuid) -> Vec<&Group> {
        self.groups
            .get(&id)
            .map(|g| {
                g.children
                    .iter()
                    .filter_map(|c| self.groups.get(c))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Direct entries of `id` in declaration order.
    pub fn entries_in(&self, id: Uuid) -> Vec<&Entry> {
        self.groups
            .get(&id)
            .map(|g| {
                g.entries
                    .iter()
                    .filter_map(|e| self.entries.get(e))
                    .collect()
            })
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Groups
    // ------------------------------------------------------------------

    /// Insert a new group under `parent` and return its id.
    ///
    /// If a group with the same id is already in the arena this degrades
    /// to [`Tree::link_group`]: attached to `parent` already → no-op;
    /// attached elsewhere → left untouched.  `parent` must exist.
    pub fn attach_group(&mut self, parent: Uuid, group: Group) -> Uuid {
        let id = group.uuid;
        if self.groups.contains_key(&id) {
            self.link_group(parent, id);
            return id;
        }
        if !self.groups.contains_key(&parent) {
            return id;
        }

        let mut group = group;
        group.parent = Some(parent);
        group.times.mark_moved();

        if let Some(pg) = self.groups.get_mut(&parent) {
            pg.add_child(id);
        }
        self.groups.insert(id, group);
        id
    }

    /// Link an existing detached group under `parent`.
    ///
    /// Idempotent: linking a group already under `parent` is a no-op
    /// returning `true`.  A group attached to a different parent is left
    /// untouched (`false`): detach it first.
    pub fn link_group(&mut self, parent: Uuid, id: Uuid) -> bool {
        let current = match self.groups.get(&id) {
            Some(g) => g.parent,
            None => return false,
        };

        match current {
            Some(p) if p == parent => true,
            Some(_) => false,
            None => {
                if id == self.root || !self.groups.contains_key(&parent) {
                    return false;
                }
                if let Some(pg) = self.groups.get_mut(&parent) {
                    pg.add_child(id);
                }
                if let Some(g) = self.groups.get_mut(&id) {
                    g.parent = Some(parent);
                    g.times.mark_moved();
                }
                true
            }
        }
    }

    /// Detach a group from its parent.  No-op (`false`) if already
    /// detached or unknown.  The group stays in the arena.
    pub fn detach_group(&mut self, id: Uuid) -> bool {
        let parent = match self.groups.get(&id).and_then(|g| g.parent) {
            Some(p) => p,
            None => return false,
        };

        if let Some(pg) = self.groups.get_mut(&parent) {
            pg.remove_child(id);
        }
        if let Some(g) = self.groups.get_mut(&id) {
            g.parent = None;
            g.times.mark_moved();
        }
        true
    }

    /// Delete a group: detach it and drop its whole subtree from the
    /// arena.  The root cannot be deleted.  Deleting twice is a no-op.
    pub fn remove_group(&mut self, id: Uuid) -> bool {
        if id == self.root || !self.groups.contains_key(&id) {
            return false;
        }
        self.detach_group(id);

        let mut stack = vec![id];
        while let Some(gid) = stack.pop() {
            if let Some(group) = self.groups.remove(&gid) {
                for eid in &group.entries {
                    self.entries.remove(eid);
                }
                stack.extend(group.children.iter().copied());
            }
        }
        true
    }

    // ------------------------------------------------------------------
    // Entries
    // ------------------------------------------------------------------

    /// Insert a new entry under `parent` and return its id.  Same
    /// degradation rules as [`Tree::attach_group`].
    pub fn attach_entry(&mut self, parent: Uuid, entry: Entry) -> Uuid {
        let id = entry.uuid;
        if self.entries.contains_key(&id) {
            self.link_entry(parent, id);
            return id;
        }
        if !self.groups.contains_key(&parent) {
            return id;
        }

        let mut entry = entry;
        entry.parent = Some(parent);
        entry.times.mark_moved();

        if let Some(pg) = self.groups.get_mut(&parent) {
            pg.add_entry(id);
        }
        self.entries.insert(id, entry);
        id
    }

    /// Link an existing detached entry under `parent`.  Same rules as
    /// [`Tree::link_group`].
    pub fn link_entry(&mut self, parent: Uuid, id: Uuid) -> bool {
        let current = match self.entries.get(&id) {
            Some(e) => e.parent,
            None => return false,
        };

        match current {
            Some(p) if p == parent => true,
            Some(_) => false,
            None => {
                if !self.groups.contains_key(&parent) {
                    return false;
                }
                if let Some(pg) = self.groups.get_mut(&parent) {
                    pg.add_entry(id);
                }
                if let Some(e) = self.entries.get_mut(&id) {
                    e.parent = Some(parent);
                    e.times.mark_moved();
                }
                true
            }
        }
    }

    /// Detach an entry from its group.  No-op (`false`) if already
    /// detached or unknown.
    pub fn detach_entry(&mut self, id: Uuid) -> bool {
        let parent = match self.entries.get(&id).and_then(|e| e.parent) {
            Some(p) => p,
            None => return false,
        };

        if let Some(pg) = self.groups.get_mut(&parent) {
            pg.remove_entry(id);
        }
        if let Some(e) = self.entries.get_mut(&id) {
            e.parent = None;
            e.times.mark_moved();
        }
        true
    }

    /// Delete an entry: detach it and drop it from the arena.  History
    /// snapshots copied into other entries are value copies and remain
    /// untouched.
    pub fn remove_entry(&mut self, id: Uuid) -> Option<Entry> {
        self.entries.get(&id)?;
        self.detach_entry(id);
        self.entries.remove(&id)
    }
}
