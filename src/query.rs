//! "/"-delimited path addressing over the credential tree.
//!
//! A query path names a chain of group names, optionally ending in an
//! entry title: `"web/banking/Checking"`.  Group matching is
//! case-insensitive, first match per level in declaration order.
//! Lookups that find nothing return `None`; a miss is a normal result,
//! not an error.

use uuid::Uuid;

use crate::model::{Entry, Group, Tree};

/// A parsed query path.
///
/// Empty segments from leading, trailing or doubled separators are
/// dropped: `"/a//b/"` parses the same as `"a/b"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPath {
    segments: Vec<String>,
}

impl QueryPath {
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Split into the group chain and the final segment.
    ///
    /// `None` when the path has no segments at all.
    fn split_leaf(&self) -> Option<(&[String], &str)> {
        let (last, init) = self.segments.split_last()?;
        Some((init, last.as_str()))
    }
}

impl std::fmt::Display for QueryPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

fn name_matches(name: &str, segment: &str) -> bool {
    name.to_lowercase() == segment.to_lowercase()
}

fn child_by_name(tree: &Tree, group: Uuid, segment: &str) -> Option<Uuid> {
    tree.child_groups(group)
        .iter()
        .find(|g| name_matches(&g.name, segment))
        .map(|g| g.uuid)
}

fn walk(tree: &Tree, start: Uuid, segments: &[String]) -> Option<Uuid> {
    let mut current = start;
    for segment in segments {
        current = child_by_name(tree, current, segment)?;
    }
    Some(current)
}

/// Resolve a group path from `start`.  `None` when any segment has no
/// matching child group.
pub fn resolve_group(tree: &Tree, start: Uuid, path: &QueryPath) -> Option<Uuid> {
    walk(tree, start, &path.segments)
}

/// Resolve a group path, creating a child group for every unmatched
/// segment.  Never fails for a valid `start`.
pub fn get_or_create_group(tree: &mut Tree, start: Uuid, path: &QueryPath) -> Uuid {
    let mut current = start;
    for segment in &path.segments {
        current = match child_by_name(tree, current, segment) {
            Some(id) => id,
            None => tree.attach_group(current, Group::new(segment)),
        };
    }
    current
}

/// Find an entry by path: all-but-last names the group, the last
/// segment is the entry title.  Scans direct entries only, no
/// recursion.
pub fn find_entry(tree: &Tree, start: Uuid, path: &QueryPath) -> Option<Uuid> {
    let (group_segments, title) = path.split_leaf()?;
    let group = walk(tree, start, group_segments)?;

    tree.entries_in(group)
        .iter()
        .find(|e| name_matches(e.title(), title))
        .map(|e| e.uuid)
}

/// Find an entry by path, creating the group chain and the entry when
/// absent.  `None` only for a path with no segments.
pub fn get_or_create_entry(tree: &mut Tree, start: Uuid, path: &QueryPath) -> Option<Uuid> {
    if let Some(id) = find_entry(tree, start, path) {
        return Some(id);
    }

    let (group_segments, title) = path.split_leaf()?;
    let group_path = QueryPath {
        segments: group_segments.to_vec(),
    };
    let group = get_or_create_group(tree, start, &group_path);
    Some(tree.attach_entry(group, Entry::new(title)))
}
