//! Case-insensitively unique tag set for entries.

use serde::{Deserialize, Serialize};

/// An ordered tag collection.  Lookups and uniqueness are
/// case-insensitive; the original casing of the first add wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags {
    tags: Vec<String>,
}

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag.  Returns `false` (and changes nothing) if an equal
    /// tag is already present.
    pub fn add(&mut self, tag: &str) -> bool {
        if self.contains(tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    /// Remove a tag.  Returns whether anything was removed.
    pub fn remove(&mut self, tag: &str) -> bool {
        let needle = tag.to_lowercase();
        match self.tags.iter().position(|t| t.to_lowercase() == needle) {
            Some(pos) => {
                self.tags.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, tag: &str) -> bool {
        let needle = tag.to_lowercase();
        self.tags.iter().any(|t| t.to_lowercase() == needle)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}
