//! Credential tree model — groups, entries, tags, audit times and the
//! id arena that holds them.
//!
//! This module provides:
//! - `Group` and `Entry` nodes (`group`, `entry`)
//! - The case-insensitive `Tags` set (`tags`)
//! - `AuditTimes` bookkeeping (`times`)
//! - The `Tree` arena with bidirectional id links (`tree`)

pub mod entry;
pub mod group;
pub mod tags;
pub mod times;
pub mod tree;

// Re-export the most commonly used items.
pub use entry::{Entry, FieldValue, FIELD_NOTES, FIELD_PASSWORD, FIELD_TITLE, FIELD_URL, FIELD_USERNAME};
pub use group::Group;
pub use tags::Tags;
pub use times::AuditTimes;
pub use tree::Tree;
