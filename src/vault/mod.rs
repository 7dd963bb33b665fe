//! Database façade — create, open, save and query.
//!
//! This module provides:
//! - High-level `KdbxStore` for creating, opening and saving databases
//!   and addressing their contents by path (`store`)

pub mod store;

// Re-export the most commonly used items.
pub use store::KdbxStore;
