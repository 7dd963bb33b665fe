//! kdbxvault — a self-contained KDBX encrypted password-database engine.
//!
//! Binary header codec, composite-key cipher pipeline, an in-memory
//! credential tree with tags/history/audit timestamps, "/"-path
//! queries, and masked in-memory secret buffers.  Blocking and
//! single-threaded by design: callers own the threading model.

pub mod crypto;
pub mod errors;
pub mod format;
pub mod model;
pub mod query;
pub mod secret;
pub mod vault;

#[cfg(feature = "keyring-store")]
pub mod keyring;
