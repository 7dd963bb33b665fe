//! Binary file format — stream primitives, the parameter dictionary and
//! the TLV header codec.
//!
//! This module provides:
//! - Little-endian stream helpers and SHA-256 tee adapters (`bytes`)
//! - The typed, order-preserving parameter dictionary (`variant`)
//! - The signature/version/TLV header codec (`header`)

pub mod bytes;
pub mod header;
pub mod variant;

// Re-export the most commonly used items.
pub use header::{Compression, Header, CIPHER_AES256, FILE_VERSION, SIGNATURE_1, SIGNATURE_2};
pub use variant::{VariantDict, VariantValue};
