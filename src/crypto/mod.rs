//! Cryptographic pipeline for the database.
//!
//! This module provides:
//! - AES-256-CBC payload encryption and decryption (`cipher`)
//! - Argon2/AES-KDF key stretching from header parameters (`kdf`)
//! - Ordered composite-key assembly from key fragments (`composite`)
//! - Key-file content sniffing (`keyfile`)
//! - The platform-protected machine key fragment (`machine`)

pub mod cipher;
pub mod composite;
pub mod kdf;
pub mod keyfile;
pub mod machine;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{CompositeKey, PayloadCipher, derive_data_key, ...};
pub use cipher::PayloadCipher;
pub use composite::{CompositeKey, KeyFragment};
pub use kdf::{derive_data_key, KdfAlgorithm, KdfParams};
pub use keyfile::{generate_key_file, load_key_file};
pub use machine::{GcmProtection, ProtectionProvider};
