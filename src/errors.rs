use std::path::PathBuf;
use thiserror::Error;

/// Structural problems in the on-disk format.  Always fatal: a file that
/// trips one of these is not usable.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Bad file signature — not a KDBX database")]
    BadSignature,

    #[error("Unsupported format version {0:#010x}")]
    UnsupportedVersion(u32),

    #[error("Truncated header: {0}")]
    Truncated(String),

    #[error("Malformed header field {id}: {reason}")]
    MalformedField { id: u8, reason: String },

    #[error("Header required field missing: {0}")]
    MissingField(&'static str),

    #[error("Header hash mismatch — file may be tampered")]
    HeaderHashMismatch,

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

/// Problems assembling or stretching key material.  Fatal for the current
/// open/create call; the caller may retry with different input.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("No key material supplied — at least one key fragment is required")]
    NoKeyMaterial,

    #[error("Unsupported key derivation function")]
    UnsupportedKdf,

    #[error("Key derivation failed: {0}")]
    KdfFailed(String),
}

/// Cipher selection and payload encryption/decryption failures.
#[derive(Debug, Error)]
pub enum CipherError {
    #[error("Unsupported cipher id")]
    UnsupportedCipher,

    #[error("Invalid cipher key or IV length: {0}")]
    InvalidParameter(String),

    #[error("Padding invalid — wrong password/keyfile or corrupted data")]
    PaddingInvalid,
}

/// All errors that can occur in kdbxvault.
#[derive(Debug, Error)]
pub enum KdbxError {
    // --- Format errors ---
    #[error(transparent)]
    Format(#[from] FormatError),

    // --- Key errors ---
    #[error(transparent)]
    Key(#[from] KeyError),

    // --- Cipher errors ---
    #[error(transparent)]
    Cipher(#[from] CipherError),

    // --- Database file errors ---
    #[error("Database not found at {0}")]
    NotFound(PathBuf),

    #[error("Database already exists at {0}")]
    FileExists(PathBuf),

    // --- Keyfile errors ---
    #[error("Keyfile error: {0}")]
    Keyfile(String),

    // --- Platform protection errors ---
    #[error("Protection error: {0}")]
    Protection(String),

    // --- Keyring errors ---
    #[cfg(feature = "keyring-store")]
    #[error("Keyring error: {0}")]
    Keyring(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Convenience type alias for kdbxvault results.
pub type Result<T> = std::result::Result<T, KdbxError>;
