//! OS keyring integration for master-password caching.
//!
//! Stores and retrieves a database's master password from the operating
//! system's secure credential store:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring / KDE Wallet)
//!
//! This is an alternate backend for a *derived* secret, never required
//! by the engine itself.  All operations fail gracefully — if the
//! keyring is unavailable, the error is returned and the caller falls
//! back to a password prompt.

use crate::errors::{KdbxError, Result};

/// Service name used in the OS keyring.
const SERVICE_NAME: &str = "kdbxvault";

/// Build a keyring entry key from a database path.
///
/// Uses the canonical path so that different relative paths to the
/// same database resolve to the same keyring entry.
fn entry_key(database_path: &str) -> String {
    format!("database:{database_path}")
}

/// Store a password in the OS keyring for a specific database.
pub fn store_password(database_path: &str, password: &str) -> Result<()> {
    let entry = keyring::Entry::new(SERVICE_NAME, &entry_key(database_path))
        .map_err(|e| KdbxError::Keyring(format!("failed to create keyring entry: {e}")))?;

    entry.set_password(password).map_err(|e| {
        KdbxError::Keyring(format!("failed to store password in keyring: {e}"))
    })?;

    Ok(())
}

/// Retrieve a password from the OS keyring for a specific database.
///
/// Returns `None` if no password is stored (rather than an error).
pub fn get_password(database_path: &str) -> Result<Option<String>> {
    let entry = keyring::Entry::new(SERVICE_NAME, &entry_key(database_path))
        .map_err(|e| KdbxError::Keyring(format!("failed to create keyring entry: {e}")))?;

    match entry.get_password() {
        Ok(password) => Ok(Some(password)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(KdbxError::Keyring(format!(
            "failed to read from keyring: {e}"
        ))),
    }
}

/// Delete a stored password from the OS keyring.
pub fn delete_password(database_path: &str) -> Result<()> {
    let entry = keyring::Entry::new(SERVICE_NAME, &entry_key(database_path))
        .map_err(|e| KdbxError::Keyring(format!("failed to create keyring entry: {e}")))?;

    match entry.delete_credential() {
        Ok(()) => Ok(()),
        Err(keyring::Error::NoEntry) => Ok(()), // Already gone, that's fine.
        Err(e) => Err(KdbxError::Keyring(format!(
            "failed to delete from keyring: {e}"
        ))),
    }
}
