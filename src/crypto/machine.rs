//! Machine-bound key fragment.
//!
//! High-entropy random bytes persisted in a platform-protected file and
//! reused on every open from the same user/machine account.  The
//! protection itself is an injected collaborator so each OS can plug in
//! its native primitive (DPAPI, Keychain, libsecret); the in-tree
//! default seals with AES-256-GCM under a key derived from the
//! application entropy constant.
//!
//! If the protected file cannot be read or unwrapped, a *new* fragment
//! is generated and persisted.  That is a recoverable condition, but it
//! permanently invalidates databases keyed against the previous
//! fragment, so the regeneration is logged as a warning for hosts to
//! surface.

use std::fs;
use std::path::Path;

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use tracing::warn;
use zeroize::Zeroizing;

use crate::errors::{KdbxError, Result};

/// Application-embedded additional entropy mixed into the protection.
pub const APPLICATION_ENTROPY: &[u8] = b"kdbxvault.machine-key.v1";

/// Length of the machine fragment in bytes (256 bits).
const FRAGMENT_LEN: usize = 32;

/// Size of the AES-256-GCM nonce in bytes.
const NONCE_LEN: usize = 12;

/// An opaque reversible transform supplied per platform.
pub trait ProtectionProvider {
    fn protect(&self, data: &[u8], entropy: &[u8]) -> Result<Vec<u8>>;
    fn unprotect(&self, blob: &[u8], entropy: &[u8]) -> Result<Vec<u8>>;
}

/// Default provider: AES-256-GCM under an HKDF-derived key.
///
/// Layout of the protected blob: `[ 12-byte nonce | ciphertext + tag ]`.
#[derive(Debug, Default)]
pub struct GcmProtection;

impl GcmProtection {
    fn derive_key(entropy: &[u8]) -> Result<Zeroizing<[u8; 32]>> {
        let hk = Hkdf::<Sha256>::new(None, entropy);
        let mut key = Zeroizing::new([0u8; 32]);
        hk.expand(b"kdbxvault-protection-key", &mut key[..])
            .map_err(|e| KdbxError::Protection(format!("HKDF expand failed: {e}")))?;
        Ok(key)
    }
}

impl ProtectionProvider for GcmProtection {
    fn protect(&self, data: &[u8], entropy: &[u8]) -> Result<Vec<u8>> {
        let key = Self::derive_key(entropy)?;
        let cipher = Aes256Gcm::new_from_slice(key.as_ref())
            .map_err(|e| KdbxError::Protection(format!("invalid key length: {e}")))?;

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, data)
            .map_err(|e| KdbxError::Protection(format!("seal failed: {e}")))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    fn unprotect(&self, blob: &[u8], entropy: &[u8]) -> Result<Vec<u8>> {
        if blob.len() < NONCE_LEN {
            return Err(KdbxError::Protection("protected blob too short".into()));
        }

        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        let key = Self::derive_key(entropy)?;
        let cipher = Aes256Gcm::new_from_slice(key.as_ref())
            .map_err(|e| KdbxError::Protection(format!("invalid key length: {e}")))?;

        cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| KdbxError::Protection("unseal failed".into()))
    }
}

/// Load the machine fragment from `path`, creating it on first use.
///
/// Unreadable or unwrappable state regenerates the fragment instead of
/// failing; see the module docs for the consequence.
pub fn load_or_create(
    path: &Path,
    provider: &dyn ProtectionProvider,
    rng: &mut dyn RngCore,
) -> Result<Zeroizing<Vec<u8>>> {
    if path.exists() {
        match fs::read(path) {
            Ok(blob) => match provider.unprotect(&blob, APPLICATION_ENTROPY) {
                Ok(fragment) => return Ok(Zeroizing::new(fragment)),
                Err(e) => {
                    warn!("machine key unprotect failed ({e}), generating a new one; \
                           databases keyed against the old fragment can no longer be opened");
                }
            },
            Err(e) => {
                warn!("machine key file unreadable ({e}), generating a new one");
            }
        }
    }

    let mut fragment = Zeroizing::new(vec![0u8; FRAGMENT_LEN]);
    rng.fill_bytes(&mut fragment);

    let blob = provider.protect(&fragment, APPLICATION_ENTROPY)?;

    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                KdbxError::Protection(format!("cannot create machine key directory: {e}"))
            })?;
        }
    }
    fs::write(path, &blob)
        .map_err(|e| KdbxError::Protection(format!("failed to write machine key: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(path, perms).map_err(|e| {
            KdbxError::Protection(format!("failed to set machine key permissions: {e}"))
        })?;
    }

    Ok(fragment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn protect_unprotect_roundtrip() {
        let provider = GcmProtection;
        let blob = provider.protect(b"fragment bytes", APPLICATION_ENTROPY).unwrap();
        assert_ne!(blob.as_slice(), b"fragment bytes");

        let back = provider.unprotect(&blob, APPLICATION_ENTROPY).unwrap();
        assert_eq!(back, b"fragment bytes");
    }

    #[test]
    fn unprotect_with_different_entropy_fails() {
        let provider = GcmProtection;
        let blob = provider.protect(b"fragment bytes", APPLICATION_ENTROPY).unwrap();
        assert!(provider.unprotect(&blob, b"other-app").is_err());
    }

    #[test]
    fn fragment_is_persisted_and_reused() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("machine.key");
        let provider = GcmProtection;

        let first = load_or_create(&path, &provider, &mut rand::rng()).unwrap();
        let second = load_or_create(&path, &provider, &mut rand::rng()).unwrap();

        assert_eq!(first.as_slice(), second.as_slice());
        assert_eq!(first.len(), FRAGMENT_LEN);
    }

    #[test]
    fn corrupted_file_regenerates_without_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("machine.key");
        let provider = GcmProtection;

        let first = load_or_create(&path, &provider, &mut rand::rng()).unwrap();
        fs::write(&path, b"garbage").unwrap();

        let second = load_or_create(&path, &provider, &mut rand::rng()).unwrap();
        assert_ne!(first.as_slice(), second.as_slice());

        // The regenerated fragment is persisted and stable again.
        let third = load_or_create(&path, &provider, &mut rand::rng()).unwrap();
        assert_eq!(second.as_slice(), third.as_slice());
    }
}
