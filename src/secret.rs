//! Obfuscated in-memory holder for secret byte sequences.
//!
//! A `SecretBuffer` keeps its contents XOR-masked against a per-buffer
//! random pad while idle, so plaintext secrets never sit in ordinary
//! process memory longer than a read takes.  `read` and `read_str` hand
//! back `Zeroizing` views that wipe themselves on drop; callers must
//! copy out what they need and drop the view, never hold it across I/O.

use rand::RngCore;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

use crate::errors::{KdbxError, Result};

/// A secret byte sequence, masked at rest.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct SecretBuffer {
    /// The secret XOR'd against `pad`, byte for byte.
    masked: Vec<u8>,
    /// Random pad, same length as `masked`.
    pad: Vec<u8>,
}

impl SecretBuffer {
    /// Wrap `plain` in a new masked buffer.
    ///
    /// The caller keeps ownership of `plain` and should zeroize it if it
    /// was the only copy.
    pub fn new(plain: &[u8]) -> Self {
        let mut pad = vec![0u8; plain.len()];
        rand::rng().fill_bytes(&mut pad);

        let masked = plain
            .iter()
            .zip(pad.iter())
            .map(|(b, p)| b ^ p)
            .collect();

        Self { masked, pad }
    }

    /// Wrap the UTF-8 bytes of `s`.
    pub fn from_str(s: &str) -> Self {
        Self::new(s.as_bytes())
    }

    /// Unmask into a short-lived plaintext view.
    pub fn read(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(
            self.masked
                .iter()
                .zip(self.pad.iter())
                .map(|(b, p)| b ^ p)
                .collect(),
        )
    }

    /// Unmask into a short-lived string view.
    ///
    /// Fails if the buffer does not hold valid UTF-8; the intermediate
    /// bytes are wiped either way.
    pub fn read_str(&self) -> Result<Zeroizing<String>> {
        let bytes = self.read();
        match std::str::from_utf8(&bytes) {
            Ok(s) => Ok(Zeroizing::new(s.to_string())),
            Err(_) => Err(KdbxError::Serialization(
                "secret is not valid UTF-8".to_string(),
            )),
        }
    }

    /// Length of the secret in bytes.  Does not unmask.
    pub fn len(&self) -> usize {
        self.masked.len()
    }

    /// Returns `true` if the secret is empty.
    pub fn is_empty(&self) -> bool {
        self.masked.is_empty()
    }

    /// Constant-time comparison against a plaintext candidate.
    pub fn eq_bytes(&self, candidate: &[u8]) -> bool {
        let plain = self.read();
        plain.ct_eq(candidate).into()
    }
}

impl Clone for SecretBuffer {
    /// Re-masks the secret under a fresh pad.
    fn clone(&self) -> Self {
        let plain = self.read();
        Self::new(&plain)
    }
}

impl PartialEq for SecretBuffer {
    fn eq(&self, other: &Self) -> bool {
        let a = self.read();
        let b = other.read();
        a.ct_eq(&b).into()
    }
}

impl Eq for SecretBuffer {}

impl std::fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretBuffer(***)")
    }
}

// ---------------------------------------------------------------------------
// Serde: the plaintext only ever lands inside the encrypted payload
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

impl serde::Serialize for SecretBuffer {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let plain = self.read();
        serializer.serialize_str(&BASE64.encode(plain.as_slice()))
    }
}

impl<'de> serde::Deserialize<'de> for SecretBuffer {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::Deserialize;
        let s = String::deserialize(deserializer)?;
        let mut plain = BASE64.decode(&s).map_err(serde::de::Error::custom)?;
        let buffer = SecretBuffer::new(&plain);
        plain.zeroize();
        Ok(buffer)
    }
}
