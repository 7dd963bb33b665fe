//! Composite key assembly.
//!
//! A composite key is an ordered collection of key fragments (a
//! password, key-file bytes, machine-bound entropy) whose raw material
//! is concatenated in addition order and hashed.  The order must be the
//! same across create and open to reproduce the derived key.

use zeroize::Zeroizing;

use crate::errors::{KeyError, Result};
use crate::secret::SecretBuffer;

use sha2::{Digest, Sha256};

/// One independently-sourced piece of key material.
pub enum KeyFragment {
    /// UTF-8 bytes of the master password, masked at rest.
    Password(SecretBuffer),
    /// Raw bytes of a key file (see [`crate::crypto::keyfile`]).
    KeyFile(Zeroizing<Vec<u8>>),
    /// Entropy bound to the current user/machine account.
    MachineKey(Zeroizing<Vec<u8>>),
}

impl KeyFragment {
    fn material(&self) -> Zeroizing<Vec<u8>> {
        match self {
            KeyFragment::Password(secret) => secret.read(),
            KeyFragment::KeyFile(bytes) => Zeroizing::new(bytes.to_vec()),
            KeyFragment::MachineKey(bytes) => Zeroizing::new(bytes.to_vec()),
        }
    }
}

impl std::fmt::Debug for KeyFragment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            KeyFragment::Password(_) => "Password",
            KeyFragment::KeyFile(_) => "KeyFile",
            KeyFragment::MachineKey(_) => "MachineKey",
        };
        write!(f, "KeyFragment::{name}(***)")
    }
}

/// The ordered set of key fragments for one database.
#[derive(Debug, Default)]
pub struct CompositeKey {
    fragments: Vec<KeyFragment>,
}

impl CompositeKey {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for the common password-only case.
    pub fn from_password(password: &str) -> Self {
        let mut key = Self::new();
        key.add_password(password);
        key
    }

    pub fn add_password(&mut self, password: &str) {
        self.fragments
            .push(KeyFragment::Password(SecretBuffer::from_str(password)));
    }

    pub fn add_key_file(&mut self, bytes: Zeroizing<Vec<u8>>) {
        self.fragments.push(KeyFragment::KeyFile(bytes));
    }

    pub fn add_machine_key(&mut self, bytes: Zeroizing<Vec<u8>>) {
        self.fragments.push(KeyFragment::MachineKey(bytes));
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// SHA-256 over the in-order concatenation of all fragment material.
    ///
    /// At least one fragment must be present.
    pub fn raw_hash(&self) -> Result<Zeroizing<[u8; 32]>> {
        if self.fragments.is_empty() {
            return Err(KeyError::NoKeyMaterial.into());
        }

        let mut hasher = Sha256::new();
        for fragment in &self.fragments {
            let material = fragment.material();
            hasher.update(material.as_slice());
        }

        let mut hash = Zeroizing::new([0u8; 32]);
        hash.copy_from_slice(&hasher.finalize());
        Ok(hash)
    }
}
