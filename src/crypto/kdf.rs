//! Key derivation from composite key material.
//!
//! The composite hash is stretched with the algorithm recorded in the
//! header's parameter dictionary: Argon2id/Argon2d (memory-hard,
//! current default) or the legacy iterated AES-256-ECB transform kept
//! for older files.  The final data key is SHA-256 over the header's
//! master seed concatenated with the stretched key.

use aes::{Aes256, Block};
use argon2::{Algorithm, Argon2, Params, Version};
use cipher::{BlockEncrypt, KeyInit};
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::errors::{KeyError, Result};
use crate::format::header::Header;
use crate::format::variant::{VariantDict, VariantValue};

/// Length of the stretched and final keys in bytes (256 bits).
const KEY_LEN: usize = 32;

/// Length of the KDF salt in bytes.
const SALT_LEN: usize = 32;

/// Minimum safe Argon2 memory cost in KiB (8 MB).
const MIN_MEMORY_KIB: u32 = 8_192;

/// Algorithm id of Argon2d.
pub const KDF_ARGON2D: [u8; 16] = [
    0xEF, 0x63, 0x6D, 0xDF, 0x8C, 0x29, 0x44, 0x4B, 0x91, 0xF7, 0xA9, 0xA4, 0x03, 0xE3, 0x0A,
    0x0C,
];

/// Algorithm id of Argon2id.
pub const KDF_ARGON2ID: [u8; 16] = [
    0x9E, 0x29, 0x8B, 0x19, 0x56, 0xDB, 0x47, 0x73, 0xB2, 0x3D, 0xFC, 0x3E, 0xC6, 0xF0, 0xA1,
    0xE6,
];

/// Algorithm id of the legacy AES key transform.
pub const KDF_AES: [u8; 16] = [
    0xC9, 0xD9, 0xF3, 0x9A, 0x62, 0x8A, 0x44, 0x60, 0xBF, 0x74, 0x0D, 0x08, 0xC1, 0x8A, 0x4F,
    0xEA,
];

// Parameter dictionary keys.
const KEY_UUID: &str = "$UUID";
const KEY_SALT: &str = "S";
const KEY_ROUNDS: &str = "R";
const KEY_ITERATIONS: &str = "I";
const KEY_MEMORY: &str = "M";
const KEY_PARALLELISM: &str = "P";
const KEY_VERSION: &str = "V";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfAlgorithm {
    Argon2d,
    Argon2id,
    /// Iterated AES-256-ECB over the composite hash, keyed by the salt.
    AesKdf,
}

/// Key-derivation settings as carried in the header dictionary.
#[derive(Debug, Clone)]
pub struct KdfParams {
    pub algorithm: KdfAlgorithm,
    /// Random salt, regenerated on every save.
    pub salt: Vec<u8>,
    /// Iterations (Argon2) or transform rounds (AES-KDF).
    pub iterations: u64,
    /// Memory cost in KiB.  Ignored by AES-KDF.
    pub memory_kib: u32,
    /// Parallelism lanes.  Ignored by AES-KDF.
    pub parallelism: u32,
    /// Argon2 version word.
    pub version: u32,
}

impl Default for KdfParams {
    /// Argon2id with the stock cost profile (64 MB, 3 iterations, 4 lanes).
    fn default() -> Self {
        Self {
            algorithm: KdfAlgorithm::Argon2id,
            salt: Vec::new(),
            iterations: 3,
            memory_kib: 65_536,
            parallelism: 4,
            version: 0x13,
        }
    }
}

impl KdfParams {
    /// Replace the salt with fresh random bytes.
    pub fn regenerate_salt(&mut self, rng: &mut dyn RngCore) {
        let mut salt = vec![0u8; SALT_LEN];
        rng.fill_bytes(&mut salt);
        self.salt = salt;
    }

    /// Encode into the self-describing dictionary stored in the header.
    pub fn to_dict(&self) -> VariantDict {
        let mut dict = VariantDict::new();

        let uuid = match self.algorithm {
            KdfAlgorithm::Argon2d => KDF_ARGON2D,
            KdfAlgorithm::Argon2id => KDF_ARGON2ID,
            KdfAlgorithm::AesKdf => KDF_AES,
        };
        dict.set(KEY_UUID, VariantValue::Bytes(uuid.to_vec()));
        dict.set(KEY_SALT, VariantValue::Bytes(self.salt.clone()));

        match self.algorithm {
            KdfAlgorithm::AesKdf => {
                dict.set(KEY_ROUNDS, VariantValue::UInt64(self.iterations));
            }
            _ => {
                dict.set(KEY_ITERATIONS, VariantValue::UInt64(self.iterations));
                dict.set(
                    KEY_MEMORY,
                    VariantValue::UInt64(u64::from(self.memory_kib) * 1024),
                );
                dict.set(KEY_PARALLELISM, VariantValue::UInt32(self.parallelism));
                dict.set(KEY_VERSION, VariantValue::UInt32(self.version));
            }
        }

        dict
    }

    /// Decode from the header dictionary.
    pub fn from_dict(dict: &VariantDict) -> Result<Self> {
        let uuid = dict
            .get_bytes(KEY_UUID)
            .ok_or(KeyError::KdfFailed("missing algorithm id".into()))?;

        let algorithm = if uuid == KDF_ARGON2D.as_slice() {
            KdfAlgorithm::Argon2d
        } else if uuid == KDF_ARGON2ID.as_slice() {
            KdfAlgorithm::Argon2id
        } else if uuid == KDF_AES.as_slice() {
            KdfAlgorithm::AesKdf
        } else {
            return Err(KeyError::UnsupportedKdf.into());
        };

        let salt = dict
            .get_bytes(KEY_SALT)
            .ok_or(KeyError::KdfFailed("missing salt".into()))?
            .to_vec();

        let defaults = Self::default();
        let iterations = dict
            .get_u64(KEY_ITERATIONS)
            .or_else(|| dict.get_u64(KEY_ROUNDS))
            .unwrap_or(defaults.iterations);
        let memory_kib = dict
            .get_u64(KEY_MEMORY)
            .map(|bytes| u32::try_from(bytes / 1024).unwrap_or(u32::MAX))
            .unwrap_or(defaults.memory_kib);
        let parallelism = dict.get_u32(KEY_PARALLELISM).unwrap_or(defaults.parallelism);
        let version = dict.get_u32(KEY_VERSION).unwrap_or(defaults.version);

        Ok(Self {
            algorithm,
            salt,
            iterations,
            memory_kib,
            parallelism,
            version,
        })
    }

    /// Stretch the 32-byte composite hash into the transformed key.
    ///
    /// The same params and input always produce the same output.
    pub fn transform(&self, composite_hash: &[u8; KEY_LEN]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
        match self.algorithm {
            KdfAlgorithm::Argon2d | KdfAlgorithm::Argon2id => self.transform_argon2(composite_hash),
            KdfAlgorithm::AesKdf => self.transform_aes(composite_hash),
        }
    }

    fn transform_argon2(&self, composite_hash: &[u8; KEY_LEN]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
        if self.memory_kib < MIN_MEMORY_KIB {
            return Err(KeyError::KdfFailed(format!(
                "Argon2 memory cost must be at least {MIN_MEMORY_KIB} KiB (got {})",
                self.memory_kib
            ))
            .into());
        }
        let iterations = u32::try_from(self.iterations)
            .ok()
            .filter(|t| *t >= 1)
            .ok_or_else(|| KeyError::KdfFailed("Argon2 iterations out of range".into()))?;
        if self.parallelism < 1 {
            return Err(KeyError::KdfFailed("Argon2 parallelism must be at least 1".into()).into());
        }

        let params = Params::new(self.memory_kib, iterations, self.parallelism, Some(KEY_LEN))
            .map_err(|e| KeyError::KdfFailed(format!("invalid Argon2 params: {e}")))?;

        let algorithm = match self.algorithm {
            KdfAlgorithm::Argon2d => Algorithm::Argon2d,
            _ => Algorithm::Argon2id,
        };
        let version = match self.version {
            0x10 => Version::V0x10,
            _ => Version::V0x13,
        };

        let argon2 = Argon2::new(algorithm, version, params);

        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        argon2
            .hash_password_into(composite_hash, &self.salt, &mut key[..])
            .map_err(|e| KeyError::KdfFailed(format!("Argon2 hashing failed: {e}")))?;

        Ok(key)
    }

    fn transform_aes(&self, composite_hash: &[u8; KEY_LEN]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
        let cipher = Aes256::new_from_slice(&self.salt)
            .map_err(|_| KeyError::KdfFailed("AES transform salt must be 32 bytes".into()))?;

        let mut data = Zeroizing::new(*composite_hash);
        for _ in 0..self.iterations {
            let (lo, hi) = data.split_at_mut(16);
            cipher.encrypt_block(Block::from_mut_slice(lo));
            cipher.encrypt_block(Block::from_mut_slice(hi));
        }

        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        key.copy_from_slice(&Sha256::digest(data.as_ref()));
        Ok(key)
    }
}

/// Derive the cipher's data key from the composite hash and the header.
///
/// `SHA-256(master seed ‖ transform(composite hash))`: exactly the
/// 32 bytes the payload cipher requires.
pub fn derive_data_key(
    composite_hash: &[u8; KEY_LEN],
    header: &Header,
) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let params = KdfParams::from_dict(&header.kdf_params)?;
    let transformed = params.transform(composite_hash)?;

    let mut hasher = Sha256::new();
    hasher.update(&header.master_seed);
    hasher.update(transformed.as_ref());

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    key.copy_from_slice(&hasher.finalize());
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::KdbxError;

    /// Cheap Argon2 profile so the suite stays fast.
    fn fast_argon2() -> KdfParams {
        KdfParams {
            algorithm: KdfAlgorithm::Argon2id,
            salt: vec![0x5A; 32],
            iterations: 1,
            memory_kib: MIN_MEMORY_KIB,
            parallelism: 1,
            version: 0x13,
        }
    }

    #[test]
    fn argon2_transform_is_deterministic() {
        let params = fast_argon2();
        let a = params.transform(&[1u8; 32]).unwrap();
        let b = params.transform(&[1u8; 32]).unwrap();
        assert_eq!(a.as_ref(), b.as_ref());
    }

    #[test]
    fn single_input_byte_changes_the_key() {
        let params = fast_argon2();
        let mut input = [1u8; 32];
        let a = params.transform(&input).unwrap();
        input[0] ^= 1;
        let b = params.transform(&input).unwrap();
        assert_ne!(a.as_ref(), b.as_ref());
    }

    #[test]
    fn salt_changes_the_key() {
        let a = fast_argon2().transform(&[1u8; 32]).unwrap();
        let mut other = fast_argon2();
        other.salt[0] ^= 1;
        let b = other.transform(&[1u8; 32]).unwrap();
        assert_ne!(a.as_ref(), b.as_ref());
    }

    #[test]
    fn aes_transform_is_deterministic() {
        let params = KdfParams {
            algorithm: KdfAlgorithm::AesKdf,
            salt: vec![0x11; 32],
            iterations: 1000,
            ..KdfParams::default()
        };
        let a = params.transform(&[9u8; 32]).unwrap();
        let b = params.transform(&[9u8; 32]).unwrap();
        assert_eq!(a.as_ref(), b.as_ref());
    }

    #[test]
    fn dict_roundtrip_preserves_params() {
        let mut params = fast_argon2();
        params.iterations = 7;
        let back = KdfParams::from_dict(&params.to_dict()).unwrap();

        assert_eq!(back.algorithm, params.algorithm);
        assert_eq!(back.salt, params.salt);
        assert_eq!(back.iterations, 7);
        assert_eq!(back.memory_kib, params.memory_kib);
        assert_eq!(back.parallelism, params.parallelism);
        assert_eq!(back.version, params.version);
    }

    #[test]
    fn aes_dict_uses_rounds_key() {
        let params = KdfParams {
            algorithm: KdfAlgorithm::AesKdf,
            salt: vec![0x11; 32],
            iterations: 60_000,
            ..KdfParams::default()
        };
        let dict = params.to_dict();
        assert_eq!(dict.get_u64("R"), Some(60_000));

        let back = KdfParams::from_dict(&dict).unwrap();
        assert_eq!(back.algorithm, KdfAlgorithm::AesKdf);
        assert_eq!(back.iterations, 60_000);
    }

    #[test]
    fn unknown_algorithm_id_is_rejected() {
        let mut dict = VariantDict::new();
        dict.set("$UUID", VariantValue::Bytes(vec![0u8; 16]));
        dict.set("S", VariantValue::Bytes(vec![0u8; 32]));

        let err = KdfParams::from_dict(&dict).unwrap_err();
        assert!(matches!(err, KdbxError::Key(KeyError::UnsupportedKdf)));
    }

    #[test]
    fn weak_argon2_memory_is_rejected() {
        let mut params = fast_argon2();
        params.memory_kib = 1024;
        assert!(params.transform(&[1u8; 32]).is_err());
    }
}
