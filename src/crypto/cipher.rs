//! AES-256-CBC payload encryption.
//!
//! The payload is encrypted as a single buffer with PKCS7 padding.  A
//! padding failure on decrypt is the expected symptom of a wrong
//! password or keyfile, so callers surface it as a credentials error
//! rather than corruption.

use aes::Aes256;
use cipher::block_padding::Pkcs7;
use cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use zeroize::Zeroizing;

use crate::errors::{CipherError, Result};
use crate::format::header::CIPHER_AES256;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

const BLOCK_LEN: usize = 16;
const IV_LEN: usize = 16;

/// A block cipher configured for the whole payload.
#[derive(Debug)]
pub struct PayloadCipher {
    key: Zeroizing<[u8; 32]>,
    iv: [u8; IV_LEN],
}

impl PayloadCipher {
    /// Select the cipher named by `cipher_id` and configure it with the
    /// derived data key and the header IV.
    ///
    /// Only AES-256-CBC is supported; any other id fails with
    /// `CipherError::UnsupportedCipher`.
    pub fn new(cipher_id: &[u8; 16], key: &[u8; 32], iv: &[u8]) -> Result<Self> {
        if *cipher_id != CIPHER_AES256 {
            return Err(CipherError::UnsupportedCipher.into());
        }

        let iv: [u8; IV_LEN] = iv.try_into().map_err(|_| {
            CipherError::InvalidParameter(format!("IV must be {IV_LEN} bytes, got {}", iv.len()))
        })?;

        Ok(Self {
            key: Zeroizing::new(*key),
            iv,
        })
    }

    /// Encrypt the whole payload, PKCS7-padded.
    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        Aes256CbcEnc::new((&*self.key).into(), (&self.iv).into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext)
    }

    /// Decrypt the whole payload and strip the padding.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
            return Err(CipherError::PaddingInvalid.into());
        }

        Aes256CbcDec::new((&*self.key).into(), (&self.iv).into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| CipherError::PaddingInvalid.into())
    }
}
