//! Binary header codec.
//!
//! A database file opens with two fixed signature words and a version
//! word, followed by a sequence of typed field records:
//!
//! ```text
//! [sig1: u32 LE][sig2: u32 LE][version: u32 LE]
//! field = [id: u8][len: u16 LE][payload]
//! ```
//!
//! The header ends with the end-of-header record whose payload is the
//! raw `\r\n\r\n` delimiter, so legacy readers can find the payload
//! boundary without understanding the record stream.  Every header byte
//! read or written (signatures, version and all field records) is
//! folded into a rolling SHA-256 that lands in [`Header::hash`]; the
//! encrypted payload carries an embedded copy for tamper detection.

use std::io::{Read, Write};

use rand::RngCore;

use crate::errors::{FormatError, KdbxError, Result};
use crate::format::bytes::{
    read_vec, HashingReader, HashingWriter, LittleEndian, ReadBytesExt, WriteBytesExt,
};
use crate::format::variant::VariantDict;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// First signature word of every database file.
pub const SIGNATURE_1: u32 = 0x9AA2_D903;
/// Second signature word.
pub const SIGNATURE_2: u32 = 0xB54B_FB67;

/// Version written by this crate.  The high half is critical, the low
/// half is informational.
pub const FILE_VERSION: u32 = 0x0004_0000;
const VERSION_CRITICAL_MASK: u32 = 0xFFFF_0000;

/// Cipher id of AES-256-CBC (`31c1f2e6-bf71-4350-be58-05216afc5aff`).
pub const CIPHER_AES256: [u8; 16] = [
    0x31, 0xC1, 0xF2, 0xE6, 0xBF, 0x71, 0x43, 0x50, 0xBE, 0x58, 0x05, 0x21, 0x6A, 0xFC, 0x5A,
    0xFF,
];

/// Header field ids.  Ids 5, 6, 8, 9 and 10 belong to the older format
/// generation and are parsed but never written.
mod field {
    pub const END: u8 = 0;
    pub const COMMENT: u8 = 1;
    pub const CIPHER_ID: u8 = 2;
    pub const COMPRESSION: u8 = 3;
    pub const MASTER_SEED: u8 = 4;
    pub const TRANSFORM_SEED: u8 = 5;
    pub const TRANSFORM_ROUNDS: u8 = 6;
    pub const CIPHER_IV: u8 = 7;
    pub const INNER_STREAM_KEY: u8 = 8;
    pub const STREAM_START_BYTES: u8 = 9;
    pub const INNER_STREAM_ID: u8 = 10;
    pub const KDF_PARAMETERS: u8 = 11;
    pub const PUBLIC_CUSTOM_DATA: u8 = 12;
}

/// Payload of the end-of-header record.
const END_DELIMITER: &[u8; 4] = b"\r\n\r\n";

const MASTER_SEED_LEN: usize = 32;
const CIPHER_IV_LEN: usize = 16;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Payload compression applied before encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    None = 0,
    #[default]
    Gzip = 1,
}

impl Compression {
    fn from_byte(b: u8) -> std::result::Result<Self, FormatError> {
        match b {
            0 => Ok(Compression::None),
            1 => Ok(Compression::Gzip),
            other => Err(FormatError::MalformedField {
                id: field::COMPRESSION,
                reason: format!("unknown compression type {other}"),
            }),
        }
    }

    fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Fields of the older format generation, kept for backward read
/// compatibility.  Superseded by the KDF parameter dictionary.
#[derive(Debug, Clone, Default)]
pub struct LegacyFields {
    pub transform_seed: Option<Vec<u8>>,
    pub transform_rounds: Option<u64>,
    pub inner_stream_key: Option<Vec<u8>>,
    pub stream_start_bytes: Option<Vec<u8>>,
    pub inner_stream_id: Option<u32>,
}

/// The decoded file header.
#[derive(Debug, Clone)]
pub struct Header {
    /// Format version as stored in the file.
    pub version: u32,
    /// 16-byte id naming the payload block cipher.
    pub cipher_id: [u8; 16],
    pub compression: Compression,
    /// Random salt consumed by key derivation.
    pub master_seed: Vec<u8>,
    pub cipher_iv: Vec<u8>,
    /// Self-describing key-derivation parameters.
    pub kdf_params: VariantDict,
    /// Opaque extra data, round-tripped verbatim when present.
    pub public_custom_data: Option<VariantDict>,
    pub legacy: LegacyFields,
    /// SHA-256 over every header byte read or written.  Zero until the
    /// header has been through `read` or `write`.
    pub hash: [u8; 32],
}

impl Header {
    /// Build a header with fresh randomness for every cryptographic field.
    pub fn new(kdf_params: VariantDict, compression: Compression, rng: &mut dyn RngCore) -> Self {
        let mut header = Self {
            version: FILE_VERSION,
            cipher_id: CIPHER_AES256,
            compression,
            master_seed: Vec::new(),
            cipher_iv: Vec::new(),
            kdf_params,
            public_custom_data: None,
            legacy: LegacyFields::default(),
            hash: [0u8; 32],
        };
        header.regenerate_random(rng);
        header
    }

    /// Replace master seed and cipher IV with fresh random bytes.
    /// Called on every save so no seed or IV is ever reused.
    pub fn regenerate_random(&mut self, rng: &mut dyn RngCore) {
        let mut seed = vec![0u8; MASTER_SEED_LEN];
        rng.fill_bytes(&mut seed);
        self.master_seed = seed;

        let mut iv = vec![0u8; CIPHER_IV_LEN];
        rng.fill_bytes(&mut iv);
        self.cipher_iv = iv;
    }

    // ------------------------------------------------------------------
    // Write
    // ------------------------------------------------------------------

    /// Serialize the header, updating [`Header::hash`] with the digest of
    /// the exact bytes written.
    pub fn write<W: Write>(&mut self, writer: W) -> Result<()> {
        let mut w = HashingWriter::new(writer);

        w.write_u32::<LittleEndian>(SIGNATURE_1)?;
        w.write_u32::<LittleEndian>(SIGNATURE_2)?;
        w.write_u32::<LittleEndian>(self.version)?;

        write_field(&mut w, field::CIPHER_ID, &self.cipher_id)?;
        write_field(&mut w, field::COMPRESSION, &[self.compression.as_byte()])?;
        write_field(&mut w, field::MASTER_SEED, &self.master_seed)?;
        write_field(&mut w, field::KDF_PARAMETERS, &self.kdf_params.encode())?;
        write_field(&mut w, field::CIPHER_IV, &self.cipher_iv)?;
        if let Some(custom) = &self.public_custom_data {
            write_field(&mut w, field::PUBLIC_CUSTOM_DATA, &custom.encode())?;
        }

        write_field(&mut w, field::END, END_DELIMITER)?;

        self.hash = w.finalize();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Parse a header, validating signatures and version, and computing
    /// the digest over every byte consumed.
    ///
    /// The reader is left positioned at the first payload byte.
    pub fn read<R: Read>(reader: R) -> Result<Self> {
        let mut r = HashingReader::new(reader);

        let sig1 = r
            .read_u32::<LittleEndian>()
            .map_err(|_| FormatError::Truncated("signature".into()))?;
        let sig2 = r
            .read_u32::<LittleEndian>()
            .map_err(|_| FormatError::Truncated("signature".into()))?;
        if sig1 != SIGNATURE_1 || sig2 != SIGNATURE_2 {
            return Err(FormatError::BadSignature.into());
        }

        let version = r
            .read_u32::<LittleEndian>()
            .map_err(|_| FormatError::Truncated("version".into()))?;
        // Minor-version differences are accepted for forward compatibility.
        if version & VERSION_CRITICAL_MASK != FILE_VERSION & VERSION_CRITICAL_MASK {
            return Err(FormatError::UnsupportedVersion(version).into());
        }

        let mut cipher_id = None;
        let mut compression = None;
        let mut master_seed = None;
        let mut cipher_iv = None;
        let mut kdf_params = None;
        let mut public_custom_data = None;
        let mut legacy = LegacyFields::default();

        loop {
            let id = r
                .read_u8()
                .map_err(|_| FormatError::Truncated("field id".into()))?;
            let len = r
                .read_u16::<LittleEndian>()
                .map_err(|_| FormatError::Truncated("field length".into()))?
                as usize;
            let payload = read_vec(&mut r, len)
                .map_err(|_| FormatError::Truncated(format!("field {id} payload")))?;

            match id {
                field::END => break,
                field::CIPHER_ID => {
                    cipher_id = Some(payload.try_into().map_err(|_| {
                        FormatError::MalformedField {
                            id,
                            reason: "cipher id must be 16 bytes".into(),
                        }
                    })?);
                }
                field::COMPRESSION => {
                    let byte = *payload.first().ok_or(FormatError::MalformedField {
                        id,
                        reason: "compression type is empty".into(),
                    })?;
                    compression = Some(Compression::from_byte(byte)?);
                }
                field::MASTER_SEED => master_seed = Some(payload),
                field::CIPHER_IV => cipher_iv = Some(payload),
                field::KDF_PARAMETERS => {
                    kdf_params = Some(VariantDict::decode(&payload)?);
                }
                field::PUBLIC_CUSTOM_DATA => {
                    public_custom_data = Some(VariantDict::decode(&payload)?);
                }
                field::TRANSFORM_SEED => legacy.transform_seed = Some(payload),
                field::TRANSFORM_ROUNDS => {
                    legacy.transform_rounds =
                        Some(u64::from_le_bytes(payload.try_into().map_err(|_| {
                            FormatError::MalformedField {
                                id,
                                reason: "transform rounds must be 8 bytes".into(),
                            }
                        })?));
                }
                field::INNER_STREAM_KEY => legacy.inner_stream_key = Some(payload),
                field::STREAM_START_BYTES => legacy.stream_start_bytes = Some(payload),
                field::INNER_STREAM_ID => {
                    legacy.inner_stream_id =
                        Some(u32::from_le_bytes(payload.try_into().map_err(|_| {
                            FormatError::MalformedField {
                                id,
                                reason: "stream id must be 4 bytes".into(),
                            }
                        })?));
                }
                // Free-form comment, ignored.
                field::COMMENT => {}
                // Unknown fields are skipped, tolerating forward-written
                // optional records.
                _ => {}
            }
        }

        let header = Self {
            version,
            cipher_id: cipher_id.ok_or(FormatError::MissingField("cipher id"))?,
            compression: compression.ok_or(FormatError::MissingField("compression type"))?,
            master_seed: master_seed.ok_or(FormatError::MissingField("master seed"))?,
            cipher_iv: cipher_iv.ok_or(FormatError::MissingField("cipher IV"))?,
            kdf_params: kdf_params.ok_or(FormatError::MissingField("KDF parameters"))?,
            public_custom_data,
            legacy,
            hash: r.finalize(),
        };

        Ok(header)
    }
}

fn write_field<W: Write>(writer: &mut W, id: u8, payload: &[u8]) -> Result<()> {
    let len = u16::try_from(payload.len()).map_err(|_| {
        KdbxError::Serialization(format!(
            "header field {id} payload of {} bytes exceeds u16::MAX",
            payload.len()
        ))
    })?;

    writer.write_u8(id)?;
    writer.write_u16::<LittleEndian>(len)?;
    writer.write_all(payload)?;
    Ok(())
}
