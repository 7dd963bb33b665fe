//! Self-describing parameter dictionary used by the header.
//!
//! Key-derivation parameters (and the opaque public custom data field)
//! travel as an ordered list of typed name/value entries so the format
//! can grow new parameters without a version bump.  Layout:
//!
//! ```text
//! [version: u16 LE][entry]*[0x00]
//! entry = [type: u8][key_len: u32 LE][key][value_len: u32 LE][value]
//! ```

use std::io::Cursor;

use crate::errors::FormatError;
use crate::format::bytes::{read_vec, LittleEndian, ReadBytesExt};

/// Dictionary wire version.  The high byte is critical, the low byte is
/// informational.
const VARIANT_VERSION: u16 = 0x0100;
const VARIANT_CRITICAL_MASK: u16 = 0xFF00;

// Value type tags.
const TYPE_UINT32: u8 = 0x04;
const TYPE_UINT64: u8 = 0x05;
const TYPE_BOOL: u8 = 0x08;
const TYPE_INT32: u8 = 0x0C;
const TYPE_INT64: u8 = 0x0D;
const TYPE_STRING: u8 = 0x18;
const TYPE_BYTES: u8 = 0x42;

/// A single typed value in a [`VariantDict`].
#[derive(Debug, Clone, PartialEq)]
pub enum VariantValue {
    UInt32(u32),
    UInt64(u64),
    Bool(bool),
    Int32(i32),
    Int64(i64),
    String(String),
    Bytes(Vec<u8>),
}

/// An ordered name → typed value map.
///
/// Insertion order is preserved on encode so a decoded dictionary
/// re-encodes byte-for-byte.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariantDict {
    entries: Vec<(String, VariantValue)>,
}

impl VariantDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value, keeping the original position on replace.
    pub fn set(&mut self, key: impl Into<String>, value: VariantValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&VariantValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn get_u32(&self, key: &str) -> Option<u32> {
        match self.get(key) {
            Some(VariantValue::UInt32(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        match self.get(key) {
            Some(VariantValue::UInt64(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_bytes(&self, key: &str) -> Option<&[u8]> {
        match self.get(key) {
            Some(VariantValue::Bytes(v)) => Some(v),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize to the wire layout.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&VARIANT_VERSION.to_le_bytes());

        for (key, value) in &self.entries {
            let (tag, payload): (u8, Vec<u8>) = match value {
                VariantValue::UInt32(v) => (TYPE_UINT32, v.to_le_bytes().to_vec()),
                VariantValue::UInt64(v) => (TYPE_UINT64, v.to_le_bytes().to_vec()),
                VariantValue::Bool(v) => (TYPE_BOOL, vec![u8::from(*v)]),
                VariantValue::Int32(v) => (TYPE_INT32, v.to_le_bytes().to_vec()),
                VariantValue::Int64(v) => (TYPE_INT64, v.to_le_bytes().to_vec()),
                VariantValue::String(v) => (TYPE_STRING, v.as_bytes().to_vec()),
                VariantValue::Bytes(v) => (TYPE_BYTES, v.clone()),
            };

            buf.push(tag);
            buf.extend_from_slice(&(key.len() as u32).to_le_bytes());
            buf.extend_from_slice(key.as_bytes());
            buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            buf.extend_from_slice(&payload);
        }

        buf.push(0); // terminator
        buf
    }

    /// Parse the wire layout.
    pub fn decode(data: &[u8]) -> Result<Self, FormatError> {
        let mut cursor = Cursor::new(data);

        let version = cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| FormatError::Truncated("variant dictionary version".into()))?;
        if version & VARIANT_CRITICAL_MASK != VARIANT_VERSION & VARIANT_CRITICAL_MASK {
            return Err(FormatError::UnsupportedVersion(u32::from(version)));
        }

        let mut dict = Self::new();
        loop {
            let tag = cursor
                .read_u8()
                .map_err(|_| FormatError::Truncated("variant entry tag".into()))?;
            if tag == 0 {
                break;
            }

            let key_len = cursor
                .read_u32::<LittleEndian>()
                .map_err(|_| FormatError::Truncated("variant key length".into()))?
                as usize;
            if key_len > data.len() {
                return Err(FormatError::Truncated("variant key".into()));
            }
            let key_bytes = read_vec(&mut cursor, key_len)
                .map_err(|_| FormatError::Truncated("variant key".into()))?;
            let key = String::from_utf8(key_bytes).map_err(|_| {
                FormatError::InvalidPayload("variant key is not UTF-8".into())
            })?;

            let value_len = cursor
                .read_u32::<LittleEndian>()
                .map_err(|_| FormatError::Truncated("variant value length".into()))?
                as usize;
            if value_len > data.len() {
                return Err(FormatError::Truncated("variant value".into()));
            }
            let value_bytes = read_vec(&mut cursor, value_len)
                .map_err(|_| FormatError::Truncated("variant value".into()))?;

            let value = Self::decode_value(tag, &value_bytes)?;
            dict.entries.push((key, value));
        }

        Ok(dict)
    }

    fn decode_value(tag: u8, bytes: &[u8]) -> Result<VariantValue, FormatError> {
        let bad_len = |expected: usize| {
            FormatError::InvalidPayload(format!(
                "variant value: expected {expected} bytes, got {}",
                bytes.len()
            ))
        };

        Ok(match tag {
            TYPE_UINT32 => VariantValue::UInt32(u32::from_le_bytes(
                bytes.try_into().map_err(|_| bad_len(4))?,
            )),
            TYPE_UINT64 => VariantValue::UInt64(u64::from_le_bytes(
                bytes.try_into().map_err(|_| bad_len(8))?,
            )),
            TYPE_BOOL => match bytes {
                [b] => VariantValue::Bool(*b != 0),
                _ => return Err(bad_len(1)),
            },
            TYPE_INT32 => VariantValue::Int32(i32::from_le_bytes(
                bytes.try_into().map_err(|_| bad_len(4))?,
            )),
            TYPE_INT64 => VariantValue::Int64(i64::from_le_bytes(
                bytes.try_into().map_err(|_| bad_len(8))?,
            )),
            TYPE_STRING => VariantValue::String(
                String::from_utf8(bytes.to_vec()).map_err(|_| {
                    FormatError::InvalidPayload("variant string is not UTF-8".into())
                })?,
            ),
            TYPE_BYTES => VariantValue::Bytes(bytes.to_vec()),
            other => {
                return Err(FormatError::InvalidPayload(format!(
                    "unknown variant type tag {other:#04x}"
                )))
            }
        })
    }
}
