//! Key-file loading with content sniffing.
//!
//! A key file contributes its bytes as a key fragment.  Structured
//! encodings are detected by content: an XML wrapper holding a base64
//! 32-byte key, or a 64-character hex string.  Anything else falls back
//! to treating the raw file bytes as key material directly, the
//! universal contract that lets arbitrary binary files act as keys.

use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::errors::{KdbxError, Result};

/// Length of a structured key in bytes (256 bits).
const KEY_LEN: usize = 32;

/// Load a key file and extract its key material.
pub fn load_key_file(path: &Path) -> Result<Zeroizing<Vec<u8>>> {
    if !path.exists() {
        return Err(KdbxError::Keyfile(format!(
            "keyfile not found at {}",
            path.display()
        )));
    }

    let data = fs::read(path)
        .map_err(|e| KdbxError::Keyfile(format!("failed to read keyfile: {e}")))?;

    Ok(sniff_key_material(&data))
}

/// Detect the key-file encoding and return the effective key bytes.
pub fn sniff_key_material(data: &[u8]) -> Zeroizing<Vec<u8>> {
    if let Some(key) = parse_xml_key(data) {
        return key;
    }
    if let Some(key) = parse_hex_key(data) {
        return key;
    }

    // Unrecognized content is used as-is.  Deliberate leniency: any file
    // can serve as a key, including an exact 32-byte random blob.
    tracing::debug!("keyfile did not match a structured encoding, using raw bytes");
    Zeroizing::new(data.to_vec())
}

/// `<KeyFile>…<Data>base64</Data>…</KeyFile>` holding a 32-byte key.
fn parse_xml_key(data: &[u8]) -> Option<Zeroizing<Vec<u8>>> {
    let text = std::str::from_utf8(data).ok()?;
    if !text.contains("<KeyFile>") {
        return None;
    }

    let start = text.find("<Data>")? + "<Data>".len();
    let end = text[start..].find("</Data>")? + start;
    let encoded: String = text[start..end]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let decoded = BASE64.decode(encoded).ok()?;
    if decoded.len() != KEY_LEN {
        return None;
    }
    Some(Zeroizing::new(decoded))
}

/// A 64-character hex string (optionally whitespace-padded).
fn parse_hex_key(data: &[u8]) -> Option<Zeroizing<Vec<u8>>> {
    let text = std::str::from_utf8(data).ok()?;
    let trimmed = text.trim();
    if trimmed.len() != KEY_LEN * 2 {
        return None;
    }

    let decoded = hex::decode(trimmed).ok()?;
    Some(Zeroizing::new(decoded))
}

/// Generate a new random 32-byte key file at `path`.
///
/// The file is written with restrictive permissions (owner-only
/// read/write).  Returns the raw key bytes for immediate use.
pub fn generate_key_file(path: &Path, rng: &mut dyn RngCore) -> Result<Zeroizing<Vec<u8>>> {
    if path.exists() {
        return Err(KdbxError::Keyfile(format!(
            "keyfile already exists at {}",
            path.display()
        )));
    }

    let mut key = Zeroizing::new(vec![0u8; KEY_LEN]);
    rng.fill_bytes(&mut key);

    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                KdbxError::Keyfile(format!("cannot create keyfile directory: {e}"))
            })?;
        }
    }

    fs::write(path, &key)
        .map_err(|e| KdbxError::Keyfile(format!("failed to write keyfile: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(path, perms).map_err(|e| {
            KdbxError::Keyfile(format!("failed to set keyfile permissions: {e}"))
        })?;
    }

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn xml_keyfile_is_unwrapped() {
        let key = [0x42u8; 32];
        let xml = format!(
            "<KeyFile><Meta><Version>2.0</Version></Meta><Key><Data>\n{}\n</Data></Key></KeyFile>",
            BASE64.encode(key)
        );

        let material = sniff_key_material(xml.as_bytes());
        assert_eq!(material.as_slice(), &key);
    }

    #[test]
    fn hex_keyfile_is_decoded() {
        let text = "00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff\n";
        let material = sniff_key_material(text.as_bytes());
        assert_eq!(material.len(), 32);
        assert_eq!(material[0], 0x00);
        assert_eq!(material[4], 0x44);
    }

    #[test]
    fn xml_with_wrong_key_length_falls_back_to_raw() {
        let xml = format!(
            "<KeyFile><Key><Data>{}</Data></Key></KeyFile>",
            BASE64.encode([1u8; 16])
        );
        let material = sniff_key_material(xml.as_bytes());
        assert_eq!(material.as_slice(), xml.as_bytes());
    }

    #[test]
    fn arbitrary_bytes_are_used_verbatim() {
        let blob = [0xFFu8, 0x00, 0x13, 0x37];
        let material = sniff_key_material(&blob);
        assert_eq!(material.as_slice(), &blob);
    }

    #[test]
    fn generate_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.keyx");

        let generated = generate_key_file(&path, &mut rand::rng()).unwrap();
        assert_eq!(generated.len(), KEY_LEN);

        let loaded = load_key_file(&path).unwrap();
        assert_eq!(generated.as_slice(), loaded.as_slice());
    }

    #[test]
    fn generate_fails_if_exists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.keyx");

        generate_key_file(&path, &mut rand::rng()).unwrap();
        assert!(generate_key_file(&path, &mut rand::rng()).is_err());
    }

    #[test]
    fn load_fails_if_missing() {
        let dir = TempDir::new().unwrap();
        assert!(load_key_file(&dir.path().join("nope.keyx")).is_err());
    }
}
