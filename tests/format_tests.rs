//! Integration tests for the binary header codec.

use std::io::Cursor;

use kdbxvault::crypto::KdfParams;
use kdbxvault::format::header::Header;
use kdbxvault::format::{Compression, VariantDict, VariantValue};

fn sample_header() -> Header {
    let mut rng = rand::rng();
    let mut kdf = KdfParams::default();
    kdf.regenerate_salt(&mut rng);
    Header::new(kdf.to_dict(), Compression::Gzip, &mut rng)
}

// ---------------------------------------------------------------------------
// Round-trip
// ---------------------------------------------------------------------------

#[test]
fn header_roundtrips_byte_for_byte() {
    let mut header = sample_header();

    let mut first = Vec::new();
    header.write(&mut first).unwrap();

    // Writing a parsed header again produces identical bytes, hash
    // included.
    let mut parsed = Header::read(Cursor::new(&first)).unwrap();
    let mut second = Vec::new();
    parsed.write(&mut second).unwrap();

    assert_eq!(first, second);
    assert_eq!(parsed.hash, header.hash);
}

#[test]
fn public_custom_data_is_roundtripped_verbatim() {
    let mut header = sample_header();
    let mut custom = VariantDict::new();
    custom.set("origin", VariantValue::String("integration test".into()));
    custom.set("counter", VariantValue::UInt64(99));
    header.public_custom_data = Some(custom.clone());

    let mut buf = Vec::new();
    header.write(&mut buf).unwrap();

    let parsed = Header::read(Cursor::new(&buf)).unwrap();
    assert_eq!(parsed.public_custom_data, Some(custom));
}

// ---------------------------------------------------------------------------
// Tamper detection
// ---------------------------------------------------------------------------

#[test]
fn any_single_byte_flip_is_detectable() {
    let mut header = sample_header();
    let mut buf = Vec::new();
    header.write(&mut buf).unwrap();

    for pos in 0..buf.len() {
        let mut tampered = buf.clone();
        tampered[pos] ^= 0x01;

        match Header::read(Cursor::new(&tampered)) {
            // Structural validation caught it outright.
            Err(_) => {}
            // Otherwise the rolling hash must differ, so the caller-side
            // check against the payload's embedded copy rejects it.
            Ok(parsed) => assert_ne!(
                parsed.hash, header.hash,
                "flip at byte {pos} left the digest unchanged"
            ),
        }
    }
}
