//! Integration tests for the database façade.

use std::fs;

use kdbxvault::crypto::keyfile;
use kdbxvault::crypto::machine::{self, GcmProtection};
use kdbxvault::crypto::{CompositeKey, KdfAlgorithm, KdfParams};
use kdbxvault::errors::{CipherError, KdbxError, KeyError};
use kdbxvault::format::Compression;
use kdbxvault::vault::KdbxStore;
use tempfile::TempDir;

/// Helper: create a temporary database file path inside a fresh temp dir.
fn db_path() -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("test.kdbx");
    (dir, path)
}

/// Cheap Argon2 profile so the suite stays fast.
fn fast_kdf() -> KdfParams {
    KdfParams {
        iterations: 1,
        memory_kib: 8_192,
        parallelism: 1,
        ..KdfParams::default()
    }
}

fn create_fast(path: &std::path::Path, name: &str, key: CompositeKey) -> KdbxStore {
    KdbxStore::create_with(path, name, key, fast_kdf(), Compression::default())
        .expect("create database")
}

// ---------------------------------------------------------------------------
// End-to-end scenario: create, populate, save, reopen, verify
// ---------------------------------------------------------------------------

#[test]
fn create_populate_save_and_reopen() {
    let (_dir, path) = db_path();

    let mut store = create_fast(&path, "Vault", CompositeKey::from_password("p@ss"));

    let entry_id = store.get_or_create_entry("web/site1").unwrap();
    store
        .tree_mut()
        .entry_mut(entry_id)
        .unwrap()
        .set_password("secretA");
    store.save().unwrap();

    // Re-open with the same password — should succeed.
    let reopened = KdbxStore::open(&path, CompositeKey::from_password("p@ss")).unwrap();

    let entry = reopened.find_entry("web/site1").expect("entry exists");
    assert_eq!(entry.title(), "site1");
    assert_eq!(entry.password().unwrap().as_str(), "secretA");

    // The root group carries the database name.
    let root = reopened.tree().group(reopened.root()).unwrap();
    assert_eq!(root.name, "Vault");
}

#[test]
fn open_with_wrong_password_is_a_credentials_error() {
    let (_dir, path) = db_path();
    create_fast(&path, "Vault", CompositeKey::from_password("p@ss"));

    let err = KdbxStore::open(&path, CompositeKey::from_password("wrong")).unwrap_err();
    assert!(matches!(
        err,
        KdbxError::Cipher(CipherError::PaddingInvalid) | KdbxError::Format(_)
    ));
}

#[test]
fn open_with_no_key_material_is_rejected() {
    let (_dir, path) = db_path();
    create_fast(&path, "Vault", CompositeKey::from_password("p@ss"));

    let err = KdbxStore::open(&path, CompositeKey::new()).unwrap_err();
    assert!(matches!(err, KdbxError::Key(KeyError::NoKeyMaterial)));
}

// ---------------------------------------------------------------------------
// Create semantics
// ---------------------------------------------------------------------------

#[test]
fn create_refuses_to_overwrite() {
    let (_dir, path) = db_path();
    create_fast(&path, "Vault", CompositeKey::from_password("p@ss"));

    let err = KdbxStore::create_with(
        &path,
        "Other",
        CompositeKey::from_password("p@ss"),
        fast_kdf(),
        Compression::default(),
    )
    .unwrap_err();
    assert!(matches!(err, KdbxError::FileExists(_)));
}

#[test]
fn create_builds_missing_parent_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested/dir/test.kdbx");

    create_fast(&path, "Vault", CompositeKey::from_password("p@ss"));
    assert!(path.exists());
}

#[test]
fn open_missing_file_is_not_found() {
    let (_dir, path) = db_path();
    let err = KdbxStore::open(&path, CompositeKey::from_password("p@ss")).unwrap_err();
    assert!(matches!(err, KdbxError::NotFound(_)));
}

// ---------------------------------------------------------------------------
// Save semantics
// ---------------------------------------------------------------------------

#[test]
fn save_is_atomic_and_leaves_no_temp_file() {
    let (_dir, path) = db_path();
    let mut store = create_fast(&path, "Vault", CompositeKey::from_password("p@ss"));

    store.get_or_create_entry("a/b").unwrap();
    store.save().unwrap();

    // No temp file lingers next to the database.
    let dir_entries: Vec<_> = fs::read_dir(path.parent().unwrap())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(dir_entries, vec!["test.kdbx".to_string()]);

    // The file on disk is a loadable database.
    let reopened = KdbxStore::open(&path, CompositeKey::from_password("p@ss")).unwrap();
    assert!(reopened.find_entry("a/b").is_some());
}

#[test]
fn unsaved_changes_do_not_touch_the_file() {
    let (_dir, path) = db_path();
    let mut store = create_fast(&path, "Vault", CompositeKey::from_password("p@ss"));
    let on_disk_before = fs::read(&path).unwrap();

    store.get_or_create_entry("not/saved").unwrap();

    assert_eq!(fs::read(&path).unwrap(), on_disk_before);
    let reopened = KdbxStore::open(&path, CompositeKey::from_password("p@ss")).unwrap();
    assert!(reopened.find_entry("not/saved").is_none());
}

#[test]
fn every_save_rotates_seeds_and_iv() {
    let (_dir, path) = db_path();
    let mut store = create_fast(&path, "Vault", CompositeKey::from_password("p@ss"));

    let seed_before = store.header().master_seed.clone();
    let iv_before = store.header().cipher_iv.clone();
    store.save().unwrap();

    assert_ne!(store.header().master_seed, seed_before);
    assert_ne!(store.header().cipher_iv, iv_before);

    // Still opens fine after rotation.
    assert!(KdbxStore::open(&path, CompositeKey::from_password("p@ss")).is_ok());
}

#[test]
fn uncompressed_databases_roundtrip_too() {
    let (_dir, path) = db_path();
    let mut store = KdbxStore::create_with(
        &path,
        "Vault",
        CompositeKey::from_password("p@ss"),
        fast_kdf(),
        Compression::None,
    )
    .unwrap();

    store.get_or_create_entry("plain/entry").unwrap();
    store.save().unwrap();

    let reopened = KdbxStore::open(&path, CompositeKey::from_password("p@ss")).unwrap();
    assert!(reopened.find_entry("plain/entry").is_some());
}

// ---------------------------------------------------------------------------
// Tamper detection
// ---------------------------------------------------------------------------

#[test]
fn flipping_a_header_byte_is_detected() {
    let (_dir, path) = db_path();
    create_fast(&path, "Vault", CompositeKey::from_password("p@ss"));

    let original = fs::read(&path).unwrap();

    // Flip one byte at every position inside the first 32 bytes of the
    // header (signatures, version, first fields).
    for pos in 0..32 {
        let mut tampered = original.clone();
        tampered[pos] ^= 0x01;
        fs::write(&path, &tampered).unwrap();

        let result = KdbxStore::open(&path, CompositeKey::from_password("p@ss"));
        assert!(result.is_err(), "tampering at byte {pos} went unnoticed");
    }
}

// ---------------------------------------------------------------------------
// Multi-fragment keys
// ---------------------------------------------------------------------------

#[test]
fn keyfile_fragment_roundtrip() {
    let (_dir, path) = db_path();
    let keyfile_dir = TempDir::new().unwrap();
    let keyfile_path = keyfile_dir.path().join("db.keyx");
    keyfile::generate_key_file(&keyfile_path, &mut rand::rng()).unwrap();

    let make_key = || {
        let mut key = CompositeKey::from_password("p@ss");
        key.add_key_file(keyfile::load_key_file(&keyfile_path).unwrap());
        key
    };

    create_fast(&path, "Vault", make_key());
    assert!(KdbxStore::open(&path, make_key()).is_ok());

    // Password alone is not enough.
    assert!(KdbxStore::open(&path, CompositeKey::from_password("p@ss")).is_err());
}

#[test]
fn machine_fragment_roundtrip() {
    let (_dir, path) = db_path();
    let key_dir = TempDir::new().unwrap();
    let machine_path = key_dir.path().join("machine.key");
    let provider = GcmProtection;

    let make_key = || {
        let mut key = CompositeKey::from_password("p@ss");
        let fragment =
            machine::load_or_create(&machine_path, &provider, &mut rand::rng()).unwrap();
        key.add_machine_key(fragment);
        key
    };

    create_fast(&path, "Vault", make_key());

    // Same machine file reproduces the same composite key.
    assert!(KdbxStore::open(&path, make_key()).is_ok());
}

// ---------------------------------------------------------------------------
// Queries over a saved database
// ---------------------------------------------------------------------------

#[test]
fn name_enumeration_matches_the_tree() {
    let (_dir, path) = db_path();
    let mut store = create_fast(&path, "Vault", CompositeKey::from_password("p@ss"));

    store.get_or_create_group("web/banking");
    store.get_or_create_group("web/social");
    store.get_or_create_entry("web/banking/Checking").unwrap();
    store.get_or_create_entry("web/banking/Savings").unwrap();

    assert_eq!(store.group_names("").unwrap(), vec!["web"]);
    assert_eq!(
        store.group_names("web").unwrap(),
        vec!["banking", "social"]
    );
    assert_eq!(
        store.entry_titles("web/banking").unwrap(),
        vec!["Checking", "Savings"]
    );
    assert!(store.group_names("missing").is_none());
}

#[test]
fn find_entry_miss_is_a_none_not_an_error() {
    let (_dir, path) = db_path();
    let mut store = create_fast(&path, "Vault", CompositeKey::from_password("p@ss"));
    store.get_or_create_entry("a/b/c").unwrap();

    assert!(store.find_entry("a/b/c").is_some());
    assert!(store.find_entry("a/b/missing").is_none());
    assert!(store.find_entry("nowhere/at/all").is_none());
}

#[test]
fn entry_mutation_through_the_store_persists() {
    let (_dir, path) = db_path();
    let mut store = create_fast(&path, "Vault", CompositeKey::from_password("p@ss"));
    store.get_or_create_entry("mail/GMail").unwrap();

    {
        let entry = store.find_entry_mut("mail/GMail").unwrap();
        entry.set_field("UserName", "someone@example.com");
        entry.push_history();
        entry.set_password("rotated");
        entry.tags.add("email");
    }
    store.save().unwrap();

    let reopened = KdbxStore::open(&path, CompositeKey::from_password("p@ss")).unwrap();
    let entry = reopened.find_entry("mail/GMail").unwrap();
    assert_eq!(entry.field("UserName"), Some("someone@example.com"));
    assert_eq!(entry.password().unwrap().as_str(), "rotated");
    assert!(entry.tags.contains("Email"));
    assert_eq!(entry.history().len(), 1);
}

// ---------------------------------------------------------------------------
// KDF variants
// ---------------------------------------------------------------------------

#[test]
fn aes_kdf_databases_roundtrip() {
    let (_dir, path) = db_path();
    let params = KdfParams {
        algorithm: KdfAlgorithm::AesKdf,
        iterations: 10_000,
        ..KdfParams::default()
    };

    let mut store = KdbxStore::create_with(
        &path,
        "Legacy",
        CompositeKey::from_password("p@ss"),
        params,
        Compression::default(),
    )
    .unwrap();
    store.get_or_create_entry("legacy/entry").unwrap();
    store.save().unwrap();

    let reopened = KdbxStore::open(&path, CompositeKey::from_password("p@ss")).unwrap();
    assert!(reopened.find_entry("legacy/entry").is_some());
}
