//! High-level database operations.
//!
//! `KdbxStore` wraps the header codec, the key-derivation pipeline and
//! the credential tree so callers can work with simple method calls
//! like `store.get_or_create_entry("web/site1")`.

use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::crypto::cipher::PayloadCipher;
use crate::crypto::composite::CompositeKey;
use crate::crypto::kdf::{self, KdfParams};
use crate::errors::{FormatError, KdbxError, Result};
use crate::format::header::{Compression, Header};
use crate::model::{Entry, Tree};
use crate::query::{self, QueryPath};

/// Length of the embedded header-hash copy prefixed to the payload.
const HASH_LEN: usize = 32;

/// The main database handle.  Create one with `KdbxStore::create` or
/// `KdbxStore::open`, then use its methods to manage the tree.
#[derive(Debug)]
pub struct KdbxStore {
    /// Path to the database file on disk.
    path: PathBuf,

    /// Decoded file header (cipher id, seeds, KDF parameters).
    header: Header,

    /// The credential tree held in memory.
    tree: Tree,

    /// The composite key, kept for re-deriving at save time.
    key: CompositeKey,
}

impl KdbxStore {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Create a brand-new database file at `path`.
    ///
    /// Generates fresh randomness for every cryptographic header field,
    /// builds a root group named `name`, and performs the initial save.
    /// Fails with `KdbxError::FileExists` if a file already occupies
    /// `path`; callers wanting overwrite must delete first.
    ///
    /// Uses the stock KDF cost profile and gzip compression.  Prefer
    /// `create_with` when you have explicit settings.
    pub fn create(path: &Path, name: &str, key: CompositeKey) -> Result<Self> {
        Self::create_with(path, name, key, KdfParams::default(), Compression::default())
    }

    /// Create a database with explicit KDF settings and compression.
    pub fn create_with(
        path: &Path,
        name: &str,
        key: CompositeKey,
        mut kdf_params: KdfParams,
        compression: Compression,
    ) -> Result<Self> {
        if path.exists() {
            return Err(KdbxError::FileExists(path.to_path_buf()));
        }

        // Reject an unusable key before touching the filesystem.
        key.raw_hash()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut rng = rand::rng();
        kdf_params.regenerate_salt(&mut rng);

        let header = Header::new(kdf_params.to_dict(), compression, &mut rng);
        let tree = Tree::new(name);

        let mut store = Self {
            path: path.to_path_buf(),
            header,
            tree,
            key,
        };

        store.save()?;
        Ok(store)
    }

    /// Open an existing database file.
    ///
    /// Reads and validates the header, derives the data key, decrypts
    /// and decompresses the payload, verifies the embedded header-hash
    /// copy, and deserializes the tree.  A wrong password or keyfile
    /// surfaces as `CipherError::PaddingInvalid`.
    pub fn open(path: &Path, key: CompositeKey) -> Result<Self> {
        if !path.exists() {
            return Err(KdbxError::NotFound(path.to_path_buf()));
        }

        let data = fs::read(path)?;
        let mut cursor = Cursor::new(data.as_slice());

        let header = Header::read(&mut cursor)?;
        let ciphertext = &data[cursor.position() as usize..];

        let composite = key.raw_hash()?;
        let data_key = kdf::derive_data_key(&composite, &header)?;
        let cipher = PayloadCipher::new(&header.cipher_id, &data_key, &header.cipher_iv)?;

        let compressed = cipher.decrypt(ciphertext)?;
        let payload = decompress(&compressed, header.compression)?;

        if payload.len() < HASH_LEN {
            return Err(FormatError::InvalidPayload("payload shorter than the header hash".into()).into());
        }
        let (embedded_hash, body) = payload.split_at(HASH_LEN);

        // The payload's embedded copy must match the hash recomputed
        // while reading the header, or the header was tampered with.
        if !bool::from(embedded_hash.ct_eq(&header.hash)) {
            return Err(FormatError::HeaderHashMismatch.into());
        }

        let tree: Tree = serde_json::from_slice(body)
            .map_err(|e| FormatError::InvalidPayload(format!("tree: {e}")))?;

        Ok(Self {
            path: path.to_path_buf(),
            header,
            tree,
            key,
        })
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Serialize, encrypt and write the database atomically.
    ///
    /// Master seed, cipher IV and KDF salt are regenerated on every
    /// save; the integrity hash is recomputed over the new header.  The
    /// bytes go to a temp file in the same directory which is renamed
    /// over the target, so a crash mid-write never corrupts the
    /// existing file.
    pub fn save(&mut self) -> Result<()> {
        let mut rng = rand::rng();

        // 1. Fresh randomness: no seed, IV or salt is ever reused.
        let mut kdf_params = KdfParams::from_dict(&self.header.kdf_params)?;
        kdf_params.regenerate_salt(&mut rng);
        self.header.kdf_params = kdf_params.to_dict();
        self.header.regenerate_random(&mut rng);

        // 2. Serialize the header; this recomputes the integrity hash.
        let mut file_buf = Vec::new();
        self.header.write(&mut file_buf)?;

        // 3. Assemble the plaintext payload: embedded hash copy + tree.
        let body = serde_json::to_vec(&self.tree)
            .map_err(|e| KdbxError::Serialization(format!("tree: {e}")))?;
        let mut payload = Vec::with_capacity(HASH_LEN + body.len());
        payload.extend_from_slice(&self.header.hash);
        payload.extend_from_slice(&body);

        // 4. Compress and encrypt.
        let compressed = compress(&payload, self.header.compression)?;

        let composite = self.key.raw_hash()?;
        let data_key = kdf::derive_data_key(&composite, &self.header)?;
        let cipher = PayloadCipher::new(&self.header.cipher_id, &data_key, &self.header.cipher_iv)?;
        file_buf.extend_from_slice(&cipher.encrypt(&compressed));

        // 5. Atomic write: temp file in the same directory, then rename.
        let parent = self.path.parent().unwrap_or(Path::new("."));
        let tmp_path = parent.join(format!(
            ".{}.tmp",
            self.path.file_name().unwrap_or_default().to_string_lossy()
        ));

        fs::write(&tmp_path, &file_buf)?;
        fs::rename(&tmp_path, &self.path)?;

        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Root group id.
    pub fn root(&self) -> Uuid {
        self.tree.root()
    }

    /// Find an entry by path.  `None` is a normal miss, not an error.
    pub fn find_entry(&self, path: &str) -> Option<&Entry> {
        let id = query::find_entry(&self.tree, self.tree.root(), &QueryPath::parse(path))?;
        self.tree.entry(id)
    }

    /// Find an entry by path for mutation.
    pub fn find_entry_mut(&mut self, path: &str) -> Option<&mut Entry> {
        let id = query::find_entry(&self.tree, self.tree.root(), &QueryPath::parse(path))?;
        self.tree.entry_mut(id)
    }

    /// Resolve a group path, creating missing groups along the way.
    pub fn get_or_create_group(&mut self, path: &str) -> Uuid {
        let root = self.tree.root();
        query::get_or_create_group(&mut self.tree, root, &QueryPath::parse(path))
    }

    /// Resolve an entry path, creating the group chain and the entry
    /// when absent.  `None` only for an empty path.
    pub fn get_or_create_entry(&mut self, path: &str) -> Option<Uuid> {
        let root = self.tree.root();
        query::get_or_create_entry(&mut self.tree, root, &QueryPath::parse(path))
    }

    /// Names of the child groups of the group at `path`, in declaration
    /// order.  `None` when the path resolves to no group.
    pub fn group_names(&self, path: &str) -> Option<Vec<String>> {
        let id = query::resolve_group(&self.tree, self.tree.root(), &QueryPath::parse(path))?;
        Some(
            self.tree
                .child_groups(id)
                .iter()
                .map(|g| g.name.clone())
                .collect(),
        )
    }

    /// Titles of the direct entries of the group at `path`, in
    /// declaration order.  `None` when the path resolves to no group.
    pub fn entry_titles(&self, path: &str) -> Option<Vec<String>> {
        let id = query::resolve_group(&self.tree, self.tree.root(), &QueryPath::parse(path))?;
        Some(
            self.tree
                .entries_in(id)
                .iter()
                .map(|e| e.title().to_string())
                .collect(),
        )
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Returns the path to the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the decoded file header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    /// Change the payload compression used from the next save on.
    pub fn set_compression(&mut self, compression: Compression) {
        self.header.compression = compression;
    }
}

// ---------------------------------------------------------------------------
// Payload compression
// ---------------------------------------------------------------------------

fn compress(data: &[u8], compression: Compression) -> Result<Vec<u8>> {
    match compression {
        Compression::None => Ok(data.to_vec()),
        Compression::Gzip => {
            let mut encoder =
                flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(data)?;
            Ok(encoder.finish()?)
        }
    }
}

fn decompress(data: &[u8], compression: Compression) -> Result<Vec<u8>> {
    match compression {
        Compression::None => Ok(data.to_vec()),
        Compression::Gzip => {
            let mut decoder = flate2::read::GzDecoder::new(data);
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .map_err(|e| FormatError::InvalidPayload(format!("gzip: {e}")))?;
            Ok(out)
        }
    }
}
