//! Key-value storage backends.
//!
//! - [`InMemoryStore`]: ephemeral, used by tests and dry runs
//! - [`FileStore`]: a single JSON document of hex-encoded keys and values,
//!   rewritten on flush through a temporary file
//!
//! [`TypedStore`] layers bincode (de)serialisation over any backend.

use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{Error, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// STORAGE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Key type for storage operations
pub type StorageKey = Vec<u8>;

/// Value type for storage operations
pub type StorageValue = Vec<u8>;

/// Trait for storage backends
pub trait StorageBackend: Send + Sync {
    /// Get a value by key
    fn get(&self, key: &[u8]) -> Result<Option<StorageValue>>;

    /// Set a value for a key
    fn set(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Delete a key, returning whether it existed
    fn delete(&self, key: &[u8]) -> Result<bool>;

    /// Check if a key exists
    fn exists(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// List all keys with a given prefix, in key order
    fn list_prefix(&self, prefix: &[u8]) -> Result<Vec<StorageKey>>;

    /// Flush any pending writes to persistent storage
    fn flush(&self) -> Result<()>;
}

type Entries = BTreeMap<StorageKey, StorageValue>;

fn read_lock(lock: &RwLock<Entries>) -> Result<RwLockReadGuard<'_, Entries>> {
    lock.read()
        .map_err(|e| Error::Storage(format!("lock poisoned: {}", e)))
}

fn write_lock(lock: &RwLock<Entries>) -> Result<RwLockWriteGuard<'_, Entries>> {
    lock.write()
        .map_err(|e| Error::Storage(format!("lock poisoned: {}", e)))
}

fn prefixed(entries: &Entries, prefix: &[u8]) -> Vec<StorageKey> {
    entries
        .keys()
        .filter(|k| k.starts_with(prefix))
        .cloned()
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// IN-MEMORY STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// In-memory storage backend
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: RwLock<Entries>,
}

impl InMemoryStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.data.read().map(|d| d.len()).unwrap_or(0)
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StorageBackend for InMemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<StorageValue>> {
        Ok(read_lock(&self.data)?.get(key).cloned())
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        write_lock(&self.data)?.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<bool> {
        Ok(write_lock(&self.data)?.remove(key).is_some())
    }

    fn list_prefix(&self, prefix: &[u8]) -> Result<Vec<StorageKey>> {
        Ok(prefixed(&*read_lock(&self.data)?, prefix))
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FILE-BASED STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Name of the document inside the data directory
pub const DATA_FILE: &str = "pegvault.json";

/// File-backed store: everything is cached in memory and written on `flush`
#[derive(Debug)]
pub struct FileStore {
    base_path: PathBuf,
    cache: RwLock<Entries>,
    dirty: RwLock<bool>,
}

impl FileStore {
    /// Open (or create) a store in `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)
            .map_err(|e| Error::Storage(format!("cannot create {}: {}", base_path.display(), e)))?;

        let store = Self {
            base_path,
            cache: RwLock::new(Entries::new()),
            dirty: RwLock::new(false),
        };
        store.load_from_disk()?;
        Ok(store)
    }

    /// Path of the JSON document
    pub fn data_file_path(&self) -> PathBuf {
        self.base_path.join(DATA_FILE)
    }

    fn load_from_disk(&self) -> Result<()> {
        let path = self.data_file_path();
        if !path.exists() {
            return Ok(());
        }

        let file = File::open(&path)
            .map_err(|e| Error::Storage(format!("cannot open {}: {}", path.display(), e)))?;
        let encoded: BTreeMap<String, String> = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::Deserialization(format!("{}: {}", path.display(), e)))?;

        let mut cache = write_lock(&self.cache)?;
        for (key_hex, value_hex) in encoded {
            let key = hex::decode(&key_hex)
                .map_err(|e| Error::Deserialization(format!("invalid key {}: {}", key_hex, e)))?;
            let value = hex::decode(&value_hex)
                .map_err(|e| Error::Deserialization(format!("invalid value for {}: {}", key_hex, e)))?;
            cache.insert(key, value);
        }
        Ok(())
    }

    fn save_to_disk(&self) -> Result<()> {
        let encoded: BTreeMap<String, String> = read_lock(&self.cache)?
            .iter()
            .map(|(k, v)| (hex::encode(k), hex::encode(v)))
            .collect();

        let path = self.data_file_path();
        let tmp = path.with_extension("json.tmp");
        let file = File::create(&tmp)
            .map_err(|e| Error::Storage(format!("cannot write {}: {}", tmp.display(), e)))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &encoded)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        fs::rename(&tmp, &path)
            .map_err(|e| Error::Storage(format!("cannot replace {}: {}", path.display(), e)))?;

        self.set_dirty(false)
    }

    fn set_dirty(&self, value: bool) -> Result<()> {
        let mut dirty = self
            .dirty
            .write()
            .map_err(|e| Error::Storage(format!("lock poisoned: {}", e)))?;
        *dirty = value;
        Ok(())
    }
}

impl StorageBackend for FileStore {
    fn get(&self, key: &[u8]) -> Result<Option<StorageValue>> {
        Ok(read_lock(&self.cache)?.get(key).cloned())
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        write_lock(&self.cache)?.insert(key.to_vec(), value.to_vec());
        self.set_dirty(true)
    }

    fn delete(&self, key: &[u8]) -> Result<bool> {
        let existed = write_lock(&self.cache)?.remove(key).is_some();
        if existed {
            self.set_dirty(true)?;
        }
        Ok(existed)
    }

    fn list_prefix(&self, prefix: &[u8]) -> Result<Vec<StorageKey>> {
        Ok(prefixed(&*read_lock(&self.cache)?, prefix))
    }

    fn flush(&self) -> Result<()> {
        let dirty = *self
            .dirty
            .read()
            .map_err(|e| Error::Storage(format!("lock poisoned: {}", e)))?;
        if dirty {
            self.save_to_disk()?;
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TYPED STORE WRAPPER
// ═══════════════════════════════════════════════════════════════════════════════

/// bincode-typed view over a backend
pub struct TypedStore<B: StorageBackend> {
    backend: B,
}

impl<B: StorageBackend> TypedStore<B> {
    /// Wrap a backend
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Get a typed value
    pub fn get<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>> {
        self.backend
            .get(key)?
            .map(|data| {
                bincode::deserialize(&data).map_err(|e| Error::Deserialization(e.to_string()))
            })
            .transpose()
    }

    /// Set a typed value
    pub fn set<T: Serialize>(&self, key: &[u8], value: &T) -> Result<()> {
        let data = bincode::serialize(value).map_err(|e| Error::Serialization(e.to_string()))?;
        self.backend.set(key, &data)
    }

    /// Delete a value
    pub fn delete(&self, key: &[u8]) -> Result<bool> {
        self.backend.delete(key)
    }

    /// Check if a key exists
    pub fn exists(&self, key: &[u8]) -> Result<bool> {
        self.backend.exists(key)
    }

    /// Flush pending writes
    pub fn flush(&self) -> Result<()> {
        self.backend.flush()
    }

    /// The wrapped backend
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEYS
// ═══════════════════════════════════════════════════════════════════════════════

/// Key prefixes
pub mod prefixes {
    /// Ledger snapshots
    pub const LEDGER: &[u8] = b"ledger:";
    /// Chain metadata (block height)
    pub const META: &[u8] = b"meta:";
}

/// Join a prefix and a key
pub fn make_key(prefix: &[u8], key: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(prefix.len() + key.len());
    result.extend_from_slice(prefix);
    result.extend_from_slice(key);
    result
}
