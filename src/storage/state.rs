//! Ledger persistence.
//!
//! The whole [`Ledger`] is stored as one bincode snapshot next to a small
//! [`ChainMeta`] record carrying the block height and the snapshot's hash.
//! Loading recomputes the hash and refuses a snapshot that does not match.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::ledger::Ledger;
use crate::error::{Error, Result};
use crate::storage::backend::{make_key, prefixes, StorageBackend, TypedStore};
use crate::utils::crypto::Hash;

/// Current snapshot layout version
pub const STATE_VERSION: u32 = 1;

// ═══════════════════════════════════════════════════════════════════════════════
// CHAIN METADATA
// ═══════════════════════════════════════════════════════════════════════════════

/// Metadata written with every snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainMeta {
    /// Height of the last committed block
    pub block_height: u64,
    /// Hash of the ledger snapshot
    pub state_hash: Hash,
    /// Layout version
    pub version: u32,
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATE MANAGER
// ═══════════════════════════════════════════════════════════════════════════════

/// Saves and restores the ledger through a storage backend
pub struct StateManager<B: StorageBackend> {
    store: TypedStore<B>,
}

impl<B: StorageBackend> StateManager<B> {
    /// Create a new state manager
    pub fn new(backend: B) -> Self {
        Self {
            store: TypedStore::new(backend),
        }
    }

    fn ledger_key() -> Vec<u8> {
        make_key(prefixes::LEDGER, b"current")
    }

    fn meta_key() -> Vec<u8> {
        make_key(prefixes::META, b"chain")
    }

    /// Write the ledger and its metadata (not flushed)
    pub fn save(&self, ledger: &Ledger, block_height: u64) -> Result<ChainMeta> {
        let meta = ChainMeta {
            block_height,
            state_hash: ledger.state_hash()?,
            version: STATE_VERSION,
        };
        self.store.set(&Self::ledger_key(), ledger)?;
        self.store.set(&Self::meta_key(), &meta)?;
        debug!(height = block_height, hash = %meta.state_hash, "Ledger snapshot written");
        Ok(meta)
    }

    /// Read the metadata record, if any
    pub fn load_meta(&self) -> Result<Option<ChainMeta>> {
        self.store.get(&Self::meta_key())
    }

    /// Read the ledger and its block height, verifying the stored hash
    pub fn load(&self) -> Result<Option<(Ledger, u64)>> {
        let meta = match self.load_meta()? {
            Some(meta) => meta,
            None => return Ok(None),
        };
        if meta.version != STATE_VERSION {
            return Err(Error::Storage(format!(
                "unsupported state version {} (expected {})",
                meta.version, STATE_VERSION
            )));
        }

        let ledger: Ledger = self
            .store
            .get(&Self::ledger_key())?
            .ok_or_else(|| Error::Storage("metadata present but ledger snapshot missing".into()))?;
        let actual = ledger.state_hash()?;
        if actual != meta.state_hash {
            return Err(Error::Storage(format!(
                "state hash mismatch: stored {}, computed {}",
                meta.state_hash, actual
            )));
        }
        Ok(Some((ledger, meta.block_height)))
    }

    /// True once a snapshot has been written
    pub fn has_state(&self) -> Result<bool> {
        self.store.exists(&Self::meta_key())
    }

    /// Flush the backend
    pub fn flush(&self) -> Result<()> {
        self.store.flush()
    }

    /// The underlying backend
    pub fn backend(&self) -> &B {
        self.store.backend()
    }
}
