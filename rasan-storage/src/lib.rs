//! RASAN Storage - Artifact Store Trait and Backends
//!
//! Holds the last-known output of each pipeline stage, keyed by
//! [`ArtifactKey`]. Records are stored as JSON values and decoded on read
//! through [`ArtifactStoreExt`].

pub mod file;

pub use file::FileArtifactStore;

use chrono::{DateTime, Utc};
use rasan_core::{ArtifactKey, StageArtifact, StorageError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Result type alias for store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// A persisted stage output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredArtifact {
    pub key: ArtifactKey,
    pub stored_at: DateTime<Utc>,
    pub record: Value,
}

impl StoredArtifact {
    pub fn new(key: ArtifactKey, record: Value) -> Self {
        Self {
            key,
            stored_at: Utc::now(),
            record,
        }
    }
}

fn encode<T: StageArtifact>(artifact: &T) -> StorageResult<Value> {
    serde_json::to_value(artifact).map_err(|e| StorageError::Serde {
        key: T::KEY,
        reason: e.to_string(),
    })
}

// ============================================================================
// BATCHES
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum BatchOp {
    Put(ArtifactKey, Value),
    Remove(ArtifactKey),
}

/// Puts and removes that [`ArtifactStore::apply`] commits together: either
/// every operation lands or none does.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtifactBatch {
    ops: Vec<BatchOp>,
}

impl ArtifactBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode `artifact` and queue it under `T::KEY`.
    pub fn put<T: StageArtifact>(self, artifact: &T) -> StorageResult<Self> {
        Ok(self.put_raw(T::KEY, encode(artifact)?))
    }

    pub fn put_raw(mut self, key: ArtifactKey, record: Value) -> Self {
        self.ops.push(BatchOp::Put(key, record));
        self
    }

    pub fn remove(mut self, key: ArtifactKey) -> Self {
        self.ops.push(BatchOp::Remove(key));
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Keys the batch writes or removes, in queue order.
    pub fn keys(&self) -> Vec<ArtifactKey> {
        self.ops
            .iter()
            .map(|op| match op {
                BatchOp::Put(key, _) | BatchOp::Remove(key) => *key,
            })
            .collect()
    }

    /// Apply the queued operations in order to `records`.
    pub fn apply_to(self, records: &mut BTreeMap<ArtifactKey, StoredArtifact>) {
        for op in self.ops {
            match op {
                BatchOp::Put(key, record) => {
                    records.insert(key, StoredArtifact::new(key, record));
                }
                BatchOp::Remove(key) => {
                    records.remove(&key);
                }
            }
        }
    }
}

// ============================================================================
// STORE TRAIT
// ============================================================================

/// Key/value store for stage artifacts.
///
/// Every write replaces the record under its key wholesale. Writes spanning
/// several keys go through [`ArtifactStore::apply`].
pub trait ArtifactStore: Send + Sync {
    /// Get the record stored under `key`.
    fn get_raw(&self, key: ArtifactKey) -> StorageResult<Option<StoredArtifact>>;

    /// Replace the record stored under `key`.
    fn put_raw(&self, key: ArtifactKey, record: Value) -> StorageResult<()>;

    /// Remove `key`. Returns whether a record existed.
    fn remove(&self, key: ArtifactKey) -> StorageResult<bool>;

    /// Commit every operation in `batch`, or none of them on error.
    fn apply(&self, batch: ArtifactBatch) -> StorageResult<()>;

    /// Remove every record.
    fn clear(&self) -> StorageResult<()>;

    /// Keys currently holding a record.
    fn keys(&self) -> StorageResult<Vec<ArtifactKey>>;
}

/// Typed access on top of [`ArtifactStore`].
pub trait ArtifactStoreExt: ArtifactStore {
    /// Decode the artifact stored under `T::KEY`.
    fn get<T: StageArtifact>(&self) -> StorageResult<Option<T>> {
        let Some(stored) = self.get_raw(T::KEY)? else {
            return Ok(None);
        };
        serde_json::from_value(stored.record)
            .map(Some)
            .map_err(|e| StorageError::Corrupt {
                key: T::KEY,
                reason: e.to_string(),
            })
    }

    /// Encode and store `artifact` under `T::KEY`.
    fn put<T: StageArtifact>(&self, artifact: &T) -> StorageResult<()> {
        self.put_raw(T::KEY, encode(artifact)?)
    }

    fn contains(&self, key: ArtifactKey) -> StorageResult<bool> {
        Ok(self.get_raw(key)?.is_some())
    }
}

impl<S: ArtifactStore + ?Sized> ArtifactStoreExt for S {}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

/// Process-lifetime store. Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct InMemoryArtifactStore {
    records: Arc<RwLock<BTreeMap<ArtifactKey, StoredArtifact>>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ArtifactStore for InMemoryArtifactStore {
    fn get_raw(&self, key: ArtifactKey) -> StorageResult<Option<StoredArtifact>> {
        let records = self.records.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(records.get(&key).cloned())
    }

    fn put_raw(&self, key: ArtifactKey, record: Value) -> StorageResult<()> {
        let mut records = self.records.write().map_err(|_| StorageError::LockPoisoned)?;
        records.insert(key, StoredArtifact::new(key, record));
        Ok(())
    }

    fn remove(&self, key: ArtifactKey) -> StorageResult<bool> {
        let mut records = self.records.write().map_err(|_| StorageError::LockPoisoned)?;
        Ok(records.remove(&key).is_some())
    }

    fn apply(&self, batch: ArtifactBatch) -> StorageResult<()> {
        let mut records = self.records.write().map_err(|_| StorageError::LockPoisoned)?;
        batch.apply_to(&mut records);
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        let mut records = self.records.write().map_err(|_| StorageError::LockPoisoned)?;
        records.clear();
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<ArtifactKey>> {
        let records = self.records.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(records.keys().copied().collect())
    }
}
