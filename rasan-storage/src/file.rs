//! JSON file backend.
//!
//! The whole store lives in one JSON document that is rewritten on every
//! mutation: written to a sibling temp file first, then renamed over the
//! original so a crash never leaves a half-written store.

use crate::{ArtifactBatch, ArtifactStore, StorageResult, StoredArtifact};
use rasan_core::{ArtifactKey, StorageError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

const STORE_FILE_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    #[serde(default)]
    artifacts: BTreeMap<ArtifactKey, StoredArtifact>,
}

/// Artifact store persisted to a single JSON file.
#[derive(Debug)]
pub struct FileArtifactStore {
    path: PathBuf,
    records: RwLock<BTreeMap<ArtifactKey, StoredArtifact>>,
}

impl FileArtifactStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let records = if path.exists() {
            load(&path)?
        } else {
            tracing::debug!(path = %path.display(), "Store file not found, starting empty");
            BTreeMap::new()
        };
        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn mutate<R>(
        &self,
        apply: impl FnOnce(&mut BTreeMap<ArtifactKey, StoredArtifact>) -> R,
    ) -> StorageResult<R> {
        let mut records = self.records.write().map_err(|_| StorageError::LockPoisoned)?;
        let mut next = records.clone();
        let outcome = apply(&mut next);
        save(&self.path, &next)?;
        *records = next;
        Ok(outcome)
    }
}

fn io_error(path: &Path, e: impl std::fmt::Display) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

fn load(path: &Path) -> StorageResult<BTreeMap<ArtifactKey, StoredArtifact>> {
    let content = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
    let file: StoreFile =
        serde_json::from_str(&content).map_err(|e| StorageError::InvalidFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
    if file.version != STORE_FILE_VERSION {
        return Err(StorageError::InvalidFile {
            path: path.display().to_string(),
            reason: format!("unsupported version {}", file.version),
        });
    }
    tracing::debug!(path = %path.display(), artifacts = file.artifacts.len(), "Loaded artifact store");
    Ok(file.artifacts)
}

fn save(path: &Path, records: &BTreeMap<ArtifactKey, StoredArtifact>) -> StorageResult<()> {
    #[derive(Serialize)]
    struct StoreFileRef<'a> {
        version: u32,
        artifacts: &'a BTreeMap<ArtifactKey, StoredArtifact>,
    }

    let content = serde_json::to_string_pretty(&StoreFileRef {
        version: STORE_FILE_VERSION,
        artifacts: records,
    })
    .map_err(|e| io_error(path, e))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, content).map_err(|e| io_error(&tmp, e))?;
    if let Err(e) = fs::rename(&tmp, path) {
        tracing::warn!(path = %path.display(), error = %e, "Failed to replace store file");
        let _ = fs::remove_file(&tmp);
        return Err(io_error(path, e));
    }
    Ok(())
}

impl ArtifactStore for FileArtifactStore {
    fn get_raw(&self, key: ArtifactKey) -> StorageResult<Option<StoredArtifact>> {
        let records = self.records.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(records.get(&key).cloned())
    }

    fn put_raw(&self, key: ArtifactKey, record: Value) -> StorageResult<()> {
        self.mutate(|records| {
            records.insert(key, StoredArtifact::new(key, record));
        })?;
        tracing::debug!(key = %key, path = %self.path.display(), "Stored artifact");
        Ok(())
    }

    fn remove(&self, key: ArtifactKey) -> StorageResult<bool> {
        let existed = {
            let records = self.records.read().map_err(|_| StorageError::LockPoisoned)?;
            records.contains_key(&key)
        };
        if !existed {
            return Ok(false);
        }
        self.mutate(|records| records.remove(&key).is_some())
    }

    fn apply(&self, batch: ArtifactBatch) -> StorageResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let keys = batch.keys();
        self.mutate(|records| batch.apply_to(records))?;
        tracing::debug!(keys = ?keys, path = %self.path.display(), "Applied artifact batch");
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        self.mutate(|records| records.clear())?;
        tracing::info!(path = %self.path.display(), "Cleared artifact store");
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<ArtifactKey>> {
        let records = self.records.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(records.keys().copied().collect())
    }
}
