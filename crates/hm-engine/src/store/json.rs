//! JSON file-backed datastore.

use std::fs;
use std::io::ErrorKind;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use hm_core::{Record, TargetKind};
use hm_schema::DedupKey;

use super::{Datastore, MemoryStore, RecordId, StoredRecord};
use crate::error::StoreError;
use crate::locks::KeyLocks;

/// On-disk layout of a store file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    records: Vec<StoredRecord>,
}

/// A [`MemoryStore`] persisted to a single JSON file.
///
/// The file is read once by [`open`](Self::open); writes stay in memory until
/// [`save`](Self::save), which replaces the file atomically (write to a
/// sibling temp file, then rename).
#[derive(Debug)]
pub struct JsonFileStore {
    path: Utf8PathBuf,
    inner: MemoryStore,
}

impl JsonFileStore {
    /// Opens the store at `path`. A missing file is an empty store.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Persist`] if the file exists but cannot be read
    /// - [`StoreError::Corrupt`] if it is not a valid store file
    /// - [`StoreError::Rejected`] if two stored records share a dedup key
    pub fn open(path: impl Into<Utf8PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let file = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str::<StoreFile>(&text).map_err(|source| {
                StoreError::Corrupt {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path, "Store file not found, starting empty");
                StoreFile::default()
            }
            Err(e) => return Err(StoreError::persist(path, e)),
        };

        let inner = MemoryStore::from_records(file.records)?;
        info!(path = %path, records = inner.len(), "Opened store");
        Ok(Self { path, inner })
    }

    /// Path of the backing file.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// The in-memory tables.
    #[inline]
    #[must_use]
    pub const fn memory(&self) -> &MemoryStore {
        &self.inner
    }

    /// Writes every record to the backing file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persist`] if the file cannot be written.
    pub fn save(&self) -> Result<(), StoreError> {
        let file = StoreFile {
            records: self.inner.all_records(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| StoreError::persist(tmp.clone(), e))?;
        fs::rename(&tmp, &self.path).map_err(|e| StoreError::persist(self.path.clone(), e))?;

        info!(path = %self.path, records = file.records.len(), "Saved store");
        Ok(())
    }
}

impl Datastore for JsonFileStore {
    fn find_by_key(
        &self,
        target: TargetKind,
        scope: Option<&str>,
        key: &DedupKey,
    ) -> Result<Option<RecordId>, StoreError> {
        self.inner.find_by_key(target, scope, key)
    }

    fn insert(
        &self,
        target: TargetKind,
        scope: Option<&str>,
        record: &Record,
        actor: &str,
    ) -> Result<RecordId, StoreError> {
        self.inner.insert(target, scope, record, actor)
    }

    fn update(
        &self,
        target: TargetKind,
        id: RecordId,
        record: &Record,
        actor: &str,
    ) -> Result<(), StoreError> {
        self.inner.update(target, id, record, actor)
    }

    fn key_locks(&self) -> Option<&KeyLocks> {
        self.inner.key_locks()
    }
}
