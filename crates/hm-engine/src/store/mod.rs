//! Datastore abstraction.
//!
//! The executor talks to the current schema only through [`Datastore`]. The
//! handle is passed in explicitly and owned by the caller; the engine keeps
//! no global client state.
//!
//! Two implementations ship with the crate:
//!
//! - [`MemoryStore`]: in-process tables behind a `RwLock`
//! - [`JsonFileStore`]: a [`MemoryStore`] loaded from and saved to a JSON file

mod json;
mod memory;

pub use json::JsonFileStore;
pub use memory::{MemoryStore, StoredRecord};

use hm_core::{Record, TargetKind};
use hm_schema::DedupKey;

use crate::error::StoreError;
use crate::locks::KeyLocks;

/// Identifier assigned to a stored record.
pub type RecordId = u64;

/// The write-side interface of the current schema.
///
/// # Contract
///
/// - `find_by_key` is an exact match on the normalized [`DedupKey`] within
///   `(target, scope)`, and sees every write the caller made before it
/// - `actor` is audit attribution only
/// - [`key_locks`](Self::key_locks), when provided, is the one lock set every
///   engine writing to this store shares
/// - Row-level refusals are [`StoreError::Rejected`]; an unreachable store is
///   [`StoreError::Connection`] (see [`StoreError::is_fatal`])
///
/// Implementations use interior mutability so one handle can be shared
/// between runs and threads.
pub trait Datastore: Send + Sync {
    /// Finds the record of `target` in `scope` whose dedup key is `key`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the lookup fails.
    fn find_by_key(
        &self,
        target: TargetKind,
        scope: Option<&str>,
        key: &DedupKey,
    ) -> Result<Option<RecordId>, StoreError>;

    /// Inserts a new record and returns its id.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the record cannot be written.
    fn insert(
        &self,
        target: TargetKind,
        scope: Option<&str>,
        record: &Record,
        actor: &str,
    ) -> Result<RecordId, StoreError>;

    /// Overwrites the fields present in `record` on an existing record.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the record cannot be written.
    fn update(
        &self,
        target: TargetKind,
        id: RecordId,
        record: &Record,
        actor: &str,
    ) -> Result<(), StoreError>;

    /// Per-key write locks owned by the store.
    ///
    /// `None` (the default) leaves locking to each engine, which only
    /// serializes its own clones.
    fn key_locks(&self) -> Option<&KeyLocks> {
        None
    }
}

impl<S: Datastore + ?Sized> Datastore for &S {
    fn find_by_key(
        &self,
        target: TargetKind,
        scope: Option<&str>,
        key: &DedupKey,
    ) -> Result<Option<RecordId>, StoreError> {
        (**self).find_by_key(target, scope, key)
    }

    fn insert(
        &self,
        target: TargetKind,
        scope: Option<&str>,
        record: &Record,
        actor: &str,
    ) -> Result<RecordId, StoreError> {
        (**self).insert(target, scope, record, actor)
    }

    fn update(
        &self,
        target: TargetKind,
        id: RecordId,
        record: &Record,
        actor: &str,
    ) -> Result<(), StoreError> {
        (**self).update(target, id, record, actor)
    }

    fn key_locks(&self) -> Option<&KeyLocks> {
        (**self).key_locks()
    }
}
