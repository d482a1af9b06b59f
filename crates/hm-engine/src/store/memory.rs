//! In-process datastore.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use hm_core::{FxHashMap, Record, TargetKind, fx_hash_map};
use hm_schema::{DedupKey, dedup_key, schema};

use super::{Datastore, RecordId};
use crate::error::StoreError;
use crate::locks::KeyLocks;

/// A record as held by the store, with its audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Store-assigned id.
    pub id: RecordId,
    /// Target table.
    pub target: TargetKind,
    /// Organisational unit, if scoped.
    pub scope: Option<String>,
    /// Field values.
    pub fields: Record,
    /// Actor that inserted the record.
    pub created_by: String,
    /// Actor of the most recent update.
    pub updated_by: Option<String>,
    /// Number of writes (1 after insert).
    pub version: u32,
}

/// Index key: a dedup key within one target and scope.
type IndexKey = (TargetKind, Option<String>, DedupKey);

#[derive(Debug, Default)]
struct Tables {
    records: FxHashMap<RecordId, StoredRecord>,
    index: FxHashMap<IndexKey, RecordId>,
    last_id: RecordId,
}

impl Tables {
    fn index_key(record: &StoredRecord) -> Result<IndexKey, StoreError> {
        let key = dedup_key(schema(record.target), &record.fields).ok_or_else(|| {
            StoreError::rejected(format!(
                "record is missing dedup key fields {:?}",
                schema(record.target).dedup_key
            ))
        })?;
        Ok((record.target, record.scope.clone(), key))
    }
}

/// A thread-safe in-memory [`Datastore`].
///
/// Dedup keys are derived from the catalog, so lookups follow the same case
/// rules as the executor. Reads and writes go through a single `RwLock`;
/// every write is immediately visible to `find_by_key`. The store owns the
/// [`KeyLocks`] for its keys, so every engine over one store serializes on
/// them.
///
/// # Examples
///
/// ```
/// use hm_core::{Record, TargetKind, Value};
/// use hm_engine::{Datastore, MemoryStore};
/// use hm_schema::{PATIENTS, dedup_key};
///
/// let store = MemoryStore::new();
/// let mut record = Record::new();
/// record.insert("identification_card_number".into(), Value::from("1234567890123456"));
///
/// let id = store.insert(TargetKind::Patients, None, &record, "importer")?;
/// let key = dedup_key(&PATIENTS, &record).unwrap();
/// assert_eq!(store.find_by_key(TargetKind::Patients, None, &key)?, Some(id));
/// # Ok::<(), hm_engine::StoreError>(())
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    locks: KeyLocks,
}

impl MemoryStore {
    /// Creates an empty store.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `records`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Rejected`] if a record lacks its dedup key or
    /// two records share one.
    pub fn from_records(records: impl IntoIterator<Item = StoredRecord>) -> Result<Self, StoreError> {
        let mut tables = Tables {
            records: fx_hash_map(),
            index: fx_hash_map(),
            last_id: 0,
        };
        for record in records {
            let key = Tables::index_key(&record)?;
            if let Some(existing) = tables.index.insert(key, record.id) {
                return Err(StoreError::rejected(format!(
                    "records {existing} and {} share a dedup key",
                    record.id
                )));
            }
            tables.last_id = tables.last_id.max(record.id);
            tables.records.insert(record.id, record);
        }
        Ok(Self {
            tables: RwLock::new(tables),
            locks: KeyLocks::new(),
        })
    }

    /// Returns a copy of the record with `id`.
    #[must_use]
    pub fn get(&self, id: RecordId) -> Option<StoredRecord> {
        self.tables.read().records.get(&id).cloned()
    }

    /// Returns copies of all records of `target`, ordered by id.
    #[must_use]
    pub fn records(&self, target: TargetKind) -> Vec<StoredRecord> {
        let tables = self.tables.read();
        let mut records: Vec<_> = tables
            .records
            .values()
            .filter(|r| r.target == target)
            .cloned()
            .collect();
        records.sort_unstable_by_key(|r| r.id);
        records
    }

    /// Returns copies of every record, ordered by id.
    #[must_use]
    pub fn all_records(&self) -> Vec<StoredRecord> {
        let tables = self.tables.read();
        let mut records: Vec<_> = tables.records.values().cloned().collect();
        records.sort_unstable_by_key(|r| r.id);
        records
    }

    /// Total number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.read().records.len()
    }

    /// Returns `true` if the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Datastore for MemoryStore {
    fn find_by_key(
        &self,
        target: TargetKind,
        scope: Option<&str>,
        key: &DedupKey,
    ) -> Result<Option<RecordId>, StoreError> {
        let index_key = (target, scope.map(str::to_owned), key.clone());
        Ok(self.tables.read().index.get(&index_key).copied())
    }

    fn insert(
        &self,
        target: TargetKind,
        scope: Option<&str>,
        record: &Record,
        actor: &str,
    ) -> Result<RecordId, StoreError> {
        let mut tables = self.tables.write();
        let stored = StoredRecord {
            id: tables.last_id + 1,
            target,
            scope: scope.map(str::to_owned),
            fields: record.clone(),
            created_by: actor.to_owned(),
            updated_by: None,
            version: 1,
        };
        let key = Tables::index_key(&stored)?;
        if let Some(existing) = tables.index.get(&key) {
            return Err(StoreError::rejected(format!(
                "dedup key already used by record {existing}"
            )));
        }

        let id = stored.id;
        tables.last_id = id;
        tables.index.insert(key, id);
        tables.records.insert(id, stored);
        Ok(id)
    }

    fn update(
        &self,
        target: TargetKind,
        id: RecordId,
        record: &Record,
        actor: &str,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let Some(existing) = tables.records.get(&id).filter(|r| r.target == target) else {
            return Err(StoreError::NotFound { target, id });
        };

        let mut updated = existing.clone();
        updated
            .fields
            .extend(record.iter().map(|(k, v)| (k.clone(), v.clone())));
        updated.updated_by = Some(actor.to_owned());
        updated.version += 1;

        let old_key = Tables::index_key(existing)?;
        let new_key = Tables::index_key(&updated)?;
        if new_key != old_key {
            if let Some(other) = tables.index.get(&new_key) {
                return Err(StoreError::rejected(format!(
                    "dedup key already used by record {other}"
                )));
            }
            tables.index.remove(&old_key);
            tables.index.insert(new_key, id);
        }
        tables.records.insert(id, updated);
        Ok(())
    }

    fn key_locks(&self) -> Option<&KeyLocks> {
        Some(&self.locks)
    }
}

#[cfg(test)]
mod tests {
    use hm_core::Value;
    use hm_schema::PATIENTS;

    use super::*;

    fn patient(icn: &str, first: &str) -> Record {
        let mut r = Record::new();
        r.insert("identification_card_number".to_owned(), Value::from(icn));
        r.insert("first_name".to_owned(), Value::from(first));
        r
    }

    #[test]
    fn test_insert_then_find() {
        let store = MemoryStore::new();
        let ann = patient("1234567890123456", "Ann");
        let id = store
            .insert(TargetKind::Patients, Some("north"), &ann, "u1")
            .unwrap();

        let key = dedup_key(&PATIENTS, &ann).unwrap();
        assert_eq!(
            store.find_by_key(TargetKind::Patients, Some("north"), &key).unwrap(),
            Some(id)
        );
        assert_eq!(
            store.find_by_key(TargetKind::Patients, Some("south"), &key).unwrap(),
            None
        );
        assert_eq!(store.find_by_key(TargetKind::LabResults, Some("north"), &key).unwrap(), None);
    }

    #[test]
    fn test_update_merges_and_audits() {
        let store = MemoryStore::new();
        let id = store
            .insert(TargetKind::Patients, None, &patient("1234567890123456", "Ann"), "u1")
            .unwrap();
        store
            .update(TargetKind::Patients, id, &patient("1234567890123456", "Anne"), "u2")
            .unwrap();

        let stored = store.get(id).unwrap();
        assert_eq!(stored.fields.get("first_name"), Some(&Value::from("Anne")));
        assert_eq!(stored.created_by, "u1");
        assert_eq!(stored.updated_by.as_deref(), Some("u2"));
        assert_eq!(stored.version, 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_duplicate_insert_is_rejected() {
        let store = MemoryStore::new();
        let ann = patient("1234567890123456", "Ann");
        store.insert(TargetKind::Patients, None, &ann, "u1").unwrap();
        let err = store.insert(TargetKind::Patients, None, &ann, "u1").unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_update_missing_record() {
        let store = MemoryStore::new();
        let err = store
            .update(TargetKind::Patients, 42, &patient("1", "x"), "u1")
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { id: 42, .. }));
    }

    #[test]
    fn test_from_records_rebuilds_index() {
        let source = MemoryStore::new();
        source
            .insert(TargetKind::Patients, None, &patient("1111111111111111", "A"), "u")
            .unwrap();
        source
            .insert(TargetKind::Patients, None, &patient("2222222222222222", "B"), "u")
            .unwrap();

        let copy = MemoryStore::from_records(source.all_records()).unwrap();
        let key = dedup_key(&PATIENTS, &patient("2222222222222222", "B")).unwrap();
        assert_eq!(copy.find_by_key(TargetKind::Patients, None, &key).unwrap(), Some(2));

        let next = copy
            .insert(TargetKind::Patients, None, &patient("3333333333333333", "C"), "u")
            .unwrap();
        assert_eq!(next, 3);
    }
}
