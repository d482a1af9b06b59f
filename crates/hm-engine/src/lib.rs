//! Preview and migration engine for legacy SQL dumps.
//!
//! This crate drives the two operator-facing steps of a migration:
//!
//! 1. **Preview**: parse a dump, sample the source table and suggest a
//!    [`FieldMapping`](hm_core::FieldMapping) ([`MigrationEngine::preview`])
//! 2. **Execute**: apply the confirmed [`MigrationPlan`] to every row,
//!    inserting, updating or skipping against a [`Datastore`]
//!    ([`MigrationEngine::execute`])
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────┐      ┌───────────────┐
//! │  MigrationEngine   │─────►│  Datastore    │  (MemoryStore, JsonFileStore,
//! │  Arc<S>, Config    │      │  find/insert/ │   or your own)
//! │  KeyLocks          │      │  update       │
//! └─────────┬──────────┘      └───────────────┘
//!           │
//!           ├─ preview ──► PreviewBuilder ──► PreviewData
//!           │
//!           └─ start ───► prepare (rayon) ──► MigrationRun (iterator)
//!                                                  │
//!                                                  └─ finish ──► MigrationResult
//! ```
//!
//! # Thread Safety
//!
//! [`MigrationEngine`] is cheap to clone: the store and configuration are
//! shared through `Arc`. Clones can run migrations concurrently; each
//! [`MigrationRun`] keeps its own [`MigrationStats`]. Writes on the same
//! dedup key are serialized through [`KeyLocks`]: the ones the store provides
//! ([`Datastore::key_locks`]), so separate engines over one store wait on
//! each other too, or else a set shared by the clones of one engine.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use hm_core::{Config, TargetKind};
//! use hm_engine::{MemoryStore, MigrationEngine, MigrationPlan};
//!
//! let dump = "INSERT INTO legacy_patients (fname, lname, icn) VALUES
//!     ('Ann', 'Lee', '1234567890123456'),
//!     ('Bo', 'Ng', 'bad-icn');";
//!
//! let engine = MigrationEngine::new(Arc::new(MemoryStore::new()), Config::default())?;
//! let preview = engine.preview(dump, TargetKind::Patients)?;
//!
//! let result = engine.execute(dump, &MigrationPlan::from_preview(&preview), "importer")?;
//! assert_eq!(result.records_inserted, 1);
//! assert_eq!(result.records_skipped, 1);
//! assert!(!result.success);
//! # Ok::<(), hm_engine::EngineError>(())
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
mod executor;
mod locks;
mod plan;
mod preview;
mod stats;
pub mod store;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use hm_core::{Config, MigrationResult, PreviewData, TargetKind};
use hm_schema::{Validator, schema};

pub use error::{EngineError, EngineErrorKind, StoreError};
pub use executor::{
    MigrationRun, MigrationTally, MigrationUpdate, RowOutcome, RowReport, WRITE_ERROR_FIELD,
};
pub use locks::{KeyGuard, KeyLocks};
pub use plan::MigrationPlan;
pub use preview::{PreviewBuilder, suggest_mapping};
pub use stats::{MigrationSnapshot, MigrationStats};
pub use store::{Datastore, JsonFileStore, MemoryStore, RecordId, StoredRecord};

use executor::{RunContext, prepare};

/// Previews and migrates dumps against one datastore.
///
/// The datastore handle is passed in and owned by the caller; the engine only
/// holds a shared reference to it.
pub struct MigrationEngine<S: ?Sized> {
    store: Arc<S>,
    config: Arc<Config>,
    /// Used when the store provides no locks of its own.
    locks: Arc<KeyLocks>,
}

impl<S: ?Sized> Clone for MigrationEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
            locks: Arc::clone(&self.locks),
        }
    }
}

impl<S: ?Sized> std::fmt::Debug for MigrationEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: Datastore + ?Sized> MigrationEngine<S> {
    /// Creates an engine over `store`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if `config` fails validation.
    pub fn new(store: Arc<S>, config: Config) -> Result<Self, EngineError> {
        config.validate()?;
        info!(
            sample_size = config.preview.sample_size,
            parallel_validation = config.execute.parallel_validation,
            scope = config.execute.scope.as_deref().unwrap_or("-"),
            "Creating migration engine"
        );

        Ok(Self {
            store,
            config: Arc::new(config),
            locks: Arc::new(KeyLocks::new()),
        })
    }

    /// The datastore.
    #[inline]
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The engine configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Previews the first table of `text` for `target`.
    ///
    /// Read-only: the datastore is never touched.
    ///
    /// # Errors
    ///
    /// See [`PreviewBuilder::build`].
    pub fn preview(&self, text: &str, target: TargetKind) -> Result<PreviewData, EngineError> {
        self.preview_table(text, target, None)
    }

    /// Previews `source_table` (or the first table) of `text` for `target`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SourceTableNotFound`] if `source_table` is not in
    /// the dump.
    pub fn preview_table(
        &self,
        text: &str,
        target: TargetKind,
        source_table: Option<&str>,
    ) -> Result<PreviewData, EngineError> {
        PreviewBuilder::new(&self.config).build(text, target, source_table)
    }

    /// Checks `plan`, prepares every row and returns the run, ready to write.
    ///
    /// Nothing is written until the run is iterated.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidMapping`] if the mapping does not fit the target
    /// - [`EngineError::SourceTableNotFound`] if the plan's table is not in the
    ///   dump
    /// - [`EngineError::Catalog`] if the target's validator cannot be built
    pub fn start<'a>(
        &'a self,
        text: &str,
        plan: &MigrationPlan,
        actor: &'a str,
    ) -> Result<MigrationRun<'a, S>, EngineError> {
        plan.check(schema(plan.target))?;
        let validator = Validator::for_target(plan.target)?;
        let execute = &self.config.execute;
        let prepared = prepare(text, plan, validator, execute.parallel_validation)?;

        let ctx = RunContext {
            store: &*self.store,
            locks: self.store.key_locks().unwrap_or(self.locks.as_ref()),
            target: plan.target,
            scope: execute.scope.as_deref(),
            actor,
            progress_interval: execute.progress_interval,
        };
        Ok(MigrationRun::new(ctx, prepared))
    }

    /// Runs the whole migration and returns its result.
    ///
    /// # Errors
    ///
    /// Everything [`start`](Self::start) returns, plus
    /// [`EngineError::DatastoreConnection`] with the partial result if the
    /// datastore fails mid-run.
    pub fn execute(
        &self,
        text: &str,
        plan: &MigrationPlan,
        actor: &str,
    ) -> Result<MigrationResult, EngineError> {
        let mut run = self.start(text, plan, actor)?;
        run.by_ref().for_each(drop);
        run.finish()
    }

    /// Runs the migration, streaming updates through `tx`.
    ///
    /// Blocks the calling thread; call it from `spawn_blocking` or a plain
    /// thread. Updates are sent in this order:
    ///
    /// 1. [`MigrationUpdate::Started`] once
    /// 2. [`MigrationUpdate::Row`] per row, with a
    ///    [`MigrationUpdate::Progress`] every `progress_interval` rows
    /// 3. [`MigrationUpdate::Complete`] once, unless the run failed
    ///
    /// # Cancellation
    ///
    /// Dropping the receiver stops the run before the next row. The method
    /// then returns `Ok` with `completed = false` and `success = false`.
    ///
    /// # Errors
    ///
    /// Same as [`execute`](Self::execute).
    #[allow(clippy::needless_pass_by_value)] // Sender belongs to the blocking task running the migration
    pub fn execute_streaming(
        &self,
        text: &str,
        plan: &MigrationPlan,
        actor: &str,
        tx: mpsc::Sender<MigrationUpdate>,
    ) -> Result<MigrationResult, EngineError> {
        let mut run = self.start(text, plan, actor)?;

        let started = MigrationUpdate::Started {
            source_table: run.source_table().to_owned(),
            rows: run.remaining(),
            malformed: run.malformed().len(),
        };
        if tx.blocking_send(started).is_err() {
            info!("Update receiver dropped before start, cancelling run");
            return run.finish();
        }

        let stats = Arc::clone(run.stats());
        let interval = self.config.execute.progress_interval.max(1);
        let mut processed = 0_u64;
        for item in run.by_ref() {
            let Ok(report) = item else { break };
            processed += 1;
            if tx.blocking_send(MigrationUpdate::Row(report)).is_err() {
                info!("Update receiver dropped, cancelling run");
                break;
            }
            if processed % interval == 0
                && tx
                    .blocking_send(MigrationUpdate::Progress(stats.snapshot()))
                    .is_err()
            {
                info!("Update receiver dropped, cancelling run");
                break;
            }
        }

        let result = run.finish()?;
        // Receiver may be gone already.
        let _ = tx.blocking_send(MigrationUpdate::Complete(Box::new(result.clone())));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use hm_core::{FieldErrorKind, FieldMapping, Record, Value};
    use hm_schema::DedupKey;

    use super::*;

    const ANN_AND_BO: &str = "\
INSERT INTO legacy_patients (fname, lname, icn) VALUES
  ('Ann','Lee','1234567890123456'), ('Bo','Ng','bad-icn');";

    fn patient_plan() -> MigrationPlan {
        MigrationPlan::new(
            TargetKind::Patients,
            FieldMapping::new()
                .with("first_name", "fname")
                .with("last_name", "lname")
                .with("identification_card_number", "icn"),
        )
    }

    fn engine() -> MigrationEngine<MemoryStore> {
        MigrationEngine::new(Arc::new(MemoryStore::new()), Config::default()).unwrap()
    }

    /// Delegates to a [`MemoryStore`] until `fail_after` writes, then fails
    /// every call with `failure`.
    struct FlakyStore {
        inner: MemoryStore,
        writes: AtomicUsize,
        fail_after: usize,
        failure: fn() -> StoreError,
    }

    impl FlakyStore {
        fn new(fail_after: usize, failure: fn() -> StoreError) -> Self {
            Self {
                inner: MemoryStore::new(),
                writes: AtomicUsize::new(0),
                fail_after,
                failure,
            }
        }

        fn tick(&self) -> Result<(), StoreError> {
            if self.writes.fetch_add(1, Ordering::SeqCst) >= self.fail_after {
                Err((self.failure)())
            } else {
                Ok(())
            }
        }
    }

    impl Datastore for FlakyStore {
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
            self.tick()?;
            self.inner.insert(target, scope, record, actor)
        }

        fn update(
            &self,
            target: TargetKind,
            id: RecordId,
            record: &Record,
            actor: &str,
        ) -> Result<(), StoreError> {
            self.tick()?;
            self.inner.update(target, id, record, actor)
        }
    }

    fn three_patients() -> String {
        "INSERT INTO p (fname, lname, icn) VALUES \
         ('A','A','1111111111111111'), ('B','B','2222222222222222'), ('C','C','3333333333333333');"
            .to_owned()
    }

    #[test]
    fn test_execute_inserts_and_skips() {
        let engine = engine();
        let result = engine.execute(ANN_AND_BO, &patient_plan(), "u1").unwrap();

        assert_eq!(result.records_inserted, 1);
        assert_eq!(result.records_updated, 0);
        assert_eq!(result.records_skipped, 1);
        assert!(result.completed);
        assert!(!result.success);
        assert_eq!(result.per_row_errors.len(), 1);
        assert_eq!(result.per_row_errors[0].position.row, 2);
        assert_eq!(
            result.per_row_errors[0].errors[0].field,
            "identification_card_number"
        );

        let stored = engine.store().records(TargetKind::Patients);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].created_by, "u1");
    }

    #[test]
    fn test_malformed_row_is_not_counted() {
        let dump = "INSERT INTO legacy_patients (fname, lname, icn) VALUES \
                    ('Ann','Lee','1234567890123456'), ('Ann','Lee');";
        let result = engine().execute(dump, &patient_plan(), "u1").unwrap();

        assert_eq!(result.total_processed(), 1);
        assert_eq!(result.records_inserted, 1);
        assert_eq!(result.malformed_rows.len(), 1);
        assert!(result.success);
    }

    #[test]
    fn test_rerun_updates_instead_of_inserting() {
        let dump = "INSERT INTO legacy_patients (fname, lname, icn) VALUES ('Ann','Lee','1234567890123456');";
        let engine = engine();

        let first = engine.execute(dump, &patient_plan(), "u1").unwrap();
        assert_eq!((first.records_inserted, first.records_updated), (1, 0));

        let second = engine.execute(dump, &patient_plan(), "u2").unwrap();
        assert_eq!((second.records_inserted, second.records_updated), (0, 1));
        assert!(second.success);

        let stored = engine.store().records(TargetKind::Patients);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].updated_by.as_deref(), Some("u2"));
    }

    #[test]
    fn test_duplicate_rows_in_one_dump() {
        let dump = "INSERT INTO p (fname, lname, icn) VALUES \
                    ('Ann','Lee','1234567890123456'), ('Anne','Lee','1234567890123456');";
        let engine = engine();
        let result = engine.execute(dump, &patient_plan(), "u1").unwrap();

        assert_eq!((result.records_inserted, result.records_updated), (1, 1));
        let stored = engine.store().records(TargetKind::Patients);
        assert_eq!(stored[0].fields["first_name"], Value::from("Anne"));
    }

    #[test]
    fn test_lab_results_match_test_name_case_insensitively() {
        let plan = MigrationPlan::new(
            TargetKind::LabResults,
            FieldMapping::new()
                .with("patient_identification_card_number", "icn")
                .with("test_name", "test")
                .with("test_date", "taken")
                .with("result_value", "result"),
        );
        let dump = "INSERT INTO labs (icn, test, taken, result) VALUES \
                    ('1234567890123456', 'HbA1c', '2024-01-15', '6.1'), \
                    ('1234567890123456', 'HBA1C', '2024/01/15', 6.4), \
                    ('1234567890123456', 'HbA1c', '2024-02-15', 5.9);";
        let engine = engine();
        let result = engine.execute(dump, &plan, "lab").unwrap();

        assert_eq!(result.records_inserted, 2);
        assert_eq!(result.records_updated, 1);
        let stored = engine.store().records(TargetKind::LabResults);
        assert_eq!(stored[0].fields["result_value"], Value::Float(6.4));
    }

    #[test]
    fn test_scope_partitions_dedup() {
        let dump = "INSERT INTO p (fname, lname, icn) VALUES ('Ann','Lee','1234567890123456');";
        let store = Arc::new(MemoryStore::new());

        for scope in ["north", "south"] {
            let mut config = Config::default();
            config.execute.scope = Some(scope.to_owned());
            let engine = MigrationEngine::new(Arc::clone(&store), config).unwrap();
            let result = engine.execute(dump, &patient_plan(), "u1").unwrap();
            assert_eq!(result.records_inserted, 1);
        }
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_separate_engines_share_store_key_locks() {
        let dump = "INSERT INTO p (fname, lname, icn) VALUES ('Ann','Lee','1234567890123456');";
        let store = Arc::new(MemoryStore::new());
        let mut record = Record::new();
        record.insert(
            "identification_card_number".to_owned(),
            Value::from("1234567890123456"),
        );
        let key = hm_schema::dedup_key(&hm_schema::PATIENTS, &record).unwrap();

        let guard = store
            .key_locks()
            .unwrap()
            .lock(TargetKind::Patients, None, &key);
        let handle = {
            let engine = MigrationEngine::new(Arc::clone(&store), Config::default()).unwrap();
            thread::spawn(move || engine.execute(dump, &patient_plan(), "u2").unwrap())
        };

        thread::sleep(std::time::Duration::from_millis(50));
        assert!(store.is_empty());
        drop(guard);

        let result = handle.join().unwrap();
        assert_eq!(result.records_inserted, 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_concurrent_runs_keep_separate_stats() {
        let engine = engine();
        let other = engine.clone();

        let mut first = engine
            .start(&three_patients(), &patient_plan(), "u1")
            .unwrap();
        first.next().unwrap().unwrap();

        let second = other.start(ANN_AND_BO, &patient_plan(), "u2").unwrap();
        assert_eq!(second.stats().snapshot().total, 2);
        assert_eq!(second.stats().snapshot().processed(), 0);

        let snap = first.stats().snapshot();
        assert_eq!((snap.total, snap.processed()), (3, 1));
    }

    #[test]
    fn test_invalid_mapping_is_rejected_before_writing() {
        let plan = MigrationPlan::new(
            TargetKind::Patients,
            FieldMapping::new().with("first_name", "fname"),
        );
        let engine = engine();
        let err = engine.execute(ANN_AND_BO, &plan, "u1").unwrap_err();

        assert_eq!(err.kind(), EngineErrorKind::InvalidMapping);
        assert!(engine.store().is_empty());
    }

    #[test]
    fn test_preview_does_not_touch_store() {
        let engine = engine();
        engine.execute(ANN_AND_BO, &patient_plan(), "u1").unwrap();
        let before = engine.store().all_records();

        let preview = engine.preview(ANN_AND_BO, TargetKind::Patients).unwrap();
        assert_eq!(preview.total_rows, 2);
        assert_eq!(engine.store().all_records(), before);
    }

    #[test]
    fn test_preview_then_execute_from_cached_preview() {
        let engine = engine();
        let cached = engine
            .preview(ANN_AND_BO, TargetKind::Patients)
            .unwrap()
            .to_json()
            .unwrap();

        let preview = PreviewData::from_json(&cached).unwrap();
        let result = engine
            .execute(ANN_AND_BO, &MigrationPlan::from_preview(&preview), "u1")
            .unwrap();
        assert_eq!(result.records_inserted, 1);
    }

    #[test]
    fn test_cached_preview_survives_out_of_range_literal() {
        let dump = "INSERT INTO legacy_patients (fname, lname, icn, weight) VALUES \
                    ('Ann','Lee','1234567890123456', 1e999);";
        let engine = engine();
        let preview = engine.preview(dump, TargetKind::Patients).unwrap();
        assert_eq!(preview.sample[0].get("weight"), Some(&Value::from("1e999")));

        let restored = PreviewData::from_json(&preview.to_json().unwrap()).unwrap();
        assert_eq!(restored, preview);

        let result = engine
            .execute(dump, &MigrationPlan::from_preview(&restored), "u1")
            .unwrap();
        assert_eq!(result.records_inserted, 1);
    }

    #[test]
    fn test_unquoted_icn_keeps_leading_zero() {
        let dump = "INSERT INTO legacy_patients (fname, lname, icn) VALUES \
                    ('Ann','Lee',0123456789012345);";
        let engine = engine();
        let result = engine.execute(dump, &patient_plan(), "u1").unwrap();

        assert_eq!(result.records_inserted, 1);
        assert!(result.success);
        let stored = engine.store().records(TargetKind::Patients);
        assert_eq!(
            stored[0].fields["identification_card_number"],
            Value::from("0123456789012345")
        );
    }

    #[test]
    fn test_default_table_skips_table_without_valid_rows() {
        let dump = "INSERT INTO audit_log (id, note) VALUES (1);\n\
                    INSERT INTO legacy_patients (fname, lname, icn) VALUES \
                    ('Ann','Lee','1234567890123456');";
        let result = engine().execute(dump, &patient_plan(), "u1").unwrap();

        assert_eq!(result.records_inserted, 1);
        assert!(result.malformed_rows.is_empty());
        assert!(result.success);
    }

    #[test]
    fn test_row_rejection_becomes_skip() {
        let store = Arc::new(FlakyStore::new(1, || StoreError::rejected("value too wide")));
        let engine = MigrationEngine::new(store, Config::default()).unwrap();
        let result = engine.execute(&three_patients(), &patient_plan(), "u1").unwrap();

        assert_eq!(result.records_inserted, 1);
        assert_eq!(result.records_skipped, 2);
        assert!(result.completed);
        let error = &result.per_row_errors[0].errors[0];
        assert_eq!(error.field, WRITE_ERROR_FIELD);
        assert!(matches!(error.kind, FieldErrorKind::Write { .. }));
    }

    #[test]
    fn test_connection_failure_returns_partial_result() {
        let store = Arc::new(FlakyStore::new(1, || StoreError::connection("reset by peer")));
        let engine = MigrationEngine::new(store, Config::default()).unwrap();
        let err = engine
            .execute(&three_patients(), &patient_plan(), "u1")
            .unwrap_err();

        assert_eq!(err.kind(), EngineErrorKind::DatastoreConnection);
        let partial = err.partial_result().unwrap();
        assert_eq!(partial.records_inserted, 1);
        assert_eq!(partial.total_processed(), 1);
        assert!(!partial.completed);
        assert!(!partial.success);
        insta::assert_snapshot!(
            err.to_string(),
            @"datastore connection failed after 1 rows: datastore unavailable: reset by peer"
        );
    }

    #[test]
    fn test_stopping_early_marks_incomplete() {
        let engine = engine();
        let mut run = engine
            .start(&three_patients(), &patient_plan(), "u1")
            .unwrap();
        assert_eq!(run.remaining(), 3);

        let first = run.next().unwrap().unwrap();
        assert!(matches!(first.outcome, RowOutcome::Inserted(_)));
        assert_eq!(run.stats().snapshot().processed(), 1);

        let result = run.finish().unwrap();
        assert_eq!(result.records_inserted, 1);
        assert!(!result.completed);
        assert!(!result.success);
    }

    #[test]
    fn test_sequential_validation_matches_parallel() {
        let mut config = Config::default();
        config.execute.parallel_validation = false;
        let engine = MigrationEngine::new(Arc::new(MemoryStore::new()), config).unwrap();

        let result = engine.execute(ANN_AND_BO, &patient_plan(), "u1").unwrap();
        let parallel = engine_result(ANN_AND_BO);
        assert_eq!(result, parallel);
    }

    fn engine_result(dump: &str) -> MigrationResult {
        engine().execute(dump, &patient_plan(), "u1").unwrap()
    }

    #[test]
    fn test_streaming_sends_every_row() {
        let engine = engine();
        let (tx, mut rx) = mpsc::channel(16);
        let worker = {
            let engine = engine.clone();
            thread::spawn(move || engine.execute_streaming(ANN_AND_BO, &patient_plan(), "u1", tx))
        };

        let mut updates = Vec::new();
        while let Some(update) = rx.blocking_recv() {
            updates.push(update);
        }
        let result = worker.join().unwrap().unwrap();

        assert!(matches!(
            updates[0],
            MigrationUpdate::Started { rows: 2, malformed: 0, .. }
        ));
        let rows = updates
            .iter()
            .filter(|u| matches!(u, MigrationUpdate::Row(_)))
            .count();
        assert_eq!(rows, 2);
        let Some(MigrationUpdate::Complete(done)) = updates.last() else {
            panic!("expected Complete last, got {:?}", updates.last());
        };
        assert_eq!(**done, result);
    }

    #[test]
    fn test_dropped_receiver_cancels_run() {
        let engine = engine();
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let result = engine
            .execute_streaming(&three_patients(), &patient_plan(), "u1", tx)
            .unwrap();
        assert_eq!(result.total_processed(), 0);
        assert!(!result.completed);
        assert!(!result.success);
        assert!(engine.store().is_empty());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = Config::default();
        config.preview.sample_size = 0;
        let err = MigrationEngine::new(Arc::new(MemoryStore::new()), config).unwrap_err();
        assert_eq!(err.kind(), EngineErrorKind::Config);
    }
}
