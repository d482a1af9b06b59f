//! Migration execution.
//!
//! A run has two phases:
//!
//! 1. **Prepare** (CPU only): parse the whole dump, select the source table,
//!    then project, validate and key every row. Rows are independent here, so
//!    this phase runs on the rayon pool when `parallel_validation` is set.
//! 2. **Write** (sequential, lazy): [`MigrationRun`] yields one [`RowReport`]
//!    per row in file order. Each valid row takes its dedup-key lock, looks
//!    the key up and then updates or inserts.
//!
//! Stopping iteration early is the cancellation mechanism: [`MigrationRun::finish`]
//! then reports `completed = false` and `success = false`.
//!
//! # Error Handling
//!
//! | Problem | Effect |
//! |---------|--------|
//! | Malformed tuple | listed in `malformed_rows`, not counted |
//! | Field errors | row skipped with its field errors |
//! | Recoverable store error | row skipped with a `record` write error |
//! | Fatal store error | run stops, [`EngineError::DatastoreConnection`] |

use std::iter::FusedIterator;
use std::mem;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};
use tracing::{debug, error, info, warn};

use hm_core::{
    FieldError, FieldErrorKind, MigrationResult, ParseIssue, Record, RowError, RowPosition,
    SourceRow, TargetKind,
};
use hm_dump::DumpParser;
use hm_schema::{DedupKey, Validator, dedup_key};

use crate::error::{EngineError, StoreError};
use crate::locks::KeyLocks;
use crate::plan::MigrationPlan;
use crate::stats::{MigrationSnapshot, MigrationStats};
use crate::store::{Datastore, RecordId};

/// Field name used for per-row datastore errors.
pub const WRITE_ERROR_FIELD: &str = "record";

/// What happened to one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum RowOutcome {
    /// A new record was inserted.
    Inserted(RecordId),
    /// An existing record with the same dedup key was updated.
    Updated(RecordId),
    /// The row was not written.
    Skipped(SmallVec<[FieldError; 4]>),
}

/// The outcome of one row, with its dump position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowReport {
    /// Where the row is in the dump.
    pub position: RowPosition,
    /// What happened to it.
    pub outcome: RowOutcome,
}

/// Running totals of a migration, folded from [`RowReport`]s.
///
/// # Examples
///
/// ```
/// use hm_core::{FieldError, FieldErrorKind, RowPosition};
/// use hm_engine::{MigrationTally, RowOutcome, RowReport};
///
/// let reports = [
///     RowReport { position: RowPosition::new(1, 1, 1, 1), outcome: RowOutcome::Inserted(1) },
///     RowReport {
///         position: RowPosition::new(2, 1, 2, 1),
///         outcome: RowOutcome::Skipped([FieldError::new("first_name", FieldErrorKind::Required)].into_iter().collect()),
///     },
/// ];
///
/// let tally = reports.iter().fold(MigrationTally::default(), MigrationTally::record);
/// let result = tally.into_result(true, Vec::new());
/// assert_eq!((result.records_inserted, result.records_skipped), (1, 1));
/// assert!(!result.success);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationTally {
    /// Rows inserted.
    pub inserted: u64,
    /// Rows that updated an existing record.
    pub updated: u64,
    /// Rows skipped.
    pub skipped: u64,
    /// Errors of skipped rows, in file order.
    pub per_row_errors: Vec<RowError>,
}

impl MigrationTally {
    /// Folds one report into the totals.
    #[must_use]
    pub fn record(mut self, report: &RowReport) -> Self {
        match &report.outcome {
            RowOutcome::Inserted(_) => self.inserted += 1,
            RowOutcome::Updated(_) => self.updated += 1,
            RowOutcome::Skipped(errors) => {
                self.skipped += 1;
                self.per_row_errors
                    .push(RowError::new(report.position, errors.iter().cloned()));
            }
        }
        self
    }

    /// Rows folded so far.
    #[inline]
    #[must_use]
    pub const fn processed(&self) -> u64 {
        self.inserted + self.updated + self.skipped
    }

    /// Finalizes the totals. `success` requires a completed run with no
    /// skipped rows.
    #[must_use]
    pub fn into_result(self, completed: bool, malformed_rows: Vec<ParseIssue>) -> MigrationResult {
        MigrationResult {
            success: completed && self.skipped == 0,
            completed,
            records_inserted: self.inserted,
            records_updated: self.updated,
            records_skipped: self.skipped,
            per_row_errors: self.per_row_errors,
            malformed_rows,
        }
    }
}

/// Progress messages of [`MigrationEngine::execute_streaming`](crate::MigrationEngine::execute_streaming).
#[derive(Debug, Clone)]
pub enum MigrationUpdate {
    /// Sent once, after the prepare phase.
    Started {
        /// Table being migrated.
        source_table: String,
        /// Rows that will be processed.
        rows: usize,
        /// Malformed tuples excluded from the run.
        malformed: usize,
    },

    /// One row was handled.
    Row(RowReport),

    /// Counter snapshot, every `progress_interval` rows.
    Progress(MigrationSnapshot),

    /// The run finished.
    Complete(Box<MigrationResult>),
}

/// A row after the prepare phase.
#[derive(Debug)]
enum Candidate {
    Valid {
        position: RowPosition,
        record: Record,
        key: DedupKey,
    },
    Invalid {
        position: RowPosition,
        errors: SmallVec<[FieldError; 4]>,
    },
}

impl Candidate {
    fn build(plan: &MigrationPlan, validator: &Validator, row: &SourceRow) -> Self {
        let position = row.position;
        let projected = plan.project(row);
        let record = match validator.check(&projected) {
            Ok(record) => record,
            Err(errors) => {
                return Self::Invalid {
                    position,
                    errors: errors.into_iter().collect(),
                };
            }
        };

        let schema = validator.schema();
        match dedup_key(schema, &record) {
            Some(key) => Self::Valid {
                position,
                record,
                key,
            },
            None => Self::Invalid {
                position,
                errors: schema
                    .dedup_key
                    .iter()
                    .filter(|name| record.get(**name).is_none_or(|v| v.is_blank()))
                    .map(|name| FieldError::new(*name, FieldErrorKind::Required))
                    .collect(),
            },
        }
    }
}

/// Output of the prepare phase.
#[derive(Debug)]
pub(crate) struct Prepared {
    source_table: String,
    candidates: Vec<Candidate>,
    malformed: Vec<ParseIssue>,
}

/// Parses `text` and prepares every row of the plan's source table.
pub(crate) fn prepare(
    text: &str,
    plan: &MigrationPlan,
    validator: &Validator,
    parallel: bool,
) -> Result<Prepared, EngineError> {
    let mut rows = Vec::new();
    let mut issues = Vec::new();
    let mut tables: Vec<String> = Vec::new();
    for item in DumpParser::new(text) {
        let table = match &item {
            Ok(row) => Some(&*row.table),
            Err(issue) => issue.table.as_deref(),
        };
        if let Some(table) = table {
            if !tables.iter().any(|t| t.eq_ignore_ascii_case(table)) {
                tables.push(table.to_owned());
            }
        }
        match item {
            Ok(row) => rows.push(row),
            Err(issue) => issues.push(issue),
        }
    }

    let source_table = match &plan.source_table {
        Some(wanted) => tables
            .iter()
            .find(|t| plan.reads_table(t))
            .cloned()
            .ok_or_else(|| EngineError::SourceTableNotFound {
                table: wanted.clone(),
                available: tables.clone(),
            })?,
        None => rows
            .first()
            .map(|row| row.table.to_string())
            .or_else(|| tables.first().cloned())
            .unwrap_or_default(),
    };

    rows.retain(|row| row.table.eq_ignore_ascii_case(&source_table));
    issues.retain(|issue| issue.table.is_none() || issue.is_for_table(&source_table));

    let candidates = if parallel {
        rows.par_iter()
            .map(|row| Candidate::build(plan, validator, row))
            .collect()
    } else {
        rows.iter()
            .map(|row| Candidate::build(plan, validator, row))
            .collect()
    };

    Ok(Prepared {
        source_table,
        candidates,
        malformed: issues,
    })
}

/// Per-run settings shared by every row.
#[derive(Debug)]
pub(crate) struct RunContext<'a, S: ?Sized> {
    pub(crate) store: &'a S,
    pub(crate) locks: &'a KeyLocks,
    pub(crate) target: TargetKind,
    pub(crate) scope: Option<&'a str>,
    pub(crate) actor: &'a str,
    pub(crate) progress_interval: u64,
}

/// A migration in progress, yielding one [`RowReport`] per row.
///
/// Created by [`MigrationEngine::start`](crate::MigrationEngine::start).
/// Each call to `next` writes at most one row. A fatal datastore error is
/// yielded once as `Err`, after which the iterator is exhausted.
///
/// Every run counts into its own [`MigrationStats`], so concurrent runs on
/// clones of one engine never mix their progress.
#[derive(Debug)]
pub struct MigrationRun<'a, S: ?Sized> {
    ctx: RunContext<'a, S>,
    stats: Arc<MigrationStats>,
    source_table: String,
    candidates: std::vec::IntoIter<Candidate>,
    malformed: Vec<ParseIssue>,
    tally: MigrationTally,
    halted: Option<String>,
}

impl<'a, S: Datastore + ?Sized> MigrationRun<'a, S> {
    pub(crate) fn new(ctx: RunContext<'a, S>, prepared: Prepared) -> Self {
        let Prepared {
            source_table,
            candidates,
            malformed,
        } = prepared;

        let stats = Arc::new(MigrationStats::new());
        stats.set_total(candidates.len() as u64);
        stats.set_malformed(malformed.len() as u64);
        info!(
            source_table = %source_table,
            target = %ctx.target,
            rows = candidates.len(),
            malformed = malformed.len(),
            scope = ctx.scope.unwrap_or("-"),
            actor = ctx.actor,
            "Starting migration"
        );

        Self {
            ctx,
            stats,
            source_table,
            candidates: candidates.into_iter(),
            malformed,
            tally: MigrationTally::default(),
            halted: None,
        }
    }

    /// The table being migrated.
    #[inline]
    #[must_use]
    pub fn source_table(&self) -> &str {
        &self.source_table
    }

    /// Malformed tuples excluded from the run.
    #[inline]
    #[must_use]
    pub fn malformed(&self) -> &[ParseIssue] {
        &self.malformed
    }

    /// Rows not yet handled.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.candidates.len()
    }

    /// Totals so far.
    #[inline]
    #[must_use]
    pub const fn tally(&self) -> &MigrationTally {
        &self.tally
    }

    /// Progress counters of this run; clone the `Arc` to watch from another
    /// thread.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> &Arc<MigrationStats> {
        &self.stats
    }

    /// Ends the run and builds its result.
    ///
    /// A run that was not iterated to the end is reported with
    /// `completed = false`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DatastoreConnection`], carrying the partial
    /// result, if the run stopped on a fatal datastore error.
    pub fn finish(self) -> Result<MigrationResult, EngineError> {
        let completed = self.halted.is_none() && self.candidates.len() == 0;
        let result = self.tally.into_result(completed, self.malformed);

        info!(
            source_table = %self.source_table,
            inserted = result.records_inserted,
            updated = result.records_updated,
            skipped = result.records_skipped,
            malformed = result.malformed_rows.len(),
            completed = result.completed,
            success = result.success,
            "Migration finished"
        );

        match self.halted {
            Some(message) => Err(EngineError::DatastoreConnection {
                message,
                partial: Box::new(result),
            }),
            None => Ok(result),
        }
    }

    /// Looks the key up and writes the row, holding the key lock throughout.
    fn write(&self, record: &Record, key: &DedupKey) -> Result<RowOutcome, StoreError> {
        let ctx = &self.ctx;
        let _guard = ctx.locks.lock(ctx.target, ctx.scope, key);
        match ctx.store.find_by_key(ctx.target, ctx.scope, key)? {
            Some(id) => {
                ctx.store.update(ctx.target, id, record, ctx.actor)?;
                Ok(RowOutcome::Updated(id))
            }
            None => ctx
                .store
                .insert(ctx.target, ctx.scope, record, ctx.actor)
                .map(RowOutcome::Inserted),
        }
    }

    fn observe(&mut self, report: &RowReport) {
        match &report.outcome {
            RowOutcome::Inserted(id) => {
                self.stats.increment_inserted();
                debug!(position = %report.position, id, "Inserted");
            }
            RowOutcome::Updated(id) => {
                self.stats.increment_updated();
                debug!(position = %report.position, id, "Updated");
            }
            RowOutcome::Skipped(errors) => {
                self.stats.increment_skipped();
                let fields: SmallVec<[&str; 4]> = errors.iter().map(|e| e.field.as_str()).collect();
                warn!(position = %report.position, fields = ?fields, "Skipped row");
            }
        }

        self.tally = mem::take(&mut self.tally).record(report);
        let processed = self.tally.processed();
        if self.ctx.progress_interval > 0 && processed % self.ctx.progress_interval == 0 {
            info!(
                processed,
                total = processed + self.candidates.len() as u64,
                "Migration progress"
            );
        }
    }
}

impl<S: Datastore + ?Sized> Iterator for MigrationRun<'_, S> {
    type Item = Result<RowReport, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.halted.is_some() {
            return None;
        }

        let outcome = match self.candidates.next()? {
            Candidate::Invalid { position, errors } => RowReport {
                position,
                outcome: RowOutcome::Skipped(errors),
            },
            Candidate::Valid {
                position,
                record,
                key,
            } => match self.write(&record, &key) {
                Ok(outcome) => RowReport { position, outcome },
                Err(e) if e.is_recoverable() => {
                    warn!(position = %position, key = %key, error = %e, "Datastore rejected row");
                    RowReport {
                        position,
                        outcome: RowOutcome::Skipped(smallvec![FieldError::new(
                            WRITE_ERROR_FIELD,
                            FieldErrorKind::Write {
                                message: e.to_string(),
                            },
                        )]),
                    }
                }
                Err(e) => {
                    error!(position = %position, error = %e, "Datastore failure, stopping run");
                    self.halted = Some(e.to_string());
                    return Some(Err(e));
                }
            },
        };

        self.observe(&outcome);
        Some(Ok(outcome))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.halted.is_some() {
            (0, Some(0))
        } else {
            (0, Some(self.candidates.len()))
        }
    }
}

impl<S: Datastore + ?Sized> FusedIterator for MigrationRun<'_, S> {}

#[cfg(test)]
mod tests {
    use hm_core::FieldMapping;
    use hm_schema::PATIENTS;

    use super::*;

    fn plan() -> MigrationPlan {
        MigrationPlan::new(
            TargetKind::Patients,
            FieldMapping::new()
                .with("first_name", "fname")
                .with("last_name", "lname")
                .with("identification_card_number", "icn"),
        )
    }

    fn validator() -> &'static Validator {
        Validator::for_target(TargetKind::Patients).unwrap()
    }

    #[test]
    fn test_prepare_selects_rows_and_issues() {
        let dump = "\
INSERT INTO other (a) VALUES (1), ();
INSERT INTO legacy_patients (fname, lname, icn) VALUES
  ('Ann', 'Lee', '1234567890123456'),
  ('Bo', 'Ng', 'bad-icn'),
  ('Cy', 'Oh');
";
        let prepared = prepare(dump, &plan().with_source_table("legacy_patients"), validator(), true)
            .unwrap();

        assert_eq!(prepared.source_table, "legacy_patients");
        assert_eq!(prepared.candidates.len(), 2);
        assert_eq!(prepared.malformed.len(), 1);
        assert!(matches!(prepared.candidates[0], Candidate::Valid { .. }));
        let Candidate::Invalid { errors, .. } = &prepared.candidates[1] else {
            panic!("expected invalid candidate");
        };
        assert_eq!(errors[0].field, "identification_card_number");
    }

    #[test]
    fn test_prepare_parallel_keeps_file_order() {
        let tuples: Vec<String> = (0..200)
            .map(|i| format!("('F{i}', 'L{i}', '{i:016}')"))
            .collect();
        let dump = format!(
            "INSERT INTO p (fname, lname, icn) VALUES {};",
            tuples.join(", ")
        );

        let prepared = prepare(&dump, &plan(), validator(), true).unwrap();
        let rows: Vec<u32> = prepared
            .candidates
            .iter()
            .map(|c| match c {
                Candidate::Valid { position, .. } | Candidate::Invalid { position, .. } => {
                    position.row
                }
            })
            .collect();
        assert_eq!(rows, (1..=200).collect::<Vec<_>>());
    }

    #[test]
    fn test_prepare_unknown_source_table() {
        let err = prepare(
            "INSERT INTO p (fname) VALUES ('a');",
            &plan().with_source_table("patients"),
            validator(),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::SourceTableNotFound { .. }));
    }

    #[test]
    fn test_candidate_key_uses_coerced_record() {
        let row = SourceRow::new(
            "p".into(),
            vec!["fname".to_owned(), "lname".to_owned(), "icn".to_owned()].into(),
            vec![
                "Ann".into(),
                "Lee".into(),
                hm_core::Value::Integer(1_234_567_890_123_456),
            ],
            RowPosition::new(1, 1, 1, 1),
        );
        let Candidate::Valid { key, record, .. } = Candidate::build(&plan(), validator(), &row)
        else {
            panic!("expected valid candidate");
        };
        assert_eq!(key.to_string(), "1234567890123456");
        assert_eq!(dedup_key(&PATIENTS, &record), Some(key));
    }

    #[test]
    fn test_tally_success_rule() {
        let inserted = RowReport {
            position: RowPosition::new(1, 1, 1, 1),
            outcome: RowOutcome::Inserted(1),
        };
        let result = MigrationTally::default()
            .record(&inserted)
            .into_result(true, Vec::new());
        assert!(result.success);

        let result = MigrationTally::default()
            .record(&inserted)
            .into_result(false, Vec::new());
        assert!(!result.success);
        assert!(!result.completed);
    }

    #[test]
    fn test_row_report_serializes() {
        let report = RowReport {
            position: RowPosition::new(2, 1, 2, 3),
            outcome: RowOutcome::Updated(7),
        };
        insta::assert_snapshot!(
            serde_json::to_string(&report).unwrap(),
            @r#"{"position":{"row":2,"statement":1,"tuple":2,"line":3},"outcome":{"outcome":"updated","detail":7}}"#
        );
    }
}
