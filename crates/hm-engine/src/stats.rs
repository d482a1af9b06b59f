//! Migration progress counters.
//!
//! Each [`MigrationRun`](crate::MigrationRun) owns one [`MigrationStats`],
//! updated as rows are written. Counters use relaxed atomics: they feed progress
//! display, while the authoritative counts live in the returned
//! [`MigrationResult`](hm_core::MigrationResult).

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Atomic counters for the current migration run.
///
/// # Examples
///
/// ```
/// use hm_engine::MigrationStats;
///
/// let stats = MigrationStats::new();
/// stats.set_total(4);
/// stats.increment_inserted();
/// stats.increment_skipped();
///
/// let snap = stats.snapshot();
/// assert_eq!(snap.processed(), 2);
/// assert!((snap.progress_percent() - 50.0).abs() < 0.1);
/// ```
#[derive(Debug, Default)]
pub struct MigrationStats {
    /// Rows selected for the run.
    total: AtomicU64,
    inserted: AtomicU64,
    updated: AtomicU64,
    skipped: AtomicU64,
    /// Malformed tuples reported by the parse pass.
    malformed: AtomicU64,
}

impl MigrationStats {
    /// Creates zeroed counters.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of rows the run will process.
    #[inline]
    pub fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
    }

    /// Sets the malformed-row count.
    #[inline]
    pub fn set_malformed(&self, malformed: u64) {
        self.malformed.store(malformed, Ordering::Relaxed);
    }

    /// Increments the inserted counter.
    #[inline]
    pub fn increment_inserted(&self) {
        self.inserted.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the updated counter.
    #[inline]
    pub fn increment_updated(&self) {
        self.updated.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the skipped counter.
    #[inline]
    pub fn increment_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of the counters.
    #[must_use]
    pub fn snapshot(&self) -> MigrationSnapshot {
        MigrationSnapshot {
            total: self.total.load(Ordering::Relaxed),
            inserted: self.inserted.load(Ordering::Relaxed),
            updated: self.updated.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time view of [`MigrationStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MigrationSnapshot {
    /// Rows selected for the run.
    pub total: u64,
    /// Rows inserted so far.
    pub inserted: u64,
    /// Rows that updated an existing record so far.
    pub updated: u64,
    /// Rows skipped so far.
    pub skipped: u64,
    /// Malformed tuples from the parse pass.
    pub malformed: u64,
}

impl MigrationSnapshot {
    /// Rows handled so far.
    #[inline]
    #[must_use]
    pub const fn processed(&self) -> u64 {
        self.inserted + self.updated + self.skipped
    }

    /// Share of selected rows handled so far. `100.0` for an empty run.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Acceptable for progress display
    pub fn progress_percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.processed() as f64 / self.total as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts() {
        let stats = MigrationStats::new();
        stats.set_total(10);
        stats.set_malformed(2);
        stats.increment_inserted();
        stats.increment_updated();
        stats.increment_updated();

        let snap = stats.snapshot();
        assert_eq!(snap.processed(), 3);
        assert_eq!(snap.malformed, 2);
        assert!((snap.progress_percent() - 30.0).abs() < 0.1);
        assert_eq!(MigrationStats::new().snapshot(), MigrationSnapshot::default());
    }

    #[test]
    fn test_empty_run_is_complete() {
        assert!((MigrationSnapshot::default().progress_percent() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_snapshot_serializes() {
        let snap = MigrationSnapshot {
            total: 2,
            inserted: 1,
            updated: 0,
            skipped: 1,
            malformed: 0,
        };
        insta::assert_snapshot!(
            serde_json::to_string(&snap).unwrap(),
            @r#"{"total":2,"inserted":1,"updated":0,"skipped":1,"malformed":0}"#
        );
    }
}
