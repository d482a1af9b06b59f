//! Per-key write serialization.
//!
//! The find-then-write step for one dedup key must not interleave with
//! another writer on the same key, or two concurrent runs importing the same
//! patient would both miss the lookup and both insert. [`KeyLocks`] hands
//! out a guard per `(target, scope, key)`; writers on different keys never
//! wait on each other.

use parking_lot::{Condvar, Mutex};

use hm_core::{FxHashSet, TargetKind, fx_hash_set};
use hm_schema::DedupKey;

type LockKey = (TargetKind, Option<String>, DedupKey);

/// A set of held dedup keys.
///
/// A datastore hands its set out through
/// [`Datastore::key_locks`](crate::Datastore::key_locks), so concurrent runs
/// against it serialize on common keys whichever engine drives them.
///
/// # Examples
///
/// ```
/// use hm_core::{Record, TargetKind, Value};
/// use hm_engine::KeyLocks;
/// use hm_schema::{PATIENTS, dedup_key};
///
/// let mut record = Record::new();
/// record.insert("identification_card_number".into(), Value::from("1234567890123456"));
/// let key = dedup_key(&PATIENTS, &record).unwrap();
///
/// let locks = KeyLocks::new();
/// {
///     let _guard = locks.lock(TargetKind::Patients, None, &key);
///     assert!(locks.is_locked(TargetKind::Patients, None, &key));
/// }
/// assert!(!locks.is_locked(TargetKind::Patients, None, &key));
/// ```
#[derive(Debug)]
pub struct KeyLocks {
    held: Mutex<FxHashSet<LockKey>>,
    released: Condvar,
}

impl Default for KeyLocks {
    fn default() -> Self {
        Self {
            held: Mutex::new(fx_hash_set()),
            released: Condvar::new(),
        }
    }
}

impl KeyLocks {
    /// Creates an empty lock set.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until `key` is free, then holds it until the guard drops.
    #[must_use = "the key is released as soon as the guard is dropped"]
    pub fn lock(&self, target: TargetKind, scope: Option<&str>, key: &DedupKey) -> KeyGuard<'_> {
        let entry = (target, scope.map(str::to_owned), key.clone());
        let mut held = self.held.lock();
        while held.contains(&entry) {
            self.released.wait(&mut held);
        }
        held.insert(entry.clone());
        KeyGuard { locks: self, entry }
    }

    /// Returns `true` if some guard currently holds `key`.
    #[must_use]
    pub fn is_locked(&self, target: TargetKind, scope: Option<&str>, key: &DedupKey) -> bool {
        let entry = (target, scope.map(str::to_owned), key.clone());
        self.held.lock().contains(&entry)
    }
}

/// Holds one key of a [`KeyLocks`] set.
#[derive(Debug)]
pub struct KeyGuard<'a> {
    locks: &'a KeyLocks,
    entry: LockKey,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.locks.held.lock().remove(&self.entry);
        self.locks.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    use hm_core::{Record, Value};
    use hm_schema::PATIENTS;

    use super::*;

    fn key(icn: &str) -> DedupKey {
        let mut r = Record::new();
        r.insert("identification_card_number".to_owned(), Value::from(icn));
        hm_schema::dedup_key(&PATIENTS, &r).unwrap()
    }

    #[test]
    fn test_distinct_keys_do_not_block() {
        let locks = KeyLocks::new();
        let _a = locks.lock(TargetKind::Patients, None, &key("1"));
        let _b = locks.lock(TargetKind::Patients, None, &key("2"));
        let _c = locks.lock(TargetKind::Patients, Some("north"), &key("1"));
        assert!(locks.is_locked(TargetKind::Patients, None, &key("2")));
    }

    #[test]
    fn test_same_key_waits_for_release() {
        let locks = Arc::new(KeyLocks::new());
        let acquired = Arc::new(AtomicBool::new(false));

        let guard = locks.lock(TargetKind::Patients, None, &key("1"));
        let handle = {
            let locks = Arc::clone(&locks);
            let acquired = Arc::clone(&acquired);
            thread::spawn(move || {
                let _guard = locks.lock(TargetKind::Patients, None, &key("1"));
                acquired.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!acquired.load(Ordering::SeqCst));
        drop(guard);
        handle.join().unwrap();
        assert!(acquired.load(Ordering::SeqCst));
        assert!(!locks.is_locked(TargetKind::Patients, None, &key("1")));
    }
}
