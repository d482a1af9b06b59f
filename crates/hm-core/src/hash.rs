//! Fast hash map and hash set type aliases.
//!
//! The engine keys its indexes by short strings (column names, dedup keys),
//! where the Fx hash from `rustc-hash` is considerably faster than SipHash.
//! None of these maps are exposed to untrusted input sizes large enough for
//! hash flooding to matter.
//!
//! # Examples
//!
//! ```
//! use hm_core::{FxHashMap, fx_hash_map};
//!
//! let mut columns: FxHashMap<&str, usize> = fx_hash_map();
//! columns.insert("fname", 0);
//! assert_eq!(columns.get("fname"), Some(&0));
//! ```

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A [`HashSet`](std::collections::HashSet) using the Fx hash algorithm.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;

/// Creates a new empty [`FxHashMap`].
#[inline]
#[must_use]
pub fn fx_hash_map<K, V>() -> FxHashMap<K, V> {
    FxHashMap::default()
}

/// Creates a new empty [`FxHashSet`].
#[inline]
#[must_use]
pub fn fx_hash_set<V>() -> FxHashSet<V> {
    FxHashSet::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fx_hash_set_deduplicates() {
        let mut set: FxHashSet<&str> = fx_hash_set();
        assert!(set.insert("icn"));
        assert!(!set.insert("icn"));
        assert_eq!(set.len(), 1);
    }
}
