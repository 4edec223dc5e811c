//! Fast hash map and hash set type aliases.
//!
//! Routing tables, mapper dispatch tables and match-id counters are all keyed
//! by short strings, which is where the Fx hash from `rustc-hash` shines.
//! None of these maps are exposed to untrusted input, so the lack of
//! denial-of-service resistance is acceptable.
//!
//! # Examples
//!
//! ```
//! use mt_core::{FxHashMap, fx_hash_map};
//!
//! let mut map: FxHashMap<String, u32> = fx_hash_map();
//! map.insert("rule-1".to_owned(), 1);
//! assert_eq!(map.get("rule-1"), Some(&1));
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
    fn test_fx_hash_map_operations() {
        let mut map: FxHashMap<&str, i32> = fx_hash_map();
        map.insert("java.annotation", 1);
        map.insert("pom.dependency", 2);
        assert_eq!(map.get("java.annotation"), Some(&1));
        assert_eq!(map.get("file.content"), None);
    }

    #[test]
    fn test_fx_hash_set_operations() {
        let mut set: FxHashSet<&str> = fx_hash_set();
        assert!(set.insert("rule-1"));
        assert!(!set.insert("rule-1"));
        assert!(set.contains("rule-1"));
    }
}
