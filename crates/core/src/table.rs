//! Generic chained hash table: the building block for the global symbol
//! table, every struct/union member table, and each lexical scope's local
//! table.
//!
//! Insertion never overwrites: `set` fails (returns `false`) if the key is
//! already present, matching picoc's "redefinition is an error unless the
//! previous entry was a prototype" symbol-table discipline — callers that
//! want last-write-wins (e.g. `typedef` re-declaration checks) delete first.

use std::collections::HashMap;
use std::hash::Hash;

pub struct Table<K, V> {
    entries: HashMap<K, V>,
}

impl<K, V> Default for Table<K, V> {
    fn default() -> Self {
        Table { entries: HashMap::new() }
    }
}

impl<K: Eq + Hash, V> Table<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `key -> value` iff `key` isn't already present. Returns
    /// `true` on success, `false` if the key was already there (and leaves
    /// the existing entry untouched).
    pub fn set(&mut self, key: K, value: V) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, value);
        true
    }

    /// Unconditionally insert, returning the previous value if any.
    pub fn replace(&mut self, key: K, value: V) -> Option<V> {
        self.entries.insert(key, value)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.entries.get_mut(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove and return the entry for `key`, if present.
    pub fn delete(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_does_not_overwrite() {
        let mut t: Table<&str, i32> = Table::new();
        assert!(t.set("a", 1));
        assert!(!t.set("a", 2));
        assert_eq!(t.get(&"a"), Some(&1));
    }

    #[test]
    fn delete_returns_ownership() {
        let mut t: Table<&str, String> = Table::new();
        t.set("a", "hello".to_string());
        assert_eq!(t.delete(&"a"), Some("hello".to_string()));
        assert_eq!(t.get(&"a"), None);
    }
}
