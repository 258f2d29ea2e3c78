//! String interning.
//!
//! Identifiers and string literals are registered once; every subsequent
//! registration of the same bytes returns the same handle. Byte comparison
//! only happens on insertion — everywhere else, equality is handle equality,
//! which is what lets the evaluator treat "same identifier" as a cheap
//! integer compare instead of a string compare.

use std::collections::HashMap;

/// A handle to an interned string. Two atoms compare equal iff the bytes
/// they were registered with compare equal — this is the "interned pointer
/// equality" invariant from the spec, expressed as a `Copy` integer instead
/// of a raw pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Atom(u32);

/// Chained hash table from byte string to `Atom`, plus the reverse table
/// for display/debugging.
pub struct Interner {
    strings: Vec<Box<str>>,
    lookup: HashMap<Box<str>, Atom>,
    empty: Atom,
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl Interner {
    pub fn new() -> Self {
        let mut interner = Interner {
            strings: Vec::new(),
            lookup: HashMap::new(),
            empty: Atom(0),
        };
        interner.empty = interner.register("");
        interner
    }

    /// The atom for the empty string, interned at construction time.
    pub fn empty(&self) -> Atom {
        self.empty
    }

    /// Register `s`, returning the existing atom if these exact bytes were
    /// already interned, or a fresh one otherwise.
    pub fn register(&mut self, s: &str) -> Atom {
        if let Some(atom) = self.lookup.get(s) {
            return *atom;
        }
        let atom = Atom(self.strings.len() as u32);
        let boxed: Box<str> = s.into();
        self.strings.push(boxed.clone());
        self.lookup.insert(boxed, atom);
        atom
    }

    /// Resolve an atom back to its string slice.
    pub fn resolve(&self, atom: Atom) -> &str {
        &self.strings[atom.0 as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_bytes_intern_to_the_same_atom() {
        let mut interner = Interner::new();
        let a = interner.register("foo");
        let b = interner.register("foo");
        assert_eq!(a, b);
        let c = interner.register("bar");
        assert_ne!(a, c);
    }

    #[test]
    fn resolves_back_to_original_bytes() {
        let mut interner = Interner::new();
        let a = interner.register("hello");
        assert_eq!(interner.resolve(a), "hello");
    }

    #[test]
    fn empty_string_is_interned_at_construction() {
        let interner = Interner::new();
        assert_eq!(interner.resolve(interner.empty()), "");
    }
}
