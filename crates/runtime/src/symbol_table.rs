//! Symbol tables: the global table, each struct/union's member table (see
//! `types::TypeTable`, which keeps its own), and each lexical scope's local
//! table are all the same shape - an interned-identifier-keyed chained hash
//! table recording where a value lives and where it was declared.

use crate::error::Pos;
use crate::value::Value;
use picoc_core::{Atom, Table};

#[derive(Debug, Clone)]
pub struct SymbolEntry {
    pub value: Value,
    pub decl: Pos,
}

pub struct SymbolTable {
    table: Table<Atom, SymbolEntry>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable { table: Table::new() }
    }

    /// Insert iff `name` isn't already present in *this* table (spec:
    /// `Set(tbl, key, value, decl-coords) -> bool`).
    pub fn set(&mut self, name: Atom, value: Value, decl: Pos) -> bool {
        self.table.set(name, SymbolEntry { value, decl })
    }

    pub fn get(&self, name: Atom) -> Option<&SymbolEntry> {
        self.table.get(&name)
    }

    pub fn get_mut(&mut self, name: Atom) -> Option<&mut SymbolEntry> {
        self.table.get_mut(&name)
    }

    /// Remove and return the entry, handing ownership of its `Value` back
    /// to the caller (used by the `delete` statement).
    pub fn delete(&mut self, name: Atom) -> Option<SymbolEntry> {
        self.table.delete(&name)
    }

    pub fn contains(&self, name: Atom) -> bool {
        self.table.contains(&name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Atom, &SymbolEntry)> {
        self.table.iter()
    }
}

/// `VariableDefineButIgnoreIdentical`: first-visit detection for `static`
/// locals. `mangled_key` should be interned from `{function-name,
/// declaration-site coords}` by the caller (the statement parser, which
/// knows both). Returns `(value, first_visit)`; on a non-first visit the
/// initializer must not be re-executed by the caller.
pub fn define_static_ignore_identical(
    global: &mut SymbolTable,
    mangled_key: Atom,
    decl: Pos,
    make_value: impl FnOnce() -> Result<Value, crate::error::Fatal>,
) -> Result<(Value, bool), crate::error::Fatal> {
    if let Some(entry) = global.get(mangled_key) {
        Ok((entry.value.clone(), false))
    } else {
        let value = make_value()?;
        global.set(mangled_key, value.clone(), decl);
        Ok((value, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BaseKind, TypeTable};
    use crate::value::ValueFlags;
    use picoc_core::{Arena, Interner};

    #[test]
    fn static_initializer_runs_once() {
        let mut interner = Interner::new();
        let mut types = TypeTable::new();
        let mut arena = Arena::new(64);
        let int_ty = types.primitive(BaseKind::Int);
        let key = interner.register("counter@main:3:5");
        let mut global = SymbolTable::new();
        let mut inits = 0;
        let (v1, first) = define_static_ignore_identical(&mut global, key, Pos::default(), || {
            inits += 1;
            let addr = arena.alloc_heap(4, 4).unwrap();
            Ok(Value::new(int_ty, addr, ValueFlags::default()))
        })
        .unwrap();
        assert!(first);
        let (v2, first2) = define_static_ignore_identical(&mut global, key, Pos::default(), || {
            inits += 1;
            let addr = arena.alloc_heap(4, 4).unwrap();
            Ok(Value::new(int_ty, addr, ValueFlags::default()))
        })
        .unwrap();
        assert!(!first2);
        assert_eq!(inits, 1);
        assert_eq!(v1.addr, v2.addr);
    }
}
