//! Variable / scope manager: monotonically increasing scope ids, a stack of
//! lexical-scope symbol tables, and the lookup order (innermost scope out
//! to the global table) that backs identifier resolution.

use crate::symbol_table::{SymbolEntry, SymbolTable};
use picoc_core::Atom;

pub type ScopeId = u32;

struct Scope {
    id: ScopeId,
    table: SymbolTable,
}

/// Owns the stack of lexical scopes. The global table is *not* part of this
/// stack - it lives on `InterpreterState` and lookup falls through to it
/// only after every local scope has been searched.
pub struct ScopeManager {
    next_id: ScopeId,
    scopes: Vec<Scope>,
}

impl Default for ScopeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeManager {
    pub fn new() -> Self {
        ScopeManager { next_id: 0, scopes: Vec::new() }
    }

    /// `ScopeBegin`: push a new scope, minting a fresh id.
    pub fn begin(&mut self) -> ScopeId {
        self.next_id += 1;
        let id = self.next_id;
        self.scopes.push(Scope { id, table: SymbolTable::new() });
        id
    }

    /// `ScopeEnd`: destroy every variable in the current scope and restore
    /// the previous one. Panics if called with no scope open - that would
    /// be a statement-parser bug (block exit without matching entry).
    pub fn end(&mut self) {
        self.scopes.pop().expect("ScopeEnd with no scope open");
    }

    pub fn current_id(&self) -> Option<ScopeId> {
        self.scopes.last().map(|s| s.id)
    }

    pub fn current(&mut self) -> &mut SymbolTable {
        &mut self.scopes.last_mut().expect("no scope open").table
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Walk from the innermost scope outward, without falling through to
    /// the global table (callers append that themselves).
    pub fn lookup_local(&self, name: Atom) -> Option<&SymbolEntry> {
        self.scopes.iter().rev().find_map(|s| s.table.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Pos;
    use crate::types::{BaseKind, TypeTable};
    use crate::value::{Value, ValueFlags};
    use picoc_core::{Arena, Interner};

    #[test]
    fn inner_scope_shadows_outer() {
        let mut interner = Interner::new();
        let mut types = TypeTable::new();
        let mut arena = Arena::new(64);
        let int_ty = types.primitive(BaseKind::Int);
        let name = interner.register("x");

        let mut mgr = ScopeManager::new();
        mgr.begin();
        let outer_addr = arena.alloc_stack(4, 4).unwrap();
        mgr.current().set(name, Value::new(int_ty, outer_addr, ValueFlags::default()), Pos::default());

        mgr.begin();
        let inner_addr = arena.alloc_stack(4, 4).unwrap();
        mgr.current().set(name, Value::new(int_ty, inner_addr, ValueFlags::default()), Pos::default());

        assert_eq!(mgr.lookup_local(name).unwrap().value.addr, inner_addr);
        mgr.end();
        assert_eq!(mgr.lookup_local(name).unwrap().value.addr, outer_addr);
        mgr.end();
        assert!(mgr.lookup_local(name).is_none());
    }

    #[test]
    fn scope_ids_increase_monotonically() {
        let mut mgr = ScopeManager::new();
        let a = mgr.begin();
        let b = mgr.begin();
        assert!(b > a);
    }
}
