//! The interpreter's root context: everything a running program needs,
//! bundled so `expr`/`parser`/`library` don't have to thread four separate
//! parameters through every call.

use crate::func::FunctionTable;
use crate::library::LibraryRegistry;
use picoc_core::{Atom, Table};
use picoc_runtime::{InterpreterState, TypeId};

pub struct Ctx {
    pub state: InterpreterState,
    pub functions: FunctionTable,
    pub library: LibraryRegistry,
    /// `typedef` names, kept separate from `state.globals` since they name
    /// types rather than values and the statement parser needs to test for
    /// one (`looks_like_type_name`) without disturbing variable lookup.
    pub typedefs: Table<Atom, TypeId>,
}

impl Ctx {
    pub fn new(state: InterpreterState) -> Self {
        Ctx { state, functions: FunctionTable::new(), library: LibraryRegistry::new(), typedefs: Table::new() }
    }
}
