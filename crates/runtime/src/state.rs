//! The interpreter state: the root object every public entry point takes
//! by reference. Owns the arena, the string table, the global symbol
//! table, the type tree, the call stack, and the I/O triple; created by
//! `new` (`Initialize`), torn down by dropping it (`Cleanup` - Rust's RAII
//! already releases every table and arena allocation in reverse
//! dependency order, so there's nothing left for an explicit destructor to
//! do beyond flushing output).

use crate::frame::StackFrame;
use crate::scope::ScopeManager;
use crate::symbol_table::SymbolTable;
use crate::types::TypeTable;
use picoc_core::{Arena, Atom, Interner};
use std::io::{self, BufRead, Write};

/// Default arena size (`STACKSIZE` env var overrides this at the CLI
/// layer): 512 KiB, matching picoc's default.
pub const DEFAULT_STACK_SIZE: u32 = 512 * 1024;

pub struct Io {
    pub stdout: Box<dyn Write>,
    pub stderr: Box<dyn Write>,
    pub stdin: Box<dyn BufRead>,
}

impl Io {
    pub fn standard() -> Self {
        Io { stdout: Box::new(io::stdout()), stderr: Box::new(io::stderr()), stdin: Box::new(io::BufReader::new(io::stdin())) }
    }
}

pub struct InterpreterState {
    pub arena: Arena,
    pub interner: Interner,
    pub types: TypeTable,
    pub globals: SymbolTable,
    pub scopes: ScopeManager,
    pub frames: Vec<StackFrame>,
    /// Names of libraries registered via the library bridge
    /// (`IncludeAllSystemHeaders`); the native function tables themselves
    /// live one layer up, in `picoc-interp`'s library registry, which is
    /// what actually owns `picoc-interp::library::Library` values.
    pub registered_includes: Vec<Atom>,
    pub io: Io,
}

impl InterpreterState {
    /// `Initialize(ctx, stackSize, io)`.
    pub fn new(stack_size: u32, io: Io) -> Self {
        tracing::debug!(stack_size, "initializing interpreter state");
        InterpreterState {
            arena: Arena::new(stack_size),
            interner: Interner::new(),
            types: TypeTable::new(),
            globals: SymbolTable::new(),
            scopes: ScopeManager::new(),
            frames: Vec::new(),
            registered_includes: Vec::new(),
            io,
        }
    }

    pub fn current_frame(&self) -> Option<&StackFrame> {
        self.frames.last()
    }

    pub fn current_frame_mut(&mut self) -> Option<&mut StackFrame> {
        self.frames.last_mut()
    }

    pub fn in_function(&self) -> bool {
        !self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_has_no_frames_and_fresh_arena() {
        let state = InterpreterState::new(4096, Io::standard());
        assert!(!state.in_function());
        assert_eq!(state.arena.capacity(), 4096);
    }
}
