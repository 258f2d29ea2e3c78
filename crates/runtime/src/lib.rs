//! picoc-runtime: `InterpreterState`, the `Value`/`ValueType` model,
//! symbol tables, the scope manager, and the fatal-error type.
//!
//! This crate knows what a C value and a C type are, but nothing about
//! tokens, syntax, or evaluation - that's `picoc-interp`, built on top of
//! this one.

pub mod error;
pub mod frame;
pub mod scope;
pub mod state;
pub mod symbol_table;
pub mod types;
pub mod value;

pub use error::{Fatal, PicocResult, Pos};
pub use frame::StackFrame;
pub use scope::{ScopeId, ScopeManager};
pub use state::{InterpreterState, Io, DEFAULT_STACK_SIZE};
pub use symbol_table::{define_static_ignore_identical, SymbolEntry, SymbolTable};
pub use types::{BaseKind, Member, TypeError, TypeId, TypeTable, POINTER_ALIGN, POINTER_SIZE};
pub use value::{Value, ValueFlags};
