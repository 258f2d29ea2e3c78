//! picoc-core: language-agnostic arena allocator, string interner and
//! chained hash table shared by the rest of the picoc interpreter crates.
//!
//! Nothing in this crate knows about C types, tokens, or the evaluator —
//! it's the leaf layer in the dependency order (arena / string table
//! before type system / symbol tables before everything else).

pub mod arena;
pub mod interner;
pub mod table;

pub use arena::{Addr, Arena, StackMark};
pub use interner::{Atom, Interner};
pub use table::Table;
