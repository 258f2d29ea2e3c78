//! picoc-interp: the lexer, expression evaluator, statement parser/
//! evaluator, library bridge, and the public entry points built on top of
//! `picoc-runtime`'s data model.
//!
//! This is the crate that knows what a `Token` is; everything below it in
//! the dependency order (`picoc-core`, `picoc-runtime`) stays ignorant of
//! syntax so it can be exercised without a lexer or parser in its tests.

pub mod api;
pub mod ctx;
pub mod expr;
pub mod func;
pub mod lexer;
pub mod library;
pub mod parser;

pub use api::{call_main, cleanup, include_all_system_headers, initialize, parse, parse_interactive, platform_scan_file, set_exit_point};
pub use ctx::Ctx;
pub use func::{FunctionDef, FunctionId, FunctionKind, FunctionTable, NativeFn, Param};
pub use lexer::{lex, Token, TokenKind};
pub use library::{Include, LibraryRegistry, NativeFnSpec, ParamKind};
pub use parser::RunMode;
