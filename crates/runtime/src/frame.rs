//! Stack frames: pushed on function entry, popped on return.
//!
//! `caller_cursor` is an opaque token index (meaningful only to
//! `picoc-interp`'s token cursor) rather than a typed cursor, so this crate
//! doesn't need to know what a token is - the dependency order in the spec
//! puts the Lexer strictly between the Variable/Scope Manager and the
//! Expression Evaluator, never below it.

use crate::scope::ScopeId;
use crate::value::Value;

pub struct StackFrame {
    pub params: Vec<(picoc_core::Atom, Value)>,
    pub return_value: Option<Value>,
    /// Token index to resume the caller at once this call returns.
    pub caller_cursor: u32,
    /// Scope id active when this frame was entered, so a `return` deep in
    /// nested blocks knows how many scopes to unwind.
    pub entry_scope_depth: usize,
    pub function_name: picoc_core::Atom,
    _entry_scope: ScopeId,
}

impl StackFrame {
    pub fn new(
        params: Vec<(picoc_core::Atom, Value)>,
        caller_cursor: u32,
        entry_scope_depth: usize,
        entry_scope: ScopeId,
        function_name: picoc_core::Atom,
    ) -> Self {
        StackFrame {
            params,
            return_value: None,
            caller_cursor,
            entry_scope_depth,
            function_name,
            _entry_scope: entry_scope,
        }
    }
}
