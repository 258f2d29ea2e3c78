//! Function and macro definitions.
//!
//! picoc never builds a separate AST: a function's body is just the token
//! span between its opening and closing brace, re-parsed from scratch on
//! every call (spec 4.9, "Control Flow and Re-entry"). We keep that shape -
//! `FunctionDef::body` is a reference-counted token vector sliced out once
//! at definition time - rather than building any intermediate
//! representation.
//!
//! A `Value` of base kind `Function` or `Macro` stores a `FunctionId`
//! (`u64`, zero-extended into the arena slot) rather than the definition
//! itself, so `picoc-runtime` never has to know what a `Token` is; this
//! table is the other half of that split, owned by the layer that *does*
//! know (`picoc-interp`).

use crate::lexer::Token;
use picoc_core::Atom;
use picoc_runtime::{PicocResult, TypeId, Value};
use std::rc::Rc;

pub type FunctionId = u32;

/// A native ("intrinsic") function backing a library call, e.g. `printf`.
/// Takes the already-evaluated argument values and returns the call's
/// result (spec 4.10, Library Bridge).
pub type NativeFn = fn(&mut crate::ctx::Ctx, &[Value]) -> PicocResult<Value>;

pub struct Param {
    pub name: Atom,
    pub ty: TypeId,
}

pub enum FunctionKind {
    /// A user-defined C function: re-parse `body` under a fresh stack frame
    /// on every call.
    Normal { body: Rc<Vec<Token>>, is_variadic: bool },
    /// A library function implemented in Rust.
    Intrinsic(NativeFn),
    /// A `#define NAME(params) expr` or `#define NAME expr` macro. Evaluated
    /// like a call-by-value inline function: arguments are evaluated once,
    /// bound (via `FunctionDef::params`, the same field a normal function
    /// uses) in a fresh scope, and `body` (a single expression's tokens) is
    /// evaluated in that scope - picoc macros are expression-valued, not a
    /// textual substitution pass.
    Macro { body: Rc<Vec<Token>> },
    /// `int f(int);` - a forward declaration with no body yet. Recorded so
    /// the parser can tell "previously just prototyped" apart from
    /// "previously fully defined" when it later sees `name(...)` again.
    Prototype { is_variadic: bool },
}

pub struct FunctionDef {
    pub name: Atom,
    pub params: Vec<Param>,
    pub return_type: TypeId,
    pub kind: FunctionKind,
}

impl FunctionDef {
    pub fn is_macro(&self) -> bool {
        matches!(self.kind, FunctionKind::Macro { .. })
    }

    pub fn is_prototype(&self) -> bool {
        matches!(self.kind, FunctionKind::Prototype { .. })
    }
}

/// All function and macro definitions the interpreter knows about, indexed
/// by `FunctionId`. Definitions themselves are never removed; `delete` only
/// removes the symbol-table entry pointing at one.
#[derive(Default)]
pub struct FunctionTable {
    defs: Vec<FunctionDef>,
}

impl FunctionTable {
    pub fn new() -> Self {
        FunctionTable { defs: Vec::new() }
    }

    pub fn register(&mut self, def: FunctionDef) -> FunctionId {
        let id = self.defs.len() as u32;
        self.defs.push(def);
        id
    }

    pub fn get(&self, id: FunctionId) -> &FunctionDef {
        &self.defs[id as usize]
    }
}
