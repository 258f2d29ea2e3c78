//! The library bridge: registers native (Rust-implemented) functions under
//! a header name, and wires `#include` / `IncludeAllSystemHeaders` to make
//! them callable from interpreted code.
//!
//! `picoc-stdlib` is the only other crate that builds `Include` values;
//! this module just stores and activates them. A header can also carry a
//! `prelude_c` string - small C source (`typedef`s, `#define`d constants)
//! parsed into the running program the first time the header is included,
//! matching picoc's `SetupCLibrary`-plus-hand-written-typedefs pattern.

use crate::ctx::Ctx;
use crate::func::{FunctionKind, NativeFn, Param};
use picoc_runtime::{BaseKind, Fatal, PicocResult, Pos};

/// A native function's declared parameter/return shape. Primitive kinds
/// come straight from `BaseKind`; `Ptr` canonicalises to a pointer-to-that-
/// primitive type, covering the `char *`/`void *`/`FILE *`-shaped
/// signatures most of the library headers need (`printf`'s format string,
/// `memcpy`'s buffers, `fopen`'s returned handle). Never enforced against
/// the arguments an intrinsic actually receives - `call_function` hands an
/// `Intrinsic` its raw evaluated `Value`s - so this only has to be
/// faithful enough for `FunctionDef::params` to describe the call
/// correctly to anything that introspects it (`sizeof`, prototype checks).
#[derive(Clone, Copy)]
pub enum ParamKind {
    Prim(BaseKind),
    Ptr(BaseKind),
}

pub struct NativeFnSpec {
    pub name: &'static str,
    pub param_kinds: &'static [ParamKind],
    pub return_kind: ParamKind,
    pub is_variadic: bool,
    pub func: NativeFn,
}

pub struct Include {
    pub name: &'static str,
    pub setup: Option<fn(&mut Ctx) -> PicocResult<()>>,
    pub functions: Vec<NativeFnSpec>,
    pub prelude_c: Option<&'static str>,
}

pub struct LibraryRegistry {
    includes: Vec<Include>,
    included: Vec<bool>,
}

impl Default for LibraryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LibraryRegistry {
    pub fn new() -> Self {
        LibraryRegistry { includes: Vec::new(), included: Vec::new() }
    }

    /// `picoc-stdlib` calls this once per header at startup, before
    /// `Initialize` hands control to the CLI.
    pub fn register(&mut self, include: Include) {
        self.includes.push(include);
        self.included.push(false);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.includes.iter().map(|i| i.name).collect()
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.includes.iter().position(|i| i.name == name)
    }

    /// `IncludeAllSystemHeaders`: include every registered header, in the
    /// order `picoc-stdlib` registered them.
    pub fn include_all(ctx: &mut Ctx) -> PicocResult<()> {
        let names = ctx.library.names();
        for name in names {
            LibraryRegistry::include(ctx, name)?;
        }
        Ok(())
    }

    /// `#include <name.h>`. Idempotent: re-including an already-included
    /// header is a no-op, matching picoc's header guard behaviour.
    pub fn include(ctx: &mut Ctx, name: &str) -> PicocResult<()> {
        let Some(idx) = ctx.library.find(name) else {
            return Err(Fatal::new(String::new(), Pos::default(), format!("unknown library '{name}'")));
        };
        if ctx.library.included[idx] {
            return Ok(());
        }
        ctx.library.included[idx] = true;

        if let Some(setup) = ctx.library.includes[idx].setup {
            setup(ctx)?;
        }

        let functions = std::mem::take(&mut ctx.library.includes[idx].functions);
        for spec in &functions {
            register_native(ctx, spec)?;
        }
        ctx.library.includes[idx].functions = functions;

        if let Some(prelude) = ctx.library.includes[idx].prelude_c {
            crate::api::parse(ctx, &format!("<{name}>"), prelude)?;
        }
        Ok(())
    }
}

fn resolve_param_kind(ctx: &mut Ctx, kind: ParamKind) -> picoc_runtime::TypeId {
    match kind {
        ParamKind::Prim(base) => ctx.state.types.primitive(base),
        ParamKind::Ptr(base) => {
            let elem = ctx.state.types.primitive(base);
            ctx.state.types.pointer_to(elem)
        }
    }
}

fn register_native(ctx: &mut Ctx, spec: &NativeFnSpec) -> PicocResult<()> {
    let name = ctx.state.interner.register(spec.name);
    let params = spec
        .param_kinds
        .iter()
        .enumerate()
        .map(|(i, kind)| {
            let pname = ctx.state.interner.register(&format!("a{i}"));
            Param { name: pname, ty: resolve_param_kind(ctx, *kind) }
        })
        .collect();
    let return_type = resolve_param_kind(ctx, spec.return_kind);
    let fn_ty = ctx.state.types.get_matching(None, BaseKind::Function, None, None, true).expect("function types always canonicalize");
    let id = ctx.functions.register(crate::func::FunctionDef {
        name,
        params,
        return_type,
        kind: FunctionKind::Intrinsic(spec.func),
    });
    let addr = ctx
        .state
        .arena
        .alloc_heap(8, 8)
        .ok_or_else(|| Fatal::new(String::new(), Pos::default(), format!("arena exhausted registering native function '{}'", spec.name)))?;
    let value = picoc_runtime::Value::new(fn_ty, addr, picoc_runtime::ValueFlags { outside_function: true, ..Default::default() });
    value.write_addr(&mut ctx.state.arena, id as u64);
    ctx.state.globals.set(name, value, Pos::default());
    Ok(())
}
