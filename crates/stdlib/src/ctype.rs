//! `<ctype.h>`: `isalpha`, `isdigit`, `isspace`, `isupper`, `islower`,
//! `toupper`, `tolower`. Grounded on spec.md §6's ctype function list;
//! implemented against Rust's own `u8`/`char` classification rather than
//! `libc`'s locale-sensitive versions, since the language subset has no
//! notion of a current locale.

use crate::helpers::int_arg;
use crate::helpers::int_result;
use picoc_interp::{Ctx, Include, NativeFnSpec, ParamKind};
use picoc_runtime::{BaseKind, PicocResult, Value};

const PREDICATE: &[ParamKind] = &[ParamKind::Prim(BaseKind::Int)];

pub fn include() -> Include {
    Include {
        name: "ctype",
        setup: None,
        functions: vec![
            NativeFnSpec { name: "isalpha", param_kinds: PREDICATE, return_kind: ParamKind::Prim(BaseKind::Int), is_variadic: false, func: isalpha },
            NativeFnSpec { name: "isdigit", param_kinds: PREDICATE, return_kind: ParamKind::Prim(BaseKind::Int), is_variadic: false, func: isdigit },
            NativeFnSpec { name: "isspace", param_kinds: PREDICATE, return_kind: ParamKind::Prim(BaseKind::Int), is_variadic: false, func: isspace },
            NativeFnSpec { name: "isupper", param_kinds: PREDICATE, return_kind: ParamKind::Prim(BaseKind::Int), is_variadic: false, func: isupper },
            NativeFnSpec { name: "islower", param_kinds: PREDICATE, return_kind: ParamKind::Prim(BaseKind::Int), is_variadic: false, func: islower },
            NativeFnSpec { name: "toupper", param_kinds: PREDICATE, return_kind: ParamKind::Prim(BaseKind::Int), is_variadic: false, func: toupper },
            NativeFnSpec { name: "tolower", param_kinds: PREDICATE, return_kind: ParamKind::Prim(BaseKind::Int), is_variadic: false, func: tolower },
        ],
        prelude_c: None,
    }
}

fn byte_arg(ctx: &Ctx, args: &[Value]) -> u8 {
    (int_arg(ctx, args, 0) & 0xff) as u8
}

fn isalpha(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let b = byte_arg(ctx, args);
    Ok(int_result(ctx, b.is_ascii_alphabetic() as i64))
}

fn isdigit(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let b = byte_arg(ctx, args);
    Ok(int_result(ctx, b.is_ascii_digit() as i64))
}

fn isspace(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let b = byte_arg(ctx, args);
    Ok(int_result(ctx, (b as char).is_ascii_whitespace() as i64))
}

fn isupper(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let b = byte_arg(ctx, args);
    Ok(int_result(ctx, b.is_ascii_uppercase() as i64))
}

fn islower(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let b = byte_arg(ctx, args);
    Ok(int_result(ctx, b.is_ascii_lowercase() as i64))
}

fn toupper(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let b = byte_arg(ctx, args);
    Ok(int_result(ctx, b.to_ascii_uppercase() as i64))
}

fn tolower(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let b = byte_arg(ctx, args);
    Ok(int_result(ctx, b.to_ascii_lowercase() as i64))
}
