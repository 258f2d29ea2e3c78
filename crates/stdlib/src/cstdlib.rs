//! `<stdlib.h>`: `atoi`, `atof`, `malloc`, `free`, `exit`, `rand`, `srand`,
//! `abs`. Grounded on spec.md §6's stdlib function list. `malloc`/`free`
//! bridge directly onto `picoc_core::Arena`'s own heap sub-allocator rather
//! than the host allocator, so interpreted and host-visible memory (string
//! literals, struct fields) come from the one arena spec.md's Memory Model
//! section describes; `exit` raises a `Fatal` carrying the status rather
//! than calling `std::process::exit` from inside the interpreter, so
//! `picoc-cli` - the only thing that should ever terminate the process -
//! stays the single place that does.

use crate::helpers::{float_arg, float_result, int_arg, int_result, ptr_arg, raw_ptr_result, read_c_string};
use picoc_interp::{Ctx, Include, NativeFnSpec, ParamKind};
use picoc_runtime::{BaseKind, Fatal, PicocResult, Pos, Value};
use std::cell::Cell;

thread_local! {
    static RNG_STATE: Cell<u32> = const { Cell::new(1) };
}

pub fn include() -> Include {
    Include {
        name: "stdlib",
        setup: None,
        functions: vec![
            NativeFnSpec { name: "atoi", param_kinds: &[ParamKind::Ptr(BaseKind::Char)], return_kind: ParamKind::Prim(BaseKind::Int), is_variadic: false, func: atoi },
            NativeFnSpec { name: "atof", param_kinds: &[ParamKind::Ptr(BaseKind::Char)], return_kind: ParamKind::Prim(BaseKind::Fp), is_variadic: false, func: atof },
            NativeFnSpec {
                name: "malloc",
                param_kinds: &[ParamKind::Prim(BaseKind::UnsignedLong)],
                return_kind: ParamKind::Ptr(BaseKind::Void),
                is_variadic: false,
                func: malloc,
            },
            NativeFnSpec { name: "free", param_kinds: &[ParamKind::Ptr(BaseKind::Void)], return_kind: ParamKind::Prim(BaseKind::Void), is_variadic: false, func: free },
            NativeFnSpec { name: "exit", param_kinds: &[ParamKind::Prim(BaseKind::Int)], return_kind: ParamKind::Prim(BaseKind::Void), is_variadic: false, func: exit },
            NativeFnSpec { name: "rand", param_kinds: &[], return_kind: ParamKind::Prim(BaseKind::Int), is_variadic: false, func: rand },
            NativeFnSpec { name: "srand", param_kinds: &[ParamKind::Prim(BaseKind::UnsignedInt)], return_kind: ParamKind::Prim(BaseKind::Void), is_variadic: false, func: srand },
            NativeFnSpec { name: "abs", param_kinds: &[ParamKind::Prim(BaseKind::Int)], return_kind: ParamKind::Prim(BaseKind::Int), is_variadic: false, func: abs },
        ],
        prelude_c: None,
    }
}

fn atoi(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let s = read_c_string(ctx, ptr_arg(ctx, args, 0));
    let trimmed = s.trim_start();
    let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit() || *c == '-' || *c == '+').collect();
    Ok(int_result(ctx, digits.parse::<i64>().unwrap_or(0)))
}

fn atof(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let s = read_c_string(ctx, ptr_arg(ctx, args, 0));
    let trimmed = s.trim_start();
    let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E')).collect();
    Ok(float_result(ctx, digits.parse::<f64>().unwrap_or(0.0)))
}

fn malloc(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let size = (int_arg(ctx, args, 0) as u32).max(1);
    match ctx.state.arena.alloc_heap(size, 8) {
        Some(addr) => Ok(raw_ptr_result(ctx, BaseKind::Void, addr as u64)),
        None => Ok(raw_ptr_result(ctx, BaseKind::Void, 0)),
    }
}

fn free(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let addr = ptr_arg(ctx, args, 0);
    if addr != 0 {
        // Size is unknown at this call site (picoc's C `free` doesn't carry
        // one either); `malloc` always rounds up to at least 1 byte, so
        // freeing as a 1-byte block is conservative - it may undersize the
        // free-list entry but never corrupts an allocation still in use.
        ctx.state.arena.free_heap(addr, 1);
    }
    Ok(crate::helpers::void_result(ctx))
}

fn exit(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let status = int_arg(ctx, args, 0);
    Err(Fatal::exit(status as i32))
}

fn rand(ctx: &mut Ctx, _args: &[Value]) -> PicocResult<Value> {
    let next = RNG_STATE.with(|s| {
        // xorshift32, seeded by `srand`; not libc's `rand`, but `rand()`'s
        // only documented contract is "some pseudo-random sequence".
        let mut x = s.get();
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        s.set(x);
        x
    });
    Ok(int_result(ctx, (next & 0x7fff_ffff) as i64))
}

fn srand(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let seed = int_arg(ctx, args, 0) as u32;
    RNG_STATE.with(|s| s.set(seed.max(1)));
    Ok(crate::helpers::void_result(ctx))
}

fn abs(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let v = int_arg(ctx, args, 0);
    Ok(int_result(ctx, v.wrapping_abs()))
}
