//! `<string.h>`: `strlen`, `strcpy`, `strncpy`, `strcmp`, `strncmp`,
//! `strcat`, `strchr`, `strstr`, `strtok`, `memcpy`, `memset`, `memcmp`.
//! Grounded on spec.md §6's string function list; `strtok` keeps its state
//! (the saved cursor between calls on the same string) in a `RefCell`
//! rather than a static buffer, matching the divergence DESIGN.md already
//! records for `picoc-runtime`'s handle-based model over raw pointers -
//! there is nowhere else to park it, since `NativeFn` is a bare `fn`
//! pointer with no closure environment.

use crate::helpers::{int_arg, int_result, ptr_arg, ptr_result, read_c_string, write_c_string};
use picoc_interp::{Ctx, Include, NativeFnSpec, ParamKind};
use picoc_runtime::{Addr, BaseKind, PicocResult, Value};
use std::cell::Cell;

thread_local! {
    static STRTOK_STATE: Cell<Option<Addr>> = const { Cell::new(None) };
}

pub fn include() -> Include {
    Include {
        name: "string",
        setup: None,
        functions: vec![
            NativeFnSpec { name: "strlen", param_kinds: &[ParamKind::Ptr(BaseKind::Char)], return_kind: ParamKind::Prim(BaseKind::UnsignedLong), is_variadic: false, func: strlen },
            NativeFnSpec {
                name: "strcpy",
                param_kinds: &[ParamKind::Ptr(BaseKind::Char), ParamKind::Ptr(BaseKind::Char)],
                return_kind: ParamKind::Ptr(BaseKind::Char),
                is_variadic: false,
                func: strcpy,
            },
            NativeFnSpec {
                name: "strncpy",
                param_kinds: &[ParamKind::Ptr(BaseKind::Char), ParamKind::Ptr(BaseKind::Char), ParamKind::Prim(BaseKind::UnsignedLong)],
                return_kind: ParamKind::Ptr(BaseKind::Char),
                is_variadic: false,
                func: strncpy,
            },
            NativeFnSpec {
                name: "strcmp",
                param_kinds: &[ParamKind::Ptr(BaseKind::Char), ParamKind::Ptr(BaseKind::Char)],
                return_kind: ParamKind::Prim(BaseKind::Int),
                is_variadic: false,
                func: strcmp,
            },
            NativeFnSpec {
                name: "strncmp",
                param_kinds: &[ParamKind::Ptr(BaseKind::Char), ParamKind::Ptr(BaseKind::Char), ParamKind::Prim(BaseKind::UnsignedLong)],
                return_kind: ParamKind::Prim(BaseKind::Int),
                is_variadic: false,
                func: strncmp,
            },
            NativeFnSpec {
                name: "strcat",
                param_kinds: &[ParamKind::Ptr(BaseKind::Char), ParamKind::Ptr(BaseKind::Char)],
                return_kind: ParamKind::Ptr(BaseKind::Char),
                is_variadic: false,
                func: strcat,
            },
            NativeFnSpec {
                name: "strchr",
                param_kinds: &[ParamKind::Ptr(BaseKind::Char), ParamKind::Prim(BaseKind::Int)],
                return_kind: ParamKind::Ptr(BaseKind::Char),
                is_variadic: false,
                func: strchr,
            },
            NativeFnSpec {
                name: "strstr",
                param_kinds: &[ParamKind::Ptr(BaseKind::Char), ParamKind::Ptr(BaseKind::Char)],
                return_kind: ParamKind::Ptr(BaseKind::Char),
                is_variadic: false,
                func: strstr,
            },
            NativeFnSpec {
                name: "strtok",
                param_kinds: &[ParamKind::Ptr(BaseKind::Char), ParamKind::Ptr(BaseKind::Char)],
                return_kind: ParamKind::Ptr(BaseKind::Char),
                is_variadic: false,
                func: strtok,
            },
            NativeFnSpec {
                name: "memcpy",
                param_kinds: &[ParamKind::Ptr(BaseKind::Void), ParamKind::Ptr(BaseKind::Void), ParamKind::Prim(BaseKind::UnsignedLong)],
                return_kind: ParamKind::Ptr(BaseKind::Void),
                is_variadic: false,
                func: memcpy,
            },
            NativeFnSpec {
                name: "memset",
                param_kinds: &[ParamKind::Ptr(BaseKind::Void), ParamKind::Prim(BaseKind::Int), ParamKind::Prim(BaseKind::UnsignedLong)],
                return_kind: ParamKind::Ptr(BaseKind::Void),
                is_variadic: false,
                func: memset,
            },
            NativeFnSpec {
                name: "memcmp",
                param_kinds: &[ParamKind::Ptr(BaseKind::Void), ParamKind::Ptr(BaseKind::Void), ParamKind::Prim(BaseKind::UnsignedLong)],
                return_kind: ParamKind::Prim(BaseKind::Int),
                is_variadic: false,
                func: memcmp,
            },
        ],
        prelude_c: None,
    }
}

fn strlen(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let s = read_c_string(ctx, ptr_arg(ctx, args, 0));
    Ok(int_result(ctx, s.len() as i64))
}

fn strcpy(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let dest = ptr_arg(ctx, args, 0);
    let src = read_c_string(ctx, ptr_arg(ctx, args, 1));
    write_c_string(ctx, dest, &src);
    Ok(ptr_result(ctx, BaseKind::Char, dest))
}

fn strncpy(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let dest = ptr_arg(ctx, args, 0);
    let src = read_c_string(ctx, ptr_arg(ctx, args, 1));
    let n = int_arg(ctx, args, 2) as usize;
    let bytes = src.as_bytes();
    let copy_len = bytes.len().min(n);
    ctx.state.arena.write_bytes(dest, &bytes[..copy_len]);
    for i in copy_len..n {
        ctx.state.arena.write_u8(dest + i as u32, 0);
    }
    Ok(ptr_result(ctx, BaseKind::Char, dest))
}

fn strcmp(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let a = read_c_string(ctx, ptr_arg(ctx, args, 0));
    let b = read_c_string(ctx, ptr_arg(ctx, args, 1));
    Ok(int_result(ctx, c_strcmp(a.as_bytes(), b.as_bytes())))
}

fn strncmp(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let a = read_c_string(ctx, ptr_arg(ctx, args, 0));
    let b = read_c_string(ctx, ptr_arg(ctx, args, 1));
    let n = int_arg(ctx, args, 2) as usize;
    let a = &a.as_bytes()[..a.len().min(n)];
    let b = &b.as_bytes()[..b.len().min(n)];
    Ok(int_result(ctx, c_strcmp(a, b)))
}

fn c_strcmp(a: &[u8], b: &[u8]) -> i64 {
    for i in 0..a.len().max(b.len()) {
        let ca = a.get(i).copied().unwrap_or(0);
        let cb = b.get(i).copied().unwrap_or(0);
        if ca != cb {
            return ca as i64 - cb as i64;
        }
    }
    0
}

fn strcat(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let dest = ptr_arg(ctx, args, 0);
    let dest_str = read_c_string(ctx, dest);
    let src = read_c_string(ctx, ptr_arg(ctx, args, 1));
    write_c_string(ctx, dest + dest_str.len() as u32, &src);
    Ok(ptr_result(ctx, BaseKind::Char, dest))
}

fn strchr(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let addr = ptr_arg(ctx, args, 0);
    let needle = int_arg(ctx, args, 1) as u8;
    let s = read_c_string(ctx, addr);
    match s.as_bytes().iter().position(|&b| b == needle) {
        Some(i) => Ok(ptr_result(ctx, BaseKind::Char, addr + i as u32)),
        None if needle == 0 => Ok(ptr_result(ctx, BaseKind::Char, addr + s.len() as u32)),
        None => Ok(ptr_result(ctx, BaseKind::Char, 0)),
    }
}

fn strstr(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let hay_addr = ptr_arg(ctx, args, 0);
    let haystack = read_c_string(ctx, hay_addr);
    let needle = read_c_string(ctx, ptr_arg(ctx, args, 1));
    if needle.is_empty() {
        return Ok(ptr_result(ctx, BaseKind::Char, hay_addr));
    }
    match haystack.find(&needle) {
        Some(i) => Ok(ptr_result(ctx, BaseKind::Char, hay_addr + i as u32)),
        None => Ok(ptr_result(ctx, BaseKind::Char, 0)),
    }
}

fn strtok(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let given = ptr_arg(ctx, args, 0);
    let delims = read_c_string(ctx, ptr_arg(ctx, args, 1));
    let start = if given != 0 { Some(given) } else { STRTOK_STATE.with(|s| s.get()) };

    let Some(mut cur) = start else {
        return Ok(ptr_result(ctx, BaseKind::Char, 0));
    };

    let is_delim = |b: u8| delims.as_bytes().contains(&b);
    loop {
        let b = ctx.state.arena.read_u8(cur);
        if b == 0 {
            STRTOK_STATE.with(|s| s.set(None));
            return Ok(ptr_result(ctx, BaseKind::Char, 0));
        }
        if !is_delim(b) {
            break;
        }
        cur += 1;
    }

    let token_start = cur;
    loop {
        let b = ctx.state.arena.read_u8(cur);
        if b == 0 {
            STRTOK_STATE.with(|s| s.set(None));
            break;
        }
        if is_delim(b) {
            ctx.state.arena.write_u8(cur, 0);
            STRTOK_STATE.with(|s| s.set(Some(cur + 1)));
            break;
        }
        cur += 1;
    }

    Ok(ptr_result(ctx, BaseKind::Char, token_start))
}

fn memcpy(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let dest = ptr_arg(ctx, args, 0);
    let src = ptr_arg(ctx, args, 1);
    let n = int_arg(ctx, args, 2) as u32;
    let bytes = ctx.state.arena.read_bytes(src, n).to_vec();
    ctx.state.arena.write_bytes(dest, &bytes);
    Ok(ptr_result(ctx, BaseKind::Void, dest))
}

fn memset(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let dest = ptr_arg(ctx, args, 0);
    let byte = int_arg(ctx, args, 1) as u8;
    let n = int_arg(ctx, args, 2) as u32;
    let fill = vec![byte; n as usize];
    ctx.state.arena.write_bytes(dest, &fill);
    Ok(ptr_result(ctx, BaseKind::Void, dest))
}

fn memcmp(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let a = ptr_arg(ctx, args, 0);
    let b = ptr_arg(ctx, args, 1);
    let n = int_arg(ctx, args, 2) as u32;
    let a = ctx.state.arena.read_bytes(a, n);
    let b = ctx.state.arena.read_bytes(b, n);
    Ok(int_result(ctx, c_strcmp(a, b)))
}
