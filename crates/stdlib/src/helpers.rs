//! Conversions between evaluated argument `Value`s and host Rust types,
//! shared by every header module. Grounded on `picoc_clibrary.c`'s own
//! helpers (`ParamType`/`CoerceT*` calls at the top of almost every library
//! function body) - the same "pull the right width out, do the C thing,
//! write a fresh `Value` back" shape, minus the union-tagged `AnyValue`
//! picoc uses, since a `Value` here is just a typed view over arena bytes.

use picoc_core::Addr;
use picoc_interp::Ctx;
use picoc_runtime::{BaseKind, Value, ValueFlags};

pub fn int_arg(ctx: &Ctx, args: &[Value], i: usize) -> i64 {
    args[i].read_int(&ctx.state.types, &ctx.state.arena)
}

pub fn float_arg(ctx: &Ctx, args: &[Value], i: usize) -> f64 {
    let node = ctx.state.types.node(args[i].ty);
    if node.base == BaseKind::Fp {
        args[i].read_float(&ctx.state.arena)
    } else {
        args[i].read_int(&ctx.state.types, &ctx.state.arena) as f64
    }
}

/// The arena address a pointer-typed argument holds (not the address of the
/// argument slot itself) - for pointers into our own arena (strings,
/// buffers).
pub fn ptr_arg(ctx: &Ctx, args: &[Value], i: usize) -> Addr {
    args[i].read_addr(&ctx.state.arena) as Addr
}

/// The full 64-bit payload a pointer-typed argument holds, unmasked - for
/// handles that live outside the arena (`FILE *`), where truncating to the
/// arena's 32-bit `Addr` would corrupt a real host pointer.
pub fn host_ptr_arg(ctx: &Ctx, args: &[Value], i: usize) -> u64 {
    args[i].read_addr(&ctx.state.arena)
}

/// Read a NUL-terminated byte string out of the arena starting at `addr`.
/// Non-UTF8 bytes are replaced rather than rejected - picoc's strings are
/// just bytes, but the headers implemented here only ever hand them to
/// Rust string APIs.
pub fn read_c_string(ctx: &Ctx, addr: Addr) -> String {
    let mut bytes = Vec::new();
    let mut cur = addr;
    loop {
        let b = ctx.state.arena.read_u8(cur);
        if b == 0 {
            break;
        }
        bytes.push(b);
        cur += 1;
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Write `s` plus a NUL terminator starting at `addr`, returning the number
/// of bytes written excluding the terminator (`strlen`'s return value for
/// the string just written).
pub fn write_c_string(ctx: &mut Ctx, addr: Addr, s: &str) -> usize {
    let bytes = s.as_bytes();
    ctx.state.arena.write_bytes(addr, bytes);
    ctx.state.arena.write_u8(addr + bytes.len() as u32, 0);
    bytes.len()
}

pub fn void_result(ctx: &mut Ctx) -> Value {
    let ty = ctx.state.types.primitive(BaseKind::Void);
    Value::new(ty, 0, ValueFlags::default())
}

pub fn int_result(ctx: &mut Ctx, v: i64) -> Value {
    let ty = ctx.state.types.primitive(BaseKind::Int);
    let addr = ctx.state.arena.alloc_stack(4, 4).expect("library call stack exhausted");
    let value = Value::new(ty, addr, ValueFlags::default());
    value.write_int(&ctx.state.types, &mut ctx.state.arena, v);
    value
}

pub fn long_result(ctx: &mut Ctx, v: i64) -> Value {
    let ty = ctx.state.types.primitive(BaseKind::Long);
    let addr = ctx.state.arena.alloc_stack(8, 8).expect("library call stack exhausted");
    let value = Value::new(ty, addr, ValueFlags::default());
    value.write_int(&ctx.state.types, &mut ctx.state.arena, v);
    value
}

pub fn float_result(ctx: &mut Ctx, v: f64) -> Value {
    let ty = ctx.state.types.primitive(BaseKind::Fp);
    let addr = ctx.state.arena.alloc_stack(8, 8).expect("library call stack exhausted");
    let value = Value::new(ty, addr, ValueFlags::default());
    value.write_float(&mut ctx.state.arena, v);
    value
}

/// A pointer result whose target is `base` (`BaseKind::Char` for the
/// `char *` most string functions return) and whose payload is an arena
/// address.
pub fn ptr_result(ctx: &mut Ctx, base: BaseKind, addr: Addr) -> Value {
    raw_ptr_result(ctx, base, addr as u64)
}

/// A pointer result carrying a raw, unmasked 64-bit payload - for handles
/// that live outside the arena (`FILE *`).
pub fn raw_ptr_result(ctx: &mut Ctx, base: BaseKind, raw: u64) -> Value {
    let elem = ctx.state.types.primitive(base);
    let ty = ctx.state.types.pointer_to(elem);
    let slot = ctx.state.arena.alloc_stack(8, 8).expect("library call stack exhausted");
    let value = Value::new(ty, slot, ValueFlags::default());
    value.write_addr(&mut ctx.state.arena, raw);
    value
}
