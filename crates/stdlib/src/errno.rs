//! `<errno.h>`: the `errno` global plus the handful of `E*` constants spec.md
//! §6 calls out. Grounded on spec.md §3's "platform variable" mechanism -
//! `errno` is exposed the same way picoc's `VariableDefinePlatformVar`
//! exposes host state, a heap-backed global a running program can read and
//! write like any other `int`.

use picoc_interp::{Ctx, Include};
use picoc_runtime::{BaseKind, PicocResult, Pos, Value, ValueFlags};

pub fn include() -> Include {
    Include { name: "errno", setup: Some(setup), functions: Vec::new(), prelude_c: None }
}

fn define_const(ctx: &mut Ctx, name: &str, value: i64) {
    let atom = ctx.state.interner.register(name);
    let ty = ctx.state.types.primitive(BaseKind::Int);
    let addr = ctx.state.arena.alloc_heap(4, 4).expect("errno constant arena exhausted");
    let val = Value::new(ty, addr, ValueFlags::default());
    val.write_int(&ctx.state.types, &mut ctx.state.arena, value);
    ctx.state.globals.set(atom, val, Pos::default());
}

fn setup(ctx: &mut Ctx) -> PicocResult<()> {
    let name = ctx.state.interner.register("errno");
    let ty = ctx.state.types.primitive(BaseKind::Int);
    let addr = ctx.state.arena.alloc_heap(4, 4).expect("errno arena exhausted");
    let val = Value::new(ty, addr, ValueFlags::default());
    val.write_int(&ctx.state.types, &mut ctx.state.arena, 0);
    ctx.state.globals.set(name, val, Pos::default());

    define_const(ctx, "EPERM", libc::EPERM as i64);
    define_const(ctx, "ENOENT", libc::ENOENT as i64);
    define_const(ctx, "ESRCH", libc::ESRCH as i64);
    define_const(ctx, "EINTR", libc::EINTR as i64);
    define_const(ctx, "EIO", libc::EIO as i64);
    define_const(ctx, "ENOMEM", libc::ENOMEM as i64);
    define_const(ctx, "EACCES", libc::EACCES as i64);
    define_const(ctx, "EEXIST", libc::EEXIST as i64);
    define_const(ctx, "ENOTDIR", libc::ENOTDIR as i64);
    define_const(ctx, "EINVAL", libc::EINVAL as i64);
    define_const(ctx, "ERANGE", libc::ERANGE as i64);
    Ok(())
}
