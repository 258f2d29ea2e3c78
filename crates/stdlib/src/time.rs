//! `<time.h>`: `time`, `clock`. Grounded on spec.md §6's time function
//! list, bridged straight to `libc` rather than `std::time` so `clock`
//! keeps its C meaning (CPU time in `CLOCKS_PER_SEC` ticks, not wall time).

use crate::helpers::{long_result, ptr_arg};
use picoc_interp::{Ctx, Include, NativeFnSpec, ParamKind};
use picoc_runtime::{BaseKind, PicocResult, Value};

pub fn include() -> Include {
    Include {
        name: "time",
        setup: None,
        functions: vec![
            NativeFnSpec { name: "time", param_kinds: &[ParamKind::Ptr(BaseKind::Long)], return_kind: ParamKind::Prim(BaseKind::Long), is_variadic: false, func: time },
            NativeFnSpec { name: "clock", param_kinds: &[], return_kind: ParamKind::Prim(BaseKind::Long), is_variadic: false, func: clock },
        ],
        prelude_c: None,
    }
}

fn time(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let now = unsafe { libc::time(std::ptr::null_mut()) } as i64;
    if !args.is_empty() {
        let addr = ptr_arg(ctx, args, 0);
        if addr != 0 {
            ctx.state.arena.write_i64(addr, now);
        }
    }
    Ok(long_result(ctx, now))
}

fn clock(ctx: &mut Ctx, _args: &[Value]) -> PicocResult<Value> {
    let ticks = unsafe { libc::clock() } as i64;
    Ok(long_result(ctx, ticks))
}
