//! `<unistd.h>`: the `sleep`/`usleep` subset spec.md §6 calls for. Grounded
//! on spec.md §6's unistd function list; uses `std::thread::sleep` rather
//! than `libc::sleep`/`libc::usleep` since it's the same blocking wait with
//! no signal-interruption semantics worth preserving for this subset.

use crate::helpers::int_arg;
use crate::helpers::int_result;
use picoc_interp::{Ctx, Include, NativeFnSpec, ParamKind};
use picoc_runtime::{BaseKind, PicocResult, Value};
use std::time::Duration;

pub fn include() -> Include {
    Include {
        name: "unistd",
        setup: None,
        functions: vec![
            NativeFnSpec {
                name: "sleep",
                param_kinds: &[ParamKind::Prim(BaseKind::UnsignedInt)],
                return_kind: ParamKind::Prim(BaseKind::UnsignedInt),
                is_variadic: false,
                func: sleep,
            },
            NativeFnSpec { name: "usleep", param_kinds: &[ParamKind::Prim(BaseKind::UnsignedInt)], return_kind: ParamKind::Prim(BaseKind::Int), is_variadic: false, func: usleep },
        ],
        prelude_c: None,
    }
}

fn sleep(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let secs = int_arg(ctx, args, 0).max(0) as u64;
    std::thread::sleep(Duration::from_secs(secs));
    Ok(int_result(ctx, 0))
}

fn usleep(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let micros = int_arg(ctx, args, 0).max(0) as u64;
    std::thread::sleep(Duration::from_micros(micros));
    Ok(int_result(ctx, 0))
}
