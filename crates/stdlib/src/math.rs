//! `<math.h>`: `sin`, `cos`, `tan`, `sqrt`, `pow`, `fabs`, `floor`, `ceil`,
//! `exp`, `log`. Grounded on spec.md §6's math function list; delegates to
//! Rust's own `f64` methods rather than `libc`'s, since they're the same
//! IEEE-754 operations with no ABI to bridge.

use crate::helpers::float_arg;
use crate::helpers::float_result;
use picoc_interp::{Ctx, Include, NativeFnSpec, ParamKind};
use picoc_runtime::{BaseKind, PicocResult, Value};

const UNARY: &[ParamKind] = &[ParamKind::Prim(BaseKind::Fp)];
const BINARY: &[ParamKind] = &[ParamKind::Prim(BaseKind::Fp), ParamKind::Prim(BaseKind::Fp)];

pub fn include() -> Include {
    Include {
        name: "math",
        setup: None,
        functions: vec![
            NativeFnSpec { name: "sin", param_kinds: UNARY, return_kind: ParamKind::Prim(BaseKind::Fp), is_variadic: false, func: sin },
            NativeFnSpec { name: "cos", param_kinds: UNARY, return_kind: ParamKind::Prim(BaseKind::Fp), is_variadic: false, func: cos },
            NativeFnSpec { name: "tan", param_kinds: UNARY, return_kind: ParamKind::Prim(BaseKind::Fp), is_variadic: false, func: tan },
            NativeFnSpec { name: "sqrt", param_kinds: UNARY, return_kind: ParamKind::Prim(BaseKind::Fp), is_variadic: false, func: sqrt },
            NativeFnSpec { name: "pow", param_kinds: BINARY, return_kind: ParamKind::Prim(BaseKind::Fp), is_variadic: false, func: pow },
            NativeFnSpec { name: "fabs", param_kinds: UNARY, return_kind: ParamKind::Prim(BaseKind::Fp), is_variadic: false, func: fabs },
            NativeFnSpec { name: "floor", param_kinds: UNARY, return_kind: ParamKind::Prim(BaseKind::Fp), is_variadic: false, func: floor },
            NativeFnSpec { name: "ceil", param_kinds: UNARY, return_kind: ParamKind::Prim(BaseKind::Fp), is_variadic: false, func: ceil },
            NativeFnSpec { name: "exp", param_kinds: UNARY, return_kind: ParamKind::Prim(BaseKind::Fp), is_variadic: false, func: exp },
            NativeFnSpec { name: "log", param_kinds: UNARY, return_kind: ParamKind::Prim(BaseKind::Fp), is_variadic: false, func: log },
        ],
        prelude_c: None,
    }
}

fn sin(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    Ok(float_result(ctx, float_arg(ctx, args, 0).sin()))
}

fn cos(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    Ok(float_result(ctx, float_arg(ctx, args, 0).cos()))
}

fn tan(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    Ok(float_result(ctx, float_arg(ctx, args, 0).tan()))
}

fn sqrt(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    Ok(float_result(ctx, float_arg(ctx, args, 0).sqrt()))
}

fn pow(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let base = float_arg(ctx, args, 0);
    let exponent = float_arg(ctx, args, 1);
    Ok(float_result(ctx, base.powf(exponent)))
}

fn fabs(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    Ok(float_result(ctx, float_arg(ctx, args, 0).abs()))
}

fn floor(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    Ok(float_result(ctx, float_arg(ctx, args, 0).floor()))
}

fn ceil(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    Ok(float_result(ctx, float_arg(ctx, args, 0).ceil()))
}

fn exp(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    Ok(float_result(ctx, float_arg(ctx, args, 0).exp()))
}

fn log(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    Ok(float_result(ctx, float_arg(ctx, args, 0).ln()))
}
