//! `<stdio.h>`: `printf`, `putchar`, `puts`, `getchar`, `getche`, `fopen`,
//! `fclose`, `fread`, `fwrite`. Grounded on spec.md §6's stdio function
//! list and `picoc_clibrary.c`'s `LibraryAdd` prototype-registration
//! pattern; `fopen`/`fclose`/`fread`/`fwrite` shell out to the real `libc`
//! functions (already a teacher workspace dependency) rather than
//! reimplementing buffered I/O, since a `FILE *` here is exactly what it is
//! in C: an opaque handle the host's C library owns.
//!
//! `printf`'s format string is interpreted by hand (`render`) rather than
//! reusing Rust's `format!` machinery, which has no notion of a `%d`/`%s`
//! mini-language; this only needs to cover the conversions picoc's test
//! programs actually exercise, not the full C standard's corner cases
//! (`%a`, positional arguments, etc. are out of scope).

use crate::helpers::{float_arg, host_ptr_arg, int_arg, int_result, ptr_arg, raw_ptr_result, read_c_string};
use picoc_interp::{Ctx, Include, NativeFnSpec, ParamKind};
use picoc_runtime::{BaseKind, PicocResult, Value};
use std::ffi::CString;
use std::io::{Read as _, Write as _};

pub fn include() -> Include {
    Include {
        name: "stdio",
        setup: None,
        functions: vec![
            NativeFnSpec { name: "printf", param_kinds: &[ParamKind::Ptr(BaseKind::Char)], return_kind: ParamKind::Prim(BaseKind::Int), is_variadic: true, func: printf },
            NativeFnSpec { name: "putchar", param_kinds: &[ParamKind::Prim(BaseKind::Int)], return_kind: ParamKind::Prim(BaseKind::Int), is_variadic: false, func: putchar },
            NativeFnSpec { name: "puts", param_kinds: &[ParamKind::Ptr(BaseKind::Char)], return_kind: ParamKind::Prim(BaseKind::Int), is_variadic: false, func: puts },
            NativeFnSpec { name: "getchar", param_kinds: &[], return_kind: ParamKind::Prim(BaseKind::Int), is_variadic: false, func: getchar },
            NativeFnSpec { name: "getche", param_kinds: &[], return_kind: ParamKind::Prim(BaseKind::Int), is_variadic: false, func: getche },
            NativeFnSpec {
                name: "fopen",
                param_kinds: &[ParamKind::Ptr(BaseKind::Char), ParamKind::Ptr(BaseKind::Char)],
                return_kind: ParamKind::Ptr(BaseKind::Void),
                is_variadic: false,
                func: fopen,
            },
            NativeFnSpec { name: "fclose", param_kinds: &[ParamKind::Ptr(BaseKind::Void)], return_kind: ParamKind::Prim(BaseKind::Int), is_variadic: false, func: fclose },
            NativeFnSpec {
                name: "fread",
                param_kinds: &[ParamKind::Ptr(BaseKind::Void), ParamKind::Prim(BaseKind::UnsignedLong), ParamKind::Prim(BaseKind::UnsignedLong), ParamKind::Ptr(BaseKind::Void)],
                return_kind: ParamKind::Prim(BaseKind::UnsignedLong),
                is_variadic: false,
                func: fread,
            },
            NativeFnSpec {
                name: "fwrite",
                param_kinds: &[ParamKind::Ptr(BaseKind::Void), ParamKind::Prim(BaseKind::UnsignedLong), ParamKind::Prim(BaseKind::UnsignedLong), ParamKind::Ptr(BaseKind::Void)],
                return_kind: ParamKind::Prim(BaseKind::UnsignedLong),
                is_variadic: false,
                func: fwrite,
            },
        ],
        prelude_c: None,
    }
}

fn printf(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let fmt_addr = ptr_arg(ctx, args, 0);
    let fmt = read_c_string(ctx, fmt_addr);
    let rendered = render(ctx, &fmt, &args[1..]);
    let _ = ctx.state.io.stdout.write_all(rendered.as_bytes());
    Ok(int_result(ctx, rendered.len() as i64))
}

fn putchar(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let c = int_arg(ctx, args, 0);
    let _ = ctx.state.io.stdout.write_all(&[c as u8]);
    Ok(int_result(ctx, c))
}

fn puts(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let addr = ptr_arg(ctx, args, 0);
    let s = read_c_string(ctx, addr);
    let _ = ctx.state.io.stdout.write_all(s.as_bytes());
    let _ = ctx.state.io.stdout.write_all(b"\n");
    Ok(int_result(ctx, 0))
}

fn getchar(ctx: &mut Ctx, _args: &[Value]) -> PicocResult<Value> {
    let mut buf = [0u8; 1];
    let n = ctx.state.io.stdin.read(&mut buf).unwrap_or(0);
    let v = if n == 0 { -1 } else { buf[0] as i64 };
    Ok(int_result(ctx, v))
}

fn getche(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let v = getchar(ctx, args)?;
    let code = v.read_int(&ctx.state.types, &ctx.state.arena);
    if code >= 0 {
        let _ = ctx.state.io.stdout.write_all(&[code as u8]);
    }
    Ok(v)
}

fn fopen(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let name = read_c_string(ctx, ptr_arg(ctx, args, 0));
    let mode = read_c_string(ctx, ptr_arg(ctx, args, 1));
    let c_name = CString::new(name).unwrap_or_default();
    let c_mode = CString::new(mode).unwrap_or_default();
    let fp = unsafe { libc::fopen(c_name.as_ptr(), c_mode.as_ptr()) };
    Ok(raw_ptr_result(ctx, BaseKind::Void, fp as u64))
}

fn fclose(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let fp = host_ptr_arg(ctx, args, 0) as *mut libc::FILE;
    let rc = if fp.is_null() { -1 } else { unsafe { libc::fclose(fp) } };
    Ok(int_result(ctx, rc as i64))
}

fn fread(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let buf_addr = ptr_arg(ctx, args, 0);
    let size = int_arg(ctx, args, 1) as usize;
    let count = int_arg(ctx, args, 2) as usize;
    let fp = host_ptr_arg(ctx, args, 3) as *mut libc::FILE;
    let total = size.saturating_mul(count);
    if fp.is_null() || total == 0 {
        return Ok(int_result(ctx, 0));
    }
    let mut scratch = vec![0u8; total];
    let read = unsafe { libc::fread(scratch.as_mut_ptr() as *mut libc::c_void, size, count, fp) };
    let bytes_read = read.saturating_mul(size);
    if bytes_read > 0 {
        ctx.state.arena.write_bytes(buf_addr, &scratch[..bytes_read]);
    }
    Ok(int_result(ctx, read as i64))
}

fn fwrite(ctx: &mut Ctx, args: &[Value]) -> PicocResult<Value> {
    let buf_addr = ptr_arg(ctx, args, 0);
    let size = int_arg(ctx, args, 1) as usize;
    let count = int_arg(ctx, args, 2) as usize;
    let fp = host_ptr_arg(ctx, args, 3) as *mut libc::FILE;
    let total = size.saturating_mul(count);
    if fp.is_null() || total == 0 {
        return Ok(int_result(ctx, 0));
    }
    let bytes = ctx.state.arena.read_bytes(buf_addr, total as u32);
    let written = unsafe { libc::fwrite(bytes.as_ptr() as *const libc::c_void, size, count, fp) };
    Ok(int_result(ctx, written as i64))
}

/// Render a `printf`-style format string against already-evaluated
/// arguments (`args[0]` is the first vararg, not the format string).
fn render(ctx: &mut Ctx, fmt: &str, args: &[Value]) -> String {
    let mut out = String::new();
    let mut arg_i = 0;
    let mut chars = fmt.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let mut left_align = false;
        let mut zero_pad = false;
        let mut show_sign = false;
        loop {
            match chars.peek() {
                Some('-') => {
                    left_align = true;
                    chars.next();
                }
                Some('0') => {
                    zero_pad = true;
                    chars.next();
                }
                Some('+') => {
                    show_sign = true;
                    chars.next();
                }
                Some(' ') => {
                    chars.next();
                }
                _ => break,
            }
        }

        let mut width_digits = String::new();
        while chars.peek().is_some_and(|d| d.is_ascii_digit()) {
            width_digits.push(chars.next().unwrap());
        }
        let width: usize = width_digits.parse().unwrap_or(0);

        let mut precision: Option<usize> = None;
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut p = String::new();
            while chars.peek().is_some_and(|d| d.is_ascii_digit()) {
                p.push(chars.next().unwrap());
            }
            precision = Some(p.parse().unwrap_or(0));
        }

        while matches!(chars.peek(), Some('l') | Some('h') | Some('L')) {
            chars.next();
        }

        let Some(conv) = chars.next() else { break };
        if conv == '%' {
            out.push('%');
            continue;
        }
        if arg_i >= args.len() && conv != '%' {
            out.push('%');
            out.push(conv);
            continue;
        }

        let rendered = match conv {
            'd' | 'i' => {
                let v = int_arg(ctx, args, arg_i);
                arg_i += 1;
                if v < 0 {
                    format!("-{}", v.unsigned_abs())
                } else if show_sign {
                    format!("+{v}")
                } else {
                    v.to_string()
                }
            }
            'u' => {
                let v = int_arg(ctx, args, arg_i) as u64;
                arg_i += 1;
                v.to_string()
            }
            'o' => {
                let v = int_arg(ctx, args, arg_i) as u64;
                arg_i += 1;
                format!("{v:o}")
            }
            'x' => {
                let v = int_arg(ctx, args, arg_i) as u64;
                arg_i += 1;
                format!("{v:x}")
            }
            'X' => {
                let v = int_arg(ctx, args, arg_i) as u64;
                arg_i += 1;
                format!("{v:X}")
            }
            'c' => {
                let v = int_arg(ctx, args, arg_i) as u8 as char;
                arg_i += 1;
                v.to_string()
            }
            's' => {
                let addr = ptr_arg(ctx, args, arg_i);
                arg_i += 1;
                let s = read_c_string(ctx, addr);
                match precision {
                    Some(p) => s.chars().take(p).collect(),
                    None => s,
                }
            }
            'f' => {
                let v = float_arg(ctx, args, arg_i);
                arg_i += 1;
                format!("{:.*}", precision.unwrap_or(6), v)
            }
            'e' => {
                let v = float_arg(ctx, args, arg_i);
                arg_i += 1;
                format!("{:.*e}", precision.unwrap_or(6), v)
            }
            'g' => {
                let v = float_arg(ctx, args, arg_i);
                arg_i += 1;
                format!("{v}")
            }
            'p' => {
                let v = host_ptr_arg(ctx, args, arg_i);
                arg_i += 1;
                format!("0x{v:x}")
            }
            other => {
                out.push('%');
                out.push(other);
                continue;
            }
        };

        if rendered.len() < width {
            let pad = width - rendered.len();
            if left_align {
                out.push_str(&rendered);
                out.push_str(&" ".repeat(pad));
            } else if zero_pad && matches!(conv, 'd' | 'i' | 'u' | 'o' | 'x' | 'X' | 'f' | 'e') {
                out.push_str(&"0".repeat(pad));
                out.push_str(&rendered);
            } else {
                out.push_str(&" ".repeat(pad));
                out.push_str(&rendered);
            }
        } else {
            out.push_str(&rendered);
        }
    }

    out
}
