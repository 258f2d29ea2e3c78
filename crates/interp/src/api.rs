//! The public entry points a host (the `picoc-cli` binary, or any other
//! embedder) drives the interpreter through: `Initialize`/`Cleanup`,
//! `Parse`/`ParseInteractive`, `IncludeAllSystemHeaders`, `PlatformScanFile`
//! and `CallMain`, grounded on `picoc_parse.c` and `picoc_platform.c`.
//!
//! Rust's ownership model already gives us two things picoc had to build by
//! hand: `Cleanup` is just dropping the `Ctx` (every table and arena
//! allocation is torn down in reverse dependency order for free), and the
//! `setjmp`/`longjmp` exit point picoc installs before running a program has
//! no counterpart here - a `Fatal` already unwinds the call stack through
//! `?`. `set_exit_point` is kept only so callers that mirror picoc's
//! `Initialize` / `SetExitPoint` / `Cleanup` sequence have something to call.

use crate::ctx::Ctx;
use crate::expr::Cursor;
use crate::func::FunctionKind;
use crate::lexer::{Token, TokenKind};
use crate::library::LibraryRegistry;
use crate::parser;
use picoc_runtime::{BaseKind, Fatal, Io, PicocResult, Pos, Value, ValueFlags};
use std::io::Write as _;

/// `PicocInitialize`: allocate the arena and set up the empty tables.
pub fn initialize(stack_size: u32, io: Io) -> Ctx {
    Ctx::new(picoc_runtime::InterpreterState::new(stack_size, io))
}

/// `PicocCleanup`. Dropping `ctx` does the actual work; this just flushes
/// whatever's left buffered in its `Io` triple.
pub fn cleanup(mut ctx: Ctx) {
    let _ = ctx.state.io.stdout.flush();
    let _ = ctx.state.io.stderr.flush();
}

/// `PicocPlatformSetExitPoint`. No-op: see the module doc comment.
pub fn set_exit_point(_ctx: &mut Ctx) {}

/// `PicocParse`: tokenise and run `source` top to bottom as one translation
/// unit.
pub fn parse(ctx: &mut Ctx, file_name: &str, source: &str) -> PicocResult<()> {
    parser::parse(ctx, file_name, source)
}

/// `PicocPlatformScanFile`: read a file off disk and `parse` it.
pub fn platform_scan_file(ctx: &mut Ctx, file_name: &str) -> PicocResult<()> {
    let source = std::fs::read_to_string(file_name).map_err(|e| Fatal::no_parser(format!("{file_name}: {e}")))?;
    parse(ctx, file_name, &source)
}

/// `IncludeAllSystemHeaders`: include every header `picoc-stdlib` registered
/// at startup, in registration order.
pub fn include_all_system_headers(ctx: &mut Ctx) -> PicocResult<()> {
    LibraryRegistry::include_all(ctx)
}

/// `PicocParseInteractive` / `PicocParseInteractiveNoStartPrompt`: a
/// line-buffered REPL driven off `ctx.state.io.stdin`, grounded on
/// `picoc_parse.c`'s statement loop. `picoc-cli` normally drives its own
/// loop on top of `rustyline` for editing and history; this entry point is
/// the plain, non-interactive-terminal fallback (piped input, embedders
/// without a line editor) and the one the original loop's prompts are
/// modelled on.
pub fn parse_interactive(ctx: &mut Ctx) -> PicocResult<()> {
    writeln!(ctx.state.io.stdout, "starting picoc {} (Ctrl+D to exit)", env!("CARGO_PKG_VERSION")).ok();

    loop {
        write!(ctx.state.io.stdout, "picoc> ").ok();
        ctx.state.io.stdout.flush().ok();

        let mut buf = String::new();
        if read_line(ctx, &mut buf)? == 0 {
            writeln!(ctx.state.io.stdout).ok();
            return Ok(());
        }

        while depth(&buf) > 0 {
            write!(ctx.state.io.stdout, "     > ").ok();
            ctx.state.io.stdout.flush().ok();
            let mut more = String::new();
            if read_line(ctx, &mut more)? == 0 {
                break;
            }
            buf.push('\n');
            buf.push_str(&more);
        }

        if buf.trim().is_empty() {
            continue;
        }
        if let Err(fatal) = parse(ctx, "<stdin>", &buf) {
            writeln!(ctx.state.io.stderr, "{fatal}").ok();
        }
    }
}

fn read_line(ctx: &mut Ctx, buf: &mut String) -> PicocResult<usize> {
    use std::io::BufRead as _;
    ctx.state.io.stdin.read_line(buf).map_err(|e| Fatal::no_parser(format!("stdin: {e}")))
}

/// How many more `{`/`(` than `}`/`)` the line leaves open - a cheap stand-in
/// for picoc's token-level "is this statement complete" check, good enough
/// to decide whether the REPL should keep reading a continuation line.
fn depth(s: &str) -> i32 {
    let mut d = 0;
    for c in s.chars() {
        match c {
            '{' | '(' => d += 1,
            '}' | ')' => d -= 1,
            _ => {}
        }
    }
    d
}

/// `PicocCallMain`: look up `main`, build `argc`/`argv` if it takes any
/// parameters, and call it. picoc synthesises one of four fixed C source
/// snippets (void/int return x 0/2 params) and parses each at startup; we
/// build the same four shapes directly as `Value`s and invoke the call
/// mechanism the parser already uses for ordinary calls, which is simpler
/// and avoids round-tripping through the lexer for a call the interpreter
/// can just make.
pub fn call_main(ctx: &mut Ctx, args: &[String]) -> PicocResult<i32> {
    let main_name = ctx.state.interner.register("main");
    let Some(entry) = ctx.state.globals.get(main_name) else {
        return Err(Fatal::no_parser("main is not defined".to_string()));
    };
    let main_value = entry.value.clone();
    let fn_node = ctx.state.types.node(main_value.ty);
    if fn_node.base != BaseKind::Function {
        return Err(Fatal::no_parser("main is not a function".to_string()));
    }
    let fn_id = main_value.read_addr(&ctx.state.arena) as u32;
    let def = ctx.functions.get(fn_id);
    if !matches!(def.kind, FunctionKind::Normal { .. }) {
        return Err(Fatal::no_parser("main is not a function".to_string()));
    }
    let return_base = ctx.state.types.node(def.return_type).base;
    let returns_void = return_base == BaseKind::Void;
    if !returns_void && return_base != BaseKind::Int {
        return Err(Fatal::no_parser("main() should return an int or void".to_string()));
    }
    let takes_args = match def.params.len() {
        0 => false,
        2 => {
            let first_base = ctx.state.types.node(def.params[0].ty).base;
            if first_base != BaseKind::Int {
                return Err(Fatal::no_parser("bad parameters to main()".to_string()));
            }
            true
        }
        _ => return Err(Fatal::no_parser("bad parameters to main()".to_string())),
    };

    let call_args = if takes_args { build_argv(ctx, args)? } else { Vec::new() };

    let tokens = [Token { kind: TokenKind::Eof, pos: Pos::default() }];
    let cur = Cursor::new(&tokens, "<startup>");
    let result = parser::call_function(ctx, fn_id, &call_args, true, &cur)?;

    if returns_void {
        Ok(0)
    } else {
        Ok(result.read_int(&ctx.state.types, &ctx.state.arena) as i32)
    }
}

/// Lays `args` out as null-terminated byte strings plus a `char *[]` array
/// in the heap sub-allocator (they need to outlive the stack frame `main`
/// runs in), and returns `[argc, argv]` ready to pass to `call_function`.
fn build_argv(ctx: &mut Ctx, args: &[String]) -> PicocResult<Vec<Value>> {
    let char_ty = ctx.state.types.primitive(BaseKind::Char);
    let char_ptr_ty = ctx.state.types.pointer_to(char_ty);
    let ptr_ptr_ty = ctx.state.types.pointer_to(char_ptr_ty);
    let int_ty = ctx.state.types.primitive(BaseKind::Int);

    let mut ptrs = Vec::with_capacity(args.len());
    for arg in args {
        let bytes = arg.as_bytes();
        let addr = ctx.state.arena.alloc_heap((bytes.len() + 1) as u32, 1).ok_or_else(|| Fatal::no_parser("argument string arena exhausted"))?;
        ctx.state.arena.write_bytes(addr, bytes);
        ctx.state.arena.write_u8(addr + bytes.len() as u32, 0);
        ptrs.push(addr as u64);
    }

    let slots = ptrs.len().max(1) as u32;
    let argv_addr = ctx.state.arena.alloc_heap(slots * 8, 8).ok_or_else(|| Fatal::no_parser("argv arena exhausted"))?;
    for (i, p) in ptrs.iter().enumerate() {
        ctx.state.arena.write_u64(argv_addr + (i as u32) * 8, *p);
    }

    let argc_addr = ctx.state.arena.alloc_stack(4, 4).ok_or_else(|| Fatal::no_parser("startup stack exhausted"))?;
    let argc_val = Value::new(int_ty, argc_addr, ValueFlags::default());
    argc_val.write_int(&ctx.state.types, &mut ctx.state.arena, args.len() as i64);

    let argv_slot = ctx.state.arena.alloc_stack(8, 8).ok_or_else(|| Fatal::no_parser("startup stack exhausted"))?;
    let argv_val = Value::new(ptr_ptr_ty, argv_slot, ValueFlags::default());
    argv_val.write_addr(&mut ctx.state.arena, argv_addr as u64);

    Ok(vec![argc_val, argv_val])
}
