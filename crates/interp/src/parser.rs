//! The statement parser/evaluator.
//!
//! Like `expr`, this never builds an AST: `exec_statement` parses one
//! statement's grammar and, if `exec` is true, carries out its effect in
//! the same pass. `exec = false` is this layer's equivalent of picoc's
//! `RunMode::Skip` - the untaken arm of an `if`, or the body of a `while`
//! whose condition never held, still has to be walked once to leave the
//! cursor in the right place, just without calling anything or touching a
//! variable.
//!
//! `RunMode` carries the handful of control-transfer outcomes that *do*
//! need to propagate back up through nested statements: `break`/`continue`
//! unwind to the nearest loop or `switch`, `return` unwinds to the
//! enclosing function call, and `goto` unwinds all the way to the function
//! call too (gotos are resolved against the whole of a function's body,
//! never across function boundaries, which a token-slice re-parse makes
//! natural: each call only ever sees its own body's tokens).

use crate::ctx::Ctx;
use crate::expr::{self, Cursor};
use crate::func::{FunctionDef, FunctionId, FunctionKind, NativeFn, Param};
use crate::lexer::{lex, Token, TokenKind};
use picoc_core::Atom;
use picoc_runtime::{BaseKind, Fatal, Pos, StackFrame, TypeId, Value, ValueFlags};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub enum RunMode {
    Run,
    Break,
    Continue,
    Return,
    Goto(Atom),
}

/// Tokenise and parse `source` as a whole translation unit: a sequence of
/// declarations, function definitions, typedefs and preprocessor
/// directives, executed as they're parsed (there's no separate
/// compile-then-run phase - top-level code runs top to bottom exactly
/// once, the same way `#define`d constants and global initialisers do).
pub(crate) fn parse_translation_unit(ctx: &mut Ctx, file_name: &str, source: &str) -> Result<(), Fatal> {
    let tokens = lex(file_name, source, &mut ctx.state.interner)?;
    let mut cur = Cursor::new(&tokens, file_name);
    while cur.peek() != &TokenKind::Eof {
        parse_top_level_item(ctx, &mut cur)?;
    }
    Ok(())
}

/// The public parse entry: tokenise and run `source` as a complete
/// translation unit. `picoc_interp::api::parse` and `library::include` both
/// delegate here.
pub(crate) fn parse(ctx: &mut Ctx, file_name: &str, source: &str) -> Result<(), Fatal> {
    parse_translation_unit(ctx, file_name, source)
}

fn parse_top_level_item(ctx: &mut Ctx, cur: &mut Cursor) -> Result<(), Fatal> {
    match cur.peek() {
        TokenKind::HashInclude => parse_hash_include(ctx, cur),
        TokenKind::HashDefine => parse_hash_define(ctx, cur),
        TokenKind::HashIf | TokenKind::HashIfdef | TokenKind::HashIfndef => parse_hash_if_toplevel(ctx, cur),
        TokenKind::HashElse | TokenKind::HashEndif => {
            cur.advance();
            Ok(())
        }
        TokenKind::Typedef => parse_typedef(ctx, cur),
        TokenKind::Semicolon => {
            cur.advance();
            Ok(())
        }
        _ => parse_declaration_or_function(ctx, cur, true),
    }
}

// ---------------------------------------------------------------------
// Type names
// ---------------------------------------------------------------------

pub(crate) fn looks_like_type_name(ctx: &Ctx, cur: &Cursor, offset: usize) -> bool {
    match cur.peek_at(offset) {
        TokenKind::Void
        | TokenKind::Char
        | TokenKind::Short
        | TokenKind::Int
        | TokenKind::Long
        | TokenKind::Unsigned
        | TokenKind::Signed
        | TokenKind::Double
        | TokenKind::Struct
        | TokenKind::Union
        | TokenKind::Enum
        | TokenKind::Const
        | TokenKind::Volatile => true,
        TokenKind::Identifier(name) => ctx.typedefs.contains(&name),
        _ => false,
    }
}

/// `(type-name)` for a cast or `sizeof` - a base type plus any number of
/// `*` and `[]` suffixes, with no declared identifier.
pub(crate) fn parse_type_name(ctx: &mut Ctx, cur: &mut Cursor) -> Result<TypeId, Fatal> {
    let mut ty = parse_base_type(ctx, cur)?;
    while cur.peek() == &TokenKind::Star {
        cur.advance();
        ty = ctx.state.types.pointer_to(ty);
    }
    while cur.peek() == &TokenKind::LBracket {
        cur.advance();
        let len = if cur.peek() != &TokenKind::RBracket {
            let v = expr::eval_expression(ctx, cur, true)?;
            Some(v.read_int(&ctx.state.types, &ctx.state.arena) as u32)
        } else {
            None
        };
        cur.eat(&TokenKind::RBracket)?;
        ty = ctx.state.types.array_of(ty, len);
    }
    Ok(ty)
}

fn parse_base_type(ctx: &mut Ctx, cur: &mut Cursor) -> Result<TypeId, Fatal> {
    while matches!(cur.peek(), TokenKind::Const | TokenKind::Volatile) {
        cur.advance();
    }
    let mut unsigned = None;
    loop {
        match cur.peek() {
            TokenKind::Unsigned => {
                unsigned = Some(true);
                cur.advance();
            }
            TokenKind::Signed => {
                unsigned = Some(false);
                cur.advance();
            }
            _ => break,
        }
    }
    let ty = match cur.peek().clone() {
        TokenKind::Void => {
            cur.advance();
            ctx.state.types.primitive(BaseKind::Void)
        }
        TokenKind::Char => {
            cur.advance();
            ctx.state.types.primitive(if unsigned == Some(true) { BaseKind::UnsignedChar } else { BaseKind::Char })
        }
        TokenKind::Short => {
            cur.advance();
            if cur.peek() == &TokenKind::Int {
                cur.advance();
            }
            ctx.state.types.primitive(if unsigned == Some(true) { BaseKind::UnsignedShort } else { BaseKind::Short })
        }
        TokenKind::Long => {
            cur.advance();
            if cur.peek() == &TokenKind::Int {
                cur.advance();
            }
            if cur.peek() == &TokenKind::Long {
                cur.advance();
            }
            ctx.state.types.primitive(if unsigned == Some(true) { BaseKind::UnsignedLong } else { BaseKind::Long })
        }
        TokenKind::Int => {
            cur.advance();
            ctx.state.types.primitive(if unsigned == Some(true) { BaseKind::UnsignedInt } else { BaseKind::Int })
        }
        TokenKind::Double => {
            cur.advance();
            ctx.state.types.primitive(BaseKind::Fp)
        }
        TokenKind::Struct | TokenKind::Union => {
            let is_union = cur.peek() == &TokenKind::Union;
            cur.advance();
            let name = expr::expect_identifier(cur)?;
            let base = if is_union { BaseKind::Union } else { BaseKind::Struct };
            let id = ctx.state.types.get_matching(None, base, None, Some(name), true).map_err(|e| cur.fail(e.to_string()))?;
            if cur.peek() == &TokenKind::LBrace {
                cur.advance();
                let mut fields = Vec::new();
                while cur.peek() != &TokenKind::RBrace {
                    let field_ty = parse_base_type(ctx, cur)?;
                    loop {
                        let (fname, fty) = parse_declarator(ctx, cur, field_ty)?;
                        fields.push((fname, fty));
                        if cur.peek() == &TokenKind::Comma {
                            cur.advance();
                        } else {
                            break;
                        }
                    }
                    cur.eat(&TokenKind::Semicolon)?;
                }
                cur.advance(); // }
                ctx.state.types.complete_struct_or_union(id, fields);
            }
            id
        }
        TokenKind::Enum => {
            cur.advance();
            let name = expr::expect_identifier(cur)?;
            let id =
                ctx.state.types.get_matching(None, BaseKind::Enum, None, Some(name), true).map_err(|e| cur.fail(e.to_string()))?;
            if cur.peek() == &TokenKind::LBrace {
                cur.advance();
                let int_ty = ctx.state.types.primitive(BaseKind::Int);
                loop {
                    let ename = expr::expect_identifier(cur)?;
                    let explicit = if cur.peek() == &TokenKind::Assign {
                        cur.advance();
                        let v = expr::eval_expression(ctx, cur, true)?;
                        Some(v.read_int(&ctx.state.types, &ctx.state.arena))
                    } else {
                        None
                    };
                    let value = ctx.state.types.add_enumerator(id, ename, explicit);
                    let addr = ctx.state.arena.alloc_heap(4, 4).ok_or_else(|| cur.fail("arena exhausted defining an enumerator"))?;
                    let val = Value::new(int_ty, addr, ValueFlags { outside_function: true, is_lvalue: true, ..Default::default() });
                    val.write_int(&ctx.state.types, &mut ctx.state.arena, value);
                    ctx.state.globals.set(ename, val, cur.pos_here());
                    if cur.peek() == &TokenKind::Comma {
                        cur.advance();
                    } else {
                        break;
                    }
                }
                cur.eat(&TokenKind::RBrace)?;
            }
            id
        }
        TokenKind::Identifier(name) => match ctx.typedefs.get(&name) {
            Some(&ty) => {
                cur.advance();
                ty
            }
            None => return Err(cur.fail("expected a type name")),
        },
        other => return Err(cur.fail(format!("expected a type name, found {other:?}"))),
    };
    Ok(ty)
}

/// Pointer stars, an identifier, and any number of `[const-expr]` array
/// suffixes - the shape shared by variable declarators, struct members,
/// and function parameters.
fn parse_declarator(ctx: &mut Ctx, cur: &mut Cursor, mut ty: TypeId) -> Result<(Atom, TypeId), Fatal> {
    while cur.peek() == &TokenKind::Star {
        cur.advance();
        ty = ctx.state.types.pointer_to(ty);
    }
    let name = expr::expect_identifier(cur)?;
    while cur.peek() == &TokenKind::LBracket {
        cur.advance();
        let len = if cur.peek() != &TokenKind::RBracket {
            let v = expr::eval_expression(ctx, cur, true)?;
            Some(v.read_int(&ctx.state.types, &ctx.state.arena) as u32)
        } else {
            None
        };
        cur.eat(&TokenKind::RBracket)?;
        ty = ctx.state.types.array_of(ty, len);
    }
    Ok((name, ty))
}

fn parse_typedef(ctx: &mut Ctx, cur: &mut Cursor) -> Result<(), Fatal> {
    cur.advance(); // typedef
    let base = parse_base_type(ctx, cur)?;
    let (name, ty) = parse_declarator(ctx, cur, base)?;
    cur.eat(&TokenKind::Semicolon)?;
    ctx.typedefs.replace(name, ty);
    Ok(())
}

// ---------------------------------------------------------------------
// Declarations and function definitions
// ---------------------------------------------------------------------

fn parse_declaration_or_function(ctx: &mut Ctx, cur: &mut Cursor, allow_function_def: bool) -> Result<(), Fatal> {
    let is_static = match cur.peek() {
        TokenKind::Static => {
            cur.advance();
            true
        }
        TokenKind::Extern => {
            cur.advance();
            false
        }
        _ => false,
    };
    let base_ty = parse_base_type(ctx, cur)?;
    if cur.peek() == &TokenKind::Semicolon {
        cur.advance(); // e.g. a bare `struct Foo;` forward declaration
        return Ok(());
    }
    loop {
        let mut ty = base_ty;
        while cur.peek() == &TokenKind::Star {
            cur.advance();
            ty = ctx.state.types.pointer_to(ty);
        }
        let name = expr::expect_identifier(cur)?;
        if allow_function_def && matches!(cur.peek(), TokenKind::LParen | TokenKind::MacroOpenParen) {
            parse_function_rest(ctx, cur, name, ty)?;
            return Ok(());
        }
        while cur.peek() == &TokenKind::LBracket {
            cur.advance();
            let len = if cur.peek() != &TokenKind::RBracket {
                let v = expr::eval_expression(ctx, cur, true)?;
                Some(v.read_int(&ctx.state.types, &ctx.state.arena) as u32)
            } else {
                None
            };
            cur.eat(&TokenKind::RBracket)?;
            ty = ctx.state.types.array_of(ty, len);
        }
        let decl_pos = cur.pos_here();
        let (value, run_init) = declare_variable(ctx, cur, name, ty, is_static, decl_pos)?;
        if cur.peek() == &TokenKind::Assign {
            cur.advance();
            if cur.peek() == &TokenKind::LBrace {
                parse_brace_initializer(ctx, cur, &value, run_init)?;
            } else {
                let init = expr::eval_expression(ctx, cur, run_init)?;
                if run_init {
                    expr::assign(ctx, &value, &init);
                }
            }
        }
        if cur.peek() == &TokenKind::Comma {
            cur.advance();
        } else {
            break;
        }
    }
    cur.eat(&TokenKind::Semicolon)?;
    Ok(())
}

fn declare_variable(ctx: &mut Ctx, cur: &Cursor, name: Atom, ty: TypeId, is_static: bool, decl_pos: Pos) -> Result<(Value, bool), Fatal> {
    if ctx.state.in_function() && !is_static {
        let node = ctx.state.types.node(ty);
        let (size, align) = (node.size.max(1), node.align.max(1));
        let addr = ctx.state.arena.alloc_stack(size, align).ok_or_else(|| cur.fail("stack exhausted declaring a local variable"))?;
        let value = Value::new(ty, addr, ValueFlags { on_stack: true, is_lvalue: true, ..Default::default() });
        ctx.state.scopes.current().set(name, value.clone(), decl_pos);
        Ok((value, true))
    } else if ctx.state.in_function() && is_static {
        let fn_name = ctx.state.current_frame().expect("in_function implies a frame").function_name;
        let fn_text = ctx.state.interner.resolve(fn_name).to_string();
        let var_text = ctx.state.interner.resolve(name).to_string();
        let mangled = ctx.state.interner.register(&format!("{fn_text}::{var_text}@{}:{}", decl_pos.line, decl_pos.column));
        let node_size = ctx.state.types.size_of(ty).max(1);
        let node_align = ctx.state.types.align_of(ty).max(1);
        let picoc_runtime::InterpreterState { globals, arena, .. } = &mut ctx.state;
        let (value, first) = picoc_runtime::define_static_ignore_identical(globals, mangled, decl_pos, || {
            let addr = arena.alloc_heap(node_size, node_align).ok_or_else(|| cur.fail("arena exhausted declaring a static local"))?;
            Ok(Value::new(ty, addr, ValueFlags { outside_function: true, is_lvalue: true, ..Default::default() }))
        })?;
        ctx.state.scopes.current().set(name, value.clone(), decl_pos);
        Ok((value, first))
    } else {
        let node_size = ctx.state.types.size_of(ty).max(1);
        let node_align = ctx.state.types.align_of(ty).max(1);
        let addr = ctx.state.arena.alloc_heap(node_size, node_align).ok_or_else(|| cur.fail("arena exhausted declaring a global variable"))?;
        let value = Value::new(ty, addr, ValueFlags { outside_function: true, is_lvalue: true, ..Default::default() });
        ctx.state.globals.set(name, value.clone(), decl_pos);
        Ok((value, true))
    }
}

/// `= { ... }` - one level of element-wise initialization for an array or
/// struct/union. Nested aggregate initializers (`{{1,2},{3,4}}`) aren't
/// supported; picoc programs overwhelmingly initialise one level deep.
fn parse_brace_initializer(ctx: &mut Ctx, cur: &mut Cursor, target: &Value, run_init: bool) -> Result<(), Fatal> {
    cur.eat(&TokenKind::LBrace)?;
    let mut values = Vec::new();
    if cur.peek() != &TokenKind::RBrace {
        loop {
            values.push(expr::eval_expression(ctx, cur, run_init)?);
            if cur.peek() == &TokenKind::Comma {
                cur.advance();
                if cur.peek() == &TokenKind::RBrace {
                    break;
                }
            } else {
                break;
            }
        }
    }
    cur.eat(&TokenKind::RBrace)?;
    if !run_init {
        return Ok(());
    }
    match ctx.state.types.node(target.ty).base {
        BaseKind::Array => {
            let elem = ctx.state.types.node(target.ty).from_type.expect("array node has an element type");
            if ctx.state.types.node(target.ty).array_size.is_none() {
                ctx.state.types.fix_array_length(target.ty, values.len() as u32);
            }
            let elem_size = ctx.state.types.size_of(elem).max(1);
            for (i, v) in values.iter().enumerate() {
                let addr = target.addr + i as u32 * elem_size;
                let slot = Value::new(elem, addr, ValueFlags { is_lvalue: true, ..Default::default() });
                expr::assign(ctx, &slot, v);
            }
        }
        BaseKind::Struct | BaseKind::Union => {
            let members = ctx.state.types.node(target.ty).members.clone().unwrap_or_default();
            for (member, v) in members.iter().zip(values.iter()) {
                let addr = target.addr + member.offset;
                let slot = Value::new(member.ty, addr, ValueFlags { is_lvalue: true, ..Default::default() });
                expr::assign(ctx, &slot, v);
            }
        }
        _ => {}
    }
    Ok(())
}

fn parse_function_rest(ctx: &mut Ctx, cur: &mut Cursor, name: Atom, return_type: TypeId) -> Result<(), Fatal> {
    cur.advance(); // '(' or the macro-open-paren lexed before this identifier's '('
    let mut params = Vec::new();
    let mut is_variadic = false;
    if cur.peek() != &TokenKind::RParen {
        loop {
            if cur.peek() == &TokenKind::Ellipsis {
                cur.advance();
                is_variadic = true;
                break;
            }
            if cur.peek() == &TokenKind::Void && cur.peek_at(1) == &TokenKind::RParen {
                cur.advance();
                break;
            }
            let pty = parse_base_type(ctx, cur)?;
            let (pname, pty) = parse_declarator(ctx, cur, pty)?;
            params.push(Param { name: pname, ty: pty });
            if cur.peek() == &TokenKind::Comma {
                cur.advance();
            } else {
                break;
            }
        }
    }
    cur.eat(&TokenKind::RParen)?;

    if cur.peek() == &TokenKind::Semicolon {
        cur.advance();
        return register_function(ctx, cur, name, params, return_type, is_variadic, None);
    }

    let (start, end) = skip_balanced_braces(ctx, cur)?;
    let mut body: Vec<Token> = cur.tokens[start..=end].to_vec();
    body.push(Token { kind: TokenKind::Eof, pos: cur.pos_here() });
    register_function(ctx, cur, name, params, return_type, is_variadic, Some(Rc::new(body)))
}

/// Install `name` in the function table and the global symbol table.
/// `body: None` records a forward declaration (`int f(int);`); `Some`
/// records a full definition. Redefining a name that's already fully
/// defined is a `Fatal` ("'name' is already defined" in the original); a
/// prior prototype is simply replaced once the real definition arrives.
fn register_function(
    ctx: &mut Ctx,
    cur: &mut Cursor,
    name: Atom,
    params: Vec<Param>,
    return_type: TypeId,
    is_variadic: bool,
    body: Option<Rc<Vec<Token>>>,
) -> Result<(), Fatal> {
    let mut had_existing = false;
    let mut existing_is_full = false;
    if let Some(entry) = ctx.state.globals.get(name) {
        had_existing = true;
        if ctx.state.types.node(entry.value.ty).base == BaseKind::Function {
            let existing_id = entry.value.read_addr(&ctx.state.arena) as FunctionId;
            existing_is_full = !ctx.functions.get(existing_id).is_prototype();
        }
    }
    if existing_is_full {
        let text = ctx.state.interner.resolve(name).to_string();
        return Err(cur.fail(format!("'{text}' is already defined")));
    }
    if had_existing {
        ctx.state.globals.delete(name);
    }

    let kind = match body {
        Some(body) => FunctionKind::Normal { body, is_variadic },
        None => FunctionKind::Prototype { is_variadic },
    };
    let fn_ty = ctx.state.types.get_matching(None, BaseKind::Function, None, None, true).expect("function types always canonicalize");
    let id = ctx.functions.register(FunctionDef { name, params, return_type, kind });
    let addr = ctx.state.arena.alloc_heap(8, 8).ok_or_else(|| cur.fail("arena exhausted registering a function"))?;
    let value = Value::new(fn_ty, addr, ValueFlags { outside_function: true, ..Default::default() });
    value.write_addr(&mut ctx.state.arena, id as u64);
    ctx.state.globals.set(name, value, cur.pos_here());
    Ok(())
}

/// Scan from `cur.peek() == LBrace` to its matching `}` by actually
/// walking the statement grammar with `exec = false` (syntax-checking the
/// body at definition time, the way a real call's `exec = false` path
/// walks an un-taken branch) rather than just counting brace tokens, and
/// return `(start, end)` token indices (`end` is the closing brace
/// itself). Advances `cur` past the closing brace.
fn skip_balanced_braces(ctx: &mut Ctx, cur: &mut Cursor) -> Result<(usize, usize), Fatal> {
    let start = cur.pos;
    exec_block(ctx, cur, false)?;
    let end = cur.pos.saturating_sub(1);
    if !matches!(cur.tokens.get(end).map(|t| &t.kind), Some(TokenKind::RBrace)) {
        return Err(cur.fail("unterminated function body: missing '}'"));
    }
    Ok((start, end))
}

// ---------------------------------------------------------------------
// Calling
// ---------------------------------------------------------------------

fn snapshot(ctx: &Ctx, v: &Value) -> (TypeId, Vec<u8>) {
    let size = ctx.state.types.size_of(v.ty).max(1);
    (v.ty, ctx.state.arena.read_bytes(v.addr, size).to_vec())
}

/// Call function/macro `id` with already-evaluated `args`.
///
/// `exec = false` (a call reached only inside an un-taken branch) never
/// actually invokes anything - it just needs a correctly-typed placeholder
/// so the surrounding expression grammar finishes parsing.
///
/// The returned `Value`'s bytes are copied into a *fresh* slot allocated
/// after the call's own stack frame is torn down: the callee's locals
/// (including whatever the return expression pointed at) live in stack
/// memory popped at the end of this call, so the result has to be copied
/// out before that memory is reclaimed, not handed back by reference.
pub(crate) fn call_function(ctx: &mut Ctx, id: FunctionId, args: &[Value], exec: bool, cur: &Cursor) -> Result<Value, Fatal> {
    if !exec {
        let return_type = ctx.functions.get(id).return_type;
        let size = ctx.state.types.size_of(return_type).max(1);
        let addr = ctx
            .state
            .arena
            .alloc_stack(size, ctx.state.types.align_of(return_type).max(1))
            .ok_or_else(|| cur.fail("arena exhausted"))?;
        return Ok(Value::new(return_type, addr, ValueFlags::default()));
    }

    enum Plan {
        Intrinsic(NativeFn),
        Normal(Rc<Vec<Token>>),
        Macro(Rc<Vec<Token>>),
    }

    let (params, return_type, plan, fn_name) = {
        let def = ctx.functions.get(id);
        let plan = match &def.kind {
            FunctionKind::Intrinsic(f) => Plan::Intrinsic(*f),
            FunctionKind::Normal { body, .. } => Plan::Normal(body.clone()),
            FunctionKind::Macro { body } => Plan::Macro(body.clone()),
            FunctionKind::Prototype { .. } => {
                let text = ctx.state.interner.resolve(def.name).to_string();
                return Err(cur.fail(format!("'{text}' is declared but not defined")));
            }
        };
        (def.params.iter().map(|p| (p.name, p.ty)).collect::<Vec<_>>(), def.return_type, plan, def.name)
    };

    if let Plan::Intrinsic(f) = plan {
        return f(ctx, args);
    }

    if args.len() < params.len() {
        let text = ctx.state.interner.resolve(fn_name).to_string();
        return Err(cur.fail(format!("too few arguments calling '{text}'")));
    }

    let mark = ctx.state.arena.stack_mark();
    let scope_id = ctx.state.scopes.begin();
    for ((pname, pty), arg) in params.iter().zip(args.iter()) {
        let converted = expr::convert_to(ctx, arg, *pty, cur)?;
        ctx.state.scopes.current().set(*pname, converted, Pos::default());
    }
    let depth = ctx.state.scopes.depth();
    ctx.state.frames.push(StackFrame::new(Vec::new(), cur.pos as u32, depth, scope_id, fn_name));

    let outcome: Result<(TypeId, Vec<u8>), Fatal> = (|| match &plan {
        Plan::Macro(body) => {
            let mut body_cur = Cursor::new(body, cur.file_name.clone());
            let v = expr::eval_expression(ctx, &mut body_cur, true)?;
            Ok(snapshot(ctx, &v))
        }
        Plan::Normal(body) => {
            let mut body_cur = Cursor::new(body, cur.file_name.clone());
            exec_function_body(ctx, &mut body_cur)?;
            match ctx.state.current_frame().and_then(|f| f.return_value.clone()) {
                Some(v) => Ok(snapshot(ctx, &v)),
                None => Ok((return_type, vec![0u8; ctx.state.types.size_of(return_type).max(1) as usize])),
            }
        }
        Plan::Intrinsic(_) => unreachable!("handled above"),
    })();

    ctx.state.frames.pop();
    ctx.state.scopes.end();
    ctx.state.arena.pop_stack_to(mark);

    let (ty, bytes) = outcome?;
    let size = bytes.len().max(1) as u32;
    let align = ctx.state.types.align_of(ty).max(1);
    let addr = ctx.state.arena.alloc_stack(size, align).ok_or_else(|| cur.fail("arena exhausted materializing a call result"))?;
    ctx.state.arena.write_bytes(addr, &bytes);
    Ok(Value::new(ty, addr, ValueFlags::default()))
}

fn find_label(tokens: &[Token], label: Atom) -> Option<usize> {
    for (i, tok) in tokens.iter().enumerate() {
        if let TokenKind::Identifier(a) = tok.kind {
            if a == label && tokens.get(i + 1).map(|t| &t.kind) == Some(&TokenKind::Colon) {
                return Some(i + 2);
            }
        }
    }
    None
}

fn exec_function_body(ctx: &mut Ctx, cur: &mut Cursor) -> Result<(), Fatal> {
    cur.eat(&TokenKind::LBrace)?;
    ctx.state.scopes.begin();
    let mut mode = exec_statements_until_rbrace(ctx, cur, true)?;
    let mut guard = 0u32;
    while let RunMode::Goto(label) = mode {
        guard += 1;
        if guard > 10_000 {
            return Err(cur.fail("goto did not converge"));
        }
        match find_label(cur.tokens, label) {
            Some(target) => {
                cur.pos = target;
                mode = exec_statements_until_rbrace(ctx, cur, true)?;
            }
            None => {
                let text = ctx.state.interner.resolve(label).to_string();
                return Err(cur.fail(format!("label '{text}' not found")));
            }
        }
    }
    ctx.state.scopes.end();
    if matches!(mode, RunMode::Break | RunMode::Continue) {
        tracing::warn!("break/continue reached the end of a function body; ignoring");
    }
    Ok(())
}

// ---------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------

/// Run statements until (and including) the matching `}`, or `Eof`.
/// Stops early - skipping to the enclosing `}` without executing anything
/// further - the moment a statement yields a non-`Run` mode, so the
/// caller's cursor still ends up past the block.
fn exec_statements_until_rbrace(ctx: &mut Ctx, cur: &mut Cursor, exec: bool) -> Result<RunMode, Fatal> {
    loop {
        match cur.peek() {
            TokenKind::RBrace => {
                cur.advance();
                return Ok(RunMode::Run);
            }
            TokenKind::Eof => return Ok(RunMode::Run),
            _ => {
                let mode = exec_statement(ctx, cur, exec)?;
                if !matches!(mode, RunMode::Run) {
                    skip_to_enclosing_rbrace(cur);
                    return Ok(mode);
                }
            }
        }
    }
}

/// Token-level (not statement-aware) scan to the first unmatched `}`,
/// tracking nested brace depth. Used once a block has already decided to
/// bail out early (via `break`/`return`/`goto`) and just needs its cursor
/// past the rest of the block's tokens.
fn skip_to_enclosing_rbrace(cur: &mut Cursor) {
    let mut depth = 0i32;
    loop {
        match cur.peek() {
            TokenKind::LBrace => {
                depth += 1;
                cur.advance();
            }
            TokenKind::RBrace => {
                if depth == 0 {
                    cur.advance();
                    return;
                }
                depth -= 1;
                cur.advance();
            }
            TokenKind::Eof => return,
            _ => {
                cur.advance();
            }
        }
    }
}

fn exec_block(ctx: &mut Ctx, cur: &mut Cursor, exec: bool) -> Result<RunMode, Fatal> {
    cur.eat(&TokenKind::LBrace)?;
    ctx.state.scopes.begin();
    let mode = exec_statements_until_rbrace(ctx, cur, exec)?;
    ctx.state.scopes.end();
    Ok(mode)
}

fn exec_statement(ctx: &mut Ctx, cur: &mut Cursor, exec: bool) -> Result<RunMode, Fatal> {
    match cur.peek().clone() {
        TokenKind::LBrace => exec_block(ctx, cur, exec),
        TokenKind::Semicolon => {
            cur.advance();
            Ok(RunMode::Run)
        }
        TokenKind::If => exec_if(ctx, cur, exec),
        TokenKind::While => exec_while(ctx, cur, exec),
        TokenKind::Do => exec_do_while(ctx, cur, exec),
        TokenKind::For => exec_for(ctx, cur, exec),
        TokenKind::Switch => exec_switch(ctx, cur, exec),
        TokenKind::Break => {
            cur.advance();
            cur.eat(&TokenKind::Semicolon)?;
            Ok(RunMode::Break)
        }
        TokenKind::Continue => {
            cur.advance();
            cur.eat(&TokenKind::Semicolon)?;
            Ok(RunMode::Continue)
        }
        TokenKind::Return => exec_return(ctx, cur, exec),
        TokenKind::Goto => exec_goto(ctx, cur, exec),
        TokenKind::Typedef => {
            parse_typedef(ctx, cur)?;
            Ok(RunMode::Run)
        }
        TokenKind::HashDefine => {
            parse_hash_define(ctx, cur)?;
            Ok(RunMode::Run)
        }
        TokenKind::HashInclude => {
            parse_hash_include(ctx, cur)?;
            Ok(RunMode::Run)
        }
        TokenKind::HashIf | TokenKind::HashIfdef | TokenKind::HashIfndef => exec_hash_if_stmt(ctx, cur, exec),
        TokenKind::Delete => exec_delete(ctx, cur, exec),
        TokenKind::Identifier(_) if cur.peek_at(1) == &TokenKind::Colon => {
            cur.advance();
            cur.advance();
            Ok(RunMode::Run)
        }
        _ if looks_like_type_name(ctx, cur, 0) => {
            parse_declaration_or_function(ctx, cur, false)?;
            Ok(RunMode::Run)
        }
        _ => {
            expr::eval_expression(ctx, cur, exec)?;
            cur.eat(&TokenKind::Semicolon)?;
            Ok(RunMode::Run)
        }
    }
}

fn exec_if(ctx: &mut Ctx, cur: &mut Cursor, exec: bool) -> Result<RunMode, Fatal> {
    cur.advance();
    cur.eat(&TokenKind::LParen)?;
    let cond = expr::eval_expression(ctx, cur, exec)?;
    cur.eat(&TokenKind::RParen)?;
    let take_then = exec && expr::truthy(ctx, &cond);
    let then_mode = exec_statement(ctx, cur, take_then)?;
    let mut result = if take_then { then_mode } else { RunMode::Run };
    if cur.peek() == &TokenKind::Else {
        cur.advance();
        let take_else = exec && !take_then;
        let else_mode = exec_statement(ctx, cur, take_else)?;
        if take_else {
            result = else_mode;
        }
    }
    Ok(result)
}

fn exec_while(ctx: &mut Ctx, cur: &mut Cursor, exec: bool) -> Result<RunMode, Fatal> {
    cur.advance(); // while
    cur.eat(&TokenKind::LParen)?;
    let cond_start = cur.pos;
    if !exec {
        expr::eval_expression(ctx, cur, false)?;
        cur.eat(&TokenKind::RParen)?;
        exec_statement(ctx, cur, false)?;
        return Ok(RunMode::Run);
    }
    loop {
        let mark = ctx.state.arena.stack_mark();
        cur.pos = cond_start;
        let cond = expr::eval_expression(ctx, cur, true)?;
        cur.eat(&TokenKind::RParen)?;
        let take = expr::truthy(ctx, &cond);
        let mode = exec_statement(ctx, cur, take)?;
        if !take {
            ctx.state.arena.pop_stack_to(mark);
            break;
        }
        match mode {
            RunMode::Break => {
                ctx.state.arena.pop_stack_to(mark);
                break;
            }
            RunMode::Return | RunMode::Goto(_) => return Ok(mode),
            _ => {}
        }
        ctx.state.arena.pop_stack_to(mark);
    }
    Ok(RunMode::Run)
}

fn exec_do_while(ctx: &mut Ctx, cur: &mut Cursor, exec: bool) -> Result<RunMode, Fatal> {
    cur.advance(); // do
    let body_start = cur.pos;
    if !exec {
        exec_statement(ctx, cur, false)?;
        cur.eat(&TokenKind::While)?;
        cur.eat(&TokenKind::LParen)?;
        expr::eval_expression(ctx, cur, false)?;
        cur.eat(&TokenKind::RParen)?;
        cur.eat(&TokenKind::Semicolon)?;
        return Ok(RunMode::Run);
    }
    loop {
        let mark = ctx.state.arena.stack_mark();
        cur.pos = body_start;
        let mode = exec_statement(ctx, cur, true)?;
        match mode {
            RunMode::Break => {
                cur.eat(&TokenKind::While)?;
                cur.eat(&TokenKind::LParen)?;
                expr::eval_expression(ctx, cur, false)?;
                cur.eat(&TokenKind::RParen)?;
                cur.eat(&TokenKind::Semicolon)?;
                ctx.state.arena.pop_stack_to(mark);
                break;
            }
            RunMode::Return | RunMode::Goto(_) => return Ok(mode),
            _ => {}
        }
        cur.eat(&TokenKind::While)?;
        cur.eat(&TokenKind::LParen)?;
        let cond = expr::eval_expression(ctx, cur, true)?;
        cur.eat(&TokenKind::RParen)?;
        cur.eat(&TokenKind::Semicolon)?;
        if !expr::truthy(ctx, &cond) {
            ctx.state.arena.pop_stack_to(mark);
            break;
        }
        ctx.state.arena.pop_stack_to(mark);
    }
    Ok(RunMode::Run)
}

fn exec_for(ctx: &mut Ctx, cur: &mut Cursor, exec: bool) -> Result<RunMode, Fatal> {
    cur.advance(); // for
    cur.eat(&TokenKind::LParen)?;
    ctx.state.scopes.begin();
    if cur.peek() == &TokenKind::Semicolon {
        cur.advance();
    } else if looks_like_type_name(ctx, cur, 0) {
        parse_declaration_or_function(ctx, cur, false)?;
    } else {
        expr::eval_expression(ctx, cur, exec)?;
        cur.eat(&TokenKind::Semicolon)?;
    }

    let cond_start = cur.pos;
    if !exec {
        if cur.peek() != &TokenKind::Semicolon {
            expr::eval_expression(ctx, cur, false)?;
        }
        cur.eat(&TokenKind::Semicolon)?;
        if cur.peek() != &TokenKind::RParen {
            expr::eval_expression(ctx, cur, false)?;
        }
        cur.eat(&TokenKind::RParen)?;
        exec_statement(ctx, cur, false)?;
        ctx.state.scopes.end();
        return Ok(RunMode::Run);
    }

    loop {
        let mark = ctx.state.arena.stack_mark();
        cur.pos = cond_start;
        let take = if cur.peek() == &TokenKind::Semicolon {
            true
        } else {
            let c = expr::eval_expression(ctx, cur, true)?;
            expr::truthy(ctx, &c)
        };
        cur.eat(&TokenKind::Semicolon)?;
        let incr_start = cur.pos;
        if cur.peek() != &TokenKind::RParen {
            expr::eval_expression(ctx, cur, false)?;
        }
        cur.eat(&TokenKind::RParen)?;
        let mode = exec_statement(ctx, cur, take)?;
        if !take {
            ctx.state.arena.pop_stack_to(mark);
            break;
        }
        match mode {
            RunMode::Break => {
                ctx.state.arena.pop_stack_to(mark);
                break;
            }
            RunMode::Return | RunMode::Goto(_) => {
                ctx.state.scopes.end();
                return Ok(mode);
            }
            _ => {}
        }
        cur.pos = incr_start;
        if cur.peek() != &TokenKind::RParen {
            expr::eval_expression(ctx, cur, true)?;
        }
        ctx.state.arena.pop_stack_to(mark);
    }
    ctx.state.scopes.end();
    Ok(RunMode::Run)
}

fn exec_switch(ctx: &mut Ctx, cur: &mut Cursor, exec: bool) -> Result<RunMode, Fatal> {
    cur.advance();
    cur.eat(&TokenKind::LParen)?;
    let scrut = expr::eval_expression(ctx, cur, exec)?;
    cur.eat(&TokenKind::RParen)?;
    let scrut_val = if exec { scrut.read_int(&ctx.state.types, &ctx.state.arena) } else { 0 };
    cur.eat(&TokenKind::LBrace)?;
    ctx.state.scopes.begin();
    let mut matched = !exec;
    let mut result_mode = RunMode::Run;
    loop {
        match cur.peek().clone() {
            TokenKind::RBrace => {
                cur.advance();
                break;
            }
            TokenKind::Eof => break,
            TokenKind::Case => {
                cur.advance();
                let val = expr::eval_expression(ctx, cur, true)?;
                cur.eat(&TokenKind::Colon)?;
                if exec && !matched && val.read_int(&ctx.state.types, &ctx.state.arena) == scrut_val {
                    matched = true;
                }
            }
            TokenKind::Default => {
                cur.advance();
                cur.eat(&TokenKind::Colon)?;
                if exec && !matched {
                    matched = true;
                }
            }
            _ => {
                let mode = exec_statement(ctx, cur, matched)?;
                if matched && !matches!(mode, RunMode::Run) {
                    result_mode = mode;
                    skip_to_enclosing_rbrace(cur);
                    break;
                }
            }
        }
    }
    ctx.state.scopes.end();
    if let RunMode::Break = result_mode {
        result_mode = RunMode::Run;
    }
    Ok(result_mode)
}

fn exec_return(ctx: &mut Ctx, cur: &mut Cursor, exec: bool) -> Result<RunMode, Fatal> {
    cur.advance();
    let value = if cur.peek() != &TokenKind::Semicolon { Some(expr::eval_expression(ctx, cur, exec)?) } else { None };
    cur.eat(&TokenKind::Semicolon)?;
    if exec {
        if let Some(v) = value {
            if let Some(frame) = ctx.state.current_frame_mut() {
                frame.return_value = Some(v);
            }
        }
        Ok(RunMode::Return)
    } else {
        Ok(RunMode::Run)
    }
}

fn exec_goto(ctx: &mut Ctx, cur: &mut Cursor, exec: bool) -> Result<RunMode, Fatal> {
    cur.advance();
    let label = expr::expect_identifier(cur)?;
    cur.eat(&TokenKind::Semicolon)?;
    let _ = ctx;
    if exec { Ok(RunMode::Goto(label)) } else { Ok(RunMode::Run) }
}

fn exec_delete(ctx: &mut Ctx, cur: &mut Cursor, exec: bool) -> Result<RunMode, Fatal> {
    cur.advance();
    let name = expr::expect_identifier(cur)?;
    cur.eat(&TokenKind::Semicolon)?;
    if exec {
        let entry = ctx.state.scopes.lookup_local(name).cloned().or_else(|| ctx.state.globals.get(name).cloned());
        if let Some(entry) = entry {
            let size = ctx.state.types.size_of(entry.value.ty).max(1);
            ctx.state.arena.free_heap(entry.value.addr, size);
        }
        if ctx.state.scopes.depth() > 0 {
            ctx.state.scopes.current().delete(name);
        }
        ctx.state.globals.delete(name);
    }
    Ok(RunMode::Run)
}

// ---------------------------------------------------------------------
// Preprocessor
// ---------------------------------------------------------------------

fn parse_hash_include(ctx: &mut Ctx, cur: &mut Cursor) -> Result<(), Fatal> {
    cur.advance(); // #include
    let header = match cur.peek().clone() {
        TokenKind::StringLiteral(atom) => {
            cur.advance();
            ctx.state.interner.resolve(atom).to_string()
        }
        TokenKind::Lt => {
            cur.advance();
            let mut name = String::new();
            loop {
                match cur.advance().clone() {
                    TokenKind::Gt => break,
                    TokenKind::Identifier(a) => name.push_str(ctx.state.interner.resolve(a)),
                    TokenKind::Dot => name.push('.'),
                    TokenKind::Eof => return Err(cur.fail("unterminated #include <...>")),
                    other => return Err(cur.fail(format!("unexpected token in #include: {other:?}"))),
                }
            }
            name
        }
        other => return Err(cur.fail(format!("expected a header name after #include, found {other:?}"))),
    };
    let header = header.strip_suffix(".h").unwrap_or(&header).to_string();
    crate::library::LibraryRegistry::include(ctx, &header)
}

fn parse_hash_define(ctx: &mut Ctx, cur: &mut Cursor) -> Result<(), Fatal> {
    cur.advance(); // #define
    let name = expr::expect_identifier(cur)?;
    let params = if cur.peek() == &TokenKind::MacroOpenParen {
        cur.advance();
        let mut ps = Vec::new();
        if cur.peek() != &TokenKind::RParen {
            loop {
                ps.push(expr::expect_identifier(cur)?);
                if cur.peek() == &TokenKind::Comma {
                    cur.advance();
                } else {
                    break;
                }
            }
        }
        cur.eat(&TokenKind::RParen)?;
        ps
    } else {
        Vec::new()
    };

    let body_start = cur.pos;
    expr::eval_expression(ctx, cur, false)?;
    let body_end = cur.pos;
    let mut body: Vec<Token> = cur.tokens[body_start..body_end].to_vec();
    body.push(Token { kind: TokenKind::Eof, pos: cur.pos_here() });

    let int_ty = ctx.state.types.primitive(BaseKind::Int);
    let macro_ty = ctx.state.types.get_matching(None, BaseKind::Macro, None, None, true).expect("macro types always canonicalize");
    let id = ctx.functions.register(FunctionDef {
        name,
        params: params.into_iter().map(|p| Param { name: p, ty: int_ty }).collect(),
        return_type: int_ty,
        kind: FunctionKind::Macro { body: Rc::new(body) },
    });
    let addr = ctx.state.arena.alloc_heap(8, 8).ok_or_else(|| cur.fail("arena exhausted registering a macro"))?;
    let value = Value::new(macro_ty, addr, ValueFlags { outside_function: true, ..Default::default() });
    value.write_addr(&mut ctx.state.arena, id as u64);
    ctx.state.globals.set(name, value, cur.pos_here());
    Ok(())
}

fn is_defined(ctx: &Ctx, name: Atom) -> bool {
    ctx.state.globals.contains(name) || ctx.state.scopes.lookup_local(name).is_some()
}

/// Token-level scan, not statement-aware: skip from just after a failed
/// `#if`/`#ifdef`/`#ifndef` condition to the matching `#else` or `#endif`,
/// tracking nested conditionals so an inner `#endif` doesn't end the
/// outer block early. Stops *before* consuming the `#else`/`#endif`
/// itself, since the two callers (top-level and statement-level) need to
/// react to which one it was.
fn skip_preprocessor_block(cur: &mut Cursor) -> Result<(), Fatal> {
    let mut depth = 0i32;
    loop {
        match cur.peek() {
            TokenKind::HashIf | TokenKind::HashIfdef | TokenKind::HashIfndef => {
                depth += 1;
                cur.advance();
            }
            TokenKind::HashEndif => {
                if depth == 0 {
                    return Ok(());
                }
                depth -= 1;
                cur.advance();
            }
            TokenKind::HashElse => {
                if depth == 0 {
                    return Ok(());
                }
                cur.advance();
            }
            TokenKind::Eof => return Err(cur.fail("unterminated #if")),
            _ => {
                cur.advance();
            }
        }
    }
}

fn parse_hash_if_toplevel(ctx: &mut Ctx, cur: &mut Cursor) -> Result<(), Fatal> {
    let kind = cur.peek().clone();
    cur.advance();
    let holds = match kind {
        TokenKind::HashIfdef => {
            let name = expr::expect_identifier(cur)?;
            is_defined(ctx, name)
        }
        TokenKind::HashIfndef => {
            let name = expr::expect_identifier(cur)?;
            !is_defined(ctx, name)
        }
        TokenKind::HashIf => {
            let v = expr::eval_expression(ctx, cur, true)?;
            v.read_int(&ctx.state.types, &ctx.state.arena) != 0
        }
        _ => unreachable!(),
    };
    if holds {
        parse_top_level_until_else_or_endif(ctx, cur)
    } else {
        skip_preprocessor_block(cur)?;
        if cur.peek() == &TokenKind::HashElse {
            cur.advance();
            parse_top_level_until_else_or_endif(ctx, cur)
        } else {
            if cur.peek() == &TokenKind::HashEndif {
                cur.advance();
            }
            Ok(())
        }
    }
}

fn parse_top_level_until_else_or_endif(ctx: &mut Ctx, cur: &mut Cursor) -> Result<(), Fatal> {
    loop {
        match cur.peek() {
            TokenKind::HashElse => {
                cur.advance();
                skip_preprocessor_block(cur)?;
                if cur.peek() == &TokenKind::HashEndif {
                    cur.advance();
                }
                return Ok(());
            }
            TokenKind::HashEndif => {
                cur.advance();
                return Ok(());
            }
            TokenKind::Eof => return Ok(()),
            _ => parse_top_level_item(ctx, cur)?,
        }
    }
}

fn exec_hash_if_stmt(ctx: &mut Ctx, cur: &mut Cursor, exec: bool) -> Result<RunMode, Fatal> {
    let kind = cur.peek().clone();
    cur.advance();
    let holds = match kind {
        TokenKind::HashIfdef => {
            let name = expr::expect_identifier(cur)?;
            exec && is_defined(ctx, name)
        }
        TokenKind::HashIfndef => {
            let name = expr::expect_identifier(cur)?;
            exec && !is_defined(ctx, name)
        }
        TokenKind::HashIf => {
            let v = expr::eval_expression(ctx, cur, exec)?;
            exec && v.read_int(&ctx.state.types, &ctx.state.arena) != 0
        }
        _ => unreachable!(),
    };
    if holds {
        exec_stmts_until_else_or_endif(ctx, cur, true)
    } else {
        skip_preprocessor_block(cur)?;
        if cur.peek() == &TokenKind::HashElse {
            cur.advance();
            exec_stmts_until_else_or_endif(ctx, cur, exec)
        } else {
            if cur.peek() == &TokenKind::HashEndif {
                cur.advance();
            }
            Ok(RunMode::Run)
        }
    }
}

fn exec_stmts_until_else_or_endif(ctx: &mut Ctx, cur: &mut Cursor, exec: bool) -> Result<RunMode, Fatal> {
    loop {
        match cur.peek() {
            TokenKind::HashElse => {
                cur.advance();
                skip_preprocessor_block(cur)?;
                if cur.peek() == &TokenKind::HashEndif {
                    cur.advance();
                }
                return Ok(RunMode::Run);
            }
            TokenKind::HashEndif => {
                cur.advance();
                return Ok(RunMode::Run);
            }
            TokenKind::Eof | TokenKind::RBrace => return Ok(RunMode::Run),
            _ => {
                let mode = exec_statement(ctx, cur, exec)?;
                if !matches!(mode, RunMode::Run) {
                    return Ok(mode);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use picoc_runtime::{InterpreterState, Io};

    fn new_ctx() -> Ctx {
        Ctx::new(InterpreterState::new(64 * 1024, Io { stdout: Box::new(Vec::new()), stderr: Box::new(Vec::new()), stdin: Box::new(std::io::empty()) }))
    }

    #[test]
    fn runs_an_if_else_and_updates_a_global() {
        let mut ctx = new_ctx();
        parse(&mut ctx, "t.c", "int x; int main() { if (1) x = 7; else x = 9; return 0; }").unwrap();
        let name = ctx.state.interner.register("x");
        let v = ctx.state.globals.get(name).unwrap().value.clone();
        assert_eq!(v.read_int(&ctx.state.types, &ctx.state.arena), 0);

        let main_name = ctx.state.interner.register("main");
        let main_val = ctx.state.globals.get(main_name).unwrap().value.clone();
        let main_id = main_val.read_addr(&ctx.state.arena) as u32;
        let tokens = vec![Token { kind: TokenKind::Eof, pos: Pos::default() }];
        let cur = Cursor::new(&tokens, "t.c");
        call_function(&mut ctx, main_id, &[], true, &cur).unwrap();

        let v = ctx.state.globals.get(name).unwrap().value.clone();
        assert_eq!(v.read_int(&ctx.state.types, &ctx.state.arena), 7);
    }

    #[test]
    fn while_loop_accumulates() {
        let mut ctx = new_ctx();
        parse(&mut ctx, "t.c", "int total; int main() { int i; i = 0; total = 0; while (i < 5) { total = total + i; i = i + 1; } return total; }").unwrap();
        let main_name = ctx.state.interner.register("main");
        let main_val = ctx.state.globals.get(main_name).unwrap().value.clone();
        let main_id = main_val.read_addr(&ctx.state.arena) as u32;
        let tokens = vec![Token { kind: TokenKind::Eof, pos: Pos::default() }];
        let cur = Cursor::new(&tokens, "t.c");
        let result = call_function(&mut ctx, main_id, &[], true, &cur).unwrap();
        assert_eq!(result.read_int(&ctx.state.types, &ctx.state.arena), 10);
    }

    #[test]
    fn function_call_round_trips_an_argument() {
        let mut ctx = new_ctx();
        parse(&mut ctx, "t.c", "int square(int n) { return n * n; }").unwrap();
        let name = ctx.state.interner.register("square");
        let val = ctx.state.globals.get(name).unwrap().value.clone();
        let id = val.read_addr(&ctx.state.arena) as u32;
        let tokens = vec![Token { kind: TokenKind::Eof, pos: Pos::default() }];
        let cur = Cursor::new(&tokens, "t.c");
        let int_ty = ctx.state.types.primitive(BaseKind::Int);
        let addr = ctx.state.arena.alloc_stack(4, 4).unwrap();
        let arg = Value::new(int_ty, addr, ValueFlags::default());
        arg.write_int(&ctx.state.types, &mut ctx.state.arena, 6);
        let result = call_function(&mut ctx, id, &[arg], true, &cur).unwrap();
        assert_eq!(result.read_int(&ctx.state.types, &ctx.state.arena), 36);
    }

    #[test]
    fn object_like_macro_expands_to_its_body() {
        let mut ctx = new_ctx();
        parse(&mut ctx, "t.c", "#define ANSWER 42\nint x; int main() { x = ANSWER; return 0; }").unwrap();
        let main_name = ctx.state.interner.register("main");
        let main_val = ctx.state.globals.get(main_name).unwrap().value.clone();
        let main_id = main_val.read_addr(&ctx.state.arena) as u32;
        let tokens = vec![Token { kind: TokenKind::Eof, pos: Pos::default() }];
        let cur = Cursor::new(&tokens, "t.c");
        call_function(&mut ctx, main_id, &[], true, &cur).unwrap();
        let name = ctx.state.interner.register("x");
        let v = ctx.state.globals.get(name).unwrap().value.clone();
        assert_eq!(v.read_int(&ctx.state.types, &ctx.state.arena), 42);
    }

    #[test]
    fn goto_jumps_to_a_label_in_the_same_function() {
        let mut ctx = new_ctx();
        parse(&mut ctx, "t.c", "int main() { int x; x = 1; goto skip; x = 2; skip: return x; }").unwrap();
        let main_name = ctx.state.interner.register("main");
        let main_val = ctx.state.globals.get(main_name).unwrap().value.clone();
        let main_id = main_val.read_addr(&ctx.state.arena) as u32;
        let tokens = vec![Token { kind: TokenKind::Eof, pos: Pos::default() }];
        let cur = Cursor::new(&tokens, "t.c");
        let result = call_function(&mut ctx, main_id, &[], true, &cur).unwrap();
        assert_eq!(result.read_int(&ctx.state.types, &ctx.state.arena), 1);
    }
}
