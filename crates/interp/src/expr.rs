//! The expression evaluator.
//!
//! There is no separate AST: each `eval_*` function both parses its
//! grammar level and immediately produces the `Value` it denotes, exactly
//! the way picoc's `ExpressionParse` walks the token stream once. The
//! `exec` flag is this crate's stand-in for the parts of picoc's `RunMode`
//! that matter at expression granularity: `exec = false` still walks the
//! full grammar (so the cursor ends up in the right place and `sizeof`
//! still sees real types) but suppresses assignment, increment, and actual
//! function invocation, instead threading through zeroed placeholder
//! values of the right type. `&&`/`||` use it for real short-circuiting.

use crate::ctx::Ctx;
use crate::lexer::{Token, TokenKind};
use crate::parser;
use picoc_runtime::{BaseKind, Fatal, Pos, TypeId, Value, ValueFlags};

pub struct Cursor<'t> {
    pub tokens: &'t [Token],
    pub pos: usize,
    pub file_name: String,
}

impl<'t> Cursor<'t> {
    pub fn new(tokens: &'t [Token], file_name: impl Into<String>) -> Self {
        Cursor { tokens, pos: 0, file_name: file_name.into() }
    }

    pub fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    pub fn peek_at(&self, ahead: usize) -> &TokenKind {
        let idx = (self.pos + ahead).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    pub fn pos_here(&self) -> Pos {
        self.tokens[self.pos.min(self.tokens.len() - 1)].pos
    }

    pub fn advance(&mut self) -> &TokenKind {
        let kind = &self.tokens[self.pos.min(self.tokens.len() - 1)].kind;
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        kind
    }

    pub fn eat(&mut self, kind: &TokenKind) -> Result<(), Fatal> {
        if self.peek() == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.fail(format!("expected {kind:?}, found {:?}", self.peek())))
        }
    }

    pub fn fail(&self, msg: impl Into<String>) -> Fatal {
        Fatal::new(self.file_name.clone(), self.pos_here(), msg.into())
    }
}

fn alloc_value(ctx: &mut Ctx, ty: TypeId, flags: ValueFlags, cur: &Cursor) -> Result<Value, Fatal> {
    let node = ctx.state.types.node(ty);
    let size = node.size.max(1);
    let align = node.align.max(1);
    let addr = ctx.state.arena.alloc_stack(size, align).ok_or_else(|| cur.fail("expression stack exhausted"))?;
    Ok(Value::new(ty, addr, flags))
}

fn int_value(ctx: &mut Ctx, ty: TypeId, v: i64, cur: &Cursor) -> Result<Value, Fatal> {
    let value = alloc_value(ctx, ty, ValueFlags::default(), cur)?;
    value.write_int(&ctx.state.types, &mut ctx.state.arena, v);
    Ok(value)
}

fn float_value(ctx: &mut Ctx, v: f64, cur: &Cursor) -> Result<Value, Fatal> {
    let ty = ctx.state.types.primitive(BaseKind::Fp);
    let value = alloc_value(ctx, ty, ValueFlags::default(), cur)?;
    value.write_float(&mut ctx.state.arena, v);
    Ok(value)
}

fn pointer_value(ctx: &mut Ctx, pointee: TypeId, addr: u32, cur: &Cursor) -> Result<Value, Fatal> {
    let ty = ctx.state.types.pointer_to(pointee);
    let value = alloc_value(ctx, ty, ValueFlags::default(), cur)?;
    value.write_addr(&mut ctx.state.arena, addr as u64);
    Ok(value)
}

fn is_float_ty(ctx: &Ctx, ty: TypeId) -> bool {
    ctx.state.types.node(ty).base == BaseKind::Fp
}

fn is_pointer_ty(ctx: &Ctx, ty: TypeId) -> bool {
    matches!(ctx.state.types.node(ty).base, BaseKind::Pointer | BaseKind::Array)
}

/// Usual arithmetic conversions, simplified to "the wider type wins, ties
/// go to unsigned" - close enough to C's integer promotion rules for an
/// interpreter that never straddles a real ABI boundary.
fn promote(ctx: &Ctx, a: TypeId, b: TypeId) -> TypeId {
    let (na, nb) = (ctx.state.types.node(a), ctx.state.types.node(b));
    if na.size != nb.size {
        if na.size > nb.size { a } else { b }
    } else if na.base.is_unsigned() {
        a
    } else if nb.base.is_unsigned() {
        b
    } else {
        a
    }
}

/// Top of the precedence table: assignment, right-associative.
pub fn eval_expression(ctx: &mut Ctx, cur: &mut Cursor, exec: bool) -> Result<Value, Fatal> {
    eval_assignment(ctx, cur, exec)
}

fn eval_assignment(ctx: &mut Ctx, cur: &mut Cursor, exec: bool) -> Result<Value, Fatal> {
    let lhs = eval_ternary(ctx, cur, exec)?;
    use TokenKind::*;
    let compound = match cur.peek() {
        Assign => None,
        PlusAssign => Some(Plus),
        MinusAssign => Some(Minus),
        StarAssign => Some(Star),
        SlashAssign => Some(Slash),
        PercentAssign => Some(Percent),
        AndAssign => Some(Amp),
        OrAssign => Some(Pipe),
        XorAssign => Some(Caret),
        ShlAssign => Some(Shl),
        ShrAssign => Some(Shr),
        _ => return Ok(lhs),
    };
    cur.advance();
    let rhs = eval_assignment(ctx, cur, exec)?;
    if !lhs.flags.is_lvalue && exec {
        return Err(cur.fail("left-hand side of assignment is not an lvalue"));
    }
    let computed = match compound {
        None => rhs,
        Some(op) => apply_binop(ctx, &op, &lhs, &rhs, cur)?,
    };
    if exec {
        assign(ctx, &lhs, &computed);
    }
    Ok(lhs)
}

pub(crate) fn assign(ctx: &mut Ctx, lhs: &Value, rhs: &Value) {
    if is_float_ty(ctx, lhs.ty) {
        let v = if is_float_ty(ctx, rhs.ty) { rhs.read_float(&ctx.state.arena) } else { rhs.read_int(&ctx.state.types, &ctx.state.arena) as f64 };
        lhs.write_float(&mut ctx.state.arena, v);
    } else if is_pointer_ty(ctx, lhs.ty) {
        let v = if is_pointer_ty(ctx, rhs.ty) { rhs.read_addr(&ctx.state.arena) } else { rhs.read_int(&ctx.state.types, &ctx.state.arena) as u64 };
        lhs.write_addr(&mut ctx.state.arena, v);
    } else {
        let v = if is_float_ty(ctx, rhs.ty) { rhs.read_float(&ctx.state.arena) as i64 } else { rhs.read_int(&ctx.state.types, &ctx.state.arena) };
        lhs.write_int(&ctx.state.types, &mut ctx.state.arena, v);
    }
}

fn eval_ternary(ctx: &mut Ctx, cur: &mut Cursor, exec: bool) -> Result<Value, Fatal> {
    let cond = eval_logical_or(ctx, cur, exec)?;
    if cur.peek() != &TokenKind::Question {
        return Ok(cond);
    }
    cur.advance();
    let taken = exec && truthy(ctx, &cond);
    let then_val = eval_expression(ctx, cur, taken)?;
    cur.eat(&TokenKind::Colon)?;
    let else_val = eval_assignment(ctx, cur, exec && !taken)?;
    Ok(if taken { then_val } else { else_val })
}

pub(crate) fn truthy(ctx: &Ctx, v: &Value) -> bool {
    if is_float_ty(ctx, v.ty) {
        v.read_float(&ctx.state.arena) != 0.0
    } else if is_pointer_ty(ctx, v.ty) {
        v.read_addr(&ctx.state.arena) != 0
    } else {
        v.read_int(&ctx.state.types, &ctx.state.arena) != 0
    }
}

macro_rules! left_assoc {
    ($name:ident, $next:ident, [$($tok:pat => $apply:expr),+ $(,)?]) => {
        fn $name(ctx: &mut Ctx, cur: &mut Cursor, exec: bool) -> Result<Value, Fatal> {
            let mut lhs = $next(ctx, cur, exec)?;
            loop {
                match cur.peek() {
                    $($tok => {
                        cur.advance();
                        let rhs = $next(ctx, cur, exec)?;
                        lhs = $apply(ctx, cur, lhs, rhs)?;
                    })+
                    _ => break,
                }
            }
            Ok(lhs)
        }
    };
}

fn eval_logical_or(ctx: &mut Ctx, cur: &mut Cursor, exec: bool) -> Result<Value, Fatal> {
    let mut lhs = eval_logical_and(ctx, cur, exec)?;
    while cur.peek() == &TokenKind::OrOr {
        cur.advance();
        let lhs_true = exec && truthy(ctx, &lhs);
        let rhs = eval_logical_and(ctx, cur, exec && !lhs_true)?;
        let result = lhs_true || (exec && truthy(ctx, &rhs));
        let int_ty = ctx.state.types.primitive(BaseKind::Int);
        lhs = int_value(ctx, int_ty, result as i64, cur)?;
    }
    Ok(lhs)
}

fn eval_logical_and(ctx: &mut Ctx, cur: &mut Cursor, exec: bool) -> Result<Value, Fatal> {
    let mut lhs = eval_bitor(ctx, cur, exec)?;
    while cur.peek() == &TokenKind::AndAnd {
        cur.advance();
        let lhs_true = exec && truthy(ctx, &lhs);
        let rhs = eval_bitor(ctx, cur, exec && lhs_true)?;
        let result = lhs_true && (exec && truthy(ctx, &rhs));
        let int_ty = ctx.state.types.primitive(BaseKind::Int);
        lhs = int_value(ctx, int_ty, result as i64, cur)?;
    }
    Ok(lhs)
}

left_assoc!(eval_bitor, eval_bitxor, [TokenKind::Pipe => |ctx: &mut Ctx, cur: &mut Cursor, l, r| apply_binop(ctx, &TokenKind::Pipe, &l, &r, cur)]);
left_assoc!(eval_bitxor, eval_bitand, [TokenKind::Caret => |ctx: &mut Ctx, cur: &mut Cursor, l, r| apply_binop(ctx, &TokenKind::Caret, &l, &r, cur)]);
left_assoc!(eval_bitand, eval_equality, [TokenKind::Amp => |ctx: &mut Ctx, cur: &mut Cursor, l, r| apply_binop(ctx, &TokenKind::Amp, &l, &r, cur)]);
left_assoc!(eval_equality, eval_relational, [
    TokenKind::EqEq => |ctx: &mut Ctx, cur: &mut Cursor, l, r| apply_binop(ctx, &TokenKind::EqEq, &l, &r, cur),
    TokenKind::NotEq => |ctx: &mut Ctx, cur: &mut Cursor, l, r| apply_binop(ctx, &TokenKind::NotEq, &l, &r, cur),
]);
left_assoc!(eval_relational, eval_shift, [
    TokenKind::Lt => |ctx: &mut Ctx, cur: &mut Cursor, l, r| apply_binop(ctx, &TokenKind::Lt, &l, &r, cur),
    TokenKind::Gt => |ctx: &mut Ctx, cur: &mut Cursor, l, r| apply_binop(ctx, &TokenKind::Gt, &l, &r, cur),
    TokenKind::Le => |ctx: &mut Ctx, cur: &mut Cursor, l, r| apply_binop(ctx, &TokenKind::Le, &l, &r, cur),
    TokenKind::Ge => |ctx: &mut Ctx, cur: &mut Cursor, l, r| apply_binop(ctx, &TokenKind::Ge, &l, &r, cur),
]);
left_assoc!(eval_shift, eval_additive, [
    TokenKind::Shl => |ctx: &mut Ctx, cur: &mut Cursor, l, r| apply_binop(ctx, &TokenKind::Shl, &l, &r, cur),
    TokenKind::Shr => |ctx: &mut Ctx, cur: &mut Cursor, l, r| apply_binop(ctx, &TokenKind::Shr, &l, &r, cur),
]);
left_assoc!(eval_additive, eval_multiplicative, [
    TokenKind::Plus => |ctx: &mut Ctx, cur: &mut Cursor, l, r| apply_binop(ctx, &TokenKind::Plus, &l, &r, cur),
    TokenKind::Minus => |ctx: &mut Ctx, cur: &mut Cursor, l, r| apply_binop(ctx, &TokenKind::Minus, &l, &r, cur),
]);
left_assoc!(eval_multiplicative, eval_cast, [
    TokenKind::Star => |ctx: &mut Ctx, cur: &mut Cursor, l, r| apply_binop(ctx, &TokenKind::Star, &l, &r, cur),
    TokenKind::Slash => |ctx: &mut Ctx, cur: &mut Cursor, l, r| apply_binop(ctx, &TokenKind::Slash, &l, &r, cur),
    TokenKind::Percent => |ctx: &mut Ctx, cur: &mut Cursor, l, r| apply_binop(ctx, &TokenKind::Percent, &l, &r, cur),
]);

/// `(type-name) expr` - casts. Distinguished from a parenthesised
/// sub-expression by peeking for a type-introducing token right after `(`.
fn eval_cast(ctx: &mut Ctx, cur: &mut Cursor, exec: bool) -> Result<Value, Fatal> {
    if cur.peek() == &TokenKind::LParen && parser::looks_like_type_name(ctx, cur, 1) {
        cur.advance();
        let ty = parser::parse_type_name(ctx, cur)?;
        cur.eat(&TokenKind::RParen)?;
        let operand = eval_cast(ctx, cur, exec)?;
        return convert_to(ctx, &operand, ty, cur);
    }
    eval_unary(ctx, cur, exec)
}

pub(crate) fn convert_to(ctx: &mut Ctx, v: &Value, ty: TypeId, cur: &Cursor) -> Result<Value, Fatal> {
    if is_float_ty(ctx, ty) {
        let f = if is_float_ty(ctx, v.ty) { v.read_float(&ctx.state.arena) } else { v.read_int(&ctx.state.types, &ctx.state.arena) as f64 };
        float_value(ctx, f, cur)
    } else if is_pointer_ty(ctx, ty) {
        let a = if is_pointer_ty(ctx, v.ty) { v.read_addr(&ctx.state.arena) } else { v.read_int(&ctx.state.types, &ctx.state.arena) as u64 };
        let value = alloc_value(ctx, ty, ValueFlags::default(), cur)?;
        value.write_addr(&mut ctx.state.arena, a);
        Ok(value)
    } else {
        let i = if is_float_ty(ctx, v.ty) { v.read_float(&ctx.state.arena) as i64 } else { v.read_int(&ctx.state.types, &ctx.state.arena) };
        int_value(ctx, ty, i, cur)
    }
}

fn eval_unary(ctx: &mut Ctx, cur: &mut Cursor, exec: bool) -> Result<Value, Fatal> {
    match cur.peek().clone() {
        TokenKind::Sizeof => {
            cur.advance();
            let ty = if cur.peek() == &TokenKind::LParen && parser::looks_like_type_name(ctx, cur, 1) {
                cur.advance();
                let ty = parser::parse_type_name(ctx, cur)?;
                cur.eat(&TokenKind::RParen)?;
                ty
            } else {
                let operand = eval_unary(ctx, cur, false)?;
                operand.ty
            };
            let size = ctx.state.types.size_of(ty) as i64;
            let ulong = ctx.state.types.primitive(BaseKind::UnsignedLong);
            int_value(ctx, ulong, size, cur)
        }
        TokenKind::Amp => {
            cur.advance();
            let operand = eval_unary(ctx, cur, exec)?;
            if exec && !operand.flags.is_lvalue {
                return Err(cur.fail("cannot take the address of a non-lvalue"));
            }
            if exec { pointer_value(ctx, operand.ty, operand.addr, cur) } else { pointer_value(ctx, operand.ty, 0, cur) }
        }
        TokenKind::Star => {
            cur.advance();
            let operand = eval_unary(ctx, cur, exec)?;
            if !exec {
                return Ok(operand);
            }
            let node = ctx.state.types.node(operand.ty);
            let pointee = node.from_type.ok_or_else(|| cur.fail("dereferenced value is not a pointer"))?;
            let addr = operand.read_addr(&ctx.state.arena) as u32;
            Ok(Value::new(pointee, addr, ValueFlags { is_lvalue: true, absolute_address: true, ..Default::default() }).with_lvalue_from(operand))
        }
        TokenKind::Minus => {
            cur.advance();
            let operand = eval_unary(ctx, cur, exec)?;
            if is_float_ty(ctx, operand.ty) {
                float_value(ctx, -operand.read_float(&ctx.state.arena), cur)
            } else {
                let ty = operand.ty;
                int_value(ctx, ty, operand.read_int(&ctx.state.types, &ctx.state.arena).wrapping_neg(), cur)
            }
        }
        TokenKind::Plus => {
            cur.advance();
            eval_unary(ctx, cur, exec)
        }
        TokenKind::Not => {
            cur.advance();
            let operand = eval_unary(ctx, cur, exec)?;
            let int_ty = ctx.state.types.primitive(BaseKind::Int);
            int_value(ctx, int_ty, !truthy(ctx, &operand) as i64, cur)
        }
        TokenKind::Tilde => {
            cur.advance();
            let operand = eval_unary(ctx, cur, exec)?;
            let ty = operand.ty;
            let v = operand.read_int(&ctx.state.types, &ctx.state.arena);
            int_value(ctx, ty, !v, cur)
        }
        TokenKind::Increment | TokenKind::Decrement => {
            let inc = cur.peek() == &TokenKind::Increment;
            cur.advance();
            let operand = eval_unary(ctx, cur, exec)?;
            if exec {
                let delta = if inc { 1 } else { -1 };
                step(ctx, &operand, delta);
            }
            Ok(operand)
        }
        _ => eval_postfix(ctx, cur, exec),
    }
}

fn step(ctx: &mut Ctx, v: &Value, delta: i64) {
    if is_pointer_ty(ctx, v.ty) {
        let elem = ctx.state.types.node(v.ty).from_type.unwrap();
        let elem_size = ctx.state.types.size_of(elem).max(1) as i64;
        let addr = v.read_addr(&ctx.state.arena) as i64 + delta * elem_size;
        v.write_addr(&mut ctx.state.arena, addr as u64);
    } else if is_float_ty(ctx, v.ty) {
        let f = v.read_float(&ctx.state.arena) + delta as f64;
        v.write_float(&mut ctx.state.arena, f);
    } else {
        let n = v.read_int(&ctx.state.types, &ctx.state.arena) + delta;
        v.write_int(&ctx.state.types, &mut ctx.state.arena, n);
    }
}

fn eval_postfix(ctx: &mut Ctx, cur: &mut Cursor, exec: bool) -> Result<Value, Fatal> {
    let mut v = eval_primary(ctx, cur, exec)?;
    loop {
        match cur.peek() {
            TokenKind::LBracket => {
                cur.advance();
                let index = eval_expression(ctx, cur, exec)?;
                cur.eat(&TokenKind::RBracket)?;
                if !exec {
                    continue;
                }
                let node = ctx.state.types.node(v.ty);
                let elem = node.from_type.ok_or_else(|| cur.fail("subscripted value is not an array or pointer"))?;
                let elem_size = ctx.state.types.size_of(elem).max(1);
                let base_addr = if node.base == BaseKind::Array { v.addr } else { v.read_addr(&ctx.state.arena) as u32 };
                let idx = index.read_int(&ctx.state.types, &ctx.state.arena);
                let addr = (base_addr as i64 + idx * elem_size as i64) as u32;
                v = Value::new(elem, addr, ValueFlags { is_lvalue: true, absolute_address: true, ..Default::default() }).with_lvalue_from(v);
            }
            TokenKind::Dot => {
                cur.advance();
                let name = expect_identifier(cur)?;
                if !exec {
                    continue;
                }
                let member = ctx.state.types.member(v.ty, name).map_err(|e| cur.fail(e.to_string()))?;
                let addr = v.addr + member.offset;
                v = Value::new(member.ty, addr, ValueFlags { is_lvalue: true, absolute_address: true, ..Default::default() }).with_lvalue_from(v);
            }
            TokenKind::Arrow => {
                cur.advance();
                let name = expect_identifier(cur)?;
                if !exec {
                    continue;
                }
                let struct_ty = ctx.state.types.node(v.ty).from_type.ok_or_else(|| cur.fail("-> on a non-pointer"))?;
                let base_addr = v.read_addr(&ctx.state.arena) as u32;
                let member = ctx.state.types.member(struct_ty, name).map_err(|e| cur.fail(e.to_string()))?;
                let addr = base_addr + member.offset;
                v = Value::new(member.ty, addr, ValueFlags { is_lvalue: true, absolute_address: true, ..Default::default() }).with_lvalue_from(v);
            }
            TokenKind::Increment | TokenKind::Decrement => {
                let inc = cur.peek() == &TokenKind::Increment;
                cur.advance();
                if exec {
                    step(ctx, &v, if inc { 1 } else { -1 });
                }
            }
            TokenKind::MacroOpenParen | TokenKind::LParen => {
                v = eval_call(ctx, cur, exec, v)?;
            }
            _ => break,
        }
    }
    Ok(v)
}

pub(crate) fn expect_identifier(cur: &mut Cursor) -> Result<picoc_core::Atom, Fatal> {
    match cur.advance().clone() {
        TokenKind::Identifier(a) => Ok(a),
        other => Err(cur.fail(format!("expected an identifier, found {other:?}"))),
    }
}

fn eval_call(ctx: &mut Ctx, cur: &mut Cursor, exec: bool, callee: Value) -> Result<Value, Fatal> {
    cur.advance(); // '(' or the macro-open-paren
    let mut args = Vec::new();
    if cur.peek() != &TokenKind::RParen {
        loop {
            args.push(eval_assignment(ctx, cur, exec)?);
            if cur.peek() == &TokenKind::Comma {
                cur.advance();
            } else {
                break;
            }
        }
    }
    cur.eat(&TokenKind::RParen)?;

    let node = ctx.state.types.node(callee.ty);
    if !matches!(node.base, BaseKind::Function | BaseKind::Macro) {
        return Err(cur.fail("called value is not a function"));
    }
    let id = callee.read_addr(&ctx.state.arena) as u32;
    crate::parser::call_function(ctx, id, &args, exec, cur)
}

fn eval_primary(ctx: &mut Ctx, cur: &mut Cursor, exec: bool) -> Result<Value, Fatal> {
    match cur.peek().clone() {
        TokenKind::IntLiteral { value, is_unsigned, is_long } => {
            cur.advance();
            let base = match (is_unsigned, is_long) {
                (true, true) => BaseKind::UnsignedLong,
                (true, false) => BaseKind::UnsignedInt,
                (false, true) => BaseKind::Long,
                (false, false) => BaseKind::Int,
            };
            let ty = ctx.state.types.primitive(base);
            int_value(ctx, ty, value, cur)
        }
        TokenKind::FloatLiteral(value) => {
            cur.advance();
            float_value(ctx, value, cur)
        }
        TokenKind::CharLiteral(value) => {
            cur.advance();
            let ty = ctx.state.types.primitive(BaseKind::Char);
            int_value(ctx, ty, value, cur)
        }
        TokenKind::StringLiteral(atom) => {
            cur.advance();
            let text = ctx.state.interner.resolve(atom).to_string();
            let bytes = text.as_bytes();
            let char_ty = ctx.state.types.primitive(BaseKind::Char);
            let arr_ty = ctx.state.types.array_of(char_ty, Some(bytes.len() as u32 + 1));
            let addr = ctx.state.arena.alloc_heap(bytes.len() as u32 + 1, 1).ok_or_else(|| cur.fail("arena exhausted allocating string literal"))?;
            ctx.state.arena.write_bytes(addr, bytes);
            ctx.state.arena.write_u8(addr + bytes.len() as u32, 0);
            Ok(Value::new(arr_ty, addr, ValueFlags::default()))
        }
        TokenKind::LParen => {
            cur.advance();
            let v = eval_expression(ctx, cur, exec)?;
            cur.eat(&TokenKind::RParen)?;
            Ok(v)
        }
        TokenKind::Identifier(name) => {
            cur.advance();
            lookup_identifier(ctx, cur, name, exec)
        }
        other => Err(cur.fail(format!("unexpected token in expression: {other:?}"))),
    }
}

fn lookup_identifier(ctx: &mut Ctx, cur: &mut Cursor, name: picoc_core::Atom, exec: bool) -> Result<Value, Fatal> {
    let found = ctx.state.scopes.lookup_local(name).cloned().or_else(|| ctx.state.globals.get(name).cloned());
    if let Some(entry) = found {
        let value = entry.value;
        // An object-like macro (`#define PI 3`) is used as a bare name, with
        // no call syntax following it - expand it here, the one place that
        // sees the reference. A function-like macro referenced without `(`
        // just yields its (largely useless) function value, same as a plain
        // function name would.
        if ctx.state.types.node(value.ty).base == BaseKind::Macro {
            let id = value.read_addr(&ctx.state.arena) as u32;
            if ctx.functions.get(id).params.is_empty() {
                return parser::call_function(ctx, id, &[], exec, cur);
            }
        }
        return Ok(value);
    }
    if exec {
        let text = ctx.state.interner.resolve(name).to_string();
        return Err(cur.fail(format!("'{text}' undeclared")));
    }
    // In a non-executing subtree (e.g. the untaken branch of `? :`) an
    // undeclared name can't be resolved to a real type; stand in with `int`
    // so the surrounding grammar still parses to completion.
    let int_ty = ctx.state.types.primitive(BaseKind::Int);
    int_value(ctx, int_ty, 0, cur)
}

fn apply_binop(ctx: &mut Ctx, op: &TokenKind, lhs: &Value, rhs: &Value, cur: &mut Cursor) -> Result<Value, Fatal> {
    use TokenKind::*;

    if is_pointer_ty(ctx, lhs.ty) || is_pointer_ty(ctx, rhs.ty) {
        return apply_pointer_binop(ctx, op, lhs, rhs, cur);
    }

    if is_float_ty(ctx, lhs.ty) || is_float_ty(ctx, rhs.ty) {
        let a = if is_float_ty(ctx, lhs.ty) { lhs.read_float(&ctx.state.arena) } else { lhs.read_int(&ctx.state.types, &ctx.state.arena) as f64 };
        let b = if is_float_ty(ctx, rhs.ty) { rhs.read_float(&ctx.state.arena) } else { rhs.read_int(&ctx.state.types, &ctx.state.arena) as f64 };
        let int_ty = ctx.state.types.primitive(BaseKind::Int);
        return match op {
            Plus => float_value(ctx, a + b, cur),
            Minus => float_value(ctx, a - b, cur),
            Star => float_value(ctx, a * b, cur),
            Slash => float_value(ctx, a / b, cur),
            EqEq => int_value(ctx, int_ty, (a == b) as i64, cur),
            NotEq => int_value(ctx, int_ty, (a != b) as i64, cur),
            Lt => int_value(ctx, int_ty, (a < b) as i64, cur),
            Gt => int_value(ctx, int_ty, (a > b) as i64, cur),
            Le => int_value(ctx, int_ty, (a <= b) as i64, cur),
            Ge => int_value(ctx, int_ty, (a >= b) as i64, cur),
            other => Err(cur.fail(format!("operator {other:?} is not defined on floating-point operands"))),
        };
    }

    let result_ty = promote(ctx, lhs.ty, rhs.ty);
    let unsigned = ctx.state.types.node(result_ty).base.is_unsigned();
    let a = lhs.read_int(&ctx.state.types, &ctx.state.arena);
    let b = rhs.read_int(&ctx.state.types, &ctx.state.arena);
    let int_ty = ctx.state.types.primitive(BaseKind::Int);

    // Two's-complement wraparound on overflow and an arithmetic (sign-
    // propagating) right shift for signed operands - see the design notes'
    // resolution of these two open questions.
    match op {
        Plus => int_value(ctx, result_ty, a.wrapping_add(b), cur),
        Minus => int_value(ctx, result_ty, a.wrapping_sub(b), cur),
        Star => int_value(ctx, result_ty, a.wrapping_mul(b), cur),
        Slash => {
            if b == 0 {
                return Err(cur.fail("division by zero"));
            }
            int_value(ctx, result_ty, a.wrapping_div(b), cur)
        }
        Percent => {
            if b == 0 {
                return Err(cur.fail("division by zero"));
            }
            int_value(ctx, result_ty, a.wrapping_rem(b), cur)
        }
        Amp => int_value(ctx, result_ty, a & b, cur),
        Pipe => int_value(ctx, result_ty, a | b, cur),
        Caret => int_value(ctx, result_ty, a ^ b, cur),
        Shl => int_value(ctx, result_ty, a.wrapping_shl(b as u32), cur),
        Shr => {
            let shifted = if unsigned { ((a as u64) >> b) as i64 } else { a >> b };
            int_value(ctx, result_ty, shifted, cur)
        }
        EqEq => int_value(ctx, int_ty, (a == b) as i64, cur),
        NotEq => int_value(ctx, int_ty, (a != b) as i64, cur),
        Lt => int_value(ctx, int_ty, (a < b) as i64, cur),
        Gt => int_value(ctx, int_ty, (a > b) as i64, cur),
        Le => int_value(ctx, int_ty, (a <= b) as i64, cur),
        Ge => int_value(ctx, int_ty, (a >= b) as i64, cur),
        other => Err(cur.fail(format!("unsupported binary operator {other:?}"))),
    }
}

fn apply_pointer_binop(ctx: &mut Ctx, op: &TokenKind, lhs: &Value, rhs: &Value, cur: &mut Cursor) -> Result<Value, Fatal> {
    use TokenKind::*;
    let int_ty = ctx.state.types.primitive(BaseKind::Int);
    let long_ty = ctx.state.types.primitive(BaseKind::Long);

    if is_pointer_ty(ctx, lhs.ty) && is_pointer_ty(ctx, rhs.ty) {
        let a = lhs.read_addr(&ctx.state.arena) as i64;
        let b = rhs.read_addr(&ctx.state.arena) as i64;
        return match op {
            Minus => {
                let elem = ctx.state.types.node(lhs.ty).from_type.unwrap();
                let elem_size = ctx.state.types.size_of(elem).max(1) as i64;
                int_value(ctx, long_ty, (a - b) / elem_size, cur)
            }
            EqEq => int_value(ctx, int_ty, (a == b) as i64, cur),
            NotEq => int_value(ctx, int_ty, (a != b) as i64, cur),
            Lt => int_value(ctx, int_ty, (a < b) as i64, cur),
            Gt => int_value(ctx, int_ty, (a > b) as i64, cur),
            Le => int_value(ctx, int_ty, (a <= b) as i64, cur),
            Ge => int_value(ctx, int_ty, (a >= b) as i64, cur),
            other => Err(cur.fail(format!("operator {other:?} is not defined between two pointers"))),
        };
    }

    let (ptr, int_operand, ptr_is_lhs) =
        if is_pointer_ty(ctx, lhs.ty) { (lhs, rhs, true) } else { (rhs, lhs, false) };
    if !matches!(op, Plus | Minus) || (!ptr_is_lhs && *op == Minus) {
        return Err(cur.fail("invalid pointer arithmetic"));
    }
    let elem = ctx.state.types.node(ptr.ty).from_type.unwrap();
    let elem_size = ctx.state.types.size_of(elem).max(1) as i64;
    let n = int_operand.read_int(&ctx.state.types, &ctx.state.arena);
    let delta = if *op == Minus { -n } else { n };
    let addr = (ptr.read_addr(&ctx.state.arena) as i64 + delta * elem_size) as u32;
    pointer_value(ctx, elem, addr, cur)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use picoc_runtime::{InterpreterState, Io};

    fn eval_str(ctx: &mut Ctx, src: &str) -> Value {
        let tokens = lex("t.c", src, &mut ctx.state.interner).unwrap();
        let mut cur = Cursor::new(&tokens, "t.c");
        eval_expression(ctx, &mut cur, true).unwrap()
    }

    fn new_ctx() -> Ctx {
        Ctx::new(InterpreterState::new(64 * 1024, Io { stdout: Box::new(Vec::new()), stderr: Box::new(Vec::new()), stdin: Box::new(std::io::empty()) }))
    }

    #[test]
    fn arithmetic_precedence() {
        let mut ctx = new_ctx();
        let v = eval_str(&mut ctx, "1+2*3");
        assert_eq!(v.read_int(&ctx.state.types, &ctx.state.arena), 7);
    }

    #[test]
    fn ternary_short_circuits_the_untaken_branch() {
        let mut ctx = new_ctx();
        let v = eval_str(&mut ctx, "1 ? 5 : 1/0");
        assert_eq!(v.read_int(&ctx.state.types, &ctx.state.arena), 5);
    }

    #[test]
    fn logical_and_short_circuits() {
        let mut ctx = new_ctx();
        let v = eval_str(&mut ctx, "0 && (1/0)");
        assert_eq!(v.read_int(&ctx.state.types, &ctx.state.arena), 0);
    }

    #[test]
    fn signed_right_shift_is_arithmetic() {
        let mut ctx = new_ctx();
        let v = eval_str(&mut ctx, "(-8) >> 1");
        assert_eq!(v.read_int(&ctx.state.types, &ctx.state.arena), -4);
    }

    #[test]
    fn sizeof_type_name() {
        let mut ctx = new_ctx();
        let v = eval_str(&mut ctx, "sizeof(int)");
        assert_eq!(v.read_int(&ctx.state.types, &ctx.state.arena), 4);
    }
}
