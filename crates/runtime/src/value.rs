//! Runtime values: a `Value` is a typed view over some bytes in the arena.
//!
//! Per the spec, a `Value` never owns its bytes directly - it's
//! `{ValueType*, data pointer, flags}` - so this module stays thin: the
//! byte-level read/write helpers below interpret a `TypeId`'s base kind to
//! decide how many bytes to touch and how to sign-extend them, but the
//! actual storage always lives in a `picoc_core::Arena`.
//!
//! Function and macro definitions are the one case worth calling out: a
//! function-typed `Value`'s bytes hold not a C value but a `FunctionId`
//! (a `u64` index into `picoc-interp`'s function table, chosen so the
//! layering stays leaf-to-root: this crate doesn't know what a token is).

use crate::types::{BaseKind, TypeId, TypeTable};
use picoc_core::{Addr, Arena};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValueFlags {
    /// Data lives in the arena's stack region, released by scope/frame pop
    /// rather than by an explicit free.
    pub on_stack: bool,
    /// Data is at an address this `Value` does not own: a struct member
    /// projection, a dereferenced pointer, or a platform-exposed variable.
    pub absolute_address: bool,
    /// Created at top level, outside any function body.
    pub outside_function: bool,
    /// Whether assignment through this `Value` is meaningful. `&v` requires
    /// `v.flags.is_lvalue`; a materialized arithmetic result (e.g. `a + b`)
    /// is not an lvalue even though, like everything else here, it lives at
    /// some arena address.
    pub is_lvalue: bool,
}

/// A runtime value: a typed view over some arena bytes.
#[derive(Debug, Clone)]
pub struct Value {
    pub ty: TypeId,
    pub addr: Addr,
    pub flags: ValueFlags,
    /// Back-pointer to the enclosing lvalue, for correct assignment through
    /// `s.m` / `s->m` projections (spec: "Member access").
    pub lvalue_from: Option<Box<Value>>,
}

impl Value {
    pub fn new(ty: TypeId, addr: Addr, flags: ValueFlags) -> Self {
        Value { ty, addr, flags, lvalue_from: None }
    }

    pub fn with_lvalue_from(mut self, parent: Value) -> Self {
        self.lvalue_from = Some(Box::new(parent));
        self
    }

    /// Read this value as a signed 64-bit integer, promoting through the
    /// usual integer-kind widths and sign-extending (or zero-extending, for
    /// the unsigned kinds) to the interpreter's wide integer. This is the
    /// "any integer kind is coerced to the host `long`" rule from the
    /// expression evaluator's arithmetic model.
    pub fn read_int(&self, types: &TypeTable, arena: &Arena) -> i64 {
        let node = types.node(self.ty);
        let raw = arena.read_uint(self.addr, node.size.max(1));
        match node.base {
            BaseKind::Char => raw as u8 as i8 as i64,
            BaseKind::Short => raw as u16 as i16 as i64,
            BaseKind::Int => raw as u32 as i32 as i64,
            BaseKind::Long => raw as i64,
            BaseKind::UnsignedChar | BaseKind::UnsignedShort | BaseKind::UnsignedInt | BaseKind::UnsignedLong => raw as i64,
            BaseKind::Enum => raw as u32 as i32 as i64,
            BaseKind::Pointer | BaseKind::Function => raw as i64,
            other => panic!("read_int on non-integer type {other:?}"),
        }
    }

    /// Narrow and write `value` into this slot's destination width, per the
    /// assignment rule "coerces it to the destination type, writes into the
    /// destination's data pointer".
    pub fn write_int(&self, types: &TypeTable, arena: &mut Arena, value: i64) {
        let node = types.node(self.ty);
        arena.write_uint(self.addr, node.size.max(1), value as u64);
    }

    pub fn read_float(&self, arena: &Arena) -> f64 {
        arena.read_f64(self.addr)
    }

    pub fn write_float(&self, arena: &mut Arena, value: f64) {
        arena.write_f64(self.addr, value);
    }

    /// Read this value as an address (pointer payload or function id).
    pub fn read_addr(&self, arena: &Arena) -> u64 {
        arena.read_u64(self.addr)
    }

    pub fn write_addr(&self, arena: &mut Arena, value: u64) {
        arena.write_u64(self.addr, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_reads_sign_extend() {
        let mut arena = Arena::new(64);
        let mut types = TypeTable::new();
        let char_ty = types.primitive(BaseKind::Char);
        let addr = arena.alloc_stack(1, 1).unwrap();
        arena.write_u8(addr, 0xFF);
        let v = Value::new(char_ty, addr, ValueFlags::default());
        assert_eq!(v.read_int(&types, &arena), -1);
    }

    #[test]
    fn unsigned_char_reads_zero_extend() {
        let mut arena = Arena::new(64);
        let mut types = TypeTable::new();
        let uchar_ty = types.primitive(BaseKind::UnsignedChar);
        let addr = arena.alloc_stack(1, 1).unwrap();
        arena.write_u8(addr, 0xFF);
        let v = Value::new(uchar_ty, addr, ValueFlags::default());
        assert_eq!(v.read_int(&types, &arena), 255);
    }

    #[test]
    fn write_then_read_round_trips() {
        let mut arena = Arena::new(64);
        let mut types = TypeTable::new();
        let int_ty = types.primitive(BaseKind::Int);
        let addr = arena.alloc_stack(4, 4).unwrap();
        let v = Value::new(int_ty, addr, ValueFlags::default());
        v.write_int(&types, &mut arena, -42);
        assert_eq!(v.read_int(&types, &arena), -42);
    }
}
