//! The canonical type tree.
//!
//! Every `ValueType` the program ever mentions - `int`, `struct Point *`,
//! `char[16]`, the anonymous pointer-to-pointer-to-`Foo` nobody wrote down
//! explicitly - lives exactly once in this arena. `TypeTable::get_matching`
//! either finds the existing node or builds it, so two calls with the same
//! `(base, from, array_size, identifier)` always return the same `TypeId`,
//! which lets the evaluator treat type equality as a handle compare.
//!
//! Pointer/array nodes are cached as children ("derived types") hanging off
//! their element type's node, mirroring the sibling-list structure the spec
//! describes for raw pointers; named types (struct/union/enum/typedef) are
//! cached in a flat name table instead, since they have no single element
//! type to hang off of.

use picoc_core::{Atom, Table};

/// Handle into the type arena. Canonical: equal types always share an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

/// The platform "pointer size" this interpreter simulates: 8 bytes,
/// matching the 64-bit hosts picoc itself targets. Internally, addresses
/// are stored as 32-bit arena offsets (see `picoc_core::arena::Addr`) and
/// zero-extended into this 8-byte slot, which keeps struct/array layout
/// identical to a real 64-bit C compiler's without requiring a 4GB arena.
pub const POINTER_SIZE: u32 = 8;
pub const POINTER_ALIGN: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseKind {
    Void,
    Char,
    UnsignedChar,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    Fp,
    Function,
    Macro,
    Pointer,
    Array,
    Struct,
    Union,
    Enum,
    GotoLabel,
    /// A first-class reference to a type itself, as used by `typedef`'s
    /// installed symbol-table entry and by `sizeof(TypeName)`.
    Type,
}

impl BaseKind {
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            BaseKind::Char
                | BaseKind::UnsignedChar
                | BaseKind::Short
                | BaseKind::UnsignedShort
                | BaseKind::Int
                | BaseKind::UnsignedInt
                | BaseKind::Long
                | BaseKind::UnsignedLong
                | BaseKind::Enum
        )
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            BaseKind::UnsignedChar | BaseKind::UnsignedShort | BaseKind::UnsignedInt | BaseKind::UnsignedLong
        )
    }
}

/// One member of a struct/union, or one enumerator of an enum.
#[derive(Debug, Clone, Copy)]
pub struct Member {
    pub name: Atom,
    pub ty: TypeId,
    /// Byte offset within the struct/union (enum: the enumerator's value).
    pub offset: u32,
}

#[derive(Debug)]
pub struct ValueTypeNode {
    pub base: BaseKind,
    pub size: u32,
    pub align: u32,
    /// Pointee type (Pointer) or element type (Array).
    pub from_type: Option<TypeId>,
    /// `None` means an unspecified-length array, fixed up by the first
    /// counting pass over its initializer (spec: array initialisers).
    pub array_size: Option<u32>,
    pub identifier: Option<Atom>,
    pub members: Option<Vec<Member>>,
    pub members_by_name: Table<Atom, usize>,
    /// Pointer-to-self / array-of-self nodes already built, so repeated
    /// `&x` or `sizeof(T[4])` lookups are a child-list scan, not a rebuild.
    pub derived: Vec<TypeId>,
}

impl ValueTypeNode {
    fn primitive(base: BaseKind, size: u32, align: u32) -> Self {
        ValueTypeNode {
            base,
            size,
            align,
            from_type: None,
            array_size: None,
            identifier: None,
            members: None,
            members_by_name: Table::new(),
            derived: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub enum TypeError {
    AlreadyDefined(String),
    IncompleteType(String),
    UnknownMember(String),
}

impl std::fmt::Display for TypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeError::AlreadyDefined(s) => write!(f, "'{s}' already defined"),
            TypeError::IncompleteType(s) => write!(f, "'{s}' is an incomplete type"),
            TypeError::UnknownMember(s) => write!(f, "no member named '{s}'"),
        }
    }
}

pub struct TypeTable {
    nodes: Vec<ValueTypeNode>,
    named: Table<Atom, TypeId>,
    primitives: Vec<TypeId>,
}

fn primitive_index(base: BaseKind) -> usize {
    use BaseKind::*;
    match base {
        Void => 0,
        Char => 1,
        UnsignedChar => 2,
        Short => 3,
        UnsignedShort => 4,
        Int => 5,
        UnsignedInt => 6,
        Long => 7,
        UnsignedLong => 8,
        Fp => 9,
        _ => unreachable!("not a primitive base kind: {base:?}"),
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeTable {
    pub fn new() -> Self {
        let mut nodes = Vec::new();
        let mut primitives = Vec::new();
        for (base, size, align) in [
            (BaseKind::Void, 0u32, 1u32),
            (BaseKind::Char, 1, 1),
            (BaseKind::UnsignedChar, 1, 1),
            (BaseKind::Short, 2, 2),
            (BaseKind::UnsignedShort, 2, 2),
            (BaseKind::Int, 4, 4),
            (BaseKind::UnsignedInt, 4, 4),
            (BaseKind::Long, 8, 8),
            (BaseKind::UnsignedLong, 8, 8),
            (BaseKind::Fp, 8, 8),
        ] {
            primitives.push(TypeId(nodes.len() as u32));
            nodes.push(ValueTypeNode::primitive(base, size, align));
        }
        TypeTable { nodes, named: Table::new(), primitives }
    }

    pub fn node(&self, id: TypeId) -> &ValueTypeNode {
        &self.nodes[id.0 as usize]
    }

    fn node_mut(&mut self, id: TypeId) -> &mut ValueTypeNode {
        &mut self.nodes[id.0 as usize]
    }

    pub fn primitive(&self, base: BaseKind) -> TypeId {
        self.primitives[primitive_index(base)]
    }

    pub fn size_of(&self, id: TypeId) -> u32 {
        self.node(id).size
    }

    pub fn align_of(&self, id: TypeId) -> u32 {
        self.node(id).align
    }

    pub fn is_complete(&self, id: TypeId) -> bool {
        let n = self.node(id);
        match n.base {
            BaseKind::Struct | BaseKind::Union => n.members.is_some(),
            _ => true,
        }
    }

    fn push_node(&mut self, node: ValueTypeNode) -> TypeId {
        let id = TypeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Canonical pointer-to-`elem`.
    pub fn pointer_to(&mut self, elem: TypeId) -> TypeId {
        self.get_matching(Some(elem), BaseKind::Pointer, None, None, true).expect("pointer types never fail to canonicalize")
    }

    /// Canonical array-of-`elem` with the given length (`None` = flexible,
    /// fixed up later by `fix_array_length`).
    pub fn array_of(&mut self, elem: TypeId, len: Option<u32>) -> TypeId {
        self.get_matching(Some(elem), BaseKind::Array, len, None, true).expect("array types never fail to canonicalize")
    }

    /// Find or construct the type described by `(parent, base, array_size,
    /// identifier)`. `allow_dup = false` means "this must be a fresh
    /// declaration" (e.g. `struct Foo { ... }`) and fails with
    /// `AlreadyDefined` if a *complete* node already exists under that name;
    /// re-declaring a forward declaration (`members.is_none()`) is allowed
    /// either way, since that's exactly how a forward declaration gets
    /// completed.
    pub fn get_matching(
        &mut self,
        parent: Option<TypeId>,
        base: BaseKind,
        array_size: Option<u32>,
        identifier: Option<Atom>,
        allow_dup: bool,
    ) -> Result<TypeId, TypeError> {
        match base {
            BaseKind::Void
            | BaseKind::Char
            | BaseKind::UnsignedChar
            | BaseKind::Short
            | BaseKind::UnsignedShort
            | BaseKind::Int
            | BaseKind::UnsignedInt
            | BaseKind::Long
            | BaseKind::UnsignedLong
            | BaseKind::Fp => Ok(self.primitive(base)),

            BaseKind::Pointer => {
                let elem = parent.expect("pointer type requires a pointee");
                if let Some(&existing) = self.node(elem).derived.iter().find(|&&d| self.node(d).base == BaseKind::Pointer) {
                    return if allow_dup { Ok(existing) } else { Err(TypeError::AlreadyDefined("pointer type".into())) };
                }
                let node = ValueTypeNode {
                    base: BaseKind::Pointer,
                    size: POINTER_SIZE,
                    align: POINTER_ALIGN,
                    from_type: Some(elem),
                    array_size: None,
                    identifier: None,
                    members: None,
                    members_by_name: Table::new(),
                    derived: Vec::new(),
                };
                let id = self.push_node(node);
                self.node_mut(elem).derived.push(id);
                Ok(id)
            }

            BaseKind::Array => {
                let elem = parent.expect("array type requires an element type");
                if let Some(&existing) = self
                    .node(elem)
                    .derived
                    .iter()
                    .find(|&&d| self.node(d).base == BaseKind::Array && self.node(d).array_size == array_size)
                {
                    return if allow_dup { Ok(existing) } else { Err(TypeError::AlreadyDefined("array type".into())) };
                }
                let elem_size = self.size_of(elem);
                let elem_align = self.align_of(elem);
                let size = array_size.map(|n| n * elem_size).unwrap_or(0);
                let node = ValueTypeNode {
                    base: BaseKind::Array,
                    size,
                    align: elem_align.max(1),
                    from_type: Some(elem),
                    array_size,
                    identifier: None,
                    members: None,
                    members_by_name: Table::new(),
                    derived: Vec::new(),
                };
                let id = self.push_node(node);
                self.node_mut(elem).derived.push(id);
                Ok(id)
            }

            BaseKind::Struct | BaseKind::Union | BaseKind::Enum => {
                let ident = identifier.expect("struct/union/enum type requires a name");
                if let Some(&existing) = self.named.get(&ident) {
                    if self.node(existing).base != base {
                        return Err(TypeError::AlreadyDefined("type tag mismatch".into()));
                    }
                    let complete = self.is_complete(existing);
                    return if !allow_dup && complete {
                        Err(TypeError::AlreadyDefined("struct/union/enum".into()))
                    } else {
                        Ok(existing)
                    };
                }
                let (size, align) = if base == BaseKind::Enum { (4, 4) } else { (0, 1) };
                let node = ValueTypeNode {
                    base,
                    size,
                    align,
                    from_type: None,
                    array_size: None,
                    identifier: Some(ident),
                    members: None,
                    members_by_name: Table::new(),
                    derived: Vec::new(),
                };
                let id = self.push_node(node);
                self.named.set(ident, id);
                Ok(id)
            }

            BaseKind::Function | BaseKind::Macro | BaseKind::GotoLabel | BaseKind::Type => {
                let node = ValueTypeNode {
                    base,
                    size: if base == BaseKind::Function { POINTER_SIZE } else { 0 },
                    align: if base == BaseKind::Function { POINTER_ALIGN } else { 1 },
                    from_type: parent,
                    array_size: None,
                    identifier,
                    members: None,
                    members_by_name: Table::new(),
                    derived: Vec::new(),
                };
                Ok(self.push_node(node))
            }
        }
    }

    /// Complete a forward-declared struct/union by laying out its members
    /// sequentially with padding to each member's alignment, then rounding
    /// the total size up to the struct's own alignment (the max member
    /// alignment). Union members all start at offset 0; the union's size
    /// is the largest member's size.
    pub fn complete_struct_or_union(&mut self, id: TypeId, fields: Vec<(Atom, TypeId)>) {
        let is_union = self.node(id).base == BaseKind::Union;
        let mut members = Vec::with_capacity(fields.len());
        let mut offset = 0u32;
        let mut max_align = 1u32;
        for (name, ty) in fields {
            let align = self.align_of(ty);
            let size = self.size_of(ty);
            max_align = max_align.max(align);
            let member_offset = if is_union {
                0
            } else {
                let aligned = align_up(offset, align);
                offset = aligned + size;
                aligned
            };
            members.push(Member { name, ty, offset: member_offset });
        }
        let total = if is_union {
            members.iter().map(|m| self.size_of(m.ty)).max().unwrap_or(0)
        } else {
            align_up(offset, max_align)
        };
        let mut by_name = Table::new();
        for (i, m) in members.iter().enumerate() {
            by_name.set(m.name, i);
        }
        let node = self.node_mut(id);
        node.size = total;
        node.align = max_align;
        node.members_by_name = by_name;
        node.members = Some(members);
    }

    /// Add an enumerator, returning its assigned value (`explicit` if
    /// given, otherwise one past the previous enumerator, starting at 0).
    pub fn add_enumerator(&mut self, id: TypeId, name: Atom, explicit: Option<i64>) -> i64 {
        let node = self.node_mut(id);
        let members = node.members.get_or_insert_with(Vec::new);
        let value = explicit.unwrap_or_else(|| members.last().map(|m| m.offset as i64 + 1).unwrap_or(0));
        let idx = members.len();
        members.push(Member { name, ty: id, offset: value as u32 });
        node.members_by_name.set(name, idx);
        value
    }

    pub fn member(&self, id: TypeId, name: Atom) -> Result<Member, TypeError> {
        let node = self.node(id);
        let members = node.members.as_ref().ok_or_else(|| TypeError::IncompleteType(String::new()))?;
        let idx = *node
            .members_by_name
            .get(&name)
            .ok_or_else(|| TypeError::UnknownMember(String::new()))?;
        Ok(members[idx])
    }

    /// Fix up a flexible array's length once an initializer has been
    /// counted, and recompute its size.
    pub fn fix_array_length(&mut self, id: TypeId, len: u32) {
        let elem = self.node(id).from_type.expect("array node always has an element type");
        let elem_size = self.size_of(elem);
        let node = self.node_mut(id);
        node.array_size = Some(len);
        node.size = len * elem_size;
    }
}

fn align_up(offset: u32, align: u32) -> u32 {
    let align = align.max(1);
    (offset + align - 1) & !(align - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_types_are_canonical() {
        let mut types = TypeTable::new();
        let int = types.primitive(BaseKind::Int);
        let p1 = types.pointer_to(int);
        let p2 = types.pointer_to(int);
        assert_eq!(p1, p2);
    }

    #[test]
    fn array_types_with_different_lengths_are_distinct() {
        let mut types = TypeTable::new();
        let int = types.primitive(BaseKind::Int);
        let a4 = types.array_of(int, Some(4));
        let a8 = types.array_of(int, Some(8));
        assert_ne!(a4, a8);
        assert_eq!(types.size_of(a4), 16);
    }

    #[test]
    fn struct_layout_respects_member_alignment_and_padding() {
        let mut types = TypeTable::new();
        let mut interner = picoc_core::Interner::new();
        let struct_name = interner.register("S");
        let field_c = interner.register("c");
        let field_x = interner.register("x");
        let id = types.get_matching(None, BaseKind::Struct, None, Some(struct_name), false).unwrap();
        let char_t = types.primitive(BaseKind::Char);
        let int_t = types.primitive(BaseKind::Int);
        types.complete_struct_or_union(id, vec![(field_c, char_t), (field_x, int_t)]);
        // char at 0, int padded to offset 4 (align 4), total size 8
        assert_eq!(types.size_of(id), 8);
        assert_eq!(types.align_of(id), 4);
        let member = types.member(id, field_x).unwrap();
        assert_eq!(member.offset, 4);
    }

    #[test]
    fn redefining_a_complete_struct_without_allow_dup_fails() {
        let mut types = TypeTable::new();
        let mut interner = picoc_core::Interner::new();
        let ident = interner.register("S");
        let id = types.get_matching(None, BaseKind::Struct, None, Some(ident), false).unwrap();
        types.complete_struct_or_union(id, vec![]);
        assert!(types.get_matching(None, BaseKind::Struct, None, Some(ident), false).is_err());
    }

    #[test]
    fn enum_is_int_sized_and_enumerators_increment() {
        let mut types = TypeTable::new();
        let mut interner = picoc_core::Interner::new();
        let ident = interner.register("Color");
        let id = types.get_matching(None, BaseKind::Enum, None, Some(ident), false).unwrap();
        assert_eq!(types.size_of(id), 4);
        let red = interner.register("Red");
        let green = interner.register("Green");
        assert_eq!(types.add_enumerator(id, red, None), 0);
        assert_eq!(types.add_enumerator(id, green, None), 1);
    }
}
