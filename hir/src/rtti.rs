//! Runtime type information (RTTI) descriptor shapes.
//!
//! Mirrors the `Any*Type` struct family from the original compiler's
//! `ir_gen_rtti.c`: one tagged-by-`kind` descriptor struct per type
//! category, all addressed uniformly as `*AnyType`. `latticec-irgen`'s
//! RTTI-building pass (spec.md §4.9) is the only consumer of these shapes;
//! this module just names the field layout so that pass and the backend
//! contract agree on it.

/// The `kind` discriminant stored as the first field of every `Any*Type`
/// descriptor, matching `ANY_TYPE_KIND_*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AnyTypeKind {
    Void,
    Bool,
    Byte,
    Ubyte,
    Short,
    Ushort,
    Int,
    Uint,
    Long,
    Ulong,
    Float,
    Double,
    Ptr,
    FixedArray,
    FuncPtr,
    Struct,
    Union,
}

/// `struct AnyType { kind, name, is_alias, size }` — the descriptor used
/// for every primitive/void type, and the common prefix every other
/// `Any*Type` descriptor starts with.
#[derive(Debug, Clone)]
pub struct AnyType {
    pub kind: AnyTypeKind,
    pub name: String,
    pub is_alias: bool,
    pub size_bits: u32,
}

/// `struct AnyPtrType { ..AnyType, subtype }`.
#[derive(Debug, Clone)]
pub struct AnyPtrType {
    pub base: AnyType,
    /// Index into the sorted RTTI table of the pointee's descriptor, or
    /// `None` for an opaque `*S8`/`ptr` with no known pointee.
    pub subtype: Option<u32>,
}

/// `struct AnyFixedArrayType { ..AnyType, subtype, length }`.
#[derive(Debug, Clone)]
pub struct AnyFixedArrayType {
    pub base: AnyType,
    pub subtype: u32,
    pub length: u64,
}

/// `struct AnyFuncPtrType { ..AnyType, args, return_type, is_vararg, is_stdcall }`.
#[derive(Debug, Clone)]
pub struct AnyFuncPtrType {
    pub base: AnyType,
    pub args: Vec<u32>,
    pub return_type: u32,
    pub is_vararg: bool,
    pub is_stdcall: bool,
}

/// `struct AnyCompositeType { ..AnyType, members, offsets, member_names, is_packed }`.
/// Shared by `struct`s and `union`s, distinguished only by `base.kind`.
#[derive(Debug, Clone)]
pub struct AnyCompositeType {
    pub base: AnyType,
    pub members: Vec<u32>,
    pub offsets_bits: Vec<u32>,
    pub member_names: Vec<String>,
    pub is_packed: bool,
}

/// One entry of the sorted RTTI table the backend linearizes
/// `__types__` from (spec.md §4.9, glossary "RTTI table").
#[derive(Debug, Clone)]
pub enum RttiEntry {
    Primitive(AnyType),
    Ptr(AnyPtrType),
    FixedArray(AnyFixedArrayType),
    FuncPtr(AnyFuncPtrType),
    Composite(AnyCompositeType),
}

impl RttiEntry {
    pub fn kind(&self) -> AnyTypeKind {
        match self {
            RttiEntry::Primitive(t) => t.kind,
            RttiEntry::Ptr(t) => t.base.kind,
            RttiEntry::FixedArray(t) => t.base.kind,
            RttiEntry::FuncPtr(t) => t.base.kind,
            RttiEntry::Composite(t) => t.base.kind,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            RttiEntry::Primitive(t) => &t.name,
            RttiEntry::Ptr(t) => &t.base.name,
            RttiEntry::FixedArray(t) => &t.base.name,
            RttiEntry::FuncPtr(t) => &t.base.name,
            RttiEntry::Composite(t) => &t.base.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_kind_distinguishes_struct_from_union() {
        let s = RttiEntry::Composite(AnyCompositeType {
            base: AnyType { kind: AnyTypeKind::Struct, name: "Point".into(), is_alias: false, size_bits: 64 },
            members: vec![0, 1],
            offsets_bits: vec![0, 32],
            member_names: vec!["x".into(), "y".into()],
            is_packed: false,
        });
        assert_eq!(s.kind(), AnyTypeKind::Struct);
        assert_eq!(s.name(), "Point");
    }
}
