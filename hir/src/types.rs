//! IR types (`IrType`), pool-backed by [`TypePool`].
//!
//! Structure/union pointers are always stored as the opaque `ptr` type
//! (`*S8`) when they occur *as fields within a composite*, so that cyclic
//! references between composites never require an infinitely-sized type
//! graph; the real pointer type is reconstructed with a `Bitcast` at field
//! access time (see `latticec-irgen`'s field-access lowering). `TypeId`
//! indirection already makes the graph finite without that trick, but the
//! discipline is kept anyway since it is a semantic requirement of the
//! source language's field-access lowering, not just a memory-layout hack.

use bitflags::bitflags;

use crate::pool::{Pool, PoolIndex};

/// A stable reference to an [`IrType`] allocated in a [`TypePool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(PoolIndex);

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CompositeTraits: u8 {
        const PACKED = 1 << 0;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FuncPtrTraits: u8 {
        const VARARG = 1 << 0;
        const STDCALL = 1 << 1;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrType {
    None,
    Ptr(TypeId),
    S8,
    S16,
    S32,
    S64,
    U8,
    U16,
    U32,
    U64,
    Half,
    Float,
    Double,
    Bool,
    Void,
    FuncPtr { args: Vec<TypeId>, return_type: TypeId, traits: FuncPtrTraits },
    FixedArray { subtype: TypeId, length: u64 },
    Structure { subtypes: Vec<TypeId>, traits: CompositeTraits },
    Union { subtypes: Vec<TypeId>, traits: CompositeTraits },
}

/// The arithmetic category of a type, used to pick arithmetic/comparison
/// opcode variants (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    /// Signed integer.
    Si,
    /// Unsigned integer.
    Ui,
    /// Floating point.
    Fp,
    /// Not applicable — no arithmetic opcode variant exists for this type.
    Na,
}

/// `TypeKind` sizes the backend must honor (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Bool,
    S8,
    U8,
    S16,
    U16,
    S32,
    U32,
    S64,
    U64,
    Half,
    Float,
    Double,
    Ptr,
    FuncPtr,
    Usize,
    Void,
    None,
    FixedArray,
    Structure,
    Union,
}

impl TypeKind {
    /// Returns the size in bits, or `None` for aggregate kinds whose size
    /// depends on their members (queried via [`TypePool::size_in_bits`]).
    pub fn size_in_bits(self) -> Option<u32> {
        use TypeKind::*;
        match self {
            Bool => Some(1),
            S8 | U8 => Some(8),
            S16 | U16 | Half => Some(16),
            S32 | U32 | Float => Some(32),
            S64 | U64 | Double | Ptr | FuncPtr | Usize => Some(64),
            Void | None | FixedArray | Structure | Union => Option::None,
        }
    }
}

/// Owns every [`IrType`] allocated during generation of one module.
#[derive(Default)]
pub struct TypePool {
    pool: Pool<IrType>,
}

impl TypePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, ty: IrType) -> TypeId {
        TypeId(self.pool.alloc(ty))
    }

    pub fn get(&self, id: TypeId) -> &IrType {
        self.pool.get(id.0)
    }

    pub fn snapshot(&self) -> crate::pool::Snapshot {
        self.pool.snapshot()
    }

    pub fn restore(&mut self, snapshot: crate::pool::Snapshot) {
        self.pool.restore(snapshot)
    }

    pub fn is_pointer(&self, id: TypeId) -> bool {
        matches!(self.get(id), IrType::Ptr(_))
    }

    pub fn category(&self, id: TypeId) -> TypeCategory {
        match self.get(id) {
            IrType::S8 | IrType::S16 | IrType::S32 | IrType::S64 => TypeCategory::Si,
            IrType::U8 | IrType::U16 | IrType::U32 | IrType::U64 | IrType::Bool => TypeCategory::Ui,
            IrType::Half | IrType::Float | IrType::Double => TypeCategory::Fp,
            _ => TypeCategory::Na,
        }
    }

    pub fn kind(&self, id: TypeId) -> TypeKind {
        match self.get(id) {
            IrType::None => TypeKind::None,
            IrType::Ptr(_) => TypeKind::Ptr,
            IrType::S8 => TypeKind::S8,
            IrType::S16 => TypeKind::S16,
            IrType::S32 => TypeKind::S32,
            IrType::S64 => TypeKind::S64,
            IrType::U8 => TypeKind::U8,
            IrType::U16 => TypeKind::U16,
            IrType::U32 => TypeKind::U32,
            IrType::U64 => TypeKind::U64,
            IrType::Half => TypeKind::Half,
            IrType::Float => TypeKind::Float,
            IrType::Double => TypeKind::Double,
            IrType::Bool => TypeKind::Bool,
            IrType::Void => TypeKind::Void,
            IrType::FuncPtr { .. } => TypeKind::FuncPtr,
            IrType::FixedArray { .. } => TypeKind::FixedArray,
            IrType::Structure { .. } => TypeKind::Structure,
            IrType::Union { .. } => TypeKind::Union,
        }
    }

    /// Size in bits of `id`, recursing into aggregates. Composite fields
    /// are padded to each member's natural alignment unless `PACKED` is
    /// set, matching the layout-bone lowering rules of spec.md §4.2.
    pub fn size_in_bits(&self, id: TypeId) -> u32 {
        if let Some(size) = self.kind(id).size_in_bits() {
            return size;
        }
        match self.get(id) {
            IrType::FixedArray { subtype, length } => self.size_in_bits(*subtype) * (*length as u32),
            IrType::Structure { subtypes, traits } => {
                let packed = traits.contains(CompositeTraits::PACKED);
                let mut offset = 0u32;
                for &sub in subtypes {
                    let align = if packed { 8 } else { self.align_in_bits(sub) };
                    offset = align_up(offset, align);
                    offset += self.size_in_bits(sub);
                }
                let align = if packed { 8 } else { self.align_in_bits(id) };
                align_up(offset, align)
            }
            IrType::Union { subtypes, .. } => {
                subtypes.iter().map(|&sub| self.size_in_bits(sub)).max().unwrap_or(0)
            }
            IrType::Void | IrType::None => 0,
            _ => unreachable!("size_in_bits: non-aggregate kind should have been handled above"),
        }
    }

    /// Alignment in bits. Primitive and pointer types align to their own
    /// size; aggregates align to their widest member (or 8 bits if empty).
    pub fn align_in_bits(&self, id: TypeId) -> u32 {
        if let Some(size) = self.kind(id).size_in_bits() {
            return size.max(8);
        }
        match self.get(id) {
            IrType::FixedArray { subtype, .. } => self.align_in_bits(*subtype),
            IrType::Structure { subtypes, .. } | IrType::Union { subtypes, .. } => {
                subtypes.iter().map(|&sub| self.align_in_bits(sub)).max().unwrap_or(8)
            }
            _ => 8,
        }
    }

    /// Byte offset of member `index` within a `Structure`, honoring
    /// `PACKED`.
    pub fn offset_of_bits(&self, id: TypeId, index: usize) -> u32 {
        let IrType::Structure { subtypes, traits } = self.get(id) else {
            unreachable!("offset_of_bits called on non-structure type");
        };
        let packed = traits.contains(CompositeTraits::PACKED);
        let mut offset = 0u32;
        for (i, &sub) in subtypes.iter().enumerate() {
            let align = if packed { 8 } else { self.align_in_bits(sub) };
            offset = align_up(offset, align);
            if i == index {
                return offset;
            }
            offset += self.size_in_bits(sub);
        }
        unreachable!("offset_of_bits: index {index} out of range");
    }
}

fn align_up(value: u32, align: u32) -> u32 {
    if align == 0 {
        return value;
    }
    value.div_ceil(align) * align
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_struct_has_no_padding() {
        let mut pool = TypePool::new();
        let u8_ty = pool.alloc(IrType::U8);
        let u64_ty = pool.alloc(IrType::U64);
        let packed = pool.alloc(IrType::Structure {
            subtypes: vec![u8_ty, u64_ty],
            traits: CompositeTraits::PACKED,
        });
        assert_eq!(pool.size_in_bits(packed), 8 + 64);
        assert_eq!(pool.offset_of_bits(packed, 1), 8);
    }

    #[test]
    fn unpacked_struct_pads_to_alignment() {
        let mut pool = TypePool::new();
        let u8_ty = pool.alloc(IrType::U8);
        let u64_ty = pool.alloc(IrType::U64);
        let plain = pool.alloc(IrType::Structure {
            subtypes: vec![u8_ty, u64_ty],
            traits: CompositeTraits::empty(),
        });
        assert_eq!(pool.offset_of_bits(plain, 1), 64);
        assert_eq!(pool.size_in_bits(plain), 128);
    }

    #[test]
    fn category_follows_signedness() {
        let mut pool = TypePool::new();
        let s32 = pool.alloc(IrType::S32);
        let u32_ty = pool.alloc(IrType::U32);
        let f64_ty = pool.alloc(IrType::Double);
        assert_eq!(pool.category(s32), TypeCategory::Si);
        assert_eq!(pool.category(u32_ty), TypeCategory::Ui);
        assert_eq!(pool.category(f64_ty), TypeCategory::Fp);
    }
}
