//! IR values (`IrValue`), pool-backed by [`ValuePool`].

use latticec_symbol::Symbol;

use crate::{
    func::FuncId,
    instr::{BlockId, InstrId},
    pool::{Pool, PoolIndex, Snapshot},
    types::TypeId,
};

/// A stable reference to an [`IrValue`] allocated in a [`ValuePool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(PoolIndex);

/// The constant-cast family (spec.md §3 `IrValue`): each applies the same
/// cast semantics as the instruction-emitting variants in [`crate::instr`],
/// but produces a value foldable at IR-construction time rather than an
/// instruction, used for e.g. static initializers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstCastKind {
    Bitcast,
    Zext,
    Sext,
    Fext,
    Trunc,
    Ftrunc,
    IntToPtr,
    PtrToInt,
    FpToUi,
    FpToSi,
    UiToFp,
    SiToFp,
    Reinterpret,
}

#[derive(Debug, Clone)]
pub enum IrValueData {
    /// A typed constant, stored as target-endian bytes.
    Literal(Vec<u8>),
    /// A reference to a prior instruction's result.
    Result { block_id: BlockId, instr_id: InstrId },
    NullPtr,
    /// A null pointer literal annotated with its pointee type (distinct
    /// from the value's own `ty`, which is always the `Ptr` type).
    NullPtrOfType(TypeId),
    ArrayLiteral { values: Vec<ValueId> },
    StructLiteral { values: Vec<ValueId> },
    /// A runtime `insertvalue` sequence, as opposed to a constant
    /// `StructLiteral`.
    StructConstruction { values: Vec<ValueId> },
    AnonGlobal(u32),
    ConstAnonGlobal(u32),
    CStrOfLen { bytes: Vec<u8>, size: u64 },
    FuncAddr(FuncId),
    FuncAddrByName(Symbol),
    ConstSizeof(TypeId),
    ConstAlignof(TypeId),
    Offsetof { ty: TypeId, index: u32 },
    ConstAdd { a: ValueId, b: ValueId },
    ConstCast { kind: ConstCastKind, value: ValueId },
}

#[derive(Debug, Clone)]
pub struct IrValue {
    pub ty: TypeId,
    pub data: IrValueData,
}

/// Owns every [`IrValue`] allocated during generation of one module.
#[derive(Default)]
pub struct ValuePool {
    pool: Pool<IrValue>,
}

impl ValuePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, ty: TypeId, data: IrValueData) -> ValueId {
        ValueId(self.pool.alloc(IrValue { ty, data }))
    }

    pub fn get(&self, id: ValueId) -> &IrValue {
        self.pool.get(id.0)
    }

    /// Overwrites the bytes of a previously allocated [`IrValueData::Literal`]
    /// in place, used by the RTTI relocation pass to back-patch a deferred
    /// `typeinfo` placeholder once the sorted table index is known (spec.md
    /// §4.9). Panics if `id` doesn't currently hold a literal.
    pub fn patch_literal(&mut self, id: ValueId, bytes: Vec<u8>) {
        match &mut self.pool.get_mut(id.0).data {
            IrValueData::Literal(slot) => *slot = bytes,
            other => panic!("patch_literal: value is not a Literal ({other:?})"),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.pool.snapshot()
    }

    pub fn restore(&mut self, snapshot: Snapshot) {
        self.pool.restore(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IrType, TypePool};

    #[test]
    fn literal_round_trips_through_pool() {
        let mut types = TypePool::new();
        let mut values = ValuePool::new();
        let s32 = types.alloc(IrType::S32);
        let id = values.alloc(s32, IrValueData::Literal(42i32.to_le_bytes().to_vec()));
        match &values.get(id).data {
            IrValueData::Literal(bytes) => assert_eq!(i32::from_le_bytes(bytes[..4].try_into().unwrap()), 42),
            _ => panic!("expected literal"),
        }
    }
}
