//! IR functions (`IrFunc`).

use bitflags::bitflags;
use latticec_symbol::Symbol;

use crate::{instr::BasicBlocks, types::TypeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncId(pub u32);

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FuncTraits: u8 {
        const FOREIGN = 1 << 0;
        const VARARG = 1 << 1;
        const MAIN = 1 << 2;
        const STDCALL = 1 << 3;
        const POLYMORPHIC = 1 << 4;
    }
}

#[derive(Debug, Clone)]
pub struct IrFunc {
    pub name: Symbol,
    pub traits: FuncTraits,
    pub return_type: TypeId,
    pub arg_types: Vec<TypeId>,
    pub arity: usize,
    pub basicblocks: BasicBlocks,
    /// Number of stack-allocated local variables in the body. The scope
    /// tree used while generating that body is owned by the builder and
    /// freed once generation completes (spec.md §5 Resource policy); it is
    /// not part of the function's persisted representation.
    pub variable_count: u32,
    pub export_as: Option<Symbol>,
    pub maybe_filename: Option<Symbol>,
    pub maybe_definition_string: Option<String>,
    pub maybe_line: Option<u32>,
    pub maybe_column: Option<u32>,
}

impl IrFunc {
    pub fn is_variadic(&self) -> bool {
        self.traits.contains(FuncTraits::VARARG)
    }

    pub fn is_foreign(&self) -> bool {
        self.traits.contains(FuncTraits::FOREIGN)
    }

    pub fn is_polymorphic(&self) -> bool {
        self.traits.contains(FuncTraits::POLYMORPHIC)
    }
}
