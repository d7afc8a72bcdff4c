//! Typed SSA intermediate representation for the Latticec compiler
//! middle-end.
//!
//! This crate owns the IR data model only: pool-allocated types, values,
//! instructions, and functions, assembled into an [`module::IrModule`] and
//! built incrementally with [`builder::IrBuilder`]. It knows nothing about
//! the source AST, scoping, or type resolution — that is `latticec-irgen`'s
//! job, built on top of the primitives exported here the same way the
//! teacher's wasm frontend crate is built on top of its `hir` crate.

pub mod builder;
pub mod func;
pub mod instr;
pub mod module;
pub mod pool;
pub mod rtti;
pub mod tri;
pub mod types;
pub mod value;

pub use builder::{BuilderSnapshot, IrBuilder, VarRef};
pub use func::{FuncId, FuncTraits, IrFunc};
pub use instr::{AsmDialect, BasicBlock, BasicBlocks, BlockId, CastKind, InstrId, IrInstr, Opcode};
pub use module::{
    AnonGlobal, FuncMapping, FuncPair, GlobalVar, IrModule, Job, MethodMapping, ModuleCommon, RttiRelocation,
    SfCacheEntry, StaticVariable,
};
pub use pool::{Pool, PoolIndex, Snapshot};
pub use tri::{GenResult, Tri};
pub use types::{CompositeTraits, FuncPtrTraits, IrType, TypeCategory, TypeId, TypeKind, TypePool};
pub use value::{ConstCastKind, IrValue, IrValueData, ValueId, ValuePool};
