//! The low-level IR builder: instruction/basic-block construction.
//!
//! This is the mechanical layer only — it knows how to open blocks and
//! append instructions, but nothing about source-level scoping, loop
//! labels, or management-method dispatch. `latticec-irgen` builds a
//! higher-level function builder on top of this one that adds those
//! concerns, the same way the teacher's `FunctionBuilderExt` (in its wasm
//! frontend crate) wraps the lower-level `OpBuilder` from its `hir` crate.

use crate::{
    instr::{BasicBlock, BasicBlocks, BlockId, CastKind, InstrId, IrInstr, Opcode},
    module::IrModule,
    types::{IrType, TypeId},
    value::{IrValueData, ValueId},
};

/// An IR-level local variable reference: either a stack slot in the
/// current function, a named global, or a static (module-lifetime) slot.
/// Scope-level bookkeeping (name shadowing, ownership traits) lives above
/// this in `latticec-irgen`.
#[derive(Debug, Clone, Copy)]
pub enum VarRef {
    /// `ptr` is the value returned by the [`IrBuilder::build_alloc`] call
    /// that created this local's stack slot.
    Local { ptr: ValueId, ty: TypeId },
    Global { index: u32, ty: TypeId },
    Static { id: u32, ty: TypeId },
}

impl VarRef {
    pub fn ty(&self) -> TypeId {
        match self {
            VarRef::Local { ty, .. } | VarRef::Global { ty, .. } | VarRef::Static { ty, .. } => *ty,
        }
    }
}

/// Captures builder state so speculative construction (tentative calls,
/// overload resolution attempts, conforming attempts) can be rolled back
/// without leaving behind half-built blocks. Always taken alongside a
/// [`crate::types::TypePool`]/[`crate::value::ValuePool`] snapshot before
/// any speculative work (spec.md §9).
#[derive(Debug, Clone, Copy)]
pub struct BuilderSnapshot {
    current_block_id: BlockId,
    current_block_len: usize,
    basicblocks_len: usize,
}

pub struct IrBuilder<'m> {
    pub module: &'m mut IrModule,
    current_block_id: BlockId,
    basicblocks: BasicBlocks,
    next_local_id: u32,
}

impl<'m> IrBuilder<'m> {
    pub fn new(module: &'m mut IrModule) -> Self {
        let mut basicblocks: BasicBlocks = Vec::new();
        basicblocks.push(BasicBlock::new());
        Self { module, current_block_id: BlockId(0), basicblocks, next_local_id: 0 }
    }

    pub fn current_block(&self) -> BlockId {
        self.current_block_id
    }

    /// Consumes the builder, returning the finished basic blocks for
    /// attachment to an [`crate::func::IrFunc`].
    pub fn finish(self) -> (BasicBlocks, u32) {
        (self.basicblocks, self.next_local_id)
    }

    // ---- block management ----

    pub fn build_basicblock(&mut self) -> BlockId {
        let id = BlockId(self.basicblocks.len() as u32);
        self.basicblocks.push(BasicBlock::new());
        id
    }

    pub fn build_using_basicblock(&mut self, id: BlockId) {
        self.current_block_id = id;
    }

    pub fn is_current_block_terminated(&self) -> bool {
        matches!(
            self.basicblocks[self.current_block_id.0 as usize].last().map(|i| &i.op),
            Some(Opcode::Br(_))
                | Some(Opcode::CondBr { .. })
                | Some(Opcode::Switch { .. })
                | Some(Opcode::Ret(_))
                | Some(Opcode::Unreachable)
        )
    }

    fn push(&mut self, op: Opcode, result_type: Option<TypeId>) -> ValueId {
        let ty = match result_type {
            Some(t) => t,
            None => self.module.types.alloc(IrType::Void),
        };
        let block = &mut self.basicblocks[self.current_block_id.0 as usize];
        let instr_id = InstrId(block.len() as u32);
        block.push(IrInstr::new(op, result_type));
        let block_id = self.current_block_id;
        self.module.values.alloc(ty, IrValueData::Result { block_id, instr_id })
    }

    fn push_void(&mut self, op: Opcode) {
        let block = &mut self.basicblocks[self.current_block_id.0 as usize];
        block.push(IrInstr::new(op, None));
    }

    // ---- memory ----

    pub fn build_alloc(&mut self, ty: TypeId) -> ValueId {
        let ptr_ty = self.module.types.alloc(IrType::Ptr(ty));
        self.next_local_id += 1;
        self.push(Opcode::Alloc { count: None, align: 0 }, Some(ptr_ty))
    }

    pub fn build_alloc_array(&mut self, ty: TypeId, count: ValueId) -> ValueId {
        let ptr_ty = self.module.types.alloc(IrType::Ptr(ty));
        self.push(Opcode::Alloc { count: Some(count), align: 0 }, Some(ptr_ty))
    }

    pub fn build_load(&mut self, ptr: ValueId, span: Option<latticec_session::SourceSpan>) -> ValueId {
        let pointee = match self.module.types.get(self.module.values.get(ptr).ty) {
            IrType::Ptr(inner) => *inner,
            _ => self.module.values.get(ptr).ty,
        };
        self.push(Opcode::Load { ptr, span }, Some(pointee))
    }

    pub fn build_store(&mut self, value: ValueId, dest: ValueId, span: Option<latticec_session::SourceSpan>) {
        self.push_void(Opcode::Store { value, dest, span });
    }

    /// Resolves a [`VarRef`] to the pointer value used to load/store it.
    /// For locals this is just the value [`Self::build_alloc`] already
    /// returned; globals and statics are addressed by table index.
    pub fn build_varptr(&mut self, var: VarRef) -> ValueId {
        match var {
            VarRef::Local { ptr, .. } => ptr,
            VarRef::Global { index, ty } => {
                let ptr_ty = self.module.types.alloc(IrType::Ptr(ty));
                self.module.values.alloc(ptr_ty, IrValueData::AnonGlobal(index))
            }
            VarRef::Static { id, ty } => {
                let ptr_ty = self.module.types.alloc(IrType::Ptr(ty));
                self.module.values.alloc(ptr_ty, IrValueData::ConstAnonGlobal(id))
            }
        }
    }

    pub fn build_member(&mut self, base: ValueId, index: u32, result_ty: TypeId, span: Option<latticec_session::SourceSpan>) -> ValueId {
        self.push(Opcode::Member { base, index, span }, Some(result_ty))
    }

    pub fn build_array_access(&mut self, base: ValueId, index: ValueId, elem_ty: TypeId, span: Option<latticec_session::SourceSpan>) -> ValueId {
        let ptr_ty = self.module.types.alloc(IrType::Ptr(elem_ty));
        self.push(Opcode::ArrayAccess { base, index, span }, Some(ptr_ty))
    }

    // ---- control flow ----

    pub fn build_break(&mut self, target: BlockId) {
        self.push_void(Opcode::Br(target));
    }

    pub fn build_cond_break(&mut self, cond: ValueId, then_block: BlockId, else_block: BlockId) {
        self.push_void(Opcode::CondBr { cond, then_block, else_block });
    }

    pub fn build_switch(&mut self, scrutinee: ValueId, cases: Vec<(u64, BlockId)>, default: BlockId) {
        self.push_void(Opcode::Switch { scrutinee, cases, default });
    }

    pub fn build_return(&mut self, value: Option<ValueId>) {
        self.push_void(Opcode::Ret(value));
    }

    pub fn build_unreachable(&mut self) {
        self.push_void(Opcode::Unreachable);
    }

    pub fn build_phi2(&mut self, ty: TypeId, a: (BlockId, ValueId), b: (BlockId, ValueId)) -> ValueId {
        self.push(Opcode::Phi2 { a, b }, Some(ty))
    }

    // ---- calls ----

    pub fn build_call(&mut self, func: crate::func::FuncId, args: Vec<ValueId>, ret_ty: TypeId) -> ValueId {
        if matches!(self.module.types.get(ret_ty), IrType::Void) {
            self.push_void(Opcode::Call { func, args });
            self.module.values.alloc(ret_ty, IrValueData::NullPtr)
        } else {
            self.push(Opcode::Call { func, args }, Some(ret_ty))
        }
    }

    pub fn build_call_address(&mut self, callee: ValueId, args: Vec<ValueId>, ret_ty: TypeId) -> ValueId {
        if matches!(self.module.types.get(ret_ty), IrType::Void) {
            self.push_void(Opcode::CallAddress { callee, args });
            self.module.values.alloc(ret_ty, IrValueData::NullPtr)
        } else {
            self.push(Opcode::CallAddress { callee, args }, Some(ret_ty))
        }
    }

    // ---- heap ----

    pub fn build_malloc(&mut self, ty: TypeId, amount: Option<ValueId>, undef: bool) -> ValueId {
        let ptr_ty = self.module.types.alloc(IrType::Ptr(ty));
        self.push(Opcode::Malloc { ty, amount, undef }, Some(ptr_ty))
    }

    pub fn build_free(&mut self, ptr: ValueId) {
        self.push_void(Opcode::Free(ptr));
    }

    pub fn build_zeroinit(&mut self, ptr: ValueId) {
        self.push_void(Opcode::Zeroinit(ptr));
    }

    pub fn build_memcpy(&mut self, dest: ValueId, src: ValueId, len: ValueId, volatile: bool) {
        self.push_void(Opcode::Memcpy { dest, src, len, volatile });
    }

    // ---- stack ----

    pub fn build_stack_save(&mut self, ptr_ty: TypeId) -> ValueId {
        self.push(Opcode::StackSave, Some(ptr_ty))
    }

    pub fn build_stack_restore(&mut self, saved: ValueId) {
        self.push_void(Opcode::StackRestore(saved));
    }

    // ---- arithmetic / bitwise / comparison ----

    pub fn build_math(&mut self, op: impl FnOnce(ValueId, ValueId) -> Opcode, a: ValueId, b: ValueId, ret_ty: TypeId) -> ValueId {
        self.push(op(a, b), Some(ret_ty))
    }

    pub fn build_unary(&mut self, op: Opcode, ret_ty: TypeId) -> ValueId {
        self.push(op, Some(ret_ty))
    }

    pub fn build_select(&mut self, cond: ValueId, a: ValueId, b: ValueId, ret_ty: TypeId) -> ValueId {
        self.push(Opcode::Select { cond, a, b }, Some(ret_ty))
    }

    // ---- casts ----

    pub fn build_cast(&mut self, kind: CastKind, value: ValueId, ret_ty: TypeId) -> ValueId {
        self.push(Opcode::Cast { kind, value }, Some(ret_ty))
    }

    /// Constant-folds a cast into a [`crate::value::IrValueData::ConstCast`]
    /// rather than emitting an instruction, used when the operand is
    /// already a compile-time constant (spec.md §4.3 "cast builders
    /// choosing between `const_cast`... and instruction-emitting
    /// variants").
    pub fn const_cast(&mut self, kind: crate::value::ConstCastKind, value: ValueId, ret_ty: TypeId) -> ValueId {
        self.module.values.alloc(ret_ty, IrValueData::ConstCast { kind, value })
    }

    // ---- literals & globals ----

    pub fn build_literal(&mut self, ty: TypeId, bytes: Vec<u8>) -> ValueId {
        self.module.values.alloc(ty, IrValueData::Literal(bytes))
    }

    pub fn build_null_ptr(&mut self, ptr_ty: TypeId) -> ValueId {
        self.module.values.alloc(ptr_ty, IrValueData::NullPtr)
    }

    pub fn build_anon_global(&mut self, ty: TypeId, init: Option<ValueId>, is_const: bool) -> ValueId {
        let ptr_ty = self.module.types.alloc(IrType::Ptr(ty));
        let index = self.module.push_anon_global(ty, init, is_const);
        self.module.values.alloc(ptr_ty, IrValueData::AnonGlobal(index))
    }

    pub fn build_static_struct(&mut self, ty: TypeId, values: Vec<ValueId>, mutable: bool) -> ValueId {
        let literal = self.module.values.alloc(ty, IrValueData::StructLiteral { values });
        self.build_anon_global(ty, Some(literal), !mutable)
    }

    pub fn build_static_array(&mut self, elem_ty: TypeId, values: Vec<ValueId>, mutable: bool) -> ValueId {
        let length = values.len() as u64;
        let array_ty = self.module.types.alloc(IrType::FixedArray { subtype: elem_ty, length });
        let literal = self.module.values.alloc(array_ty, IrValueData::ArrayLiteral { values });
        self.build_anon_global(array_ty, Some(literal), !mutable)
    }

    pub fn build_offsetof(&mut self, ty: TypeId, index: u32, usize_ty: TypeId) -> ValueId {
        self.module.values.alloc(usize_ty, IrValueData::Offsetof { ty, index })
    }

    pub fn const_sizeof(&mut self, ty: TypeId, usize_ty: TypeId) -> ValueId {
        self.module.values.alloc(usize_ty, IrValueData::ConstSizeof(ty))
    }

    pub fn const_alignof(&mut self, ty: TypeId, usize_ty: TypeId) -> ValueId {
        self.module.values.alloc(usize_ty, IrValueData::ConstAlignof(ty))
    }

    pub fn const_add(&mut self, a: ValueId, b: ValueId, ty: TypeId) -> ValueId {
        self.module.values.alloc(ty, IrValueData::ConstAdd { a, b })
    }

    // ---- varargs / asm / misc ----

    pub fn build_va_start(&mut self, va_list: ValueId) {
        self.push_void(Opcode::VaStart(va_list));
    }

    pub fn build_va_end(&mut self, va_list: ValueId) {
        self.push_void(Opcode::VaEnd(va_list));
    }

    pub fn build_va_copy(&mut self, dest: ValueId, src: ValueId) {
        self.push_void(Opcode::VaCopy { dest, src });
    }

    pub fn build_va_arg(&mut self, va_list: ValueId, ty: TypeId) -> ValueId {
        self.push(Opcode::VaArg { va_list, ty }, Some(ty))
    }

    pub fn build_asm(&mut self, template: String, constraints: String, side_effects: bool, align_stack: bool, dialect: crate::instr::AsmDialect) {
        self.push_void(Opcode::Asm { template, constraints, side_effects, align_stack, dialect });
    }

    pub fn build_deinit_svars(&mut self) {
        self.push_void(Opcode::DeinitSvars);
    }

    // ---- snapshots ----

    /// Captures builder state for later rollback via [`Self::restore`].
    pub fn snapshot(&self) -> BuilderSnapshot {
        BuilderSnapshot {
            current_block_id: self.current_block_id,
            current_block_len: self.basicblocks[self.current_block_id.0 as usize].len(),
            basicblocks_len: self.basicblocks.len(),
        }
    }

    /// Restores the builder to a prior [`BuilderSnapshot`], discarding any
    /// blocks created and instructions appended since. Must be paired with
    /// restoring the module's type/value pool snapshots taken at the same
    /// time, or dangling references to rolled-back values can leak into
    /// surviving instructions (spec.md §9).
    pub fn restore(&mut self, snapshot: BuilderSnapshot) {
        self.basicblocks.truncate(snapshot.basicblocks_len);
        self.basicblocks[snapshot.current_block_id.0 as usize].truncate(snapshot.current_block_len);
        self.current_block_id = snapshot.current_block_id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{instr::Opcode, module::IrModule, types::IrType};

    #[test]
    fn snapshot_restore_discards_speculative_block() {
        let mut module = IrModule::new();
        let s32 = module.types.alloc(IrType::S32);
        let mut builder = IrBuilder::new(&mut module);
        let before = builder.snapshot();
        let extra = builder.build_basicblock();
        builder.build_using_basicblock(extra);
        let lit = builder.build_literal(s32, 1i32.to_le_bytes().to_vec());
        builder.build_return(Some(lit));

        builder.restore(before);
        let (blocks, _) = builder.finish();
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].is_empty());
    }

    #[test]
    fn call_with_void_return_emits_no_result_instruction() {
        let mut module = IrModule::new();
        let void_ty = module.types.alloc(IrType::Void);
        let func = module.push_func(crate::func::IrFunc {
            name: latticec_symbol::Symbol::intern("f"),
            traits: Default::default(),
            return_type: void_ty,
            arg_types: vec![],
            arity: 0,
            basicblocks: vec![vec![]],
            variable_count: 0,
            export_as: None,
            maybe_filename: None,
            maybe_definition_string: None,
            maybe_line: None,
            maybe_column: None,
        });
        let mut builder = IrBuilder::new(&mut module);
        builder.build_call(func, vec![], void_ty);
        let (blocks, _) = builder.finish();
        assert!(matches!(blocks[0][0].op, Opcode::Call { .. }));
        assert!(blocks[0][0].result_type.is_none());
    }
}
