//! The higher-level per-function builder: wraps [`latticec_hir::IrBuilder`]
//! with source-level scoping, loop-label tracking and management-method
//! dispatch, the same way the teacher's `FunctionBuilderExt` sits above its
//! `OpBuilder` (see `hir/src/builder.rs`'s module doc comment). Grounded on
//! `IRGEN/ir_gen_stmt.c`'s `ir_gen_stmts` state (current scope, break/
//! continue/fallthrough targets, loop label stack).

use latticec_hir::{FuncTraits, IrBuilder, IrModule, TypeId, ValueId};
use latticec_session::{Diagnostic, DiagnosticsHandler, SourceSpan};
use latticec_symbol::Symbol;

use crate::ast::{Ast, AstType};
use crate::scope::{BridgeVar, ScopeStack, VarStorage, VarTraits};
use crate::sfcache::{find_or_autogen, ManagementKind};
use crate::typemap::{TypeMap, TypeTable};

/// One entry of the loop-label stack (`bridge_loop_label_t`): the blocks
/// `break`/`continue` jump to, named when the loop itself carries a label
/// (spec.md §4.7 "labeled loop control").
struct LoopFrame {
    label: Option<Symbol>,
    break_block: latticec_hir::BlockId,
    continue_block: latticec_hir::BlockId,
    /// Scope depth when this loop was entered; `break`/`continue` defer
    /// every variable declared since, not the whole function.
    scope_depth: usize,
}

/// Per-function generation context. One of these lives for the duration of
/// lowering a single [`crate::ast::AstFunc`] body.
pub struct FuncGen<'a, 'm> {
    pub builder: IrBuilder<'m>,
    pub ast: &'a mut Ast,
    pub typemap: &'a mut TypeMap,
    pub type_table: &'a mut TypeTable,
    pub diagnostics: &'a DiagnosticsHandler,
    pub scope: ScopeStack,
    loops: Vec<LoopFrame>,
    filename: Symbol,
}

impl<'a, 'm> FuncGen<'a, 'm> {
    pub fn new(
        module: &'m mut IrModule,
        ast: &'a mut Ast,
        typemap: &'a mut TypeMap,
        type_table: &'a mut TypeTable,
        diagnostics: &'a DiagnosticsHandler,
        filename: Symbol,
    ) -> Self {
        Self {
            builder: IrBuilder::new(module),
            ast,
            typemap,
            type_table,
            diagnostics,
            scope: ScopeStack::new(),
            loops: Vec::new(),
            filename,
        }
    }

    /// Records `ast_type` in the RTTI type table under `name`, returning
    /// the name unchanged for convenience at call sites (spec.md §3 "Type
    /// table", §4.9).
    pub fn mention_type(&mut self, ast_type: &AstType, name: String) -> String {
        self.type_table.mention(ast_type, name.clone());
        name
    }

    pub fn error(&self, span: SourceSpan, message: impl Into<String>) {
        self.diagnostics.emit(Diagnostic::error(message).with_label(span, "here"));
    }

    pub fn span_or_unknown(&self, span: Option<SourceSpan>) -> SourceSpan {
        span.unwrap_or_else(|| SourceSpan { file: self.filename, line: 0, column: 0 })
    }

    pub fn resolve_type(&mut self, ty: &AstType) -> Result<TypeId, String> {
        self.typemap.resolve_type(ty, self.builder.module)
    }

    // ---- scoping ----

    pub fn open_scope(&mut self) {
        self.scope.push_scope();
    }

    /// Closes the current scope, running `__defer__` (reverse-declaration
    /// order) over every non-POD, non-reference local it declared, then
    /// pops it (spec.md §4.4 "runs on scope exit").
    pub fn close_scope(&mut self) {
        let vars: Vec<BridgeVar> = self.scope.current_scope_vars();
        self.run_defers(vars.iter().rev().filter(|v| v.needs_defer()));
        self.scope.pop_scope();
    }

    fn run_defers<'v>(&mut self, vars: impl Iterator<Item = &'v BridgeVar>) {
        let void_ty = self.typemap.find(Symbol::intern("void")).expect("void seeded");
        for var in vars {
            let crate::ast::AstTypeElem::Base(type_name) = &var.ast_type.elem else { continue };
            if var.ast_type.is_pointer() {
                continue;
            }
            match find_or_autogen(self.builder.module, self.ast, self.typemap, ManagementKind::Defer, *type_name) {
                latticec_hir::GenResult::Success(Some(pair)) => {
                    let ptr = var.ptr();
                    self.builder.build_call(pair.ir_func_id, vec![ptr], void_ty);
                }
                _ => {}
            }
        }
    }

    /// Declares `name` in the current scope: resolves its type, allocates
    /// stack storage, zero-initializes unless `undef` (spec.md §4.3
    /// "zero-init declaration"), and returns the variable's stack id.
    pub fn declare_var(
        &mut self,
        name: Symbol,
        ast_type: AstType,
        traits: VarTraits,
        undef: bool,
    ) -> Result<u32, String> {
        let ir_type = self.resolve_type(&ast_type)?;
        let ptr = self.builder.build_alloc(ir_type);
        if !undef {
            self.builder.build_zeroinit(ptr);
        }
        let id = self.scope.declare(name, ast_type, ir_type, ptr, traits);
        Ok(id)
    }

    /// Declares `name` as a [`VarTraits::REFERENCE`] binding aliasing
    /// `referent_ptr` (already an address of `ast_type`), the way `it` in
    /// an each-in loop binds the element it's currently visiting without
    /// copying it. The slot itself stores the pointer; `ir_type` records
    /// the *referent's* type so every other consumer of [`BridgeVar`]
    /// (loads, conforming, method dispatch) treats it exactly like a
    /// by-value local — only address resolution needs to know to load
    /// through the slot once first (spec.md §4.7 "Each-in ... binds `it`
    /// as a reference variable").
    pub fn declare_reference_var(&mut self, name: Symbol, ast_type: AstType, referent_ptr: ValueId, traits: VarTraits) -> Result<u32, String> {
        let ir_type = self.resolve_type(&ast_type)?;
        let ptr_ty = self.builder.module.types.alloc(latticec_hir::IrType::Ptr(ir_type));
        let slot = self.builder.build_alloc(ptr_ty);
        self.builder.build_store(referent_ptr, slot, None);
        let id = self.scope.declare(name, ast_type, ir_type, slot, traits | VarTraits::REFERENCE);
        Ok(id)
    }

    /// Resolves a variable's real address: reference vars store their
    /// target's address in their slot, so it must be loaded once first;
    /// plain locals/statics use the slot directly.
    pub fn var_address(&mut self, var: &BridgeVar) -> ValueId {
        if var.is_reference() {
            self.builder.build_load(var.ptr(), None)
        } else {
            var.ptr()
        }
    }

    pub fn find_var(&self, name: Symbol) -> Option<&BridgeVar> {
        self.scope.find_var(name)
    }

    // ---- loop labels ----

    pub fn push_loop(&mut self, label: Option<Symbol>, break_block: latticec_hir::BlockId, continue_block: latticec_hir::BlockId) {
        self.loops.push(LoopFrame { label, break_block, continue_block, scope_depth: self.scope.depth() });
    }

    pub fn pop_loop(&mut self) {
        self.loops.pop();
    }

    /// Resolves a `break`/`continue` target: the innermost loop when
    /// `label` is `None`, otherwise the named loop, searched outward
    /// (spec.md §4.7 "labeled `break`/`continue` targets an outer loop").
    fn find_loop(&self, label: Option<Symbol>) -> Option<(latticec_hir::BlockId, latticec_hir::BlockId, usize)> {
        match label {
            None => self.loops.last().map(|f| (f.break_block, f.continue_block, f.scope_depth)),
            Some(name) => self
                .loops
                .iter()
                .rev()
                .find(|f| f.label == Some(name))
                .map(|f| (f.break_block, f.continue_block, f.scope_depth)),
        }
    }

    /// Emits the defer set for every scope between the current one and
    /// `target_depth` (exclusive), in reverse-declaration order, without
    /// popping any scope — used before a non-local jump (`break`,
    /// `continue`, `return`) leaves scopes behind still logically open.
    fn defer_up_to(&mut self, target_depth: usize) {
        let vars: Vec<BridgeVar> = self.scope.defer_set_up_to(target_depth).into_iter().cloned().collect();
        self.run_defers(vars.iter());
    }

    /// Lowers a `break <label>?` statement. Returns `Err` with a diagnostic
    /// already emitted if no matching loop is in scope.
    pub fn build_labeled_break(&mut self, label: Option<Symbol>, span: SourceSpan) {
        match self.find_loop(label) {
            Some((break_block, _, depth)) => {
                self.defer_up_to(depth);
                self.builder.build_break(break_block);
            }
            None => self.error(span, "`break` outside of any loop"),
        }
    }

    pub fn build_labeled_continue(&mut self, label: Option<Symbol>, span: SourceSpan) {
        match self.find_loop(label) {
            Some((_, continue_block, depth)) => {
                self.defer_up_to(depth);
                self.builder.build_break(continue_block);
            }
            None => self.error(span, "`continue` outside of any loop"),
        }
    }

    /// Defers every variable from the current scope down to (and
    /// including) the function root, then emits `return` — `return` always
    /// unwinds the whole function regardless of loop nesting (spec.md §4.7
    /// "Return").
    pub fn build_return_deferring(&mut self, value: Option<ValueId>) {
        let vars: Vec<BridgeVar> = self.scope.defer_set_to_root().into_iter().cloned().collect();
        self.run_defers(vars.iter());
        self.builder.build_return(value);
    }

    pub fn ast_traits_to_func_traits(traits: crate::ast::AstFuncTraits) -> FuncTraits {
        let mut out = FuncTraits::empty();
        if traits.contains(crate::ast::AstFuncTraits::FOREIGN) {
            out |= FuncTraits::FOREIGN;
        }
        if traits.contains(crate::ast::AstFuncTraits::VARARG) {
            out |= FuncTraits::VARARG;
        }
        if traits.contains(crate::ast::AstFuncTraits::MAIN) {
            out |= FuncTraits::MAIN;
        }
        if traits.contains(crate::ast::AstFuncTraits::STDCALL) {
            out |= FuncTraits::STDCALL;
        }
        out
    }

    pub fn storage_static(&self, var: &BridgeVar) -> bool {
        matches!(var.storage, VarStorage::Static { .. })
    }

    /// Consumes the generator, handing back the finished basic blocks and
    /// local-variable count for attachment to the [`latticec_hir::IrFunc`]
    /// this body belongs to (spec.md §2 step 4).
    pub fn finish(self) -> (latticec_hir::BasicBlocks, u32) {
        self.builder.finish()
    }
}
