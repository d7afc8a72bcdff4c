//! Statement lowering (spec.md §4.7). Grounded on `IRGEN/ir_gen_stmt.c`'s
//! `ir_gen_stmts`: each statement either falls through to the next or is a
//! guaranteed terminator (`return`/`break`/`continue`/`fallthrough`), and
//! [`lower_stmts`] reports which, the same tri-state propagation
//! [`crate::call`]/[`crate::expr`] already use for expressions.

use latticec_hir::{CastKind, GenResult, IrType, TypeCategory, ValueId};
use latticec_session::SourceSpan;
use latticec_symbol::Symbol;

use crate::ast::{AstExpr, AstStmt};
use crate::conform::{conform, ConformMode};
use crate::expr::{binop_instr, lower_expr, lower_place};
use crate::funcbuilder::FuncGen;
use crate::sfcache::{find_or_autogen, find_user_method, ManagementKind};

use GenResult::{AltFailure, Failure, Success};

/// Lowers a statement list as a new child scope, closing it (running
/// defers) unless the list itself already terminated — a terminated block
/// has already deferred everything on its way out (spec.md §4.7 "Auto-
/// termination helper").
pub fn lower_block(fg: &mut FuncGen, body: &[AstStmt]) -> GenResult<bool> {
    fg.open_scope();
    let result = lower_stmts(fg, body);
    match result {
        Success(true) => {}
        _ => fg.close_scope(),
    }
    result
}

/// Lowers a flat statement sequence in the *current* scope, returning
/// whether the sequence ended in a guaranteed terminator.
pub fn lower_stmts(fg: &mut FuncGen, stmts: &[AstStmt]) -> GenResult<bool> {
    for stmt in stmts {
        match lower_stmt(fg, stmt) {
            Success(true) => return Success(true),
            Success(false) => {}
            Failure => return Failure,
            AltFailure => return AltFailure,
        }
    }
    Success(false)
}

fn lower_stmt(fg: &mut FuncGen, stmt: &AstStmt) -> GenResult<bool> {
    match stmt {
        AstStmt::Return(value, span) => lower_return(fg, value.as_ref(), *span),
        AstStmt::Declare { name, ty, initial, undef, pod, inputs, span } => {
            lower_declare(fg, *name, ty, initial.as_ref(), *undef, *pod, inputs, *span).map(|()| false)
        }
        AstStmt::Assign { dest, value, pod, span } => lower_assign(fg, dest, value, *pod, *span).map(|()| false),
        AstStmt::CompoundAssign { dest, op, value, span } => lower_compound_assign(fg, dest, *op, value, *span).map(|()| false),
        AstStmt::If { cond, body } => lower_if(fg, cond, body, &[], false),
        AstStmt::Unless { cond, body } => lower_if(fg, cond, body, &[], true),
        AstStmt::IfElse { cond, then_body, else_body } => lower_if(fg, cond, then_body, else_body, false),
        AstStmt::UnlessElse { cond, then_body, else_body } => lower_if(fg, cond, then_body, else_body, true),
        AstStmt::While { label, cond, body } => lower_pretest_loop(fg, *label, cond, body, false),
        AstStmt::Until { label, cond, body } => lower_pretest_loop(fg, *label, cond, body, true),
        AstStmt::WhileContinue { label, cond, body } => lower_posttest_loop(fg, *label, cond, body, false),
        AstStmt::UntilBreak { label, cond, body } => lower_posttest_loop(fg, *label, cond, body, true),
        AstStmt::EachIn { label, it_name, subject, is_static, body, span } => {
            lower_each_in(fg, *label, *it_name, subject, *is_static, body, *span)
        }
        AstStmt::Repeat { label, limit, body } => lower_repeat(fg, *label, limit, body),
        AstStmt::For { label, before, cond, after, body } => lower_for(fg, *label, before, cond, after, body),
        AstStmt::Switch { scrutinee, cases, default, exhaustive, span } => {
            lower_switch(fg, scrutinee, cases, default.as_deref(), *exhaustive, *span)
        }
        AstStmt::Break(label) => {
            let span = fg.span_or_unknown(None);
            fg.build_labeled_break(*label, span);
            Success(true)
        }
        AstStmt::Continue(label) => {
            let span = fg.span_or_unknown(None);
            fg.build_labeled_continue(*label, span);
            Success(true)
        }
        AstStmt::Fallthrough => Success(true),
        AstStmt::Delete(expr, span) => lower_delete(fg, expr, *span).map(|()| false),
        AstStmt::VaStart(expr) => match lower_expr(fg, expr) {
            Success((v, _)) => {
                fg.builder.build_va_start(v);
                Success(false)
            }
            other => other.map(|_| false),
        },
        AstStmt::VaEnd(expr) => match lower_expr(fg, expr) {
            Success((v, _)) => {
                fg.builder.build_va_end(v);
                Success(false)
            }
            other => other.map(|_| false),
        },
        AstStmt::VaCopy { dest, src } => lower_va_copy(fg, dest, src).map(|()| false),
        AstStmt::Asm { template, constraints, side_effects, align_stack, intel_dialect } => {
            let dialect = if *intel_dialect { latticec_hir::AsmDialect::Intel } else { latticec_hir::AsmDialect::ATT };
            fg.builder.build_asm(template.clone(), constraints.clone(), *side_effects, *align_stack, dialect);
            Success(false)
        }
        AstStmt::ConditionlessBlock(body) => lower_block(fg, body),
        AstStmt::Expr(expr) => match lower_expr(fg, expr) {
            Success(_) => Success(false),
            Failure => Failure,
            AltFailure => AltFailure,
        },
    }
}

fn lower_return(fg: &mut FuncGen, value: Option<&AstExpr>, span: SourceSpan) -> GenResult<bool> {
    let lowered = match value {
        Some(expr) => match lower_expr(fg, expr) {
            Success(v) => Some(v),
            Failure => return Failure,
            AltFailure => return AltFailure,
        },
        None => None,
    };
    let ret_value = lowered.map(|(v, _)| v);
    let _ = span;
    fg.build_return_deferring(ret_value);
    Success(true)
}

/// Declares a local, then either zero-inits (done inside
/// [`FuncGen::declare_var`]), assigns an initial value, or forwards
/// constructor `inputs` to a user `__constructor__` overload (spec.md §4.7
/// "Declare / DeclareUndef").
fn lower_declare(
    fg: &mut FuncGen,
    name: Symbol,
    ty: &crate::ast::AstType,
    initial: Option<&AstExpr>,
    undef: bool,
    pod: bool,
    inputs: &[AstExpr],
    span: SourceSpan,
) -> GenResult<()> {
    let mut traits = crate::scope::VarTraits::empty();
    if pod {
        traits |= crate::scope::VarTraits::POD;
    }
    let id = match fg.declare_var(name, ty.clone(), traits, undef || !inputs.is_empty()) {
        Ok(id) => id,
        Err(e) => {
            fg.error(span, e);
            return Failure;
        }
    };
    let _ = id;
    let var = fg.find_var(name).expect("just declared").clone();

    if let Some(init) = initial {
        let (value, value_ty) = match lower_expr(fg, init) {
            Success(v) => v,
            Failure => return Failure,
            AltFailure => return AltFailure,
        };
        match conform(&mut fg.builder, value, value_ty, var.ir_type, ConformMode::ASSIGNING) {
            Some(conformed) => fg.builder.build_store(conformed, var.ptr(), Some(span)),
            None => {
                fg.error(span, "initializer does not conform to declared type");
                return Failure;
            }
        }
        return Success(());
    }

    if !inputs.is_empty() {
        let Some(type_name) = fg.typemap.name_of(var.ir_type) else {
            fg.error(span, "type has no constructor");
            return Failure;
        };
        let Some(pair) = find_user_method(fg.builder.module, type_name, "__constructor__") else {
            fg.error(span, format!("'{type_name}' has no '__constructor__'"));
            return Failure;
        };
        let mut args = vec![var.ptr()];
        for input in inputs {
            match lower_expr(fg, input) {
                Success((v, _)) => args.push(v),
                Failure => return Failure,
                AltFailure => return AltFailure,
            }
        }
        let void_ty = fg.typemap.find(Symbol::intern("void")).expect("void seeded");
        fg.builder.build_call(pair.ir_func_id, args, void_ty);
    }
    Success(())
}

/// `dest = value`: tries a user `__assign__` first, falling back to a
/// plain POD store under `ASSIGNING` conformance (spec.md §4.7
/// "Assignment").
fn lower_assign(fg: &mut FuncGen, dest: &AstExpr, value: &AstExpr, pod: bool, span: SourceSpan) -> GenResult<()> {
    let (dest_addr, dest_ty) = match lower_place(fg, dest) {
        Success(v) => v,
        Failure => return Failure,
        AltFailure => return AltFailure,
    };

    if !pod {
        if let Some(type_name) = fg.typemap.name_of(dest_ty) {
            if let GenResult::Success(Some(pair)) =
                find_or_autogen(fg.builder.module, fg.ast, fg.typemap, ManagementKind::Assign, type_name)
            {
                let (value_val, value_ty) = match lower_expr(fg, value) {
                    Success(v) => v,
                    Failure => return Failure,
                    AltFailure => return AltFailure,
                };
                let conformed = conform(&mut fg.builder, value_val, value_ty, dest_ty, ConformMode::ASSIGNING).unwrap_or(value_val);
                fg.builder.build_call(pair.ir_func_id, vec![dest_addr, conformed], dest_ty);
                return Success(());
            }
        }
    }

    let (value_val, value_ty) = match lower_expr(fg, value) {
        Success(v) => v,
        Failure => return Failure,
        AltFailure => return AltFailure,
    };
    match conform(&mut fg.builder, value_val, value_ty, dest_ty, ConformMode::ASSIGNING) {
        Some(conformed) => {
            fg.builder.build_store(conformed, dest_addr, Some(span));
            Success(())
        }
        None => {
            fg.error(span, "value does not conform to the assigned variable's type");
            Failure
        }
    }
}

/// `dest += value` etc: always POD (spec.md §4.7 "Compound assignment
/// ... always operates POD"), load/math/store.
fn lower_compound_assign(fg: &mut FuncGen, dest: &AstExpr, op: crate::ast::BinOp, value: &AstExpr, span: SourceSpan) -> GenResult<()> {
    let (dest_addr, dest_ty) = match lower_place(fg, dest) {
        Success(v) => v,
        Failure => return Failure,
        AltFailure => return AltFailure,
    };
    let (value_val, value_ty) = match lower_expr(fg, value) {
        Success(v) => v,
        Failure => return Failure,
        AltFailure => return AltFailure,
    };
    let conformed = match conform(&mut fg.builder, value_val, value_ty, dest_ty, ConformMode::CALCULATION) {
        Some(v) => v,
        None => {
            fg.error(span, "compound-assignment operand does not conform");
            return Failure;
        }
    };
    let current = fg.builder.build_load(dest_addr, Some(span));
    let cat = fg.builder.module.types.category(dest_ty);
    let Some(opcode) = binop_instr(op, cat, current, conformed) else {
        fg.error(span, "compound assignment requires an arithmetic type");
        return Failure;
    };
    let result = fg.builder.build_unary(opcode, dest_ty);
    fg.builder.build_store(result, dest_addr, Some(span));
    Success(())
}

fn conform_cond(fg: &mut FuncGen, cond: &AstExpr) -> GenResult<ValueId> {
    let (cond_val, cond_ty) = match lower_expr(fg, cond) {
        Success(v) => v,
        Failure => return Failure,
        AltFailure => return AltFailure,
    };
    let bool_ty = fg.typemap.find(Symbol::intern("bool")).expect("bool seeded");
    Success(conform(&mut fg.builder, cond_val, cond_ty, bool_ty, ConformMode::CALCULATION).unwrap_or(cond_val))
}

/// `If`/`Unless`/`IfElse`/`UnlessElse`: `unless` just swaps the true/false
/// targets (spec.md §4.7).
fn lower_if(fg: &mut FuncGen, cond: &AstExpr, then_body: &[AstStmt], else_body: &[AstStmt], unless: bool) -> GenResult<bool> {
    let cond_val = match conform_cond(fg, cond) {
        Success(v) => v,
        Failure => return Failure,
        AltFailure => return AltFailure,
    };

    let then_block = fg.builder.build_basicblock();
    let else_block = fg.builder.build_basicblock();
    let end_block = fg.builder.build_basicblock();
    if unless {
        fg.builder.build_cond_break(cond_val, else_block, then_block);
    } else {
        fg.builder.build_cond_break(cond_val, then_block, else_block);
    }

    fg.builder.build_using_basicblock(then_block);
    let then_terminated = match lower_block(fg, then_body) {
        Success(t) => t,
        Failure => return Failure,
        AltFailure => return AltFailure,
    };
    if !then_terminated {
        fg.builder.build_break(end_block);
    }

    fg.builder.build_using_basicblock(else_block);
    let else_terminated = if else_body.is_empty() {
        false
    } else {
        match lower_block(fg, else_body) {
            Success(t) => t,
            Failure => return Failure,
            AltFailure => return AltFailure,
        }
    };
    if !else_terminated {
        fg.builder.build_break(end_block);
    }

    fg.builder.build_using_basicblock(end_block);
    Success(then_terminated && else_terminated)
}

/// `While`/`Until`: condition re-checked at the top of each iteration;
/// `continue` re-enters the check (spec.md §4.7).
fn lower_pretest_loop(fg: &mut FuncGen, label: Option<Symbol>, cond: &AstExpr, body: &[AstStmt], invert: bool) -> GenResult<bool> {
    let check_block = fg.builder.build_basicblock();
    let body_block = fg.builder.build_basicblock();
    let end_block = fg.builder.build_basicblock();

    fg.builder.build_break(check_block);
    fg.builder.build_using_basicblock(check_block);
    let cond_val = match conform_cond(fg, cond) {
        Success(v) => v,
        Failure => return Failure,
        AltFailure => return AltFailure,
    };
    if invert {
        fg.builder.build_cond_break(cond_val, end_block, body_block);
    } else {
        fg.builder.build_cond_break(cond_val, body_block, end_block);
    }

    fg.builder.build_using_basicblock(body_block);
    fg.push_loop(label, end_block, check_block);
    let terminated = match lower_block(fg, body) {
        Success(t) => t,
        Failure => {
            fg.pop_loop();
            return Failure;
        }
        AltFailure => {
            fg.pop_loop();
            return AltFailure;
        }
    };
    fg.pop_loop();
    if !terminated {
        fg.builder.build_break(check_block);
    }

    fg.builder.build_using_basicblock(end_block);
    Success(false)
}

/// `WhileContinue`/`UntilBreak`: post-test loops — the body runs once
/// unconditionally before the first check, `continue` jumps to the check
/// rather than the body start (spec.md §4.7 distinguishes these from the
/// pre-test `While`/`Until` forms by loop-entry position).
fn lower_posttest_loop(fg: &mut FuncGen, label: Option<Symbol>, cond: &AstExpr, body: &[AstStmt], invert: bool) -> GenResult<bool> {
    let body_block = fg.builder.build_basicblock();
    let check_block = fg.builder.build_basicblock();
    let end_block = fg.builder.build_basicblock();

    fg.builder.build_break(body_block);
    fg.builder.build_using_basicblock(body_block);
    fg.push_loop(label, end_block, check_block);
    let terminated = match lower_block(fg, body) {
        Success(t) => t,
        Failure => {
            fg.pop_loop();
            return Failure;
        }
        AltFailure => {
            fg.pop_loop();
            return AltFailure;
        }
    };
    fg.pop_loop();
    if !terminated {
        fg.builder.build_break(check_block);
    }

    fg.builder.build_using_basicblock(check_block);
    let cond_val = match conform_cond(fg, cond) {
        Success(v) => v,
        Failure => return Failure,
        AltFailure => return AltFailure,
    };
    if invert {
        fg.builder.build_cond_break(cond_val, end_block, body_block);
    } else {
        fg.builder.build_cond_break(cond_val, body_block, end_block);
    }

    fg.builder.build_using_basicblock(end_block);
    Success(false)
}

/// Binds `it` (a reference to the element type) and `idx` (`usize`) over
/// a fixed array, a raw pointer paired with a `__length__`/`__array__`
/// method pair, or a bare pointer subject treated as unbounded (spec.md
/// §4.7 "Each-in"). `is_static` only affects whether length/array are
/// recomputed each iteration; both forms hoist them here since nothing in
/// this crate's expression lowering has visible side effects beyond calls.
fn lower_each_in(
    fg: &mut FuncGen,
    label: Option<Symbol>,
    it_name: Symbol,
    subject: &AstExpr,
    _is_static: bool,
    body: &[AstStmt],
    span: SourceSpan,
) -> GenResult<bool> {
    let (length, array_ptr, elem_ty) = match each_in_source(fg, subject, span) {
        Success(v) => v,
        Failure => return Failure,
        AltFailure => return AltFailure,
    };

    let usize_ty = fg.builder.module.common.ir_usize.expect("usize seeded");
    fg.open_scope();
    let idx_id = match fg.declare_var(Symbol::intern("idx"), crate::ast::AstType::base(Symbol::intern("usize")), crate::scope::VarTraits::POD, true) {
        Ok(id) => id,
        Err(e) => {
            fg.error(span, e);
            fg.close_scope();
            return Failure;
        }
    };
    let _ = idx_id;
    let idx_var = fg.find_var(Symbol::intern("idx")).expect("just declared").clone();
    let zero = fg.builder.build_literal(usize_ty, 0u64.to_le_bytes().to_vec());
    fg.builder.build_store(zero, idx_var.ptr(), Some(span));

    let check_block = fg.builder.build_basicblock();
    let body_block = fg.builder.build_basicblock();
    let incr_block = fg.builder.build_basicblock();
    let end_block = fg.builder.build_basicblock();

    fg.builder.build_break(check_block);
    fg.builder.build_using_basicblock(check_block);
    let idx_val = fg.builder.build_load(idx_var.ptr(), Some(span));
    let in_bounds = fg.builder.build_unary(latticec_hir::Opcode::ULt { lhs: idx_val, rhs: length }, fg.typemap.find(Symbol::intern("bool")).expect("bool seeded"));
    fg.builder.build_cond_break(in_bounds, body_block, end_block);

    fg.builder.build_using_basicblock(body_block);
    fg.open_scope();
    let it_ptr = fg.builder.build_array_access(array_ptr, idx_val, elem_ty, Some(span));
    let it_ir_name = fg.typemap.name_of(elem_ty).unwrap_or_else(|| Symbol::intern("void"));
    let it_ast_ty = crate::ast::AstType::base(it_ir_name);
    if let Err(e) = fg.declare_reference_var(it_name, it_ast_ty, it_ptr, crate::scope::VarTraits::empty()) {
        fg.error(span, e);
    }
    fg.push_loop(label, end_block, incr_block);
    let terminated = match lower_stmts(fg, body) {
        Success(t) => t,
        Failure => {
            fg.pop_loop();
            fg.close_scope();
            fg.close_scope();
            return Failure;
        }
        AltFailure => {
            fg.pop_loop();
            fg.close_scope();
            fg.close_scope();
            return AltFailure;
        }
    };
    fg.pop_loop();
    fg.close_scope();
    if !terminated {
        fg.builder.build_break(incr_block);
    }

    fg.builder.build_using_basicblock(incr_block);
    let idx_val2 = fg.builder.build_load(idx_var.ptr(), Some(span));
    let one = fg.builder.build_literal(usize_ty, 1u64.to_le_bytes().to_vec());
    let next = fg.builder.build_unary(latticec_hir::Opcode::Add { lhs: idx_val2, rhs: one }, usize_ty);
    fg.builder.build_store(next, idx_var.ptr(), Some(span));
    fg.builder.build_break(check_block);

    fg.builder.build_using_basicblock(end_block);
    fg.close_scope();
    Success(false)
}

/// Resolves `(length: usize, array base ptr, element type)` for an
/// each-in subject: a fixed-array place, a struct exposing
/// `__length__`/`__array__`, or a bare pointer (treated as length
/// `usize::MAX`-free iteration is not supported without a known bound, so
/// bare pointers are rejected here).
fn each_in_source(fg: &mut FuncGen, subject: &AstExpr, span: SourceSpan) -> GenResult<(ValueId, ValueId, latticec_hir::TypeId)> {
    let (addr, ty) = match lower_place(fg, subject) {
        Success(v) => v,
        Failure => return Failure,
        AltFailure => return AltFailure,
    };
    let usize_ty = fg.builder.module.common.ir_usize.expect("usize seeded");
    match fg.builder.module.types.get(ty) {
        IrType::FixedArray { subtype, length } => {
            let elem_ty = *subtype;
            let len_val = fg.builder.build_literal(usize_ty, length.to_le_bytes().to_vec());
            let elem_ptr_ty = fg.builder.module.types.alloc(IrType::Ptr(elem_ty));
            let base = fg.builder.build_cast(CastKind::Bitcast, addr, elem_ptr_ty);
            Success((len_val, base, elem_ty))
        }
        _ => {
            let Some(type_name) = fg.typemap.name_of(ty) else {
                fg.error(span, "each-in subject is not an array or iterable struct");
                return Failure;
            };
            let (Some(length_pair), Some(array_pair)) = (
                find_user_method(fg.builder.module, type_name, "__length__"),
                find_user_method(fg.builder.module, type_name, "__array__"),
            ) else {
                fg.error(span, format!("'{type_name}' has no '__length__'/'__array__'"));
                return Failure;
            };
            let length = fg.builder.build_call(length_pair.ir_func_id, vec![addr], usize_ty);
            let array_ret_ty = fg.builder.module.func(array_pair.ir_func_id).return_type;
            let array_ptr = fg.builder.build_call(array_pair.ir_func_id, vec![addr], array_ret_ty);
            let IrType::Ptr(elem_ty) = fg.builder.module.types.get(array_ret_ty) else {
                fg.error(span, format!("'{type_name}.__array__' does not return a pointer"));
                return Failure;
            };
            Success((length, array_ptr, *elem_ty))
        }
    }
}

/// `Repeat limit { ... }`: same counting loop as each-in but binding only
/// `idx` (spec.md §4.7 "like `each_in` but only the `idx` variable").
fn lower_repeat(fg: &mut FuncGen, label: Option<Symbol>, limit: &AstExpr, body: &[AstStmt]) -> GenResult<bool> {
    let (limit_val, limit_ty) = match lower_expr(fg, limit) {
        Success(v) => v,
        Failure => return Failure,
        AltFailure => return AltFailure,
    };
    let usize_ty = fg.builder.module.common.ir_usize.expect("usize seeded");
    let limit_usize = conform(&mut fg.builder, limit_val, limit_ty, usize_ty, ConformMode::CALCULATION).unwrap_or(limit_val);

    fg.open_scope();
    let span = fg.span_or_unknown(None);
    let _ = fg.declare_var(Symbol::intern("idx"), crate::ast::AstType::base(Symbol::intern("usize")), crate::scope::VarTraits::POD, true);
    let idx_var = fg.find_var(Symbol::intern("idx")).expect("just declared").clone();
    let zero = fg.builder.build_literal(usize_ty, 0u64.to_le_bytes().to_vec());
    fg.builder.build_store(zero, idx_var.ptr(), Some(span));

    let check_block = fg.builder.build_basicblock();
    let body_block = fg.builder.build_basicblock();
    let incr_block = fg.builder.build_basicblock();
    let end_block = fg.builder.build_basicblock();

    fg.builder.build_break(check_block);
    fg.builder.build_using_basicblock(check_block);
    let idx_val = fg.builder.build_load(idx_var.ptr(), Some(span));
    let bool_ty = fg.typemap.find(Symbol::intern("bool")).expect("bool seeded");
    let in_bounds = fg.builder.build_unary(latticec_hir::Opcode::ULt { lhs: idx_val, rhs: limit_usize }, bool_ty);
    fg.builder.build_cond_break(in_bounds, body_block, end_block);

    fg.builder.build_using_basicblock(body_block);
    fg.push_loop(label, end_block, incr_block);
    let terminated = match lower_block(fg, body) {
        Success(t) => t,
        Failure => {
            fg.pop_loop();
            fg.close_scope();
            return Failure;
        }
        AltFailure => {
            fg.pop_loop();
            fg.close_scope();
            return AltFailure;
        }
    };
    fg.pop_loop();
    if !terminated {
        fg.builder.build_break(incr_block);
    }

    fg.builder.build_using_basicblock(incr_block);
    let idx_val2 = fg.builder.build_load(idx_var.ptr(), Some(span));
    let one = fg.builder.build_literal(usize_ty, 1u64.to_le_bytes().to_vec());
    let next = fg.builder.build_unary(latticec_hir::Opcode::Add { lhs: idx_val2, rhs: one }, usize_ty);
    fg.builder.build_store(next, idx_var.ptr(), Some(span));
    fg.builder.build_break(check_block);

    fg.builder.build_using_basicblock(end_block);
    fg.close_scope();
    Success(false)
}

/// `for before; cond; after { body }`: four blocks, `before`/`after` must
/// not themselves terminate (spec.md §4.7 "For").
fn lower_for(fg: &mut FuncGen, label: Option<Symbol>, before: &[AstStmt], cond: &AstExpr, after: &[AstStmt], body: &[AstStmt]) -> GenResult<bool> {
    fg.open_scope();
    match lower_stmts(fg, before) {
        Success(false) => {}
        Success(true) => {
            fg.error(fg.span_or_unknown(None), "`for` init statements must not terminate");
            fg.close_scope();
            return Failure;
        }
        Failure => {
            fg.close_scope();
            return Failure;
        }
        AltFailure => {
            fg.close_scope();
            return AltFailure;
        }
    }

    let check_block = fg.builder.build_basicblock();
    let body_block = fg.builder.build_basicblock();
    let adv_block = fg.builder.build_basicblock();
    let end_block = fg.builder.build_basicblock();

    fg.builder.build_break(check_block);
    fg.builder.build_using_basicblock(check_block);
    let cond_val = match conform_cond(fg, cond) {
        Success(v) => v,
        Failure => {
            fg.close_scope();
            return Failure;
        }
        AltFailure => {
            fg.close_scope();
            return AltFailure;
        }
    };
    fg.builder.build_cond_break(cond_val, body_block, end_block);

    fg.builder.build_using_basicblock(body_block);
    fg.push_loop(label, end_block, adv_block);
    let terminated = match lower_block(fg, body) {
        Success(t) => t,
        Failure => {
            fg.pop_loop();
            fg.close_scope();
            return Failure;
        }
        AltFailure => {
            fg.pop_loop();
            fg.close_scope();
            return AltFailure;
        }
    };
    fg.pop_loop();
    if !terminated {
        fg.builder.build_break(adv_block);
    }

    fg.builder.build_using_basicblock(adv_block);
    match lower_stmts(fg, after) {
        Success(false) => {}
        Success(true) => {
            fg.error(fg.span_or_unknown(None), "`for` advance statements must not terminate");
            fg.close_scope();
            return Failure;
        }
        Failure => {
            fg.close_scope();
            return Failure;
        }
        AltFailure => {
            fg.close_scope();
            return AltFailure;
        }
    }
    fg.builder.build_break(check_block);

    fg.builder.build_using_basicblock(end_block);
    fg.close_scope();
    Success(false)
}

/// Extracts a compile-time integer constant from a case label, the only
/// shape `Switch` accepts for its scrutinee cases (spec.md §4.7 "case
/// values must be constants").
fn const_case_value(expr: &AstExpr) -> Option<u64> {
    match expr {
        AstExpr::Byte(v) => Some(*v as u8 as u64),
        AstExpr::Ubyte(v) => Some(*v as u64),
        AstExpr::Short(v) => Some(*v as u16 as u64),
        AstExpr::Ushort(v) => Some(*v as u64),
        AstExpr::Int(v) => Some(*v as u32 as u64),
        AstExpr::Uint(v) => Some(*v as u64),
        AstExpr::Long(v) => Some(*v as u64),
        AstExpr::Ulong(v) => Some(*v),
        AstExpr::Bool(v) => Some(*v as u64),
        _ => None,
    }
}

/// Checks that `values` covers every member of `en`, keyed by each case's
/// value as the member's ordinal (declaration-index) position — the
/// same scheme `IRGEN/ir_gen_stmt.c`'s `exhaustive_switch_check` uses: a
/// `covered[]` bitmap sized to the enum's member count, one bit set per
/// in-range case value, with every uncovered member named in the
/// diagnostic and every out-of-range value rejected outright. Enums over
/// 512 members fall back to a bare count comparison, matching the
/// original's own size-gated cutoff.
fn check_exhaustive(fg: &FuncGen, type_name: Symbol, en: &crate::ast::AstEnum, values: &[u64], span: SourceSpan) -> bool {
    if en.members.len() > 512 {
        if values.len() < en.members.len() {
            fg.error(span, format!("non-exhaustive switch over '{type_name}': missing {} case(s)", en.members.len() - values.len()));
            return false;
        }
        return true;
    }

    let mut covered = vec![false; en.members.len()];
    for &value in values {
        match usize::try_from(value).ok().filter(|&i| i < en.members.len()) {
            Some(i) => covered[i] = true,
            None => {
                fg.error(span, format!("switch case value {value} is out of range for enum '{type_name}' with {} member(s)", en.members.len()));
                return false;
            }
        }
    }

    let missing: Vec<String> = covered
        .iter()
        .enumerate()
        .filter(|(_, &c)| !c)
        .map(|(i, _)| format!("case {type_name}::{}", en.members[i]))
        .collect();
    if !missing.is_empty() {
        fg.error(span, format!("non-exhaustive switch over '{type_name}': missing {}", missing.join(", ")));
        return false;
    }
    true
}

/// `Switch`: integer-only scrutinee, unique constant case labels,
/// fallthrough to the next case unless `Fallthrough`/a terminator ends
/// the arm, exhaustiveness checked against the enum member count when
/// `exhaustive` is set (spec.md §4.7, capped at 512 per §4.7 "≤512
/// values").
fn lower_switch(
    fg: &mut FuncGen,
    scrutinee: &AstExpr,
    cases: &[(AstExpr, Vec<AstStmt>)],
    default: Option<&[AstStmt]>,
    exhaustive: bool,
    span: SourceSpan,
) -> GenResult<bool> {
    let (scrut_val, scrut_ty) = match lower_expr(fg, scrutinee) {
        Success(v) => v,
        Failure => return Failure,
        AltFailure => return AltFailure,
    };
    let cat = fg.builder.module.types.category(scrut_ty);
    if !matches!(cat, TypeCategory::Si | TypeCategory::Ui) {
        fg.error(span, "switch scrutinee must be an integer type");
        return Failure;
    }

    if cases.len() > 512 {
        fg.error(span, "switch has more than 512 cases");
        return Failure;
    }

    let mut values = Vec::with_capacity(cases.len());
    for (label_expr, _) in cases {
        let Some(value) = const_case_value(label_expr) else {
            fg.error(span, "switch case label must be a compile-time integer constant");
            return Failure;
        };
        values.push(value);
    }

    let mut seen = std::collections::HashSet::new();
    for &value in &values {
        if !seen.insert(value) {
            fg.error(span, "duplicate switch case value");
            return Failure;
        }
    }

    if exhaustive {
        if let Some(type_name) = fg.typemap.name_of(scrut_ty) {
            if let Some(en) = fg.ast.enums.iter().find(|e| e.name == type_name) {
                if !check_exhaustive(fg, type_name, en, &values, span) {
                    return Failure;
                }
            }
        }
    }

    let mut case_blocks = Vec::with_capacity(cases.len());
    for &value in &values {
        case_blocks.push((value, fg.builder.build_basicblock()));
    }
    let default_block = fg.builder.build_basicblock();
    let end_block = fg.builder.build_basicblock();

    fg.builder.build_switch(scrut_val, case_blocks.clone(), default_block);

    let mut all_terminated = true;
    for (i, (_, body)) in cases.iter().enumerate() {
        fg.builder.build_using_basicblock(case_blocks[i].1);
        let terminated = match lower_block(fg, body) {
            Success(t) => t,
            Failure => return Failure,
            AltFailure => return AltFailure,
        };
        if !terminated {
            let fallthrough_target = case_blocks.get(i + 1).map(|(_, b)| *b).unwrap_or(default_block);
            fg.builder.build_break(fallthrough_target);
        }
        all_terminated &= terminated;
    }

    fg.builder.build_using_basicblock(default_block);
    let default_terminated = match default {
        Some(body) => match lower_block(fg, body) {
            Success(t) => t,
            Failure => return Failure,
            AltFailure => return AltFailure,
        },
        None => false,
    };
    if !default_terminated {
        fg.builder.build_break(end_block);
    }

    fg.builder.build_using_basicblock(end_block);
    Success(all_terminated && default_terminated)
}

fn lower_delete(fg: &mut FuncGen, expr: &AstExpr, span: SourceSpan) -> GenResult<()> {
    let (value, ty) = match lower_expr(fg, expr) {
        Success(v) => v,
        Failure => return Failure,
        AltFailure => return AltFailure,
    };
    if !matches!(fg.builder.module.types.get(ty), IrType::Ptr(_)) {
        fg.error(span, "`delete` requires a pointer value");
        return Failure;
    }
    fg.builder.build_free(value);
    Success(())
}

fn lower_va_copy(fg: &mut FuncGen, dest: &AstExpr, src: &AstExpr) -> GenResult<()> {
    let (dest_val, _) = match lower_expr(fg, dest) {
        Success(v) => v,
        Failure => return Failure,
        AltFailure => return AltFailure,
    };
    let (src_val, _) = match lower_expr(fg, src) {
        Success(v) => v,
        Failure => return Failure,
        AltFailure => return AltFailure,
    };
    fg.builder.build_va_copy(dest_val, src_val);
    Success(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Ast, AstType};
    use crate::funcbuilder::FuncGen;
    use crate::typemap::{TypeMap, TypeTable};
    use latticec_hir::IrModule;
    use latticec_session::DiagnosticsHandler;

    fn fresh() -> (IrModule, Ast, TypeMap, TypeTable, DiagnosticsHandler) {
        let mut module = IrModule::new();
        let mut typemap = TypeMap::new();
        typemap.seed_primitives(&mut module);
        (module, Ast::default(), typemap, TypeTable::new(), DiagnosticsHandler::new())
    }

    #[test]
    fn declare_with_initial_stores_conformed_value() {
        let (mut module, mut ast, mut typemap, mut table, diags) = fresh();
        let mut fg = FuncGen::new(&mut module, &mut ast, &mut typemap, &mut table, &diags, Symbol::intern("t.lc"));
        let stmt = AstStmt::Declare {
            name: Symbol::intern("x"),
            ty: AstType::base(Symbol::intern("int")),
            initial: Some(AstExpr::Int(5)),
            undef: false,
            pod: true,
            inputs: Vec::new(),
            span: SourceSpan::unknown(),
        };
        assert!(matches!(lower_stmt(&mut fg, &stmt), GenResult::Success(false)));
        assert_eq!(diags.error_count(), 0);
    }

    #[test]
    fn if_with_return_on_both_branches_reports_terminated() {
        let (mut module, mut ast, mut typemap, mut table, diags) = fresh();
        let mut fg = FuncGen::new(&mut module, &mut ast, &mut typemap, &mut table, &diags, Symbol::intern("t.lc"));
        let stmt = AstStmt::IfElse {
            cond: AstExpr::Bool(true),
            then_body: vec![AstStmt::Return(Some(AstExpr::Int(1)), SourceSpan::unknown())],
            else_body: vec![AstStmt::Return(Some(AstExpr::Int(2)), SourceSpan::unknown())],
        };
        assert!(matches!(lower_stmt(&mut fg, &stmt), GenResult::Success(true)));
    }

    #[test]
    fn exhaustive_switch_names_the_uncovered_member() {
        let (mut module, mut ast, mut typemap, mut table, diags) = fresh();
        let color = Symbol::intern("Color");
        ast.enums.push(crate::ast::AstEnum {
            name: color,
            members: vec![Symbol::intern("A"), Symbol::intern("B"), Symbol::intern("C")],
            span: SourceSpan::unknown(),
        });
        let enum_ty = module.types.alloc(IrType::U64);
        typemap.declare_instantiated(color, enum_ty);

        let mut fg = FuncGen::new(&mut module, &mut ast, &mut typemap, &mut table, &diags, Symbol::intern("t.lc"));
        fg.declare_var(Symbol::intern("c"), AstType::base(color), crate::scope::VarTraits::POD, false).unwrap();

        let stmt = AstStmt::Switch {
            scrutinee: AstExpr::Variable(Symbol::intern("c")),
            cases: vec![
                (AstExpr::Int(0), vec![AstStmt::Fallthrough]),
                (AstExpr::Int(2), vec![AstStmt::Fallthrough]),
            ],
            default: None,
            exhaustive: true,
            span: SourceSpan::unknown(),
        };
        assert!(matches!(lower_stmt(&mut fg, &stmt), GenResult::Failure));
        assert_eq!(diags.error_count(), 1);
    }

    #[test]
    fn exhaustive_switch_rejects_out_of_range_case_value() {
        let (mut module, mut ast, mut typemap, mut table, diags) = fresh();
        let color = Symbol::intern("Color");
        ast.enums.push(crate::ast::AstEnum {
            name: color,
            members: vec![Symbol::intern("A"), Symbol::intern("B"), Symbol::intern("C")],
            span: SourceSpan::unknown(),
        });
        let enum_ty = module.types.alloc(IrType::U64);
        typemap.declare_instantiated(color, enum_ty);

        let mut fg = FuncGen::new(&mut module, &mut ast, &mut typemap, &mut table, &diags, Symbol::intern("t.lc"));
        fg.declare_var(Symbol::intern("c"), AstType::base(color), crate::scope::VarTraits::POD, false).unwrap();

        let stmt = AstStmt::Switch {
            scrutinee: AstExpr::Variable(Symbol::intern("c")),
            cases: vec![
                (AstExpr::Int(0), vec![AstStmt::Fallthrough]),
                (AstExpr::Int(1), vec![AstStmt::Fallthrough]),
                (AstExpr::Int(99), vec![AstStmt::Fallthrough]),
            ],
            default: None,
            exhaustive: true,
            span: SourceSpan::unknown(),
        };
        assert!(matches!(lower_stmt(&mut fg, &stmt), GenResult::Failure));
        assert_eq!(diags.error_count(), 1);
    }

    #[test]
    fn switch_rejects_duplicate_case_values() {
        let (mut module, mut ast, mut typemap, mut table, diags) = fresh();
        let mut fg = FuncGen::new(&mut module, &mut ast, &mut typemap, &mut table, &diags, Symbol::intern("t.lc"));
        let stmt = AstStmt::Switch {
            scrutinee: AstExpr::Int(0),
            cases: vec![
                (AstExpr::Int(1), vec![AstStmt::Fallthrough]),
                (AstExpr::Int(1), vec![AstStmt::Fallthrough]),
            ],
            default: None,
            exhaustive: false,
            span: SourceSpan::unknown(),
        };
        assert!(matches!(lower_stmt(&mut fg, &stmt), GenResult::Failure));
        assert!(diags.error_count() > 0);
    }
}
