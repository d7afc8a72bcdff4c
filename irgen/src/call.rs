//! Call and method-call lowering, including default-argument-promotion
//! variadic packing (spec.md §4.6). Grounded on `IRGEN/ir_gen_expr.c`'s
//! `ir_gen_call`/`ir_gen_call_method` and the `__add__`/`__subtract__`/…
//! overload-method fallback used by binary operator lowering.
//!
//! Overload resolution here is intentionally simpler than the teacher's: it
//! takes the first candidate whose arguments all conform, rather than
//! scoring every candidate and picking a best match. A real scoring pass
//! needs argument-distance comparisons this crate's `conform` module
//! doesn't expose (see DESIGN.md).

use latticec_hir::{GenResult, TypeId, ValueId};
use latticec_session::SourceSpan;
use latticec_symbol::Symbol;

use crate::ast::AstExpr;
use crate::conform::{conform, ConformMode};
use crate::funcbuilder::FuncGen;

/// Default C-style variadic argument promotion: narrower integers promote
/// to `int`/`uint`, `float` promotes to `double` (spec.md §4.6 "variadic
/// packing applies default argument promotions to trailing arguments").
fn promote_variadic(fg: &mut FuncGen, value: ValueId, ty: TypeId) -> (ValueId, TypeId) {
    use latticec_hir::{IrType, TypeCategory};
    let cat = fg.builder.module.types.category(ty);
    let bits = fg.builder.module.types.size_in_bits(ty);
    match cat {
        TypeCategory::Si if bits < 32 => {
            let int_ty = fg.typemap.find(Symbol::intern("int")).expect("int seeded");
            (conform(&mut fg.builder, value, ty, int_ty, ConformMode::PRIMITIVES).unwrap_or(value), int_ty)
        }
        TypeCategory::Ui if bits < 32 => {
            let uint_ty = fg.typemap.find(Symbol::intern("uint")).expect("uint seeded");
            (conform(&mut fg.builder, value, ty, uint_ty, ConformMode::PRIMITIVES).unwrap_or(value), uint_ty)
        }
        TypeCategory::Fp if matches!(fg.builder.module.types.get(ty), IrType::Float | IrType::Half) => {
            let double_ty = fg.typemap.find(Symbol::intern("double")).expect("double seeded");
            (conform(&mut fg.builder, value, ty, double_ty, ConformMode::PRIMITIVES).unwrap_or(value), double_ty)
        }
        _ => (value, ty),
    }
}

/// Tries to conform every argument in `args` to `param_types`, in order.
/// `variadic` extra args (beyond `param_types.len()`) are promoted rather
/// than conformed to a declared type. Returns the conformed values, or
/// `None` if any fixed argument fails to conform under `mode`.
fn conform_args(
    fg: &mut FuncGen,
    args: Vec<(ValueId, TypeId)>,
    param_types: &[TypeId],
    variadic: bool,
    mode: ConformMode,
) -> Option<Vec<ValueId>> {
    if variadic {
        if args.len() < param_types.len() {
            return None;
        }
    } else if args.len() != param_types.len() {
        return None;
    }

    let mut out = Vec::with_capacity(args.len());
    for (i, (value, ty)) in args.into_iter().enumerate() {
        if let Some(&param_ty) = param_types.get(i) {
            out.push(conform(&mut fg.builder, value, ty, param_ty, mode)?);
        } else {
            let (v, _) = promote_variadic(fg, value, ty);
            out.push(v);
        }
    }
    Some(out)
}

/// Looks up every candidate named `name` and returns the first whose
/// arguments all conform, emitting the call. `tentative` calls (spec.md
/// §4.5 "tentative call expressions") return `AltFailure` silently instead
/// of diagnosing when nothing matches, so the caller can try an overload
/// method next.
pub fn lower_call(fg: &mut FuncGen, name: Symbol, args: &[AstExpr], tentative: bool, span: SourceSpan) -> GenResult<(ValueId, TypeId)> {
    let mut lowered = Vec::with_capacity(args.len());
    for a in args {
        match crate::expr::lower_expr(fg, a) {
            GenResult::Success(v) => lowered.push(v),
            GenResult::Failure => return GenResult::Failure,
            GenResult::AltFailure => return GenResult::AltFailure,
        }
    }

    let candidates: Vec<_> = fg.builder.module.find_funcs_by_name(name).to_vec();
    let mode = ConformMode::CALL_ARGUMENTS_LOOSE;
    for candidate in &candidates {
        let func = fg.builder.module.func(candidate.pair.ir_func_id);
        let variadic = func.is_variadic();
        let return_type = func.return_type;
        let param_types = func.arg_types.clone();
        if let Some(conformed) = conform_args(fg, lowered.clone(), &param_types, variadic, mode) {
            let result = fg.builder.build_call(candidate.pair.ir_func_id, conformed, return_type);
            return GenResult::Success((result, return_type));
        }
    }

    if tentative {
        GenResult::AltFailure
    } else if candidates.is_empty() {
        fg.error(span, format!("undefined function '{name}'"));
        GenResult::Failure
    } else {
        fg.error(span, format!("no overload of '{name}' matches these arguments"));
        GenResult::Failure
    }
}

/// Lowers a call through a function-pointer-valued expression (spec.md §4.6
/// "calling an address directly", distinct from calling a named function).
pub fn lower_call_address(fg: &mut FuncGen, callee: ValueId, callee_ty: TypeId, args: &[AstExpr], span: SourceSpan) -> GenResult<(ValueId, TypeId)> {
    let latticec_hir::IrType::FuncPtr { args: param_types, return_type, .. } = fg.builder.module.types.get(callee_ty).clone() else {
        fg.error(span, "call target is not a function pointer");
        return GenResult::Failure;
    };
    let mut lowered = Vec::with_capacity(args.len());
    for a in args {
        match crate::expr::lower_expr(fg, a) {
            GenResult::Success(v) => lowered.push(v),
            GenResult::Failure => return GenResult::Failure,
            GenResult::AltFailure => return GenResult::AltFailure,
        }
    }
    let Some(conformed) = conform_args(fg, lowered, &param_types, false, ConformMode::CALL_ARGUMENTS_LOOSE) else {
        fg.error(span, "argument types do not match function pointer signature");
        return GenResult::Failure;
    };
    let result = fg.builder.build_call_address(callee, conformed, return_type);
    GenResult::Success((result, return_type))
}

/// Dispatches a method call on `subject`'s type. `allow_drop` makes a
/// missing method a silent no-op rather than an error (spec.md §4.5
/// "optional hook calls").
pub fn lower_method_call(
    fg: &mut FuncGen,
    subject: &AstExpr,
    name: Symbol,
    args: &[AstExpr],
    tentative: bool,
    allow_drop: bool,
    span: SourceSpan,
) -> GenResult<(ValueId, TypeId)> {
    let (subject_value, subject_ty) = match crate::expr::lower_expr(fg, subject) {
        GenResult::Success(v) => v,
        GenResult::Failure => return GenResult::Failure,
        GenResult::AltFailure => return GenResult::AltFailure,
    };
    let Some(type_name) = fg.typemap.name_of(subject_ty) else {
        return drop_or_fail(fg, allow_drop, tentative, span, "method call on a type with no name");
    };

    let method = crate::sfcache::find_user_method(fg.builder.module, type_name, name.as_str().as_str());
    let Some(pair) = method else {
        return drop_or_fail(fg, allow_drop, tentative, span, &format!("'{type_name}' has no method '{name}'"));
    };

    let mut lowered = vec![(subject_value, subject_ty)];
    for a in args {
        match crate::expr::lower_expr(fg, a) {
            GenResult::Success(v) => lowered.push(v),
            GenResult::Failure => return GenResult::Failure,
            GenResult::AltFailure => return GenResult::AltFailure,
        }
    }
    let func = fg.builder.module.func(pair.ir_func_id);
    let variadic = func.is_variadic();
    let return_type = func.return_type;
    let param_types = func.arg_types.clone();
    let mode = ConformMode::CALL_ARGUMENTS_LOOSE;
    match conform_args(fg, lowered, &param_types, variadic, mode) {
        Some(conformed) => {
            let result = fg.builder.build_call(pair.ir_func_id, conformed, return_type);
            GenResult::Success((result, return_type))
        }
        None => drop_or_fail(fg, allow_drop, tentative, span, &format!("arguments do not match '{type_name}.{name}'")),
    }
}

fn drop_or_fail(fg: &mut FuncGen, allow_drop: bool, tentative: bool, span: SourceSpan, message: &str) -> GenResult<(ValueId, TypeId)> {
    if allow_drop {
        let void_ty = fg.typemap.find(Symbol::intern("void")).expect("void seeded");
        let unit = fg.builder.build_null_ptr(void_ty);
        return GenResult::Success((unit, void_ty));
    }
    if tentative {
        return GenResult::AltFailure;
    }
    fg.error(span, message.to_string());
    GenResult::Failure
}

/// Tries calling `name` as a method on `lhs`'s type with a single argument
/// `rhs`, by value (no receiver pointer) — the binary-operator overload
/// fallback (spec.md §4.5 "try overload method"). Simpler than full method
/// dispatch: operator overloads take both operands by value, not through a
/// pointer receiver, unlike `__defer__`/`__pass__`/`__assign__`.
pub fn try_operator_overload(
    fg: &mut FuncGen,
    name: &str,
    lhs: (ValueId, TypeId),
    rhs: (ValueId, TypeId),
    span: SourceSpan,
) -> GenResult<(ValueId, TypeId)> {
    let Some(type_name) = fg.typemap.name_of(lhs.1) else {
        fg.error(span, format!("no overload of operator available for this type (wanted '{name}')"));
        return GenResult::Failure;
    };
    let Some(pair) = crate::sfcache::find_user_method(fg.builder.module, type_name, name) else {
        fg.error(span, format!("'{type_name}' has no operator overload '{name}'"));
        return GenResult::Failure;
    };
    let func = fg.builder.module.func(pair.ir_func_id);
    let return_type = func.return_type;
    let param_types = func.arg_types.clone();
    match conform_args(fg, vec![lhs, rhs], &param_types, false, ConformMode::CALL_ARGUMENTS_LOOSE) {
        Some(conformed) => {
            let result = fg.builder.build_call(pair.ir_func_id, conformed, return_type);
            GenResult::Success((result, return_type))
        }
        None => {
            fg.error(span, format!("'{type_name}.{name}' does not accept these argument types"));
            GenResult::Failure
        }
    }
}

