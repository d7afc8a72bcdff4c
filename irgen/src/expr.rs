//! Expression lowering (spec.md §4.5). Grounded on `IRGEN/ir_gen_expr.c`'s
//! `ir_gen_expr` dispatch: literals fold to [`latticec_hir::IrValueData`]
//! constants, lvalue-shaped expressions (`Variable`/`Member`/`ArrayAccess`/
//! `At`) resolve through [`lower_place`] before loading, binary operators
//! conform operands with [`crate::conform::merge`] before picking an
//! opcode and fall back to [`crate::call::try_operator_overload`] on
//! non-arithmetic operand types, and `Call`/`MethodCall` delegate to
//! [`crate::call`].

use latticec_hir::{CastKind, GenResult, IrType, TypeCategory, TypeId, ValueId};
use latticec_session::SourceSpan;
use latticec_symbol::Symbol;

use crate::ast::{AstExpr, AstType, AstTypeElem, AstTypeLayer, BinOp, Bone};
use crate::conform::{conform, merge, ConformMode};
use crate::funcbuilder::FuncGen;

/// Lowers `expr` to a value, widening/loading as needed so the result is
/// always usable as an rvalue.
pub fn lower_expr(fg: &mut FuncGen, expr: &AstExpr) -> GenResult<(ValueId, TypeId)> {
    match expr {
        AstExpr::Byte(v) => Success(int_literal(fg, "byte", &v.to_le_bytes())),
        AstExpr::Ubyte(v) => Success(int_literal(fg, "ubyte", &v.to_le_bytes())),
        AstExpr::Short(v) => Success(int_literal(fg, "short", &v.to_le_bytes())),
        AstExpr::Ushort(v) => Success(int_literal(fg, "ushort", &v.to_le_bytes())),
        AstExpr::Int(v) => Success(int_literal(fg, "int", &v.to_le_bytes())),
        AstExpr::Uint(v) => Success(int_literal(fg, "uint", &v.to_le_bytes())),
        AstExpr::Long(v) => Success(int_literal(fg, "long", &v.to_le_bytes())),
        AstExpr::Ulong(v) => Success(int_literal(fg, "ulong", &v.to_le_bytes())),
        AstExpr::Float(v) => Success(int_literal(fg, "float", &v.to_le_bytes())),
        AstExpr::Double(v) => Success(int_literal(fg, "double", &v.to_le_bytes())),
        AstExpr::Bool(v) => Success(int_literal(fg, "bool", &[*v as u8])),
        AstExpr::Null => {
            let ptr_ty = fg.typemap.find(Symbol::intern("ptr")).expect("ptr seeded");
            Success((fg.builder.build_null_ptr(ptr_ty), ptr_ty))
        }
        AstExpr::CStr(s) => Success(cstr_literal(fg, s)),
        AstExpr::Str(s) => lower_string_literal(fg, s),
        AstExpr::NewCString(s) => lower_heap_cstring(fg, s),
        AstExpr::Variable(_) => match lower_place(fg, expr) {
            Success((addr, ty)) => {
                let span = fg.span_or_unknown(None);
                Success((fg.builder.build_load(addr, Some(span)), ty))
            }
            Failure => Failure,
            AltFailure => AltFailure,
        },
        AstExpr::BinOp { op, lhs, rhs } => lower_binop(fg, *op, lhs, rhs),
        AstExpr::And(lhs, rhs) => lower_logical(fg, lhs, rhs, true),
        AstExpr::Or(lhs, rhs) => lower_logical(fg, lhs, rhs, false),
        AstExpr::Not(inner) => {
            let (value, ty) = match lower_expr(fg, inner) {
                Success(v) => v,
                Failure => return Failure,
                AltFailure => return AltFailure,
            };
            let bool_ty = fg.typemap.find(Symbol::intern("bool")).expect("bool seeded");
            let as_bool = conform(&mut fg.builder, value, ty, bool_ty, ConformMode::CALCULATION).unwrap_or(value);
            Success((fg.builder.build_cast(CastKind::IsZero, as_bool, bool_ty), bool_ty))
        }
        AstExpr::Member { span, .. } | AstExpr::ArrayAccess { span, .. } | AstExpr::At { span, .. } => {
            match lower_place(fg, expr) {
                Success((addr, ty)) => Success((fg.builder.build_load(addr, Some(*span)), ty)),
                Failure => Failure,
                AltFailure => AltFailure,
            }
        }
        AstExpr::Call { name, args, tentative, span } => crate::call::lower_call(fg, *name, args, *tentative, *span),
        AstExpr::MethodCall { subject, name, args, tentative, allow_drop, span } => {
            crate::call::lower_method_call(fg, subject, *name, args, *tentative, *allow_drop, *span)
        }
        AstExpr::Cast { ty, value } => lower_cast(fg, ty, value),
        AstExpr::New { ty, amount, undef, inputs } => lower_new(fg, ty, amount.as_deref(), *undef, inputs),
        AstExpr::Ternary { cond, then_expr, else_expr } => lower_ternary(fg, cond, then_expr, else_expr),
        AstExpr::Sizeof(ty) => lower_sizeof(fg, ty),
        AstExpr::SizeofValue(inner) => {
            let (_, ty) = match lower_expr(fg, inner) {
                Success(v) => v,
                Failure => return Failure,
                AltFailure => return AltFailure,
            };
            let usize_ty = fg.builder.module.common.ir_usize.expect("usize seeded");
            Success((fg.builder.const_sizeof(ty, usize_ty), usize_ty))
        }
        AstExpr::Alignof(ty) => lower_alignof(fg, ty),
        AstExpr::PreIncrement(inner) => lower_step(fg, inner, 1, true),
        AstExpr::PreDecrement(inner) => lower_step(fg, inner, -1, true),
        AstExpr::PostIncrement(inner) => lower_step(fg, inner, 1, false),
        AstExpr::PostDecrement(inner) => lower_step(fg, inner, -1, false),
        AstExpr::Toggle(inner) => lower_toggle(fg, inner),
        AstExpr::InlineDeclare { name, ty, initial, undef } => lower_inline_declare(fg, *name, ty, initial.as_deref(), *undef),
        AstExpr::Typeinfo(ty) => lower_typeinfo(fg, ty),
        AstExpr::Typenameof(ty) => lower_typenameof(fg, ty),
        AstExpr::Embed(text) => Success(cstr_literal(fg, text)),
        AstExpr::VaArg { va_list, ty } => lower_va_arg(fg, va_list, ty),
        AstExpr::FuncAddr(name) => lower_func_addr(fg, *name),
        AstExpr::InitializerList { ty, values } => lower_initializer_list(fg, ty, values),
        AstExpr::StaticArray { elem_ty, values } => lower_static_array(fg, elem_ty, values),
        AstExpr::StaticStruct { ty, values } => lower_static_struct(fg, ty, values),
    }
}

use GenResult::{AltFailure, Failure, Success};

fn int_literal(fg: &mut FuncGen, type_name: &str, bytes: &[u8]) -> (ValueId, TypeId) {
    let ty = fg.typemap.find(Symbol::intern(type_name)).expect("primitive seeded");
    (fg.builder.build_literal(ty, bytes.to_vec()), ty)
}

fn cstr_literal(fg: &mut FuncGen, text: &str) -> (ValueId, TypeId) {
    let ptr_ty = fg.typemap.find(Symbol::intern("ptr")).expect("ptr seeded");
    let mut bytes = text.as_bytes().to_vec();
    bytes.push(0);
    let size = bytes.len() as u64;
    let value = fg.builder.module.values.alloc(ptr_ty, latticec_hir::IrValueData::CStrOfLen { bytes, size });
    (value, ptr_ty)
}

/// Constructs a `String` struct literal (spec.md §4.2 "`String` layout"):
/// `{ *ubyte data, usize length, usize capacity, StringOwnership }`, backed
/// by a constant C-string anon global.
fn lower_string_literal(fg: &mut FuncGen, text: &str) -> GenResult<(ValueId, TypeId)> {
    let Some(string_ty) = fg.builder.module.common.ir_string_struct else {
        let (value, ty) = cstr_literal(fg, text);
        return Success((value, ty));
    };
    let ubyte = fg.typemap.find(Symbol::intern("ubyte")).expect("seeded");
    let ubyte_ptr = fg.builder.module.types.alloc(IrType::Ptr(ubyte));
    let usize_ty = fg.builder.module.common.ir_usize.expect("usize seeded");
    let mut bytes = text.as_bytes().to_vec();
    let length = bytes.len() as u64;
    bytes.push(0);
    let cstr = fg.builder.module.values.alloc(ubyte_ptr, latticec_hir::IrValueData::CStrOfLen { bytes, size: length + 1 });
    let length_val = fg.builder.build_literal(usize_ty, length.to_le_bytes().to_vec());
    let capacity_val = fg.builder.build_literal(usize_ty, length.to_le_bytes().to_vec());
    let ownership_ty = match fg.builder.module.types.get(string_ty) {
        IrType::Structure { subtypes, .. } => subtypes[3],
        _ => unreachable!("validated by validate_string_struct"),
    };
    // `StringOwnership::Borrowed` / enums lower to `u64`; `0` is the
    // conventional "not owned, do not free" tag used throughout.
    let ownership_val = fg.builder.build_literal(ownership_ty, 0u64.to_le_bytes().to_vec());
    let value = fg.builder.module.values.alloc(
        string_ty,
        latticec_hir::IrValueData::StructLiteral { values: vec![cstr, length_val, capacity_val, ownership_val] },
    );
    Success((value, string_ty))
}

fn lower_heap_cstring(fg: &mut FuncGen, text: &str) -> GenResult<(ValueId, TypeId)> {
    let ubyte = fg.typemap.find(Symbol::intern("ubyte")).expect("seeded");
    let ptr_ty = fg.builder.module.types.alloc(IrType::Ptr(ubyte));
    let len = (text.len() + 1) as u64;
    let usize_ty = fg.builder.module.common.ir_usize.expect("usize seeded");
    let amount = fg.builder.build_literal(usize_ty, len.to_le_bytes().to_vec());
    let heap = fg.builder.build_malloc(ubyte, Some(amount), true);
    let (source, _) = cstr_literal(fg, text);
    let len_val = fg.builder.build_literal(usize_ty, len.to_le_bytes().to_vec());
    fg.builder.build_memcpy(heap, source, len_val, false);
    let casted = fg.builder.build_cast(CastKind::Bitcast, heap, ptr_ty);
    Success((casted, ptr_ty))
}

fn lower_logical(fg: &mut FuncGen, lhs: &AstExpr, rhs: &AstExpr, is_and: bool) -> GenResult<(ValueId, TypeId)> {
    let bool_ty = fg.typemap.find(Symbol::intern("bool")).expect("bool seeded");
    let (lhs_val, lhs_ty) = match lower_expr(fg, lhs) {
        Success(v) => v,
        Failure => return Failure,
        AltFailure => return AltFailure,
    };
    let lhs_bool = conform(&mut fg.builder, lhs_val, lhs_ty, bool_ty, ConformMode::CALCULATION).unwrap_or(lhs_val);

    let rhs_block = fg.builder.build_basicblock();
    let merge_block = fg.builder.build_basicblock();
    let entry_block = fg.builder.current_block();
    if is_and {
        fg.builder.build_cond_break(lhs_bool, rhs_block, merge_block);
    } else {
        fg.builder.build_cond_break(lhs_bool, merge_block, rhs_block);
    }

    fg.builder.build_using_basicblock(rhs_block);
    let (rhs_val, rhs_ty) = match lower_expr(fg, rhs) {
        Success(v) => v,
        Failure => return Failure,
        AltFailure => return AltFailure,
    };
    let rhs_bool = conform(&mut fg.builder, rhs_val, rhs_ty, bool_ty, ConformMode::CALCULATION).unwrap_or(rhs_val);
    let rhs_exit_block = fg.builder.current_block();
    fg.builder.build_break(merge_block);

    fg.builder.build_using_basicblock(merge_block);
    let short_circuit = fg.builder.build_literal(bool_ty, vec![if is_and { 0 } else { 1 }]);
    let result = fg.builder.build_phi2(bool_ty, (entry_block, short_circuit), (rhs_exit_block, rhs_bool));
    Success((result, bool_ty))
}

pub(crate) fn binop_instr(op: BinOp, cat: TypeCategory, lhs: ValueId, rhs: ValueId) -> Option<latticec_hir::Opcode> {
    use latticec_hir::Opcode::*;
    use TypeCategory::*;
    Some(match (op, cat) {
        (BinOp::Add, Si) | (BinOp::Add, Ui) => Add { lhs, rhs },
        (BinOp::Add, Fp) => FAdd { lhs, rhs },
        (BinOp::Sub, Si) | (BinOp::Sub, Ui) => Sub { lhs, rhs },
        (BinOp::Sub, Fp) => FSub { lhs, rhs },
        (BinOp::Mul, Si) | (BinOp::Mul, Ui) => Mul { lhs, rhs },
        (BinOp::Mul, Fp) => FMul { lhs, rhs },
        (BinOp::Div, Si) => SDiv { lhs, rhs },
        (BinOp::Div, Ui) => UDiv { lhs, rhs },
        (BinOp::Div, Fp) => FDiv { lhs, rhs },
        (BinOp::Mod, Si) => SMod { lhs, rhs },
        (BinOp::Mod, Ui) => UMod { lhs, rhs },
        (BinOp::Mod, Fp) => FMod { lhs, rhs },
        (BinOp::Eq, Si) | (BinOp::Eq, Ui) => Eq { lhs, rhs },
        (BinOp::Eq, Fp) => FEq { lhs, rhs },
        (BinOp::NEq, Si) | (BinOp::NEq, Ui) => NEq { lhs, rhs },
        (BinOp::NEq, Fp) => FNEq { lhs, rhs },
        (BinOp::Gt, Si) => SGt { lhs, rhs },
        (BinOp::Gt, Ui) => UGt { lhs, rhs },
        (BinOp::Gt, Fp) => FGt { lhs, rhs },
        (BinOp::Lt, Si) => SLt { lhs, rhs },
        (BinOp::Lt, Ui) => ULt { lhs, rhs },
        (BinOp::Lt, Fp) => FLt { lhs, rhs },
        (BinOp::Ge, Si) => SGe { lhs, rhs },
        (BinOp::Ge, Ui) => UGe { lhs, rhs },
        (BinOp::Ge, Fp) => FGe { lhs, rhs },
        (BinOp::Le, Si) => SLe { lhs, rhs },
        (BinOp::Le, Ui) => ULe { lhs, rhs },
        (BinOp::Le, Fp) => FLe { lhs, rhs },
        (BinOp::BitAnd, Si) | (BinOp::BitAnd, Ui) => And { lhs, rhs },
        (BinOp::BitOr, Si) | (BinOp::BitOr, Ui) => Or { lhs, rhs },
        (BinOp::BitXor, Si) | (BinOp::BitXor, Ui) => Xor { lhs, rhs },
        (BinOp::Shl, Si) | (BinOp::Shl, Ui) => Shl { lhs, rhs },
        (BinOp::Shr, Si) => AShr { lhs, rhs },
        (BinOp::Shr, Ui) => LShr { lhs, rhs },
        _ => return None,
    })
}

fn is_comparison(op: BinOp) -> bool {
    matches!(op, BinOp::Eq | BinOp::NEq | BinOp::Gt | BinOp::Lt | BinOp::Ge | BinOp::Le)
}

pub(crate) fn lower_binop(fg: &mut FuncGen, op: BinOp, lhs: &AstExpr, rhs: &AstExpr) -> GenResult<(ValueId, TypeId)> {
    let (lhs_val, lhs_ty) = match lower_expr(fg, lhs) {
        Success(v) => v,
        Failure => return Failure,
        AltFailure => return AltFailure,
    };
    let (rhs_val, rhs_ty) = match lower_expr(fg, rhs) {
        Success(v) => v,
        Failure => return Failure,
        AltFailure => return AltFailure,
    };

    if let Some((a, b, common_ty)) = merge(&mut fg.builder, lhs_val, lhs_ty, rhs_val, rhs_ty) {
        let cat = fg.builder.module.types.category(common_ty);
        if let Some(opcode) = binop_instr(op, cat, a, b) {
            let result_ty = if is_comparison(op) {
                fg.typemap.find(Symbol::intern("bool")).expect("bool seeded")
            } else {
                common_ty
            };
            return Success((fg.builder.build_unary(opcode, result_ty), result_ty));
        }
    }

    let span = fg.span_or_unknown(None);
    crate::call::try_operator_overload(fg, op.overload_method(), (lhs_val, lhs_ty), (rhs_val, rhs_ty), span)
}

/// Resolves the field named `field` on a struct/union composite `type_name`
/// (spec.md §4.5 "field access"). Anonymous nested layouts are not
/// addressable by name through this path — a deliberate simplification
/// (see DESIGN.md).
fn resolve_field(fg: &FuncGen, type_name: Symbol, field: Symbol) -> Option<(u32, AstType)> {
    let composite = fg.ast.composites.iter().find(|c| c.name == type_name)?;
    let children = match &composite.layout {
        Bone::Struct { children, .. } | Bone::Union { children, .. } => children,
    };
    children.iter().position(|(name, _)| *name == field).map(|index| {
        let ty = match &children[index].1 {
            Bone::Type(t) => t.clone(),
            _ => AstType::base(Symbol::intern("void")),
        };
        (index as u32, ty)
    })
}

pub(crate) fn structure_subtype(fg: &FuncGen, struct_ty: TypeId, index: u32) -> TypeId {
    match fg.builder.module.types.get(struct_ty) {
        IrType::Structure { subtypes, .. } | IrType::Union { subtypes, .. } => subtypes[index as usize],
        other => unreachable!("structure_subtype called on non-composite {other:?}"),
    }
}

/// Resolves the address-of-struct and composite name to use as the base
/// for the *next* field/array access in a chain (`a.b.c`, `a[i].b`).
/// Top-level pointer-typed variables/parameters load their value directly
/// (already a correctly-typed pointer); pointer-typed composite *fields*
/// additionally bitcast from the opaque storage type to the AST-declared
/// pointee, preserving the cyclic-struct discipline documented on
/// `hir::types` (spec.md §9).
fn struct_base_for_chaining(fg: &mut FuncGen, expr: &AstExpr, span: SourceSpan) -> GenResult<(ValueId, TypeId, Symbol)> {
    match expr {
        AstExpr::Variable(name) => match fg.scope.find_var_or_nearest(name.as_str().as_str()) {
            Ok(var) => {
                let var = var.clone();
                let ty = var.ir_type;
                let is_pointer = var.ast_type.is_pointer();
                let addr = fg.var_address(&var);
                if is_pointer {
                    let loaded = fg.builder.build_load(addr, Some(span));
                    let IrType::Ptr(inner) = fg.builder.module.types.get(ty) else {
                        fg.error(span, format!("'{name}' is not a struct pointer"));
                        return Failure;
                    };
                    let struct_ty = *inner;
                    match fg.typemap.name_of(struct_ty) {
                        Some(struct_name) => Success((loaded, struct_ty, struct_name)),
                        None => {
                            fg.error(span, format!("'{name}' does not point to a named composite"));
                            Failure
                        }
                    }
                } else {
                    match fg.typemap.name_of(ty) {
                        Some(struct_name) => Success((addr, ty, struct_name)),
                        None => {
                            fg.error(span, format!("'{name}' is not a composite value"));
                            Failure
                        }
                    }
                }
            }
            Err(Some(suggestion)) => {
                fg.error(span, format!("undefined variable '{name}', did you mean '{suggestion}'?"));
                Failure
            }
            Err(None) => {
                fg.error(span, format!("undefined variable '{name}'"));
                Failure
            }
        },
        AstExpr::Member { subject, field, span: mspan } => {
            let (base_addr, base_ty, base_name) = match struct_base_for_chaining(fg, subject, *mspan) {
                Success(v) => v,
                Failure => return Failure,
                AltFailure => return AltFailure,
            };
            let Some((index, field_ast_ty)) = resolve_field(fg, base_name, *field) else {
                fg.error(*mspan, format!("'{base_name}' has no field '{field}'"));
                return Failure;
            };
            let storage_ty = structure_subtype(fg, base_ty, index);
            let field_ptr_ty = fg.builder.module.types.alloc(IrType::Ptr(storage_ty));
            let field_addr = fg.builder.build_member(base_addr, index, field_ptr_ty, Some(*mspan));
            if field_ast_ty.is_pointer() {
                let raw = fg.builder.build_load(field_addr, Some(*mspan));
                let real_ptr_ty = match fg.resolve_type(&field_ast_ty) {
                    Ok(t) => t,
                    Err(e) => {
                        fg.error(*mspan, e);
                        return Failure;
                    }
                };
                let real_addr = fg.builder.build_cast(CastKind::Bitcast, raw, real_ptr_ty);
                let IrType::Ptr(inner) = fg.builder.module.types.get(real_ptr_ty) else {
                    fg.error(*mspan, format!("field '{field}' is not a pointer to a composite"));
                    return Failure;
                };
                let struct_ty = *inner;
                match fg.typemap.name_of(struct_ty) {
                    Some(struct_name) => Success((real_addr, struct_ty, struct_name)),
                    None => {
                        fg.error(*mspan, format!("field '{field}' does not point to a named composite"));
                        Failure
                    }
                }
            } else {
                match fg.typemap.name_of(storage_ty) {
                    Some(struct_name) => Success((field_addr, storage_ty, struct_name)),
                    None => {
                        fg.error(*mspan, format!("field '{field}' is not a composite"));
                        Failure
                    }
                }
            }
        }
        AstExpr::ArrayAccess { subject, index, span: aspan } | AstExpr::At { subject, index, span: aspan } => {
            let (arr_addr, elem_ty) = match lower_array_like_place(fg, subject, *aspan) {
                Success(v) => v,
                Failure => return Failure,
                AltFailure => return AltFailure,
            };
            let idx_val = match lower_index_value(fg, index) {
                Success(v) => v,
                Failure => return Failure,
                AltFailure => return AltFailure,
            };
            let elem_addr = fg.builder.build_array_access(arr_addr, idx_val, elem_ty, Some(*aspan));
            match fg.typemap.name_of(elem_ty) {
                Some(struct_name) => Success((elem_addr, elem_ty, struct_name)),
                None => {
                    fg.error(*aspan, "array element is not a named composite");
                    Failure
                }
            }
        }
        _ => {
            fg.error(span, "expression does not denote a composite");
            Failure
        }
    }
}

/// Resolves the address and element type for indexing `expr` (the subject
/// of an `ArrayAccess`/`At`): a `[N]`-typed variable/field indexes its own
/// storage, a pointer-typed one indexes what it points to.
fn lower_array_like_place(fg: &mut FuncGen, expr: &AstExpr, span: SourceSpan) -> GenResult<(ValueId, TypeId)> {
    match expr {
        AstExpr::Variable(name) => match fg.scope.find_var_or_nearest(name.as_str().as_str()) {
            Ok(var) => {
                let var = var.clone();
                let ty = var.ir_type;
                let addr = fg.var_address(&var);
                match fg.builder.module.types.get(ty) {
                    IrType::FixedArray { subtype, .. } => Success((addr, *subtype)),
                    IrType::Ptr(inner) => {
                        let loaded = fg.builder.build_load(addr, Some(span));
                        Success((loaded, *inner))
                    }
                    _ => {
                        fg.error(span, format!("'{name}' is not an array or pointer"));
                        Failure
                    }
                }
            }
            Err(Some(suggestion)) => {
                fg.error(span, format!("undefined variable '{name}', did you mean '{suggestion}'?"));
                Failure
            }
            Err(None) => {
                fg.error(span, format!("undefined variable '{name}'"));
                Failure
            }
        },
        AstExpr::Member { subject, field, span: mspan } => {
            let (base_addr, base_ty, base_name) = match struct_base_for_chaining(fg, subject, *mspan) {
                Success(v) => v,
                Failure => return Failure,
                AltFailure => return AltFailure,
            };
            let Some((index, field_ast_ty)) = resolve_field(fg, base_name, *field) else {
                fg.error(*mspan, format!("'{base_name}' has no field '{field}'"));
                return Failure;
            };
            let storage_ty = structure_subtype(fg, base_ty, index);
            let field_ptr_ty = fg.builder.module.types.alloc(IrType::Ptr(storage_ty));
            let field_addr = fg.builder.build_member(base_addr, index, field_ptr_ty, Some(*mspan));
            match fg.builder.module.types.get(storage_ty) {
                IrType::FixedArray { subtype, .. } => Success((field_addr, *subtype)),
                _ if field_ast_ty.is_pointer() => {
                    let raw = fg.builder.build_load(field_addr, Some(*mspan));
                    let real_ptr_ty = match fg.resolve_type(&field_ast_ty) {
                        Ok(t) => t,
                        Err(e) => {
                            fg.error(*mspan, e);
                            return Failure;
                        }
                    };
                    let real_addr = fg.builder.build_cast(CastKind::Bitcast, raw, real_ptr_ty);
                    let IrType::Ptr(inner) = fg.builder.module.types.get(real_ptr_ty) else {
                        fg.error(*mspan, format!("field '{field}' is not indexable"));
                        return Failure;
                    };
                    Success((real_addr, *inner))
                }
                _ => {
                    fg.error(*mspan, format!("field '{field}' is not an array or pointer"));
                    Failure
                }
            }
        }
        _ => {
            fg.error(span, "expression is not indexable");
            Failure
        }
    }
}

pub(crate) fn lower_index_value(fg: &mut FuncGen, index: &AstExpr) -> GenResult<ValueId> {
    let (value, ty) = match lower_expr(fg, index) {
        Success(v) => v,
        Failure => return Failure,
        AltFailure => return AltFailure,
    };
    let usize_ty = fg.builder.module.common.ir_usize.expect("usize seeded");
    Success(conform(&mut fg.builder, value, ty, usize_ty, ConformMode::CALCULATION).unwrap_or(value))
}

/// Resolves an assignable location: address plus the storage type held
/// there. Used both by rvalue lowering (which loads through it) and by
/// statement lowering (`Assign`, `PreIncrement`, …, which write through it
/// directly).
pub fn lower_place(fg: &mut FuncGen, expr: &AstExpr) -> GenResult<(ValueId, TypeId)> {
    match expr {
        AstExpr::Variable(name) => match fg.scope.find_var_or_nearest(name.as_str().as_str()) {
            Ok(var) => {
                let var = var.clone();
                let ty = var.ir_type;
                let addr = fg.var_address(&var);
                Success((addr, ty))
            }
            Err(Some(suggestion)) => {
                let span = fg.span_or_unknown(None);
                fg.error(span, format!("undefined variable '{name}', did you mean '{suggestion}'?"));
                Failure
            }
            Err(None) => {
                let span = fg.span_or_unknown(None);
                fg.error(span, format!("undefined variable '{name}'"));
                Failure
            }
        },
        AstExpr::Member { subject, field, span } => {
            let (base_addr, base_ty, base_name) = match struct_base_for_chaining(fg, subject, *span) {
                Success(v) => v,
                Failure => return Failure,
                AltFailure => return AltFailure,
            };
            let Some((index, _field_ast_ty)) = resolve_field(fg, base_name, *field) else {
                fg.error(*span, format!("'{base_name}' has no field '{field}'"));
                return Failure;
            };
            let storage_ty = structure_subtype(fg, base_ty, index);
            let field_ptr_ty = fg.builder.module.types.alloc(IrType::Ptr(storage_ty));
            let field_addr = fg.builder.build_member(base_addr, index, field_ptr_ty, Some(*span));
            Success((field_addr, storage_ty))
        }
        AstExpr::ArrayAccess { subject, index, span } | AstExpr::At { subject, index, span } => {
            let (arr_addr, elem_ty) = match lower_array_like_place(fg, subject, *span) {
                Success(v) => v,
                Failure => return Failure,
                AltFailure => return AltFailure,
            };
            let idx_val = match lower_index_value(fg, index) {
                Success(v) => v,
                Failure => return Failure,
                AltFailure => return AltFailure,
            };
            let elem_addr = fg.builder.build_array_access(arr_addr, idx_val, elem_ty, Some(*span));
            Success((elem_addr, elem_ty))
        }
        AstExpr::InlineDeclare { .. } => match lower_expr(fg, expr) {
            Success((value, ty)) => {
                let ptr = fg.builder.build_alloc(ty);
                let span = fg.span_or_unknown(None);
                fg.builder.build_store(value, ptr, Some(span));
                Success((ptr, ty))
            }
            Failure => Failure,
            AltFailure => AltFailure,
        },
        _ => {
            let span = fg.span_or_unknown(None);
            fg.error(span, "expression is not assignable");
            Failure
        }
    }
}

fn lower_cast(fg: &mut FuncGen, ty: &AstType, value: &AstExpr) -> GenResult<(ValueId, TypeId)> {
    let (val, from_ty) = match lower_expr(fg, value) {
        Success(v) => v,
        Failure => return Failure,
        AltFailure => return AltFailure,
    };
    let to_ty = match fg.resolve_type(ty) {
        Ok(t) => t,
        Err(e) => {
            let span = fg.span_or_unknown(None);
            fg.error(span, e);
            return Failure;
        }
    };
    match conform(&mut fg.builder, val, from_ty, to_ty, ConformMode::ALL) {
        Some(v) => Success((v, to_ty)),
        None => Success((fg.builder.build_cast(CastKind::Reinterpret, val, to_ty), to_ty)),
    }
}

fn lower_new(fg: &mut FuncGen, ty: &AstType, amount: Option<&AstExpr>, undef: bool, inputs: &[AstExpr]) -> GenResult<(ValueId, TypeId)> {
    let ir_ty = match fg.resolve_type(ty) {
        Ok(t) => t,
        Err(e) => {
            let span = fg.span_or_unknown(None);
            fg.error(span, e);
            return Failure;
        }
    };
    let amount_val = match amount {
        Some(a) => match lower_index_value(fg, a) {
            Success(v) => Some(v),
            Failure => return Failure,
            AltFailure => return AltFailure,
        },
        None => None,
    };
    let ptr = fg.builder.build_malloc(ir_ty, amount_val, undef);
    let ptr_ty = fg.builder.module.types.alloc(IrType::Ptr(ir_ty));
    if amount.is_none() {
        for (i, input) in inputs.iter().enumerate() {
            let (value, value_ty) = match lower_expr(fg, input) {
                Success(v) => v,
                Failure => return Failure,
                AltFailure => return AltFailure,
            };
            let field_ptr_ty = fg.builder.module.types.alloc(IrType::Ptr(structure_subtype(fg, ir_ty, i as u32)));
            let span = fg.span_or_unknown(None);
            let field_addr = fg.builder.build_member(ptr, i as u32, field_ptr_ty, Some(span));
            let conformed = conform(&mut fg.builder, value, value_ty, structure_subtype(fg, ir_ty, i as u32), ConformMode::ASSIGNING).unwrap_or(value);
            fg.builder.build_store(conformed, field_addr, Some(span));
        }
    }
    Success((ptr, ptr_ty))
}

fn lower_ternary(fg: &mut FuncGen, cond: &AstExpr, then_expr: &AstExpr, else_expr: &AstExpr) -> GenResult<(ValueId, TypeId)> {
    let (cond_val, cond_ty) = match lower_expr(fg, cond) {
        Success(v) => v,
        Failure => return Failure,
        AltFailure => return AltFailure,
    };
    let bool_ty = fg.typemap.find(Symbol::intern("bool")).expect("bool seeded");
    let cond_bool = conform(&mut fg.builder, cond_val, cond_ty, bool_ty, ConformMode::CALCULATION).unwrap_or(cond_val);

    let (then_val, then_ty) = match lower_expr(fg, then_expr) {
        Success(v) => v,
        Failure => return Failure,
        AltFailure => return AltFailure,
    };
    let (else_val, else_ty) = match lower_expr(fg, else_expr) {
        Success(v) => v,
        Failure => return Failure,
        AltFailure => return AltFailure,
    };
    match merge(&mut fg.builder, then_val, then_ty, else_val, else_ty) {
        Some((a, b, common_ty)) => Success((fg.builder.build_select(cond_bool, a, b, common_ty), common_ty)),
        None => {
            let span = fg.span_or_unknown(None);
            fg.error(span, "ternary branches have incompatible types");
            Failure
        }
    }
}

fn lower_sizeof(fg: &mut FuncGen, ty: &AstType) -> GenResult<(ValueId, TypeId)> {
    let ir_ty = match fg.resolve_type(ty) {
        Ok(t) => t,
        Err(e) => {
            let span = fg.span_or_unknown(None);
            fg.error(span, e);
            return Failure;
        }
    };
    let usize_ty = fg.builder.module.common.ir_usize.expect("usize seeded");
    Success((fg.builder.const_sizeof(ir_ty, usize_ty), usize_ty))
}

fn lower_alignof(fg: &mut FuncGen, ty: &AstType) -> GenResult<(ValueId, TypeId)> {
    let ir_ty = match fg.resolve_type(ty) {
        Ok(t) => t,
        Err(e) => {
            let span = fg.span_or_unknown(None);
            fg.error(span, e);
            return Failure;
        }
    };
    let usize_ty = fg.builder.module.common.ir_usize.expect("usize seeded");
    Success((fg.builder.const_alignof(ir_ty, usize_ty), usize_ty))
}

fn lower_step(fg: &mut FuncGen, inner: &AstExpr, delta: i64, pre: bool) -> GenResult<(ValueId, TypeId)> {
    let (addr, ty) = match lower_place(fg, inner) {
        Success(v) => v,
        Failure => return Failure,
        AltFailure => return AltFailure,
    };
    let span = fg.span_or_unknown(None);
    let old = fg.builder.build_load(addr, Some(span));
    let cat = fg.builder.module.types.category(ty);
    let one_bytes = |bits: u32, cat: TypeCategory| -> Vec<u8> {
        match (cat, bits) {
            (TypeCategory::Fp, 32) => 1.0f32.to_le_bytes().to_vec(),
            (TypeCategory::Fp, 64) => 1.0f64.to_le_bytes().to_vec(),
            _ => {
                let mut v = vec![0u8; (bits / 8).max(1) as usize];
                v[0] = 1;
                v
            }
        }
    };
    let bits = fg.builder.module.types.size_in_bits(ty);
    let one = fg.builder.build_literal(ty, one_bytes(bits, cat));
    let opcode = if delta > 0 {
        binop_instr(BinOp::Add, cat, old, one)
    } else {
        binop_instr(BinOp::Sub, cat, old, one)
    };
    let Some(opcode) = opcode else {
        fg.error(span, "increment/decrement requires an arithmetic type");
        return Failure;
    };
    let new_val = fg.builder.build_unary(opcode, ty);
    fg.builder.build_store(new_val, addr, Some(span));
    Success((if pre { new_val } else { old }, ty))
}

fn lower_toggle(fg: &mut FuncGen, inner: &AstExpr) -> GenResult<(ValueId, TypeId)> {
    let (addr, ty) = match lower_place(fg, inner) {
        Success(v) => v,
        Failure => return Failure,
        AltFailure => return AltFailure,
    };
    let span = fg.span_or_unknown(None);
    let old = fg.builder.build_load(addr, Some(span));
    let toggled = fg.builder.build_cast(CastKind::IsZero, old, ty);
    fg.builder.build_store(toggled, addr, Some(span));
    Success((toggled, ty))
}

fn lower_inline_declare(fg: &mut FuncGen, name: Symbol, ty: &AstType, initial: Option<&AstExpr>, undef: bool) -> GenResult<(ValueId, TypeId)> {
    let _ = fg.declare_var(name, ty.clone(), crate::scope::VarTraits::empty(), undef);
    let var = fg.find_var(name).expect("just declared").clone();
    if let Some(init) = initial {
        let (value, value_ty) = match lower_expr(fg, init) {
            Success(v) => v,
            Failure => return Failure,
            AltFailure => return AltFailure,
        };
        let span = fg.span_or_unknown(None);
        let conformed = conform(&mut fg.builder, value, value_ty, var.ir_type, ConformMode::ASSIGNING).unwrap_or(value);
        fg.builder.build_store(conformed, var.ptr(), Some(span));
    }
    let span = fg.span_or_unknown(None);
    Success((fg.builder.build_load(var.ptr(), Some(span)), var.ir_type))
}

/// Renders a minimal textual name for an [`AstType`], used as the RTTI
/// type-table key (spec.md §3 "Type table" entries are keyed by written
/// name, not resolved `TypeId`).
fn ast_type_name(ty: &AstType) -> String {
    let mut name = match &ty.elem {
        AstTypeElem::Base(n) => n.as_str().to_string(),
        AstTypeElem::GenericBase { name, args } => {
            let parts: Vec<String> = args.iter().map(ast_type_name).collect();
            format!("<{}>{name}", parts.join(", "))
        }
        AstTypeElem::Func { .. } => "func".to_string(),
        AstTypeElem::Anonymous(_) => "anonymous".to_string(),
        AstTypeElem::PolyType(n) => format!("${n}"),
        AstTypeElem::PolyCount(n) => format!("$#{n}"),
    };
    for layer in ty.layers.iter().rev() {
        name = match layer {
            AstTypeLayer::Ptr => format!("*{name}"),
            AstTypeLayer::FixedArray(n) => format!("{name}[{n}]"),
            AstTypeLayer::PolyCountArray(n) => format!("{name}[$#{n}]"),
        };
    }
    name
}

/// `typeinfo(T)` yields a pointer to `T`'s RTTI descriptor. The concrete
/// index isn't known until [`crate::rtti_build`] lays out the sorted type
/// table, so this records a relocation against a placeholder value (spec.md
/// §4.9 "deferred RTTI relocation").
fn lower_typeinfo(fg: &mut FuncGen, ty: &AstType) -> GenResult<(ValueId, TypeId)> {
    let name = fg.mention_type(ty, ast_type_name(ty));
    let ptr_ty = fg.typemap.find(Symbol::intern("ptr")).expect("ptr seeded");
    let usize_ty = fg.builder.module.common.ir_usize.expect("usize seeded");
    let placeholder = fg.builder.build_literal(usize_ty, 0u64.to_le_bytes().to_vec());
    let casted = fg.builder.build_cast(CastKind::IntToPtr, placeholder, ptr_ty);
    fg.builder.module.rtti_relocations.push(latticec_hir::RttiRelocation { value: placeholder, type_name: Symbol::intern(&name) });
    Success((casted, ptr_ty))
}

/// `typenameof(T)` yields a `*ubyte` C string naming `T`.
fn lower_typenameof(fg: &mut FuncGen, ty: &AstType) -> GenResult<(ValueId, TypeId)> {
    let name = ast_type_name(ty);
    fg.mention_type(ty, name.clone());
    Success(cstr_literal(fg, &name))
}

fn lower_va_arg(fg: &mut FuncGen, va_list: &AstExpr, ty: &AstType) -> GenResult<(ValueId, TypeId)> {
    let (list_val, _) = match lower_expr(fg, va_list) {
        Success(v) => v,
        Failure => return Failure,
        AltFailure => return AltFailure,
    };
    let ir_ty = match fg.resolve_type(ty) {
        Ok(t) => t,
        Err(e) => {
            let span = fg.span_or_unknown(None);
            fg.error(span, e);
            return Failure;
        }
    };
    Success((fg.builder.build_va_arg(list_val, ir_ty), ir_ty))
}

fn lower_func_addr(fg: &mut FuncGen, name: Symbol) -> GenResult<(ValueId, TypeId)> {
    let candidates = fg.builder.module.find_funcs_by_name(name);
    let Some(mapping) = candidates.first().copied() else {
        let span = fg.span_or_unknown(None);
        fg.error(span, format!("undefined function '{name}'"));
        return Failure;
    };
    let func = fg.builder.module.func(mapping.pair.ir_func_id);
    let traits = if func.is_variadic() { latticec_hir::FuncPtrTraits::VARARG } else { latticec_hir::FuncPtrTraits::empty() };
    let fp_ty = fg.builder.module.types.alloc(IrType::FuncPtr {
        args: func.arg_types.clone(),
        return_type: func.return_type,
        traits,
    });
    let value = fg.builder.module.values.alloc(fp_ty, latticec_hir::IrValueData::FuncAddr(mapping.pair.ir_func_id));
    Success((value, fp_ty))
}

fn lower_initializer_list(fg: &mut FuncGen, ty: &AstType, values: &[AstExpr]) -> GenResult<(ValueId, TypeId)> {
    let ir_ty = match fg.resolve_type(ty) {
        Ok(t) => t,
        Err(e) => {
            let span = fg.span_or_unknown(None);
            fg.error(span, e);
            return Failure;
        }
    };
    let ptr = fg.builder.build_alloc(ir_ty);
    for (i, value) in values.iter().enumerate() {
        let (val, val_ty) = match lower_expr(fg, value) {
            Success(v) => v,
            Failure => return Failure,
            AltFailure => return AltFailure,
        };
        let field_ty = structure_subtype(fg, ir_ty, i as u32);
        let field_ptr_ty = fg.builder.module.types.alloc(IrType::Ptr(field_ty));
        let span = fg.span_or_unknown(None);
        let field_addr = fg.builder.build_member(ptr, i as u32, field_ptr_ty, Some(span));
        let conformed = conform(&mut fg.builder, val, val_ty, field_ty, ConformMode::ASSIGNING).unwrap_or(val);
        fg.builder.build_store(conformed, field_addr, Some(span));
    }
    let span = fg.span_or_unknown(None);
    Success((fg.builder.build_load(ptr, Some(span)), ir_ty))
}

fn lower_static_array(fg: &mut FuncGen, elem_ty: &AstType, values: &[AstExpr]) -> GenResult<(ValueId, TypeId)> {
    let ir_elem_ty = match fg.resolve_type(elem_ty) {
        Ok(t) => t,
        Err(e) => {
            let span = fg.span_or_unknown(None);
            fg.error(span, e);
            return Failure;
        }
    };
    let mut elems = Vec::with_capacity(values.len());
    for value in values {
        let (val, val_ty) = match lower_expr(fg, value) {
            Success(v) => v,
            Failure => return Failure,
            AltFailure => return AltFailure,
        };
        let conformed = conform(&mut fg.builder, val, val_ty, ir_elem_ty, ConformMode::ASSIGNING).unwrap_or(val);
        elems.push(conformed);
    }
    let array_ty = fg.builder.module.types.alloc(IrType::FixedArray { subtype: ir_elem_ty, length: elems.len() as u64 });
    let value = fg.builder.build_static_array(ir_elem_ty, elems, false);
    let ptr_ty = fg.builder.module.types.alloc(IrType::Ptr(array_ty));
    let _ = ptr_ty;
    Success((value, fg.builder.module.types.alloc(IrType::Ptr(array_ty))))
}

fn lower_static_struct(fg: &mut FuncGen, ty: &AstType, values: &[AstExpr]) -> GenResult<(ValueId, TypeId)> {
    let ir_ty = match fg.resolve_type(ty) {
        Ok(t) => t,
        Err(e) => {
            let span = fg.span_or_unknown(None);
            fg.error(span, e);
            return Failure;
        }
    };
    let mut fields = Vec::with_capacity(values.len());
    for (i, value) in values.iter().enumerate() {
        let (val, val_ty) = match lower_expr(fg, value) {
            Success(v) => v,
            Failure => return Failure,
            AltFailure => return AltFailure,
        };
        let field_ty = structure_subtype(fg, ir_ty, i as u32);
        let conformed = conform(&mut fg.builder, val, val_ty, field_ty, ConformMode::ASSIGNING).unwrap_or(val);
        fields.push(conformed);
    }
    let value = fg.builder.build_static_struct(ir_ty, fields, false);
    let ptr_ty = fg.builder.module.types.alloc(IrType::Ptr(ir_ty));
    let _ = ptr_ty;
    Success((value, fg.builder.module.types.alloc(IrType::Ptr(ir_ty))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::funcbuilder::FuncGen;
    use crate::typemap::{TypeMap, TypeTable};
    use latticec_hir::IrModule;
    use latticec_session::DiagnosticsHandler;

    fn fresh() -> (IrModule, crate::ast::Ast, TypeMap, TypeTable, DiagnosticsHandler) {
        let mut module = IrModule::new();
        let mut typemap = TypeMap::new();
        typemap.seed_primitives(&mut module);
        (module, crate::ast::Ast::default(), typemap, TypeTable::new(), DiagnosticsHandler::new())
    }

    #[test]
    fn integer_literal_lowers_to_its_primitive_type() {
        let (mut module, mut ast, mut typemap, mut table, diags) = fresh();
        let mut fg = FuncGen::new(&mut module, &mut ast, &mut typemap, &mut table, &diags, Symbol::intern("t.lc"));
        match lower_expr(&mut fg, &AstExpr::Int(7)) {
            GenResult::Success((_, ty)) => assert_eq!(*fg.builder.module.types.get(ty), IrType::S32),
            other => panic!("expected literal lowering, got {other:?}"),
        }
    }

    #[test]
    fn short_circuit_and_builds_a_diamond() {
        let (mut module, mut ast, mut typemap, mut table, diags) = fresh();
        let mut fg = FuncGen::new(&mut module, &mut ast, &mut typemap, &mut table, &diags, Symbol::intern("t.lc"));
        let expr = AstExpr::And(Box::new(AstExpr::Bool(true)), Box::new(AstExpr::Bool(false)));
        match lower_expr(&mut fg, &expr) {
            GenResult::Success((_, ty)) => assert_eq!(*fg.builder.module.types.get(ty), IrType::Bool),
            other => panic!("expected bool result, got {other:?}"),
        }
        let (blocks, _) = fg.builder.finish();
        assert!(blocks.len() >= 3, "expected at least entry/rhs/merge blocks");
    }

    #[test]
    fn undefined_variable_reports_nearest_name() {
        let (mut module, mut ast, mut typemap, mut table, diags) = fresh();
        let mut fg = FuncGen::new(&mut module, &mut ast, &mut typemap, &mut table, &diags, Symbol::intern("t.lc"));
        fg.declare_var(Symbol::intern("count"), AstType::base(Symbol::intern("int")), crate::scope::VarTraits::POD, false)
            .expect("declares");
        let result = lower_expr(&mut fg, &AstExpr::Variable(Symbol::intern("counnt")));
        assert!(matches!(result, GenResult::Failure));
        assert!(diags.error_count() > 0);
    }
}
