//! Multi-mode type-conforming engine (spec.md §4.2, "a multi-mode
//! coercion engine that decides when/how to cast one value to a target
//! type"). Grounded verbatim on `IRGEN/ir_gen_type.h`'s `CONFORM_MODE_*`
//! bitflags and named composite modes.

use latticec_hir::{CastKind, ConstCastKind, IrBuilder, IrModule, IrType, IrValueData, TypeCategory, TypeId, ValueId};

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ConformMode: u16 {
        const PRIMITIVES     = 1 << 0;
        const INTFLOAT       = 1 << 1;
        const POINTERS       = 1 << 2;
        const INTPTR         = 1 << 3;
        const INTENUM        = 1 << 4;
        const FROM_ANY       = 1 << 5;
        const PTR_TO_BOOL    = 1 << 6;
        const POINTERPTR     = 1 << 7;
        const INT_TO_BOOL    = 1 << 8;
        const VARIADIC       = 1 << 9;
        const CLASS_POINTERS = 1 << 10;
        const USER_EXPLICIT  = 1 << 11;
        const USER_IMPLICIT  = 1 << 12;
    }
}

impl ConformMode {
    /// `CONFORM_MODE_CALL_ARGUMENTS`: the strictest mode, no implicit
    /// coercion beyond identity.
    pub const CALL_ARGUMENTS: ConformMode = ConformMode::empty();

    pub const CALL_ARGUMENTS_LOOSE_NOUSER: ConformMode = ConformMode::PRIMITIVES
        .union(ConformMode::VARIADIC)
        .union(ConformMode::POINTERPTR)
        .union(ConformMode::PTR_TO_BOOL)
        .union(ConformMode::CLASS_POINTERS);

    pub const CALL_ARGUMENTS_LOOSE: ConformMode =
        ConformMode::CALL_ARGUMENTS_LOOSE_NOUSER.union(ConformMode::USER_IMPLICIT);

    pub const ASSIGNING: ConformMode = ConformMode::PRIMITIVES
        .union(ConformMode::POINTERPTR)
        .union(ConformMode::PTR_TO_BOOL)
        .union(ConformMode::INT_TO_BOOL)
        .union(ConformMode::CLASS_POINTERS)
        .union(ConformMode::USER_IMPLICIT);

    pub const CALCULATION: ConformMode = ConformMode::PRIMITIVES
        .union(ConformMode::POINTERPTR)
        .union(ConformMode::PTR_TO_BOOL)
        .union(ConformMode::INT_TO_BOOL);

    pub const ALL: ConformMode = ConformMode::all();
}

/// Attempts to conform `value` (typed `from`) to `to`, returning the
/// conformed value (possibly `value` itself, unchanged, if already equal
/// — spec.md §8 "`conform(x:T, to:T)` is a no-op returning `x`"). Returns
/// `None` if no rule in `mode` applies, mirroring `ast_types_conform`'s
/// `successful_t` return; the caller decides whether that is a hard
/// failure or a tentative one (spec.md §9 "Three-valued error codes").
pub fn conform(builder: &mut IrBuilder, value: ValueId, from: TypeId, to: TypeId, mode: ConformMode) -> Option<ValueId> {
    if from == to {
        return Some(value);
    }

    let from_kind = builder.module.types.category(from);
    let to_kind = builder.module.types.category(to);
    let from_is_ptr = builder.module.types.is_pointer(from);
    let to_is_ptr = builder.module.types.is_pointer(to);

    if mode.contains(ConformMode::PRIMITIVES) && from_kind != TypeCategory::Na && to_kind != TypeCategory::Na {
        if let Some(v) = conform_primitive(builder, value, from, to, from_kind, to_kind) {
            return Some(v);
        }
    }

    if mode.contains(ConformMode::POINTERPTR) {
        if from_is_ptr && to_is_ptr {
            return Some(builder.build_cast(CastKind::Bitcast, value, to));
        }
    }

    if mode.contains(ConformMode::POINTERS) && from_is_ptr && to_is_ptr {
        return Some(builder.build_cast(CastKind::Bitcast, value, to));
    }

    if mode.contains(ConformMode::INTPTR) {
        if from_is_ptr && to_kind != TypeCategory::Na && to_kind != TypeCategory::Fp {
            return Some(builder.build_cast(CastKind::PtrToInt, value, to));
        }
        if to_is_ptr && from_kind != TypeCategory::Na && from_kind != TypeCategory::Fp {
            return Some(builder.build_cast(CastKind::IntToPtr, value, to));
        }
    }

    if mode.contains(ConformMode::PTR_TO_BOOL) && from_is_ptr && matches!(builder.module.types.get(to), IrType::Bool) {
        return Some(builder.build_cast(CastKind::IsntZero, value, to));
    }

    if mode.contains(ConformMode::INT_TO_BOOL)
        && matches!(from_kind, TypeCategory::Si | TypeCategory::Ui)
        && matches!(builder.module.types.get(to), IrType::Bool)
    {
        return Some(builder.build_cast(CastKind::IsntZero, value, to));
    }

    None
}

fn conform_primitive(
    builder: &mut IrBuilder,
    value: ValueId,
    from: TypeId,
    to: TypeId,
    from_kind: TypeCategory,
    to_kind: TypeCategory,
) -> Option<ValueId> {
    let from_bits = builder.module.types.size_in_bits(from);
    let to_bits = builder.module.types.size_in_bits(to);

    match (from_kind, to_kind) {
        (TypeCategory::Si, TypeCategory::Si) | (TypeCategory::Ui, TypeCategory::Ui) => {
            let kind = if to_bits > from_bits {
                if from_kind == TypeCategory::Si { CastKind::Sext } else { CastKind::Zext }
            } else if to_bits < from_bits {
                CastKind::Trunc
            } else {
                CastKind::Bitcast
            };
            Some(builder.build_cast(kind, value, to))
        }
        (TypeCategory::Si, TypeCategory::Ui) | (TypeCategory::Ui, TypeCategory::Si) => {
            Some(builder.build_cast(CastKind::Bitcast, value, to))
        }
        (TypeCategory::Fp, TypeCategory::Fp) => {
            let kind = if to_bits > from_bits { CastKind::Fext } else { CastKind::FTrunc };
            Some(builder.build_cast(kind, value, to))
        }
        (TypeCategory::Si, TypeCategory::Fp) => Some(builder.build_cast(CastKind::SiToFp, value, to)),
        (TypeCategory::Ui, TypeCategory::Fp) => Some(builder.build_cast(CastKind::UiToFp, value, to)),
        (TypeCategory::Fp, TypeCategory::Si) => Some(builder.build_cast(CastKind::FpToSi, value, to)),
        (TypeCategory::Fp, TypeCategory::Ui) => Some(builder.build_cast(CastKind::FpToUi, value, to)),
        _ => None,
    }
}

/// Constant-folding counterpart to [`conform`], used when `value` is
/// already a compile-time constant (e.g. static initializers): produces a
/// `ConstCast` [`latticec_hir::IrValueData`] instead of emitting an
/// instruction.
pub fn const_conform(module: &mut IrModule, value: ValueId, from: TypeId, to: TypeId) -> Option<ValueId> {
    if from == to {
        return Some(value);
    }
    let from_kind = module.types.category(from);
    let to_kind = module.types.category(to);
    let from_bits = module.types.size_in_bits(from);
    let to_bits = module.types.size_in_bits(to);
    let kind = match (from_kind, to_kind) {
        (TypeCategory::Si, TypeCategory::Si) if to_bits > from_bits => ConstCastKind::Sext,
        (TypeCategory::Ui, TypeCategory::Ui) if to_bits > from_bits => ConstCastKind::Zext,
        (TypeCategory::Si | TypeCategory::Ui, TypeCategory::Si | TypeCategory::Ui) if to_bits < from_bits => {
            ConstCastKind::Trunc
        }
        (TypeCategory::Si | TypeCategory::Ui, TypeCategory::Si | TypeCategory::Ui) => ConstCastKind::Bitcast,
        (TypeCategory::Fp, TypeCategory::Fp) if to_bits > from_bits => ConstCastKind::Fext,
        (TypeCategory::Fp, TypeCategory::Fp) => ConstCastKind::Ftrunc,
        _ if module.types.is_pointer(from) && module.types.is_pointer(to) => ConstCastKind::Bitcast,
        _ => return None,
    };
    Some(module.values.alloc(to, IrValueData::ConstCast { kind, value }))
}

/// Finds a common type for two values and conforms both to it (spec.md
/// §4.5 Ternary, "if branch types differ, attempt mutual widening"). Picks
/// whichever of `a_ty`/`b_ty` has the larger bit width within the same
/// category; returns `None` if the categories differ and neither side can
/// be widened into the other.
pub fn merge(
    builder: &mut IrBuilder,
    a: ValueId,
    a_ty: TypeId,
    b: ValueId,
    b_ty: TypeId,
) -> Option<(ValueId, ValueId, TypeId)> {
    if a_ty == b_ty {
        return Some((a, b, a_ty));
    }
    let cat_a = builder.module.types.category(a_ty);
    let cat_b = builder.module.types.category(b_ty);
    if cat_a != cat_b || cat_a == TypeCategory::Na {
        return None;
    }
    let (wide_ty, narrow_val, narrow_ty, widened_is_a) =
        if builder.module.types.size_in_bits(a_ty) >= builder.module.types.size_in_bits(b_ty) {
            (a_ty, b, b_ty, true)
        } else {
            (b_ty, a, a_ty, false)
        };
    let widened = conform(builder, narrow_val, narrow_ty, wide_ty, ConformMode::CALCULATION)?;
    if widened_is_a {
        Some((a, widened, wide_ty))
    } else {
        Some((widened, b, wide_ty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latticec_hir::IrModule;

    #[test]
    fn identity_conform_is_noop() {
        let mut module = IrModule::new();
        let s32 = module.types.alloc(IrType::S32);
        let lit = module.values.alloc(s32, IrValueData::Literal(1i32.to_le_bytes().to_vec()));
        let mut builder = IrBuilder::new(&mut module);
        let result = conform(&mut builder, lit, s32, s32, ConformMode::ALL);
        assert_eq!(result, Some(lit));
    }

    #[test]
    fn widening_int_cast_emits_sext() {
        let mut module = IrModule::new();
        let s8 = module.types.alloc(IrType::S8);
        let s32 = module.types.alloc(IrType::S32);
        let lit = module.values.alloc(s8, IrValueData::Literal(vec![1]));
        let mut builder = IrBuilder::new(&mut module);
        let result = conform(&mut builder, lit, s8, s32, ConformMode::PRIMITIVES).expect("conforms");
        let (blocks, _) = builder.finish();
        assert!(matches!(&blocks[0][0].op, latticec_hir::Opcode::Cast { kind: CastKind::Sext, .. }));
        let _ = result;
    }

    #[test]
    fn strict_mode_rejects_int_float_conversion() {
        let mut module = IrModule::new();
        let s32 = module.types.alloc(IrType::S32);
        let f32_ty = module.types.alloc(IrType::Float);
        let lit = module.values.alloc(s32, IrValueData::Literal(1i32.to_le_bytes().to_vec()));
        let mut builder = IrBuilder::new(&mut module);
        assert_eq!(conform(&mut builder, lit, s32, f32_ty, ConformMode::CALL_ARGUMENTS), None);
    }
}
