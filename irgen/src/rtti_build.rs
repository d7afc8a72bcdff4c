//! RTTI table construction & relocation (spec.md §4.9). Grounded on
//! `IRGEN/ir_gen_rtti.c`: one [`latticec_hir::rtti::RttiEntry`] per
//! deduplicated [`crate::typemap::TypeTable`] record, cross-referenced by
//! plain index into the sorted table (not by pointer or `TypeId`), then a
//! relocation pass that backpatches every deferred `typeinfo` placeholder
//! [`crate::expr`] recorded during expression lowering.

use latticec_hir::rtti::{AnyCompositeType, AnyFixedArrayType, AnyFuncPtrType, AnyPtrType, AnyType, AnyTypeKind, RttiEntry};
use latticec_hir::{CastKind, IrModule, IrType};
use latticec_symbol::Symbol;

use crate::ast::{Ast, Bone};
use crate::typemap::TypeTable;

fn kind_of(ty: &IrType) -> AnyTypeKind {
    match ty {
        IrType::Void | IrType::None => AnyTypeKind::Void,
        IrType::Bool => AnyTypeKind::Bool,
        IrType::S8 => AnyTypeKind::Byte,
        IrType::U8 => AnyTypeKind::Ubyte,
        IrType::S16 => AnyTypeKind::Short,
        IrType::U16 => AnyTypeKind::Ushort,
        IrType::S32 => AnyTypeKind::Int,
        IrType::U32 => AnyTypeKind::Uint,
        IrType::S64 => AnyTypeKind::Long,
        IrType::U64 => AnyTypeKind::Ulong,
        IrType::Half => AnyTypeKind::Float,
        IrType::Float => AnyTypeKind::Float,
        IrType::Double => AnyTypeKind::Double,
        IrType::Ptr(_) => AnyTypeKind::Ptr,
        IrType::FixedArray { .. } => AnyTypeKind::FixedArray,
        IrType::FuncPtr { .. } => AnyTypeKind::FuncPtr,
        IrType::Structure { .. } => AnyTypeKind::Struct,
        IrType::Union { .. } => AnyTypeKind::Union,
    }
}

/// Looks up `name`'s position in the already-[`TypeTable::reduce`]d table,
/// stripping a leading `*` the way [`TypeTable::mention`] names pointer
/// entries, so a field/subtype reference written against the unprefixed
/// name still resolves.
fn table_index(table: &TypeTable, name: &str) -> Option<u32> {
    table.find(name).map(|i| i as u32)
}

/// Names a composite's member fields by re-reading its [`Bone`] layout from
/// the AST (the same lookup [`crate::expr::resolve_field`] uses), so the
/// `AnyCompositeType` descriptor can carry real field names instead of
/// positional placeholders. Returns `None` for anonymous/unknown types,
/// where the descriptor falls back to `member_<i>`.
fn composite_field_names(ast: &Ast, type_name: &str) -> Option<Vec<String>> {
    let composite = ast.composites.iter().find(|c| c.name.as_str().as_str() == type_name)?;
    let children = match &composite.layout {
        Bone::Struct { children, .. } | Bone::Union { children, .. } => children,
    };
    Some(children.iter().map(|(name, _)| name.to_string()).collect())
}

/// Builds one [`RttiEntry`] per entry of the reduced type table (spec.md
/// §4.9 "For each entry in the type table, produce one `*AnyType`-compatible
/// ... global sized to the entry's variant"). Cross-references
/// (`subtype`/`members`/`args`/`return_type`) are plain indices into this
/// same, already-sorted vector — the descriptor for table position `i` is
/// `entries[i]`.
pub fn build_rtti_table(module: &IrModule, type_table: &mut TypeTable, ast: &Ast) -> Vec<RttiEntry> {
    type_table.reduce();

    let records_len = type_table.records().len();
    let mut entries = Vec::with_capacity(records_len);
    for i in 0..records_len {
        let (name, ir_type) = {
            let record = &type_table.records()[i];
            (record.name.clone(), record.ir_type)
        };
        let Some(ty) = ir_type else {
            // A name mentioned during inference but never actually
            // resolved (e.g. a polymorph that was never instantiated):
            // carry it as an opaque zero-size void entry rather than
            // panicking, so relocation can still report it precisely.
            entries.push(RttiEntry::Primitive(AnyType { kind: AnyTypeKind::Void, name, is_alias: false, size_bits: 0 }));
            continue;
        };
        let is_alias = type_table.records()[i].is_alias;
        let size_bits = module.types.size_in_bits(ty);
        let base = AnyType { kind: kind_of(module.types.get(ty)), name: name.clone(), is_alias, size_bits };

        let entry = match module.types.get(ty) {
            IrType::Ptr(inner) => {
                let inner_name = name.strip_prefix('*').unwrap_or(&name);
                let _ = inner;
                RttiEntry::Ptr(AnyPtrType { base, subtype: table_index(type_table, inner_name) })
            }
            IrType::FixedArray { subtype, length } => {
                let elem_name = type_table
                    .records()
                    .iter()
                    .find(|r| r.ir_type == Some(*subtype))
                    .map(|r| r.name.clone());
                let subtype_index = elem_name.and_then(|n| table_index(type_table, &n)).unwrap_or(0);
                RttiEntry::FixedArray(AnyFixedArrayType { base, subtype: subtype_index, length: *length })
            }
            IrType::FuncPtr { args, return_type, traits } => {
                let arg_indices = args
                    .iter()
                    .map(|&a| {
                        type_table
                            .records()
                            .iter()
                            .find(|r| r.ir_type == Some(a))
                            .and_then(|r| table_index(type_table, &r.name))
                            .unwrap_or(0)
                    })
                    .collect();
                let return_index = type_table
                    .records()
                    .iter()
                    .find(|r| r.ir_type == Some(*return_type))
                    .and_then(|r| table_index(type_table, &r.name))
                    .unwrap_or(0);
                RttiEntry::FuncPtr(AnyFuncPtrType {
                    base,
                    args: arg_indices,
                    return_type: return_index,
                    is_vararg: traits.contains(latticec_hir::FuncPtrTraits::VARARG),
                    is_stdcall: traits.contains(latticec_hir::FuncPtrTraits::STDCALL),
                })
            }
            IrType::Structure { subtypes, .. } | IrType::Union { subtypes, .. } => {
                let members: Vec<u32> = subtypes
                    .iter()
                    .map(|&sub| {
                        type_table
                            .records()
                            .iter()
                            .find(|r| r.ir_type == Some(sub))
                            .and_then(|r| table_index(type_table, &r.name))
                            .unwrap_or(0)
                    })
                    .collect();
                let offsets: Vec<u32> = if matches!(module.types.get(ty), IrType::Structure { .. }) {
                    (0..subtypes.len()).map(|idx| module.types.offset_of_bits(ty, idx)).collect()
                } else {
                    vec![0; subtypes.len()]
                };
                let is_packed = matches!(
                    module.types.get(ty),
                    IrType::Structure { traits, .. } | IrType::Union { traits, .. }
                        if traits.contains(latticec_hir::CompositeTraits::PACKED)
                );
                let member_names = composite_field_names(ast, &name)
                    .unwrap_or_else(|| (0..subtypes.len()).map(|i| format!("member_{i}")).collect());
                RttiEntry::Composite(AnyCompositeType { base, members, offsets_bits: offsets, member_names, is_packed })
            }
            _ => RttiEntry::Primitive(base),
        };
        entries.push(entry);
    }
    entries
}

/// Backpatches every [`latticec_hir::RttiRelocation`] recorded during
/// expression lowering with the final sorted-table index of its named type
/// (spec.md §4.9 "writing the sorted-table index into the deferred slot;
/// missing types are fatal"). Returns the names of any relocation whose
/// type never made it into the table — per spec this is a fatal condition,
/// left to the caller to turn into a diagnostic/abort.
pub fn resolve_rtti_relocations(module: &mut IrModule, type_table: &TypeTable) -> Result<(), Vec<String>> {
    let relocations = std::mem::take(&mut module.rtti_relocations);
    let mut missing = Vec::new();
    for reloc in relocations {
        let name = reloc.type_name.as_str();
        match type_table.find(name.as_str()) {
            Some(index) => {
                let bytes = (index as u64).to_le_bytes().to_vec();
                module.values.patch_literal(reloc.value, bytes);
            }
            None => missing.push(name.as_str().to_string()),
        }
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(missing)
    }
}

/// The common `AnyType { kind, name, is_alias, size }` prefix every
/// `Any*Type` descriptor starts with (spec.md §4.9, `hir::rtti`'s module
/// doc comment). Built once and reused as the leading fields of every
/// variant-specific composite below.
struct AnyTypeLayout {
    ty: latticec_hir::TypeId,
    u8_ty: latticec_hir::TypeId,
    usize_ty: latticec_hir::TypeId,
    ptr_ty: latticec_hir::TypeId,
    bool_ty: latticec_hir::TypeId,
}

fn any_type_layout(builder: &mut latticec_hir::IrBuilder) -> AnyTypeLayout {
    let u8_ty = builder.module.types.alloc(IrType::U8);
    let usize_ty = builder.module.common.ir_usize.expect("usize seeded");
    let ptr_ty = builder.module.common.ir_ptr.expect("ptr seeded");
    let bool_ty = builder.module.common.ir_bool.expect("bool seeded");
    let ty = builder.module.types.alloc(IrType::Structure {
        subtypes: vec![u8_ty, ptr_ty, bool_ty, usize_ty],
        traits: latticec_hir::CompositeTraits::empty(),
    });
    AnyTypeLayout { ty, u8_ty, usize_ty, ptr_ty, bool_ty }
}

fn cstr_value(builder: &mut latticec_hir::IrBuilder, ptr_ty: latticec_hir::TypeId, text: &str) -> latticec_hir::ValueId {
    let mut bytes = text.as_bytes().to_vec();
    bytes.push(0);
    let size = bytes.len() as u64;
    builder.module.values.alloc(ptr_ty, latticec_hir::IrValueData::CStrOfLen { bytes, size })
}

/// Builds the common `AnyType` fields (`kind`, `name`, `is_alias`, `size`)
/// as literal/constant values, in struct-field order.
fn base_fields(builder: &mut latticec_hir::IrBuilder, layout: &AnyTypeLayout, base: &AnyType) -> Vec<latticec_hir::ValueId> {
    let kind = builder.build_literal(layout.u8_ty, vec![base.kind as u8]);
    let name = cstr_value(builder, layout.ptr_ty, &base.name);
    let is_alias = builder.build_literal(layout.bool_ty, vec![base.is_alias as u8]);
    let size = builder.build_literal(layout.usize_ty, (base.size_bits as u64).to_le_bytes().to_vec());
    vec![kind, name, is_alias, size]
}

/// `Option<u32>`/absent cross-references are stamped with this sentinel
/// rather than `0`, since `0` is itself a valid table position (the
/// original reserves no index for "no reference").
const NO_SUBTYPE: u64 = u64::MAX;

fn index_literal(builder: &mut latticec_hir::IrBuilder, usize_ty: latticec_hir::TypeId, index: Option<u32>) -> latticec_hir::ValueId {
    let value = index.map(|i| i as u64).unwrap_or(NO_SUBTYPE);
    builder.build_literal(usize_ty, value.to_le_bytes().to_vec())
}

/// Builds a `*usize` anon global from a plain index array, bitcast to the
/// opaque `ptr` type for storage as an `Any*Type` cross-reference field.
fn index_array_ptr(builder: &mut latticec_hir::IrBuilder, usize_ty: latticec_hir::TypeId, ptr_ty: latticec_hir::TypeId, indices: &[u32]) -> latticec_hir::ValueId {
    let elems: Vec<_> = indices.iter().map(|&i| builder.build_literal(usize_ty, (i as u64).to_le_bytes().to_vec())).collect();
    let array_ptr = builder.build_static_array(usize_ty, elems, false);
    builder.build_cast(CastKind::Bitcast, array_ptr, ptr_ty)
}

/// Builds one populated `Any*Type` descriptor global for `entry` and
/// returns its address bitcast to `*AnyType`, ready to drop into
/// `__types__` (spec.md §4.9 "Populate each global ... cross-referencing
/// subtype/member/argument/return/element RTTI via pre-allocated slots").
fn build_descriptor(builder: &mut latticec_hir::IrBuilder, layout: &AnyTypeLayout, entry: &RttiEntry) -> latticec_hir::ValueId {
    let (variant_ty, values): (latticec_hir::TypeId, Vec<latticec_hir::ValueId>) = match entry {
        RttiEntry::Primitive(base) => (layout.ty, base_fields(builder, layout, base)),
        RttiEntry::Ptr(t) => {
            let mut values = base_fields(builder, layout, &t.base);
            values.push(index_literal(builder, layout.usize_ty, t.subtype));
            let ty = builder.module.types.alloc(IrType::Structure {
                subtypes: vec![layout.u8_ty, layout.ptr_ty, layout.bool_ty, layout.usize_ty, layout.usize_ty],
                traits: latticec_hir::CompositeTraits::empty(),
            });
            (ty, values)
        }
        RttiEntry::FixedArray(t) => {
            let mut values = base_fields(builder, layout, &t.base);
            values.push(builder.build_literal(layout.usize_ty, (t.subtype as u64).to_le_bytes().to_vec()));
            values.push(builder.build_literal(layout.usize_ty, t.length.to_le_bytes().to_vec()));
            let ty = builder.module.types.alloc(IrType::Structure {
                subtypes: vec![layout.u8_ty, layout.ptr_ty, layout.bool_ty, layout.usize_ty, layout.usize_ty, layout.usize_ty],
                traits: latticec_hir::CompositeTraits::empty(),
            });
            (ty, values)
        }
        RttiEntry::FuncPtr(t) => {
            let mut values = base_fields(builder, layout, &t.base);
            let args_ptr = index_array_ptr(builder, layout.usize_ty, layout.ptr_ty, &t.args);
            values.push(args_ptr);
            values.push(builder.build_literal(layout.usize_ty, (t.args.len() as u64).to_le_bytes().to_vec()));
            values.push(builder.build_literal(layout.usize_ty, (t.return_type as u64).to_le_bytes().to_vec()));
            values.push(builder.build_literal(layout.bool_ty, vec![t.is_vararg as u8]));
            values.push(builder.build_literal(layout.bool_ty, vec![t.is_stdcall as u8]));
            let ty = builder.module.types.alloc(IrType::Structure {
                subtypes: vec![
                    layout.u8_ty, layout.ptr_ty, layout.bool_ty, layout.usize_ty,
                    layout.ptr_ty, layout.usize_ty, layout.usize_ty, layout.bool_ty, layout.bool_ty,
                ],
                traits: latticec_hir::CompositeTraits::empty(),
            });
            (ty, values)
        }
        RttiEntry::Composite(t) => {
            let mut values = base_fields(builder, layout, &t.base);
            let members_ptr = index_array_ptr(builder, layout.usize_ty, layout.ptr_ty, &t.members);
            values.push(members_ptr);
            values.push(builder.build_literal(layout.usize_ty, (t.members.len() as u64).to_le_bytes().to_vec()));
            let offsets_ptr = index_array_ptr(builder, layout.usize_ty, layout.ptr_ty, &t.offsets_bits);
            values.push(offsets_ptr);
            let name_ptrs: Vec<_> = t.member_names.iter().map(|n| cstr_value(builder, layout.ptr_ty, n)).collect();
            let names_array = builder.build_static_array(layout.ptr_ty, name_ptrs, false);
            values.push(builder.build_cast(CastKind::Bitcast, names_array, layout.ptr_ty));
            values.push(builder.build_literal(layout.bool_ty, vec![t.is_packed as u8]));
            let ty = builder.module.types.alloc(IrType::Structure {
                subtypes: vec![
                    layout.u8_ty, layout.ptr_ty, layout.bool_ty, layout.usize_ty,
                    layout.ptr_ty, layout.usize_ty, layout.ptr_ty, layout.ptr_ty, layout.bool_ty,
                ],
                traits: latticec_hir::CompositeTraits::empty(),
            });
            (ty, values)
        }
    };

    let descriptor_ptr = builder.build_static_struct(variant_ty, values, false);
    let any_ptr_ty = builder.module.types.alloc(IrType::Ptr(layout.ty));
    builder.build_cast(CastKind::Bitcast, descriptor_ptr, any_ptr_ty)
}

/// Emits the special RTTI globals spec.md §2 step 5 names: `__types__`
/// (a constant array of `*AnyType`, each pointer bitcast from its
/// variant's own populated descriptor), `__types_length__`,
/// `__type_kinds__` (the parallel array of bare `kind` tags), and
/// `__type_kinds_length__`. When RTTI is disabled (`TRAITS.NO_TYPEINFO`),
/// `__types__`/`__type_kinds__` become null placeholders and both
/// lengths are `0` (spec.md §4.9, §6). Records `__types__`'s position in
/// `module.globals` as `module.common.rtti_array_index`.
pub fn emit_rtti_globals(builder: &mut latticec_hir::IrBuilder, entries: &[RttiEntry], enable_rtti: bool) {
    let usize_ty = builder.module.common.ir_usize.expect("usize seeded");
    let ptr_ty = builder.module.common.ir_ptr.expect("ptr seeded");
    let layout = any_type_layout(builder);
    let any_ptr_ty = builder.module.types.alloc(IrType::Ptr(layout.ty));

    let (types_ty, types_init, kinds_ty, kinds_init, length) = if !enable_rtti || entries.is_empty() {
        let double_ptr_ty = builder.module.types.alloc(IrType::Ptr(any_ptr_ty));
        let types_null = builder.build_null_ptr(double_ptr_ty);
        let kinds_null = builder.build_null_ptr(ptr_ty);
        (double_ptr_ty, types_null, ptr_ty, kinds_null, 0u64)
    } else {
        let descriptors: Vec<_> = entries.iter().map(|e| build_descriptor(builder, &layout, e)).collect();
        let types_array_ty = builder.module.types.alloc(IrType::FixedArray { subtype: any_ptr_ty, length: descriptors.len() as u64 });
        let types_literal = builder.module.values.alloc(types_array_ty, latticec_hir::IrValueData::ArrayLiteral { values: descriptors });

        let kind_tags: Vec<_> = entries.iter().map(|e| builder.build_literal(layout.u8_ty, vec![e.kind() as u8])).collect();
        let kinds_array_ty = builder.module.types.alloc(IrType::FixedArray { subtype: layout.u8_ty, length: kind_tags.len() as u64 });
        let kinds_literal = builder.module.values.alloc(kinds_array_ty, latticec_hir::IrValueData::ArrayLiteral { values: kind_tags });

        (types_array_ty, types_literal, kinds_array_ty, kinds_literal, entries.len() as u64)
    };

    let types_index = builder.module.globals.len();
    builder.module.globals.push(latticec_hir::GlobalVar {
        name: Symbol::intern("__types__"),
        ty: types_ty,
        init: Some(types_init),
        is_external: false,
        is_thread_local: false,
    });
    builder.module.globals.push(latticec_hir::GlobalVar {
        name: Symbol::intern("__types_length__"),
        ty: usize_ty,
        init: Some(builder.build_literal(usize_ty, length.to_le_bytes().to_vec())),
        is_external: false,
        is_thread_local: false,
    });
    builder.module.globals.push(latticec_hir::GlobalVar {
        name: Symbol::intern("__type_kinds__"),
        ty: kinds_ty,
        init: Some(kinds_init),
        is_external: false,
        is_thread_local: false,
    });
    builder.module.globals.push(latticec_hir::GlobalVar {
        name: Symbol::intern("__type_kinds_length__"),
        ty: usize_ty,
        init: Some(builder.build_literal(usize_ty, length.to_le_bytes().to_vec())),
        is_external: false,
        is_thread_local: false,
    });
    builder.module.common.rtti_array_index = Some(types_index as u32);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstType;
    use crate::typemap::TypeMap;

    fn seeded() -> (IrModule, TypeMap) {
        let mut module = IrModule::new();
        let mut typemap = TypeMap::new();
        typemap.seed_primitives(&mut module);
        (module, typemap)
    }

    #[test]
    fn primitive_entry_carries_size() {
        let (module, typemap) = seeded();
        let mut table = TypeTable::new();
        table.mention(&AstType::base(Symbol::intern("int")), "int".into());
        let ast = Ast::default();
        let mut table = table;
        // resolve the int entry's ir_type the way inference would have.
        let int_ty = typemap.find(Symbol::intern("int")).unwrap();
        table.records_mut()[0].ir_type = Some(int_ty);
        let entries = build_rtti_table(&module, &mut table, &ast);
        match &entries[0] {
            RttiEntry::Primitive(t) => assert_eq!(t.size_bits, 32),
            other => panic!("expected primitive, got {other:?}"),
        }
    }

    #[test]
    fn relocation_patches_literal_with_sorted_index() {
        let (mut module, typemap) = seeded();
        let mut table = TypeTable::new();
        table.mention(&AstType::base(Symbol::intern("bool")), "bool".into());
        table.mention(&AstType::base(Symbol::intern("int")), "int".into());
        table.reduce();
        let bool_ty = typemap.find(Symbol::intern("bool")).unwrap();
        let int_ty = typemap.find(Symbol::intern("int")).unwrap();
        for record in table.records_mut() {
            record.ir_type = Some(if record.name == "bool" { bool_ty } else if record.name == "int" { int_ty } else { bool_ty });
        }

        let usize_ty = module.common.ir_usize.unwrap();
        let placeholder = module.values.alloc(usize_ty, latticec_hir::IrValueData::Literal(0u64.to_le_bytes().to_vec()));
        module.rtti_relocations.push(latticec_hir::RttiRelocation { value: placeholder, type_name: Symbol::intern("int") });

        resolve_rtti_relocations(&mut module, &table).expect("int is in the table");
        let expected = table.find("int").unwrap() as u64;
        match &module.values.get(placeholder).data {
            latticec_hir::IrValueData::Literal(bytes) => assert_eq!(u64::from_le_bytes(bytes[..8].try_into().unwrap()), expected),
            other => panic!("expected literal, got {other:?}"),
        }
    }

    #[test]
    fn missing_relocation_target_is_reported() {
        let (mut module, _typemap) = seeded();
        let table = TypeTable::new();
        let usize_ty = module.common.ir_usize.unwrap();
        let placeholder = module.values.alloc(usize_ty, latticec_hir::IrValueData::Literal(0u64.to_le_bytes().to_vec()));
        module.rtti_relocations.push(latticec_hir::RttiRelocation { value: placeholder, type_name: Symbol::intern("*NeverAdded") });
        let result = resolve_rtti_relocations(&mut module, &table);
        assert_eq!(result, Err(vec!["*NeverAdded".to_string()]));
    }
}
