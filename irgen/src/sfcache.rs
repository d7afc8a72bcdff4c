//! Structural management-method dispatch and autogeneration: `__defer__`,
//! `__pass__`, `__assign__`, `__access__` (spec.md §4.4). User-defined
//! overloads always win; when none exists for a "simple" struct (every
//! field a plain, non-pointer, possibly-fixed-array type), a structural
//! implementation is synthesized on demand and memoized in
//! [`latticec_hir::IrModule::sf_cache`]. Grounded on
//! `IRGEN/ir_builder.c`'s `attempt_autogen___defer__`/`attempt_autogen___pass__`/
//! `attempt_autogen___assign__` and `handle_single_deference`/
//! `handle_children_deference`.
//!
//! `__access__` has no structural form in the original and is left as a
//! pure user-overload lookup (`ir_gen_expr.c`'s `__access__` dispatch).

use latticec_hir::{
    FuncPair, FuncTraits, GenResult, IrBuilder, IrFunc, IrModule, IrType, SfCacheEntry, Tri, TypeId,
};
use latticec_session::SourceSpan;
use latticec_symbol::Symbol;

use crate::ast::{Ast, AstArg, AstFunc, AstFuncTraits, AstType, AstTypeLayer, Bone};
use crate::typemap::TypeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagementKind {
    Defer,
    Pass,
    Assign,
}

impl ManagementKind {
    pub fn method_name(self) -> &'static str {
        match self {
            ManagementKind::Defer => "__defer__",
            ManagementKind::Pass => "__pass__",
            ManagementKind::Assign => "__assign__",
        }
    }

    fn arity(self) -> usize {
        match self {
            ManagementKind::Defer | ManagementKind::Pass => 1,
            ManagementKind::Assign => 2,
        }
    }

    fn cache_slot(self, entry: &mut SfCacheEntry) -> &mut Tri<FuncPair> {
        match self {
            ManagementKind::Defer => &mut entry.defer,
            ManagementKind::Pass => &mut entry.pass,
            ManagementKind::Assign => &mut entry.assign,
        }
    }

    fn read_slot(self, entry: &SfCacheEntry) -> Tri<FuncPair> {
        match self {
            ManagementKind::Defer => entry.defer,
            ManagementKind::Pass => entry.pass,
            ManagementKind::Assign => entry.assign,
        }
    }
}

/// Binary-searches the sorted `(type_name, method_name)` method table for a
/// user-defined override. Overload resolution proper (argument conforming)
/// is [`crate::conform`]'s job; management methods are always looked up by
/// exact receiver-type name.
pub fn find_user_method(module: &IrModule, type_name: Symbol, method_name: &str) -> Option<FuncPair> {
    let needle = type_name.as_str();
    let pos = module
        .methods
        .partition_point(|m| (m.type_name.as_str().as_str(), m.method_name.as_str().as_str()) < (needle.as_str(), method_name));
    module
        .methods
        .get(pos)
        .filter(|m| m.type_name.as_str() == needle && m.method_name.as_str() == method_name)
        .map(|m| m.pair)
}

/// `__access__`: pure user-overload dispatch, no structural autogen form.
pub fn find_access(module: &IrModule, type_name: Symbol) -> Option<FuncPair> {
    find_user_method(module, type_name, "__access__")
}

/// Finds (or builds) the `__defer__`/`__pass__`/`__assign__` implementation
/// for `type_name`, a struct composite. Returns `Success(None)` when the
/// type is plain-old-data and needs no management method at all — not an
/// error, just "nothing to call".
pub fn find_or_autogen(
    module: &mut IrModule,
    ast: &mut Ast,
    typemap: &TypeMap,
    kind: ManagementKind,
    type_name: Symbol,
) -> GenResult<Option<FuncPair>> {
    if let Some(pair) = find_user_method(module, type_name, kind.method_name()) {
        return GenResult::Success(Some(pair));
    }

    if let Some(entry) = module.sf_cache.get(&type_name) {
        match kind.read_slot(entry) {
            Tri::Yes(pair) => return GenResult::Success(Some(pair)),
            Tri::No => return GenResult::Success(None),
            Tri::Unknown => {}
        }
    }

    // Guard against infinite recursion on cyclic composites: mark "no"
    // before recursing into fields, same as the original's
    // `entry->has_defer = TROOLEAN_FALSE` set ahead of the child scan.
    *kind.cache_slot(module.sf_cache.entry(type_name).or_default()) = Tri::No;

    let Some(composite) = ast.composites.iter().find(|c| c.name == type_name) else {
        return GenResult::Success(None);
    };
    let Bone::Struct { children, .. } = &composite.layout else {
        return GenResult::Success(None);
    };
    // "Simple" struct: every field is a plain `Type` bone (spec.md §4.4,
    // `ast_layout_is_simple_struct`); nested anonymous layouts bail out.
    if children.iter().any(|(_, bone)| !matches!(bone, Bone::Type(_))) {
        return GenResult::Success(None);
    }
    let fields: Vec<(Symbol, AstType)> = children
        .iter()
        .map(|(name, bone)| match bone {
            Bone::Type(ty) => (*name, ty.clone()),
            _ => unreachable!("filtered above"),
        })
        .collect();

    let mut plans = Vec::with_capacity(fields.len());
    for (index, (_, field_ty)) in fields.iter().enumerate() {
        match structural_plan_for_field(module, ast, typemap, kind, field_ty) {
            GenResult::Success(Some(plan)) => plans.push((index as u32, field_ty.clone(), Some(plan))),
            GenResult::Success(None) => plans.push((index as u32, field_ty.clone(), None)),
            GenResult::Failure => return GenResult::Failure,
            GenResult::AltFailure => return GenResult::AltFailure,
        }
    }

    if plans.iter().all(|(_, _, plan)| plan.is_none()) {
        return GenResult::Success(None);
    }
    // __assign__ autogen is restricted to direct-field composites: threading
    // the right-hand value through a per-element array loop as well as a
    // per-field call needs lowering support this module doesn't build.
    if kind == ManagementKind::Assign && plans.iter().any(|(_, _, plan)| matches!(plan, Some(FieldPlan::Array { .. }))) {
        return GenResult::Success(None);
    }

    let Some(composite_ty) = typemap.find(type_name) else {
        return GenResult::Success(None);
    };
    let pair = build_structural_func(module, ast, typemap, kind, type_name, composite_ty, &plans);
    *kind.cache_slot(module.sf_cache.entry(type_name).or_default()) = Tri::Yes(pair);
    GenResult::Success(Some(pair))
}

/// What a single field needs done to it for `kind`: either a recursive
/// call to the field type's own management function, or (for fixed
/// arrays) the same applied element-by-element, statically unrolled.
enum FieldPlan {
    Direct(FuncPair),
    Array { length: u64, elem_pair: FuncPair },
}

fn structural_plan_for_field(
    module: &mut IrModule,
    ast: &mut Ast,
    typemap: &TypeMap,
    kind: ManagementKind,
    field_ty: &AstType,
) -> GenResult<Option<FieldPlan>> {
    if field_ty.is_pointer() {
        // Fields behind a pointer are not owned recursively.
        return GenResult::Success(None);
    }
    match field_ty.layers.first() {
        Some(AstTypeLayer::FixedArray(length)) => {
            let elem_ty = field_ty.unwrapped_view();
            match structural_plan_for_field(module, ast, typemap, kind, &elem_ty) {
                GenResult::Success(Some(FieldPlan::Direct(elem_pair))) => {
                    GenResult::Success(Some(FieldPlan::Array { length: *length, elem_pair }))
                }
                GenResult::Success(_) => GenResult::Success(None),
                other => other.map(|_| unreachable!()),
            }
        }
        Some(AstTypeLayer::Ptr) => GenResult::Success(None),
        // Only ever reachable on an un-instantiated polymorphic template;
        // concrete field types have already had their counts substituted.
        Some(AstTypeLayer::PolyCountArray(_)) => GenResult::Success(None),
        None => {
            let crate::ast::AstTypeElem::Base(name) = &field_ty.elem else {
                return GenResult::Success(None);
            };
            if typemap.find(*name).is_none() {
                return GenResult::Success(None);
            }
            match find_or_autogen(module, ast, typemap, kind, *name) {
                GenResult::Success(Some(pair)) => GenResult::Success(Some(FieldPlan::Direct(pair))),
                GenResult::Success(None) => GenResult::Success(None),
                GenResult::Failure => GenResult::Failure,
                GenResult::AltFailure => GenResult::AltFailure,
            }
        }
    }
}

/// Emits the IR body directly (bypassing statement lowering, same as the
/// original's `handle_children_deference`/`handle_children_pass`, which run
/// against the low-level builder rather than through AST statements) and
/// registers the result as a method and AST function.
fn build_structural_func(
    module: &mut IrModule,
    ast: &mut Ast,
    typemap: &TypeMap,
    kind: ManagementKind,
    type_name: Symbol,
    composite_ty: TypeId,
    plans: &[(u32, AstType, Option<FieldPlan>)],
) -> FuncPair {
    let void_ty = typemap.find(Symbol::intern("void")).expect("void seeded");
    let this_ptr_ty = module.types.alloc(IrType::Ptr(composite_ty));
    let this_slot_ty = module.types.alloc(IrType::Ptr(this_ptr_ty));

    let mut builder = IrBuilder::new(module);
    let this_slot = builder.build_alloc(this_ptr_ty);
    let this_value = builder.build_load(this_slot, None);
    let rhs_value = (kind == ManagementKind::Assign).then(|| {
        let rhs_slot = builder.build_alloc(composite_ty);
        builder.build_load(rhs_slot, None)
    });

    for (index, _field_ty, plan) in plans {
        let Some(plan) = plan else { continue };
        match plan {
            FieldPlan::Direct(pair) => {
                let field_ty = field_ir_type(&mut builder, composite_ty, *index);
                let field_ptr_ty = builder.module.types.alloc(IrType::Ptr(field_ty));
                let this_field_ptr = builder.build_member(this_value, *index, field_ptr_ty, None);
                let mut args = vec![this_field_ptr];
                if let Some(rhs) = rhs_value {
                    let rhs_field_ptr = builder.build_member(rhs, *index, field_ptr_ty, None);
                    args.push(builder.build_load(rhs_field_ptr, None));
                }
                builder.build_call(pair.ir_func_id, args, void_ty);
            }
            FieldPlan::Array { length, elem_pair, .. } => {
                let field_ty = field_ir_type(&mut builder, composite_ty, *index);
                let field_ptr_ty = builder.module.types.alloc(IrType::Ptr(field_ty));
                let this_field_ptr = builder.build_member(this_value, *index, field_ptr_ty, None);
                let elem_ty = match builder.module.types.get(field_ty) {
                    IrType::FixedArray { subtype, .. } => *subtype,
                    _ => field_ty,
                };
                let elem_ptr_ty = builder.module.types.alloc(IrType::Ptr(elem_ty));
                let casted = builder.build_cast(latticec_hir::CastKind::Bitcast, this_field_ptr, elem_ptr_ty);
                let usize_ty = builder.module.common.ir_usize.expect("usize seeded");
                for i in 0..*length {
                    let idx = builder.build_literal(usize_ty, i.to_le_bytes().to_vec());
                    let item = builder.build_array_access(casted, idx, elem_ty, None);
                    builder.build_call(elem_pair.ir_func_id, vec![item], void_ty);
                }
            }
        }
    }
    builder.build_return(None);
    let (basicblocks, variable_count) = builder.finish();

    let arg_types = match kind {
        ManagementKind::Defer | ManagementKind::Pass => vec![this_ptr_ty],
        ManagementKind::Assign => vec![this_ptr_ty, composite_ty],
    };

    let ir_func_id = module.push_func(IrFunc {
        name: Symbol::intern(kind.method_name()),
        traits: FuncTraits::empty(),
        return_type: void_ty,
        arg_types,
        arity: kind.arity(),
        basicblocks,
        variable_count,
        export_as: None,
        maybe_filename: None,
        maybe_definition_string: None,
        maybe_line: None,
        maybe_column: None,
    });

    let args = match kind {
        ManagementKind::Defer | ManagementKind::Pass => {
            vec![AstArg { name: Symbol::intern("this"), ty: AstType::base(type_name).pointer_to(), default: None }]
        }
        ManagementKind::Assign => vec![
            AstArg { name: Symbol::intern("this"), ty: AstType::base(type_name).pointer_to(), default: None },
            AstArg { name: Symbol::intern("$"), ty: AstType::base(type_name), default: None },
        ],
    };
    let ast_func_id = ast.push_func(AstFunc {
        name: Symbol::intern(kind.method_name()),
        args,
        return_type: AstType::base(Symbol::intern("void")),
        traits: AstFuncTraits::METHOD,
        type_params: Vec::new(),
        statements: Vec::new(),
        export_as: None,
        method_of: Some(type_name),
        span: SourceSpan::unknown(),
    });

    let pair = FuncPair { ast_func_id: ast_func_id.0, ir_func_id };
    module.methods.push(latticec_hir::MethodMapping {
        type_name,
        method_name: Symbol::intern(kind.method_name()),
        pair,
    });
    module.sort_mappings();
    pair
}

fn field_ir_type(builder: &mut IrBuilder, composite_ty: TypeId, index: u32) -> TypeId {
    match builder.module.types.get(composite_ty) {
        IrType::Structure { subtypes, .. } => subtypes[index as usize],
        _ => unreachable!("field_ir_type called on non-structure composite"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AstComposite, Bone};
    use latticec_session::SourceSpan;

    fn make_pod_struct(name: &str, field_type: &str) -> (Ast, TypeMap, IrModule) {
        let mut module = IrModule::new();
        let mut typemap = TypeMap::new();
        typemap.seed_primitives(&mut module);

        let mut ast = Ast::default();
        ast.composites.push(AstComposite {
            name: Symbol::intern(name),
            layout: Bone::Struct {
                children: vec![(Symbol::intern("x"), Bone::Type(AstType::base(Symbol::intern(field_type))))],
                packed: false,
            },
            is_alias: false,
            span: SourceSpan::unknown(),
        });

        let diagnostics = latticec_session::DiagnosticsHandler::new();
        typemap.declare_skeletons(&ast, &diagnostics).expect("no collisions");
        typemap.resolve_composite_bodies(&ast, &mut module).expect("resolves");
        (ast, typemap, module)
    }

    #[test]
    fn pod_struct_needs_no_defer() {
        let (mut ast, typemap, mut module) = make_pod_struct("Point", "int");
        let result = find_or_autogen(&mut module, &mut ast, &typemap, ManagementKind::Defer, Symbol::intern("Point"));
        assert!(matches!(result, GenResult::Success(None)));
    }

    #[test]
    fn struct_with_managed_field_gets_autogenerated_defer() {
        let (mut ast, typemap, mut module) = make_pod_struct("Outer", "Inner");
        ast.composites.push(AstComposite {
            name: Symbol::intern("Inner"),
            layout: Bone::Struct {
                children: vec![(Symbol::intern("y"), Bone::Type(AstType::base(Symbol::intern("int"))))],
                packed: false,
            },
            is_alias: false,
            span: SourceSpan::unknown(),
        });
        let diagnostics = latticec_session::DiagnosticsHandler::new();
        typemap.declare_skeletons(&ast, &diagnostics).expect("no collisions");
        let mut typemap = typemap;
        typemap.resolve_composite_bodies(&ast, &mut module).expect("resolves");

        // A user-defined __defer__ on Inner forces Outer's autogen path to
        // produce a real function that calls it.
        let inner_ty = typemap.find(Symbol::intern("Inner")).expect("declared");
        let void_ty = typemap.find(Symbol::intern("void")).expect("declared");
        let inner_ptr_ty = module.types.alloc(IrType::Ptr(inner_ty));
        let inner_defer = module.push_func(IrFunc {
            name: Symbol::intern("__defer__"),
            traits: FuncTraits::empty(),
            return_type: void_ty,
            arg_types: vec![inner_ptr_ty],
            arity: 1,
            basicblocks: vec![vec![]],
            variable_count: 0,
            export_as: None,
            maybe_filename: None,
            maybe_definition_string: None,
            maybe_line: None,
            maybe_column: None,
        });
        module.methods.push(latticec_hir::MethodMapping {
            type_name: Symbol::intern("Inner"),
            method_name: Symbol::intern("__defer__"),
            pair: FuncPair { ast_func_id: 0, ir_func_id: inner_defer },
        });
        module.sort_mappings();

        let result = find_or_autogen(&mut module, &mut ast, &typemap, ManagementKind::Defer, Symbol::intern("Outer"));
        match result {
            GenResult::Success(Some(pair)) => {
                assert!(module.func(pair.ir_func_id).arity == 1);
            }
            other => panic!("expected autogenerated __defer__, got {other:?}"),
        }
    }
}
