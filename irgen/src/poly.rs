//! Polymorphic instantiation (spec.md §4.8): on-demand specialization of
//! polymorphic composites and functions. Grounded on `IRGEN/ir_gen_type.c`'s
//! `resolve_type_polymorphics` and `IRGEN/ir_gen_func.c`'s
//! `instantiate_poly_func`.
//!
//! A polymorphic composite/function is never lowered directly; instead its
//! template is cloned with every `$T`/`$#N` reference substituted per a
//! [`PolyCatalog`] solved at the call/generic-base site, and the clone is
//! registered under a mangled name so repeat instantiations with the same
//! arguments are memoized rather than redone.

use hashbrown::HashMap;
use latticec_hir::{FuncTraits, IrFunc, IrModule, TypeId};
use latticec_session::SourceSpan;
use latticec_symbol::Symbol;

use crate::ast::{
    Ast, AstArg, AstExpr, AstFunc, AstFuncId, AstFuncTraits, AstPolymorphicComposite, AstStmt, AstType, AstTypeElem,
    AstTypeLayer, Bone,
};
use crate::typemap::{lower_bone, TypeMap};

/// The solved bindings for one instantiation site: `$T`-style type
/// variables to concrete [`AstType`]s, `$#N`-style count variables to
/// concrete lengths.
#[derive(Debug, Clone, Default)]
pub struct PolyCatalog {
    pub types: HashMap<Symbol, AstType>,
    pub counts: HashMap<Symbol, u64>,
}

impl PolyCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from a template's ordered type parameters and the
    /// concrete arguments supplied at a `GenericBase` / explicit
    /// instantiation site. Count parameters are not populated here —
    /// `<Ts…> Name` generic-base references in this AST surface carry only
    /// type arguments (spec.md §4.2); a composite with non-empty
    /// `count_params` must be instantiated explicitly via
    /// [`instantiate_composite_with_counts`].
    pub fn from_type_args(type_params: &[Symbol], args: &[AstType]) -> Self {
        let mut catalog = Self::new();
        for (param, arg) in type_params.iter().zip(args.iter()) {
            catalog.types.insert(*param, arg.clone());
        }
        catalog
    }
}

/// Substitutes every `$T`/`$#N` reference in `ty` per `catalog`, recursing
/// into function and generic-base elements (spec.md §4.8
/// `resolve_type_polymorphics`: "Walks an AST type cloning elements;
/// substitutes `$T` bindings inline (may expand to multiple elements);
/// substitutes `$#N` bindings into `FixedArray{length}`").
pub fn resolve_type_polymorphics(ty: &AstType, catalog: &PolyCatalog) -> AstType {
    let mut layers = Vec::with_capacity(ty.layers.len());
    for layer in &ty.layers {
        match layer {
            AstTypeLayer::PolyCountArray(name) => match catalog.counts.get(name) {
                Some(&length) => layers.push(AstTypeLayer::FixedArray(length)),
                None => layers.push(*layer),
            },
            other => layers.push(*other),
        }
    }

    match &ty.elem {
        AstTypeElem::PolyType(name) => match catalog.types.get(name) {
            // `$T` substitution splices the bound type's own layers and
            // element in under whatever layers were already written around
            // the placeholder (e.g. `*$T` where `T = Pair` stays `*Pair`;
            // `*$T` where `T = *Pair` becomes `**Pair`).
            Some(bound) => {
                layers.extend(bound.layers.iter().copied());
                AstType { layers, elem: bound.elem.clone() }
            }
            None => AstType { layers, elem: ty.elem.clone() },
        },
        AstTypeElem::PolyCount(_) => AstType { layers, elem: ty.elem.clone() },
        AstTypeElem::Base(_) => AstType { layers, elem: ty.elem.clone() },
        AstTypeElem::Func { args, return_type, traits } => {
            let args = args.iter().map(|a| resolve_type_polymorphics(a, catalog)).collect();
            let return_type = Box::new(resolve_type_polymorphics(return_type, catalog));
            AstType { layers, elem: AstTypeElem::Func { args, return_type, traits: *traits } }
        }
        AstTypeElem::GenericBase { name, args } => {
            let args = args.iter().map(|a| resolve_type_polymorphics(a, catalog)).collect();
            AstType { layers, elem: AstTypeElem::GenericBase { name: *name, args } }
        }
        AstTypeElem::Anonymous(bone) => {
            AstType { layers, elem: AstTypeElem::Anonymous(resolve_bone_polymorphics(bone, catalog)) }
        }
    }
}

fn resolve_bone_polymorphics(bone: &Bone, catalog: &PolyCatalog) -> Bone {
    match bone {
        Bone::Type(ty) => Bone::Type(resolve_type_polymorphics(ty, catalog)),
        Bone::Struct { children, packed } => Bone::Struct {
            children: children.iter().map(|(n, b)| (*n, resolve_bone_polymorphics(b, catalog))).collect(),
            packed: *packed,
        },
        Bone::Union { children, packed } => Bone::Union {
            children: children.iter().map(|(n, b)| (*n, resolve_bone_polymorphics(b, catalog))).collect(),
            packed: *packed,
        },
    }
}

/// Walks every `AstExpr` variant that carries an [`AstType`], substituting
/// polymorphs in place (spec.md §4.8 "Statement/expression-level
/// resolution walks every expression variant that contains types").
fn substitute_expr_types(expr: &mut AstExpr, catalog: &PolyCatalog) {
    match expr {
        AstExpr::BinOp { lhs, rhs, .. } => {
            substitute_expr_types(lhs, catalog);
            substitute_expr_types(rhs, catalog);
        }
        AstExpr::And(a, b) | AstExpr::Or(a, b) => {
            substitute_expr_types(a, catalog);
            substitute_expr_types(b, catalog);
        }
        AstExpr::Not(e)
        | AstExpr::PreIncrement(e)
        | AstExpr::PreDecrement(e)
        | AstExpr::PostIncrement(e)
        | AstExpr::PostDecrement(e)
        | AstExpr::Toggle(e)
        | AstExpr::SizeofValue(e) => substitute_expr_types(e, catalog),
        AstExpr::Member { subject, .. } => substitute_expr_types(subject, catalog),
        AstExpr::ArrayAccess { subject, index, .. } | AstExpr::At { subject, index, .. } => {
            substitute_expr_types(subject, catalog);
            substitute_expr_types(index, catalog);
        }
        AstExpr::Call { args, .. } => args.iter_mut().for_each(|a| substitute_expr_types(a, catalog)),
        AstExpr::MethodCall { subject, args, .. } => {
            substitute_expr_types(subject, catalog);
            args.iter_mut().for_each(|a| substitute_expr_types(a, catalog));
        }
        AstExpr::Cast { ty, value } => {
            *ty = resolve_type_polymorphics(ty, catalog);
            substitute_expr_types(value, catalog);
        }
        AstExpr::New { ty, amount, inputs, .. } => {
            *ty = resolve_type_polymorphics(ty, catalog);
            if let Some(amount) = amount {
                substitute_expr_types(amount, catalog);
            }
            inputs.iter_mut().for_each(|i| substitute_expr_types(i, catalog));
        }
        AstExpr::Ternary { cond, then_expr, else_expr } => {
            substitute_expr_types(cond, catalog);
            substitute_expr_types(then_expr, catalog);
            substitute_expr_types(else_expr, catalog);
        }
        AstExpr::Sizeof(ty) | AstExpr::Alignof(ty) | AstExpr::Typeinfo(ty) | AstExpr::Typenameof(ty) => {
            *ty = resolve_type_polymorphics(ty, catalog);
        }
        AstExpr::InlineDeclare { ty, initial, .. } => {
            *ty = resolve_type_polymorphics(ty, catalog);
            if let Some(initial) = initial {
                substitute_expr_types(initial, catalog);
            }
        }
        AstExpr::VaArg { va_list, ty } => {
            substitute_expr_types(va_list, catalog);
            *ty = resolve_type_polymorphics(ty, catalog);
        }
        AstExpr::InitializerList { ty, values } => {
            *ty = resolve_type_polymorphics(ty, catalog);
            values.iter_mut().for_each(|v| substitute_expr_types(v, catalog));
        }
        AstExpr::StaticArray { elem_ty, values } => {
            *elem_ty = resolve_type_polymorphics(elem_ty, catalog);
            values.iter_mut().for_each(|v| substitute_expr_types(v, catalog));
        }
        AstExpr::StaticStruct { ty, values } => {
            *ty = resolve_type_polymorphics(ty, catalog);
            values.iter_mut().for_each(|v| substitute_expr_types(v, catalog));
        }
        AstExpr::Byte(_)
        | AstExpr::Ubyte(_)
        | AstExpr::Short(_)
        | AstExpr::Ushort(_)
        | AstExpr::Int(_)
        | AstExpr::Uint(_)
        | AstExpr::Long(_)
        | AstExpr::Ulong(_)
        | AstExpr::Float(_)
        | AstExpr::Double(_)
        | AstExpr::Bool(_)
        | AstExpr::Null
        | AstExpr::CStr(_)
        | AstExpr::Str(_)
        | AstExpr::Variable(_)
        | AstExpr::NewCString(_)
        | AstExpr::Embed(_)
        | AstExpr::FuncAddr(_) => {}
    }
}

fn substitute_stmts_types(stmts: &mut [AstStmt], catalog: &PolyCatalog) {
    for stmt in stmts {
        substitute_stmt_types(stmt, catalog);
    }
}

fn substitute_stmt_types(stmt: &mut AstStmt, catalog: &PolyCatalog) {
    match stmt {
        AstStmt::Return(value, _) => {
            if let Some(value) = value {
                substitute_expr_types(value, catalog);
            }
        }
        AstStmt::Declare { ty, initial, inputs, .. } => {
            *ty = resolve_type_polymorphics(ty, catalog);
            if let Some(initial) = initial {
                substitute_expr_types(initial, catalog);
            }
            inputs.iter_mut().for_each(|i| substitute_expr_types(i, catalog));
        }
        AstStmt::Assign { dest, value, .. } => {
            substitute_expr_types(dest, catalog);
            substitute_expr_types(value, catalog);
        }
        AstStmt::CompoundAssign { dest, value, .. } => {
            substitute_expr_types(dest, catalog);
            substitute_expr_types(value, catalog);
        }
        AstStmt::If { cond, body } | AstStmt::Unless { cond, body } => {
            substitute_expr_types(cond, catalog);
            substitute_stmts_types(body, catalog);
        }
        AstStmt::IfElse { cond, then_body, else_body } | AstStmt::UnlessElse { cond, then_body, else_body } => {
            substitute_expr_types(cond, catalog);
            substitute_stmts_types(then_body, catalog);
            substitute_stmts_types(else_body, catalog);
        }
        AstStmt::While { cond, body, .. }
        | AstStmt::Until { cond, body, .. }
        | AstStmt::WhileContinue { cond, body, .. }
        | AstStmt::UntilBreak { cond, body, .. } => {
            substitute_expr_types(cond, catalog);
            substitute_stmts_types(body, catalog);
        }
        AstStmt::EachIn { subject, body, .. } => {
            substitute_expr_types(subject, catalog);
            substitute_stmts_types(body, catalog);
        }
        AstStmt::Repeat { limit, body, .. } => {
            substitute_expr_types(limit, catalog);
            substitute_stmts_types(body, catalog);
        }
        AstStmt::For { before, cond, after, body, .. } => {
            substitute_stmts_types(before, catalog);
            substitute_expr_types(cond, catalog);
            substitute_stmts_types(after, catalog);
            substitute_stmts_types(body, catalog);
        }
        AstStmt::Switch { scrutinee, cases, default, .. } => {
            substitute_expr_types(scrutinee, catalog);
            for (value, body) in cases {
                substitute_expr_types(value, catalog);
                substitute_stmts_types(body, catalog);
            }
            if let Some(default) = default {
                substitute_stmts_types(default, catalog);
            }
        }
        AstStmt::Delete(e, _) | AstStmt::VaStart(e) | AstStmt::VaEnd(e) | AstStmt::Expr(e) => {
            substitute_expr_types(e, catalog);
        }
        AstStmt::VaCopy { dest, src } => {
            substitute_expr_types(dest, catalog);
            substitute_expr_types(src, catalog);
        }
        AstStmt::ConditionlessBlock(body) => substitute_stmts_types(body, catalog),
        AstStmt::Break(_) | AstStmt::Continue(_) | AstStmt::Fallthrough | AstStmt::Asm { .. } => {}
    }
}

/// Produces a deterministic, collision-free name for a monomorphization —
/// `Pair<String>`, `Pair<*int>` — used both as the `TypeMap`/AST-composite
/// key and (indirectly, via the backend's own mangling of `IrFunc::name`)
/// as a disambiguator for generated functions.
pub fn mangle_generic_name(base: Symbol, type_args: &[AstType]) -> Symbol {
    let mut out = String::from(base.as_str().as_str());
    out.push('<');
    for (i, arg) in type_args.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_type_name(&mut out, arg);
    }
    out.push('>');
    Symbol::intern(&out)
}

fn write_type_name(out: &mut String, ty: &AstType) {
    for layer in &ty.layers {
        match layer {
            AstTypeLayer::Ptr => out.push('*'),
            AstTypeLayer::FixedArray(length) => out.push_str(&format!("[{length}]")),
            AstTypeLayer::PolyCountArray(name) => out.push_str(&format!("[$#{name}]")),
        }
    }
    match &ty.elem {
        AstTypeElem::Base(name) => out.push_str(name.as_str().as_str()),
        AstTypeElem::GenericBase { name, args } => {
            out.push_str(name.as_str().as_str());
            out.push('<');
            for (i, a) in args.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_type_name(out, a);
            }
            out.push('>');
        }
        AstTypeElem::PolyType(name) => out.push_str(&format!("${name}")),
        AstTypeElem::PolyCount(name) => out.push_str(&format!("$#{name}")),
        AstTypeElem::Func { .. } => out.push_str("func"),
        AstTypeElem::Anonymous(_) => out.push_str("anon"),
    }
}

/// Finds (or builds, and memoizes) the concrete [`TypeId`] for
/// `template_name<type_args…>` (spec.md §4.2 "Generic base `<Ts…> Name`").
/// Composites whose template also declares `count_params` cannot be
/// instantiated through this entry point; use
/// [`instantiate_composite_with_counts`].
pub fn instantiate_composite(
    ast: &mut Ast,
    typemap: &mut TypeMap,
    module: &mut IrModule,
    template_name: Symbol,
    type_args: &[AstType],
) -> Result<TypeId, String> {
    instantiate_composite_with_counts(ast, typemap, module, template_name, type_args, &[])
}

/// Full form of [`instantiate_composite`] accepting `$#N` count bindings
/// alongside type arguments, in template-declaration order.
pub fn instantiate_composite_with_counts(
    ast: &mut Ast,
    typemap: &mut TypeMap,
    module: &mut IrModule,
    template_name: Symbol,
    type_args: &[AstType],
    count_args: &[u64],
) -> Result<TypeId, String> {
    let Some(template) = ast.polymorphic_composites.iter().find(|c| c.name == template_name).cloned() else {
        return Err(format!("no polymorphic composite named '{template_name}'"));
    };
    if type_args.len() != template.type_params.len() {
        return Err(format!(
            "'{template_name}' takes {} type argument(s), {} given",
            template.type_params.len(),
            type_args.len()
        ));
    }
    if count_args.len() != template.count_params.len() {
        return Err(format!(
            "'{template_name}' takes {} count argument(s), {} given",
            template.count_params.len(),
            count_args.len()
        ));
    }

    let mangled = mangle_generic_name(template_name, type_args);
    if let Some(existing) = typemap.find(mangled) {
        return Ok(existing);
    }

    let mut catalog = PolyCatalog::from_type_args(&template.type_params, type_args);
    for (param, &length) in template.count_params.iter().zip(count_args.iter()) {
        catalog.counts.insert(*param, length);
    }

    let monomorphized_layout = resolve_bone_polymorphics(&template.layout, &catalog);
    let ty = lower_bone(&monomorphized_layout, typemap, module).map_err(|_| {
        format!("failed to lower monomorphized layout for '{mangled}'")
    })?;
    typemap.declare_instantiated(mangled, ty);

    ast.composites.push(crate::ast::AstComposite {
        name: mangled,
        layout: monomorphized_layout,
        is_alias: false,
        span: template.span,
    });

    instantiate_poly_methods(ast, typemap, module, template_name, mangled, &catalog);

    Ok(ty)
}

/// Clones every method declared with `method_of == Some(template_name)`,
/// substitutes polymorphs per `catalog`, and registers each under the
/// mangled composite name, appending an [`latticec_hir::module::Job`]-
/// ready skeleton the same way [`instantiate_poly_func`] does for a
/// polymorphic free function (spec.md §4.8 "Autogen… follows the same
/// cache-then-generate pattern; the generated AST function is inserted and
/// its body is produced during its body-generation job").
fn instantiate_poly_methods(
    ast: &mut Ast,
    typemap: &mut TypeMap,
    module: &mut IrModule,
    template_name: Symbol,
    mangled_type: Symbol,
    catalog: &PolyCatalog,
) {
    let template_ids: Vec<AstFuncId> = ast
        .funcs
        .iter()
        .enumerate()
        .filter(|(_, f)| f.method_of == Some(template_name))
        .map(|(i, _)| AstFuncId(i as u32))
        .collect();

    for template_id in template_ids {
        match instantiate_poly_func(ast, typemap, module, template_id, catalog, Some(mangled_type)) {
            Ok(pair) => {
                let method_name = ast.func(AstFuncId(pair.ast_func_id)).name;
                module.methods.push(latticec_hir::MethodMapping {
                    type_name: mangled_type,
                    method_name,
                    pair,
                });
                module.sort_mappings();
            }
            Err(_) => {
                // Body-level polymorph resolution failures surface as a
                // real diagnostic once body lowering runs the job; a
                // skeleton-stage failure here just means this method
                // isn't offered on the monomorphization.
            }
        }
    }
}

/// Clones `template_id`'s AST function, substitutes polymorphs per
/// `catalog` in its argument types, return type, and body, appends the
/// clone to `ast`, builds a concrete IR skeleton, and enqueues a body-
/// generation job (spec.md §4.8 `instantiate_poly_func`). `method_of`
/// overrides the clone's receiver type when instantiating a polymorphic
/// composite's method; `None` for a plain polymorphic free function.
pub fn instantiate_poly_func(
    ast: &mut Ast,
    typemap: &mut TypeMap,
    module: &mut IrModule,
    template_id: AstFuncId,
    catalog: &PolyCatalog,
    method_of: Option<Symbol>,
) -> Result<latticec_hir::FuncPair, String> {
    let template = ast.func(template_id).clone();

    let mangled_suffix: Vec<AstType> = template.type_params.iter().filter_map(|p| catalog.types.get(p).cloned()).collect();
    let mangled_name = if mangled_suffix.is_empty() { template.name } else { mangle_generic_name(template.name, &mangled_suffix) };

    let new_args: Vec<AstArg> = template
        .args
        .iter()
        .map(|a| AstArg {
            name: a.name,
            ty: resolve_type_polymorphics(&a.ty, catalog),
            default: a.default.clone().map(|mut e| {
                substitute_expr_types(&mut e, catalog);
                e
            }),
        })
        .collect();
    let new_return = resolve_type_polymorphics(&template.return_type, catalog);
    let mut new_statements = template.statements.clone();
    substitute_stmts_types(&mut new_statements, catalog);

    let ast_func_id = ast.push_func(AstFunc {
        name: mangled_name,
        args: new_args.clone(),
        return_type: new_return.clone(),
        traits: template.traits.difference(AstFuncTraits::POLYMORPHIC),
        type_params: Vec::new(),
        statements: new_statements,
        export_as: None,
        method_of: method_of.or(template.method_of),
        span: template.span,
    });

    let mut arg_types = Vec::with_capacity(new_args.len());
    for arg in &new_args {
        arg_types.push(typemap.resolve_type(&arg.ty, module)?);
    }
    let return_type = typemap.resolve_type(&new_return, module)?;

    let ir_func_id = module.push_func(IrFunc {
        name: mangled_name,
        traits: ast_traits_to_ir(template.traits),
        return_type,
        arity: arg_types.len(),
        arg_types,
        basicblocks: vec![vec![]],
        variable_count: 0,
        export_as: None,
        maybe_filename: Some(template.span.file),
        maybe_definition_string: None,
        maybe_line: Some(template.span.line),
        maybe_column: Some(template.span.column),
    });

    module.job_list.push(latticec_hir::Job { ast_func_id: ast_func_id.0, ir_func_id });
    module.insert_func_mapping_sorted(latticec_hir::FuncMapping {
        name: mangled_name,
        pair: latticec_hir::FuncPair { ast_func_id: ast_func_id.0, ir_func_id },
    });

    Ok(latticec_hir::FuncPair { ast_func_id: ast_func_id.0, ir_func_id })
}

fn ast_traits_to_ir(traits: AstFuncTraits) -> FuncTraits {
    let mut out = FuncTraits::empty();
    if traits.contains(AstFuncTraits::FOREIGN) {
        out |= FuncTraits::FOREIGN;
    }
    if traits.contains(AstFuncTraits::VARARG) {
        out |= FuncTraits::VARARG;
    }
    if traits.contains(AstFuncTraits::MAIN) {
        out |= FuncTraits::MAIN;
    }
    if traits.contains(AstFuncTraits::STDCALL) {
        out |= FuncTraits::STDCALL;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AstComposite, Bone};
    use latticec_hir::IrType;

    fn make_pair_template() -> (Ast, TypeMap, IrModule) {
        let mut module = IrModule::new();
        let mut typemap = TypeMap::new();
        typemap.seed_primitives(&mut module);

        let mut ast = Ast::default();
        ast.composites.push(AstComposite {
            name: Symbol::intern("String"),
            layout: Bone::Struct {
                children: vec![
                    (Symbol::intern("bytes"), Bone::Type(AstType::base(Symbol::intern("ubyte")).pointer_to())),
                    (Symbol::intern("length"), Bone::Type(AstType::base(Symbol::intern("usize")))),
                    (Symbol::intern("capacity"), Bone::Type(AstType::base(Symbol::intern("usize")))),
                ],
                packed: false,
            },
            is_alias: false,
            span: SourceSpan::unknown(),
        });
        ast.polymorphic_composites.push(AstPolymorphicComposite {
            name: Symbol::intern("Pair"),
            type_params: vec![Symbol::intern("T")],
            count_params: Vec::new(),
            layout: Bone::Struct {
                children: vec![
                    (Symbol::intern("a"), Bone::Type(AstType { layers: Vec::new(), elem: AstTypeElem::PolyType(Symbol::intern("T")) })),
                    (Symbol::intern("b"), Bone::Type(AstType { layers: Vec::new(), elem: AstTypeElem::PolyType(Symbol::intern("T")) })),
                ],
                packed: false,
            },
            span: SourceSpan::unknown(),
        });

        let diagnostics = latticec_session::DiagnosticsHandler::new();
        typemap.declare_skeletons(&ast, &diagnostics).expect("no collisions");
        typemap.resolve_composite_bodies(&ast, &mut module).expect("resolves");
        (ast, typemap, module)
    }

    #[test]
    fn instantiating_pair_of_string_lowers_two_fields() {
        let (mut ast, mut typemap, mut module) = make_pair_template();
        let string_ty = AstType::base(Symbol::intern("String"));
        let ty = instantiate_composite(&mut ast, &mut typemap, &mut module, Symbol::intern("Pair"), &[string_ty])
            .expect("instantiates");
        match module.types.get(ty) {
            IrType::Structure { subtypes, .. } => assert_eq!(subtypes.len(), 2),
            other => panic!("expected a structure, got {other:?}"),
        }
    }

    #[test]
    fn instantiating_twice_memoizes_the_same_type() {
        let (mut ast, mut typemap, mut module) = make_pair_template();
        let string_ty = AstType::base(Symbol::intern("String"));
        let first = instantiate_composite(&mut ast, &mut typemap, &mut module, Symbol::intern("Pair"), &[string_ty.clone()])
            .expect("instantiates");
        let second = instantiate_composite(&mut ast, &mut typemap, &mut module, Symbol::intern("Pair"), &[string_ty])
            .expect("instantiates");
        assert_eq!(first, second);
        assert_eq!(ast.composites.iter().filter(|c| c.name.as_str() == "Pair<String>").count(), 1);
    }

    #[test]
    fn mangled_name_embeds_pointer_layer() {
        let name = mangle_generic_name(Symbol::intern("Box"), &[AstType::base(Symbol::intern("int")).pointer_to()]);
        assert_eq!(name.as_str().as_str(), "Box<*int>");
    }
}
