//! Function-head generation, job list, and global declaration (spec.md §2
//! steps 2-4, §5 "Job list"). Grounded on `IRGEN/ir_gen.c`'s two-pass
//! structure: first every global and function *signature* is resolved and
//! registered so forward references type-check, then bodies are lowered
//! one job at a time, the list growing as polymorphic instantiation
//! (`crate::poly`) discovers new concrete functions to generate.
//!
//! Function arguments have no dedicated `Opcode`: the first `arity`
//! [`latticec_hir::IrBuilder::build_alloc`] calls in a body are its
//! parameter slots, by position, matching the order [`crate::ast::AstArg`]
//! declares them — the same convention the teacher's own backend expects
//! of its first N allocas.

use latticec_hir::{FuncId, FuncTraits, GenResult, IrFunc, IrModule, IrValueData, ValueId};
use latticec_session::DiagnosticsHandler;
use latticec_symbol::Symbol;

use crate::ast::{Ast, AstExpr, AstFunc, AstFuncId, AstFuncTraits, AstType};
use crate::funcbuilder::FuncGen;
use crate::scope::VarTraits;
use crate::typemap::{TypeMap, TypeTable};

use GenResult::{AltFailure, Failure, Success};

/// Lowers a global initializer to a pool constant. Globals may only be
/// initialized by expressions foldable without emitting an instruction —
/// there is no basic block for a global initializer to live in — so this
/// is a small, literal-only sibling of [`crate::expr::lower_expr`] rather
/// than the full expression lowerer.
fn lower_const_expr(module: &mut IrModule, typemap: &TypeMap, expr: &AstExpr, expected: latticec_hir::TypeId) -> Result<ValueId, String> {
    fn bytes_literal(module: &mut IrModule, ty: latticec_hir::TypeId, bytes: &[u8]) -> ValueId {
        module.values.alloc(ty, IrValueData::Literal(bytes.to_vec()))
    }

    match expr {
        AstExpr::Byte(v) => Ok(bytes_literal(module, expected, &v.to_le_bytes())),
        AstExpr::Ubyte(v) => Ok(bytes_literal(module, expected, &v.to_le_bytes())),
        AstExpr::Short(v) => Ok(bytes_literal(module, expected, &v.to_le_bytes())),
        AstExpr::Ushort(v) => Ok(bytes_literal(module, expected, &v.to_le_bytes())),
        AstExpr::Int(v) => Ok(bytes_literal(module, expected, &v.to_le_bytes())),
        AstExpr::Uint(v) => Ok(bytes_literal(module, expected, &v.to_le_bytes())),
        AstExpr::Long(v) => Ok(bytes_literal(module, expected, &v.to_le_bytes())),
        AstExpr::Ulong(v) => Ok(bytes_literal(module, expected, &v.to_le_bytes())),
        AstExpr::Float(v) => Ok(bytes_literal(module, expected, &v.to_le_bytes())),
        AstExpr::Double(v) => Ok(bytes_literal(module, expected, &v.to_le_bytes())),
        AstExpr::Bool(v) => Ok(bytes_literal(module, expected, &[*v as u8])),
        AstExpr::Null => Ok(module.values.alloc(expected, IrValueData::NullPtr)),
        AstExpr::CStr(s) => {
            let mut bytes = s.as_bytes().to_vec();
            bytes.push(0);
            let size = bytes.len() as u64;
            Ok(module.values.alloc(expected, IrValueData::CStrOfLen { bytes, size }))
        }
        AstExpr::StaticArray { elem_ty, values } => {
            let elem = typemap.resolve_type(elem_ty, module)?;
            let mut out = Vec::with_capacity(values.len());
            for v in values {
                out.push(lower_const_expr(module, typemap, v, elem)?);
            }
            Ok(module.values.alloc(expected, IrValueData::ArrayLiteral { values: out }))
        }
        AstExpr::StaticStruct { ty: _, values } => {
            let mut out = Vec::with_capacity(values.len());
            for v in values {
                out.push(lower_const_expr(module, typemap, v, expected)?);
            }
            Ok(module.values.alloc(expected, IrValueData::StructLiteral { values: out }))
        }
        other => Err(format!("global initializer is not a constant expression: {other:?}")),
    }
}

/// Resolves every [`crate::ast::AstGlobal`]'s type and (if present) its
/// constant initializer, pushing a [`latticec_hir::GlobalVar`] per entry
/// (spec.md §2 step 2 "Declare globals").
pub fn declare_globals(module: &mut IrModule, ast: &Ast, typemap: &TypeMap) -> Result<(), String> {
    for global in &ast.globals {
        let ty = typemap.resolve_type(&global.ty, module)?;
        let init = match &global.initial {
            Some(expr) => Some(lower_const_expr(module, typemap, expr, ty)?),
            None => None,
        };
        module.globals.push(latticec_hir::GlobalVar {
            name: global.name,
            ty,
            init,
            is_external: global.is_external,
            is_thread_local: global.is_thread_local,
        });
    }
    Ok(())
}

/// Generates a function-head skeleton: resolves `args`/`return_type`,
/// allocates an empty [`IrFunc`] body and registers it under its name (or
/// as a method), pushing a [`latticec_hir::Job`] to lower later (spec.md
/// §2 step 3 "Generate function skeletons, job list, mappings"). Skips
/// polymorphic templates — those only produce concrete `IrFunc`s when
/// [`crate::poly::instantiate_poly_func`] instantiates them.
fn skeleton_for(module: &mut IrModule, typemap: &TypeMap, ast_func_id: AstFuncId, func: &AstFunc) -> Result<FuncId, String> {
    let mut arg_types = Vec::with_capacity(func.args.len());
    for arg in &func.args {
        arg_types.push(typemap.resolve_type(&arg.ty, module)?);
    }
    let return_type = typemap.resolve_type(&func.return_type, module)?;
    let traits = FuncGen::ast_traits_to_func_traits(func.traits);
    let ir_func = IrFunc {
        name: func.name,
        traits,
        return_type,
        arity: arg_types.len(),
        arg_types,
        basicblocks: vec![Vec::new()],
        variable_count: 0,
        export_as: func.export_as,
        maybe_filename: None,
        maybe_definition_string: None,
        maybe_line: None,
        maybe_column: None,
    };
    let ir_func_id = module.push_func(ir_func);
    module.job_list.push(latticec_hir::Job { ast_func_id: ast_func_id.0, ir_func_id });
    if func.traits.contains(AstFuncTraits::MAIN) {
        module.common.has_main = true;
        module.common.ast_main_id = Some(ast_func_id.0);
        module.common.ir_main_id = Some(ir_func_id);
    }
    Ok(ir_func_id)
}

/// Walks every declared, non-polymorphic function, emitting its skeleton
/// and registering it in `func_mappings`/`methods`, then sorts the tables
/// once the bulk emission is done (spec.md §5: "function skeletons are
/// emitted in source order ... sorted immediately after bulk emission").
pub fn generate_function_skeletons(module: &mut IrModule, ast: &Ast, typemap: &TypeMap) -> Result<(), String> {
    for (idx, func) in ast.funcs.iter().enumerate() {
        if func.is_polymorphic() {
            continue;
        }
        let ast_func_id = AstFuncId(idx as u32);
        let ir_func_id = skeleton_for(module, typemap, ast_func_id, func)?;
        let pair = latticec_hir::FuncPair { ast_func_id: ast_func_id.0, ir_func_id };
        match func.method_of {
            Some(type_name) => module.methods.push(latticec_hir::MethodMapping { type_name, method_name: func.name, pair }),
            None => module.func_mappings.push(latticec_hir::FuncMapping { name: func.name, pair }),
        }
    }
    module.sort_mappings();
    Ok(())
}

/// Lowers one job's body: declares each argument as a first-N local
/// (undef, since its value is already live on entry), lowers the
/// statement list, and synthesizes a trailing `return` if the body fell
/// through without one — `main` synthesizes `0` rather than a bare `ret`
/// (spec.md §4.7 "Return ... lowers value (or synthesizes `0` for `main
/// void`)").
fn lower_job_body(
    module: &mut IrModule,
    ast: &mut Ast,
    typemap: &mut TypeMap,
    type_table: &mut TypeTable,
    diagnostics: &DiagnosticsHandler,
    job: latticec_hir::Job,
    filename: Symbol,
) -> Result<(), ()> {
    let func = ast.func(AstFuncId(job.ast_func_id)).clone();
    let mut fg = FuncGen::new(module, ast, typemap, type_table, diagnostics, filename);

    for arg in &func.args {
        if let Err(e) = fg.declare_var(arg.name, arg.ty.clone(), VarTraits::empty(), true) {
            fg.error(func.span, e);
            return Err(());
        }
    }

    let result = crate::stmt::lower_block(&mut fg, &func.statements);
    let terminated = match result {
        Success(terminated) => terminated,
        Failure | AltFailure => return Err(()),
    };

    if !terminated {
        let ret_value = if func.traits.contains(AstFuncTraits::MAIN) {
            let ret_ty = fg.builder.module.func(job.ir_func_id).return_type;
            match fg.builder.module.types.get(ret_ty) {
                latticec_hir::IrType::Void => None,
                _ => Some(fg.builder.build_literal(ret_ty, 0u64.to_le_bytes().to_vec())),
            }
        } else {
            None
        };
        fg.build_return_deferring(ret_value);
    }

    let (basicblocks, variable_count) = fg.finish();
    let ir_func = module.func_mut(job.ir_func_id);
    ir_func.basicblocks = basicblocks;
    ir_func.variable_count = variable_count;
    Ok(())
}

/// Drains `module.job_list` LIFO (spec.md §5 "The job list drains LIFO"),
/// lowering each job's body. Jobs pushed mid-drain by
/// [`crate::poly::instantiate_poly_func`] are picked up in the same loop,
/// so polymorphic instantiation converges without a second pass.
pub fn drain_jobs(module: &mut IrModule, ast: &mut Ast, typemap: &mut TypeMap, type_table: &mut TypeTable, diagnostics: &DiagnosticsHandler, filename: Symbol) -> Result<(), ()> {
    let mut ok = true;
    while let Some(job) = module.job_list.pop() {
        if lower_job_body(module, ast, typemap, type_table, diagnostics, job, filename).is_err() {
            ok = false;
        }
    }
    if ok {
        Ok(())
    } else {
        Err(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AstArg, AstFuncTraits, AstStmt, AstType};
    use latticec_session::{DiagnosticsHandler, SourceSpan};

    fn span() -> SourceSpan {
        SourceSpan { file: Symbol::intern("test.adept"), line: 1, column: 1 }
    }

    fn seeded_module_and_types() -> (IrModule, TypeMap) {
        let mut module = IrModule::new();
        let mut typemap = TypeMap::new();
        typemap.seed_primitives(&mut module);
        (module, typemap)
    }

    #[test]
    fn skeleton_registers_mapping_and_job() {
        let (mut module, typemap) = seeded_module_and_types();
        let mut ast = Ast::default();
        ast.push_func(AstFunc {
            name: Symbol::intern("add"),
            args: vec![
                AstArg { name: Symbol::intern("a"), ty: AstType::base(Symbol::intern("int")), default: None },
                AstArg { name: Symbol::intern("b"), ty: AstType::base(Symbol::intern("int")), default: None },
            ],
            return_type: AstType::base(Symbol::intern("int")),
            traits: AstFuncTraits::empty(),
            type_params: Vec::new(),
            statements: vec![AstStmt::Return(None, span())],
            export_as: None,
            method_of: None,
            span: span(),
        });
        generate_function_skeletons(&mut module, &ast, &typemap).unwrap();
        assert_eq!(module.job_list.len(), 1);
        assert_eq!(module.find_funcs_by_name(Symbol::intern("add")).len(), 1);
        let func = module.func(module.find_funcs_by_name(Symbol::intern("add"))[0].pair.ir_func_id);
        assert_eq!(func.arity, 2);
    }

    #[test]
    fn main_void_falling_through_synthesizes_zero_return() {
        let (mut module, mut typemap) = seeded_module_and_types();
        let mut ast = Ast::default();
        ast.push_func(AstFunc {
            name: Symbol::intern("main"),
            args: Vec::new(),
            return_type: AstType::base(Symbol::intern("void")),
            traits: AstFuncTraits::MAIN,
            type_params: Vec::new(),
            statements: Vec::new(),
            export_as: None,
            method_of: None,
            span: span(),
        });
        generate_function_skeletons(&mut module, &ast, &typemap).unwrap();
        let diagnostics = DiagnosticsHandler::new();
        let mut type_table = TypeTable::new();
        drain_jobs(&mut module, &mut ast, &mut typemap, &mut type_table, &diagnostics, Symbol::intern("test.adept")).unwrap();
        assert!(module.common.has_main);
        let ir_main = module.func(module.common.ir_main_id.unwrap());
        assert_eq!(ir_main.basicblocks.len(), 1);
        assert_eq!(ir_main.basicblocks[0].len(), 1);
    }

    #[test]
    fn global_with_int_initializer_lowers_a_literal() {
        let (mut module, typemap) = seeded_module_and_types();
        let mut ast = Ast::default();
        ast.globals.push(crate::ast::AstGlobal {
            name: Symbol::intern("counter"),
            ty: AstType::base(Symbol::intern("int")),
            initial: Some(AstExpr::Int(7)),
            is_external: false,
            is_thread_local: false,
            span: span(),
        });
        declare_globals(&mut module, &ast, &typemap).unwrap();
        assert_eq!(module.globals.len(), 1);
        assert!(module.globals[0].init.is_some());
    }
}
