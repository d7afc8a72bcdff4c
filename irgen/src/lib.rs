//! AST-to-IR middle-end entry point (spec.md §1-§2).
//!
//! [`ir_gen`] drives the whole pipeline in the order spec.md §2 lays out:
//! seed primitives, declare type skeletons and fill in composite bodies,
//! declare globals, generate function skeletons (registering the job
//! list and name/method mappings), drain the job list (lowering bodies,
//! growing the job list as polymorphic instantiation discovers new
//! concrete functions), then build and relocate the RTTI table. Each step
//! only runs if the previous one reported no errors, mirroring
//! `IRGEN/ir_gen.c`'s `ir_gen`'s early-exit-on-error structure.

pub mod ast;
pub mod call;
pub mod conform;
pub mod expr;
pub mod funcbuilder;
pub mod jobs;
pub mod poly;
pub mod rtti_build;
pub mod scope;
pub mod sfcache;
pub mod stmt;
pub mod typemap;

use latticec_hir::IrModule;
use latticec_session::{DiagnosticsHandler, Options};
use latticec_symbol::Symbol;

use ast::Object;
use typemap::{TypeMap, TypeTable};

/// The finished middle-end output: the [`IrModule`] ready for the
/// backend, plus the diagnostics handler any caller should drain for
/// warnings/errors accumulated along the way.
pub struct IrGenResult {
    pub module: IrModule,
}

/// Runs the full middle-end pipeline over `object`, reporting diagnostics
/// through `diagnostics` and returning `Err(())` if any stage failed
/// (spec.md §2, §7 "Error handling ... each stage records instead of
/// aborting to report as many as possible").
pub fn ir_gen(object: &Object, options: &Options, diagnostics: &DiagnosticsHandler) -> Result<IrGenResult, ()> {
    let mut ast = object.ast.clone();
    let filename = object.filename;

    let mut module = IrModule::new();
    let mut typemap = TypeMap::new();
    let mut type_table = TypeTable::new();

    typemap.seed_primitives(&mut module);
    typemap.declare_skeletons(&ast, diagnostics)?;
    typemap.resolve_composite_bodies(&ast, &mut module).map_err(|_| ())?;

    jobs::declare_globals(&mut module, &ast, &typemap).map_err(|e| {
        diagnostics.emit(latticec_session::Diagnostic::error(e));
    })?;

    jobs::generate_function_skeletons(&mut module, &ast, &typemap).map_err(|e| {
        diagnostics.emit(latticec_session::Diagnostic::error(e));
    })?;

    jobs::drain_jobs(&mut module, &mut ast, &mut typemap, &mut type_table, diagnostics, filename)?;

    let entries = rtti_build::build_rtti_table(&module, &mut type_table, &ast);
    rtti_build::resolve_rtti_relocations(&mut module, &type_table).map_err(|missing| {
        for name in missing {
            diagnostics.emit(latticec_session::Diagnostic::error(format!("typeinfo requested for unregistered type '{name}'")));
        }
    })?;

    let mut rtti_builder = latticec_hir::IrBuilder::new(&mut module);
    rtti_build::emit_rtti_globals(&mut rtti_builder, &entries, options.rtti_enabled());

    if diagnostics.has_errors() {
        return Err(());
    }

    Ok(IrGenResult { module })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ast::{Ast, AstFunc, AstFuncTraits, AstStmt};
    use latticec_session::SourceSpan;

    fn span() -> SourceSpan {
        SourceSpan { file: Symbol::intern("test.adept"), line: 1, column: 1 }
    }

    #[test]
    fn empty_main_lowers_to_a_single_returning_function() {
        let mut ast = Ast::default();
        ast.push_func(AstFunc {
            name: Symbol::intern("main"),
            args: Vec::new(),
            return_type: ast::AstType::base(Symbol::intern("int")),
            traits: AstFuncTraits::MAIN,
            type_params: Vec::new(),
            statements: vec![AstStmt::Return(Some(ast::AstExpr::Int(0)), span())],
            export_as: None,
            method_of: None,
            span: span(),
        });
        let object = Object { ast, filename: Symbol::intern("test.adept") };
        let options = Options::default();
        let diagnostics = DiagnosticsHandler::new();
        let result = ir_gen(&object, &options, &diagnostics).expect("pipeline should succeed");
        assert!(result.module.common.has_main);
        assert_eq!(result.module.funcs.len(), 1);
    }
}
