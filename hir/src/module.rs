//! The IR module (`IrModule`): the top-level container produced by the
//! middle-end and handed to the backend.

use hashbrown::HashMap;
use latticec_symbol::Symbol;

use crate::{
    func::{FuncId, IrFunc},
    tri::Tri,
    types::{TypeId, TypePool},
    value::{ValueId, ValuePool},
};

#[derive(Debug, Clone)]
pub struct GlobalVar {
    pub name: Symbol,
    pub ty: TypeId,
    pub init: Option<ValueId>,
    pub is_external: bool,
    pub is_thread_local: bool,
}

#[derive(Debug, Clone)]
pub struct AnonGlobal {
    pub id: u32,
    pub ty: TypeId,
    pub init: Option<ValueId>,
    pub is_const: bool,
}

#[derive(Debug, Clone)]
pub struct StaticVariable {
    pub id: u32,
    pub ty: TypeId,
    pub init: Option<ValueId>,
    pub name: Option<Symbol>,
}

/// `(AstFuncId, IrFuncId)`, the "Funcpair" of the glossary: together with a
/// pointer to the resolved AST function for trait inspection (kept by the
/// irgen crate, which owns the AST side of this pair).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuncPair {
    pub ast_func_id: u32,
    pub ir_func_id: FuncId,
}

/// An entry in the sorted-by-name function mapping table, used for
/// binary-search overload-set lookup by `find_func_conforming`.
#[derive(Debug, Clone)]
pub struct FuncMapping {
    pub name: Symbol,
    pub pair: FuncPair,
}

/// An entry in the sorted method mapping tables (`methods`/`poly_methods`),
/// keyed by `(receiver type name, method name)`.
#[derive(Debug, Clone)]
pub struct MethodMapping {
    pub type_name: Symbol,
    pub method_name: Symbol,
    pub pair: FuncPair,
}

/// A pending function body to lower, seeded with every declared function's
/// skeleton and appended to as polymorphic instantiation discovers new
/// concrete functions (spec.md §2 step 4, glossary "Job list").
#[derive(Debug, Clone, Copy)]
pub struct Job {
    pub ast_func_id: u32,
    pub ir_func_id: FuncId,
}

/// A deferred RTTI relocation: the value at `value` holds a placeholder
/// index that must be rewritten to `type_name`'s final position in the
/// sorted type table once relocation runs (spec.md §4.9).
#[derive(Debug, Clone, Copy)]
pub struct RttiRelocation {
    pub value: ValueId,
    pub type_name: Symbol,
}

/// Tri-state memoization of whether a type has a management method, and if
/// so, which concrete function implements it (spec.md §4.4 `sf_cache`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SfCacheEntry {
    pub defer: Tri<FuncPair>,
    pub pass: Tri<FuncPair>,
    pub assign: Tri<FuncPair>,
    pub access: Tri<FuncPair>,
}

/// Module-wide well-known types and flags, filled in as generation
/// proceeds (spec.md §3 `IrModule.common`).
#[derive(Debug, Clone, Default)]
pub struct ModuleCommon {
    pub ir_usize: Option<TypeId>,
    pub ir_ptr: Option<TypeId>,
    pub ir_bool: Option<TypeId>,
    pub ir_variadic_array: Option<TypeId>,
    pub ir_string_struct: Option<TypeId>,
    pub has_main: bool,
    pub ast_main_id: Option<u32>,
    pub ir_main_id: Option<FuncId>,
    pub rtti_array_index: Option<u32>,
}

pub struct IrModule {
    pub funcs: Vec<IrFunc>,
    pub globals: Vec<GlobalVar>,
    pub anon_globals: Vec<AnonGlobal>,
    pub static_variables: Vec<StaticVariable>,
    pub types: TypePool,
    pub values: ValuePool,
    pub func_mappings: Vec<FuncMapping>,
    pub methods: Vec<MethodMapping>,
    pub poly_methods: Vec<MethodMapping>,
    pub job_list: Vec<Job>,
    pub rtti_relocations: Vec<RttiRelocation>,
    pub common: ModuleCommon,
    pub sf_cache: HashMap<Symbol, SfCacheEntry>,
}

impl IrModule {
    pub fn new() -> Self {
        Self {
            funcs: Vec::new(),
            globals: Vec::new(),
            anon_globals: Vec::new(),
            static_variables: Vec::new(),
            types: TypePool::new(),
            values: ValuePool::new(),
            func_mappings: Vec::new(),
            methods: Vec::new(),
            poly_methods: Vec::new(),
            job_list: Vec::new(),
            rtti_relocations: Vec::new(),
            common: ModuleCommon::default(),
            sf_cache: HashMap::new(),
        }
    }

    pub fn func(&self, id: FuncId) -> &IrFunc {
        &self.funcs[id.0 as usize]
    }

    pub fn func_mut(&mut self, id: FuncId) -> &mut IrFunc {
        &mut self.funcs[id.0 as usize]
    }

    pub fn push_func(&mut self, func: IrFunc) -> FuncId {
        let id = FuncId(self.funcs.len() as u32);
        self.funcs.push(func);
        id
    }

    pub fn push_anon_global(&mut self, ty: TypeId, init: Option<ValueId>, is_const: bool) -> u32 {
        let id = self.anon_globals.len() as u32;
        self.anon_globals.push(AnonGlobal { id, ty, init, is_const });
        id
    }

    pub fn push_static_variable(&mut self, ty: TypeId, init: Option<ValueId>, name: Option<Symbol>) -> u32 {
        let id = self.static_variables.len() as u32;
        self.static_variables.push(StaticVariable { id, ty, init, name });
        id
    }

    /// Sorts the function/method/poly-method mapping tables by key so
    /// `find_func_conforming` and method resolution can binary-search
    /// them (spec.md §2 step 3, §5 ordering guarantees).
    pub fn sort_mappings(&mut self) {
        self.func_mappings.sort_by(|a, b| a.name.as_str().cmp(&b.name.as_str()));
        self.methods.sort_by(|a, b| {
            (a.type_name.as_str(), a.method_name.as_str()).cmp(&(b.type_name.as_str(), b.method_name.as_str()))
        });
        self.poly_methods.sort_by(|a, b| {
            (a.type_name.as_str(), a.method_name.as_str()).cmp(&(b.type_name.as_str(), b.method_name.as_str()))
        });
    }

    /// Incremental insertion used during polymorphic instantiation
    /// (spec.md §5: "re-sorted iff `preserve_sortedness` is set"). Finds
    /// the insertion point by binary search and inserts in place rather
    /// than appending + re-sorting the whole table.
    pub fn insert_func_mapping_sorted(&mut self, mapping: FuncMapping) {
        let pos = self
            .func_mappings
            .partition_point(|m| m.name.as_str().as_str() < mapping.name.as_str().as_str());
        self.func_mappings.insert(pos, mapping);
    }

    pub fn find_funcs_by_name(&self, name: Symbol) -> &[FuncMapping] {
        let needle = name.as_str();
        let start = self.func_mappings.partition_point(|m| m.name.as_str().as_str() < needle.as_str());
        let end = start
            + self.func_mappings[start..].partition_point(|m| m.name.as_str().as_str() == needle.as_str());
        &self.func_mappings[start..end]
    }
}

impl Default for IrModule {
    fn default() -> Self {
        Self::new()
    }
}
