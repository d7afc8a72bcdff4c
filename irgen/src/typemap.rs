//! AST→IR type resolution (spec.md §4.2).
//!
//! `TypeMap` seeds the primitive set, then appends one skeleton entry per
//! AST composite/enum, sorts and checks for name collisions, then fills in
//! composite bodies by lowering their layout bone tree. `resolve_type`
//! converts an arbitrary [`AstType`] (peeling `*`/`[N]` layers) to a
//! [`TypeId`] against this map.

use hashbrown::HashMap;
use latticec_hir::{CompositeTraits, FuncPtrTraits, IrModule, IrType, TypeId};
use latticec_session::{Diagnostic, DiagnosticsHandler, SourceSpan};
use latticec_symbol::Symbol;

use crate::ast::{Ast, AstType, AstTypeElem, AstTypeLayer, Bone};

/// The 16 primitive entries seeded before any user type (spec.md §4.2).
/// `ptr` is handled separately in [`TypeMap::seed_primitives`] since its
/// `IrType::Ptr(S8)` needs a pool-allocated `TypeId` that doesn't exist
/// until `S8` itself has been allocated.
const PRIMITIVES: &[(&str, IrType)] = &[
    ("byte", IrType::S8),
    ("ubyte", IrType::U8),
    ("short", IrType::S16),
    ("ushort", IrType::U16),
    ("int", IrType::S32),
    ("uint", IrType::U32),
    ("long", IrType::S64),
    ("ulong", IrType::U64),
    ("half", IrType::Half),
    ("float", IrType::Float),
    ("double", IrType::Double),
    ("bool", IrType::Bool),
    ("usize", IrType::U64),
    ("successful", IrType::Bool),
    ("void", IrType::Void),
];

struct MapEntry {
    name: Symbol,
    ty: Option<TypeId>,
}

/// Maps a human-readable composite/enum/primitive name to its resolved
/// [`TypeId`], sorted by name once built so method/overload resolution can
/// binary-search it (the table itself, as distinct from the RTTI
/// `TypeTable` below, which records every *referenced* type name).
pub struct TypeMap {
    entries: Vec<MapEntry>,
    by_name: HashMap<Symbol, usize>,
    by_type: HashMap<TypeId, Symbol>,
}

impl TypeMap {
    pub fn new() -> Self {
        Self { entries: Vec::new(), by_name: HashMap::new(), by_type: HashMap::new() }
    }

    fn insert(&mut self, name: Symbol, ty: Option<TypeId>) -> usize {
        let idx = self.entries.len();
        if let Some(ty) = ty {
            self.by_type.entry(ty).or_insert(name);
        }
        self.entries.push(MapEntry { name, ty });
        self.by_name.insert(name, idx);
        idx
    }

    pub fn find(&self, name: Symbol) -> Option<TypeId> {
        self.by_name.get(&name).and_then(|&idx| self.entries[idx].ty)
    }

    /// Reverse lookup: the declared name backing `ty`, if any (spec.md
    /// §4.4 — method/overload dispatch is name-indexed, not `TypeId`-
    /// indexed). `or_insert` in [`Self::insert`] means the *first* name to
    /// resolve to a given `TypeId` wins ties (relevant for `usize`, which
    /// resolves to the same `IrType` shape as `ulong` but gets a distinct
    /// pool allocation, so no tie actually occurs among the seeded set).
    pub fn name_of(&self, ty: TypeId) -> Option<Symbol> {
        self.by_type.get(&ty).copied()
    }

    /// Registers a monomorphized composite's resolved type under its
    /// mangled name (spec.md §4.8), so later lookups by that name (method
    /// resolution, nested instantiation, `sf_cache`) find it without
    /// re-lowering. Lookup is a hash-map probe, not the sorted binary
    /// search `declare_skeletons` sets up for the primitive/source-level
    /// set, so appending after that sort is safe.
    pub fn declare_instantiated(&mut self, name: Symbol, ty: TypeId) -> TypeId {
        self.insert(name, Some(ty));
        ty
    }

    /// Seeds the 16 primitive entries and caches `ptr`/`usize`/`bool` on
    /// `module.common` for the builder's convenience.
    pub fn seed_primitives(&mut self, module: &mut IrModule) {
        for &(name, ref proto) in PRIMITIVES {
            let ty = module.types.alloc(proto.clone());
            self.insert(Symbol::intern(name), Some(ty));
        }
        let s8 = self.find(Symbol::intern("byte")).expect("byte seeded above");
        let ptr_ty = module.types.alloc(IrType::Ptr(s8));
        self.insert(Symbol::intern("ptr"), Some(ptr_ty));

        module.common.ir_ptr = Some(ptr_ty);
        module.common.ir_usize = self.find(Symbol::intern("usize"));
        module.common.ir_bool = self.find(Symbol::intern("bool"));
    }

    /// Declares one skeleton entry (no body yet) per composite/enum,
    /// sorts by name, and reports every colliding name at once (spec.md
    /// §4.2 "enforce uniqueness (error with all source locations of
    /// colliding names)").
    pub fn declare_skeletons(
        &mut self,
        ast: &Ast,
        diagnostics: &DiagnosticsHandler,
    ) -> Result<(), ()> {
        for composite in &ast.composites {
            self.insert(composite.name, None);
        }
        for e in &ast.enums {
            self.insert(e.name, None);
        }

        self.entries.sort_by(|a, b| a.name.as_str().cmp(&b.name.as_str()));
        self.by_name.clear();
        for (idx, entry) in self.entries.iter().enumerate() {
            self.by_name.insert(entry.name, idx);
        }

        let mut ok = true;
        let mut i = 0;
        while i < self.entries.len() {
            let mut j = i + 1;
            while j < self.entries.len() && self.entries[j].name.as_str() == self.entries[i].name.as_str() {
                j += 1;
            }
            if j - i > 1 {
                ok = false;
                let spans: Vec<SourceSpan> = ast
                    .composites
                    .iter()
                    .filter(|c| c.name == self.entries[i].name)
                    .map(|c| c.span)
                    .collect();
                let mut diag = Diagnostic::error(format!(
                    "duplicate type name '{}' declared {} times",
                    self.entries[i].name,
                    j - i
                ));
                for span in spans {
                    diag = diag.with_label(span, "declared here");
                }
                diagnostics.emit(diag);
            }
            i = j;
        }
        if ok { Ok(()) } else { Err(()) }
    }

    /// Fills in composite bodies now that every name (including forward
    /// references within cyclic composites) has a slot in the map.
    pub fn resolve_composite_bodies(&mut self, ast: &Ast, module: &mut IrModule) -> Result<(), ()> {
        for composite in &ast.composites {
            let ty = lower_bone(&composite.layout, self, module)?;
            let idx = *self.by_name.get(&composite.name).expect("declared in declare_skeletons");
            self.entries[idx].ty = Some(ty);
            self.by_type.entry(ty).or_insert(composite.name);
        }
        for e in &ast.enums {
            let ty = module.types.alloc(IrType::U64);
            let idx = *self.by_name.get(&e.name).expect("declared in declare_skeletons");
            self.entries[idx].ty = Some(ty);
            self.by_type.entry(ty).or_insert(e.name);
        }
        self.validate_string_struct(module);
        Ok(())
    }

    /// `String` must be exactly `{ *ubyte, usize, usize, StringOwnership }`
    /// (spec.md §4.2); caches the resolved layout in
    /// `module.common.ir_string_struct` when present so expression
    /// lowering can construct string literals without re-resolving.
    fn validate_string_struct(&self, module: &mut IrModule) {
        if let Some(ty) = self.find(Symbol::intern("String")) {
            if matches!(module.types.get(ty), IrType::Structure { subtypes, .. } if subtypes.len() == 4) {
                module.common.ir_string_struct = Some(ty);
            }
        }
    }

    /// Peels `*`/`[N]` layers off `ast_type`, resolves the terminal
    /// element, then re-applies the layers outermost-last (spec.md §4.2).
    pub fn resolve_type(&self, ast_type: &AstType, module: &mut IrModule) -> Result<TypeId, String> {
        let mut ty = self.resolve_elem(&ast_type.elem, module)?;
        for layer in ast_type.layers.iter().rev() {
            ty = match layer {
                AstTypeLayer::Ptr => module.types.alloc(IrType::Ptr(ty)),
                AstTypeLayer::FixedArray(length) => {
                    module.types.alloc(IrType::FixedArray { subtype: ty, length: *length })
                }
                AstTypeLayer::PolyCountArray(name) => {
                    return Err(format!("unresolved polymorphic count parameter '$#{name}'"))
                }
            };
        }
        Ok(ty)
    }

    fn resolve_elem(&self, elem: &AstTypeElem, module: &mut IrModule) -> Result<TypeId, String> {
        match elem {
            AstTypeElem::Base(name) => {
                self.find(*name).ok_or_else(|| format!("unresolved type '{name}'"))
            }
            AstTypeElem::Func { args, return_type, traits } => {
                let mut arg_types = Vec::with_capacity(args.len());
                for a in args {
                    arg_types.push(self.resolve_type(a, module)?);
                }
                let return_ty = self.resolve_type(return_type, module)?;
                let mut fp_traits = FuncPtrTraits::empty();
                if traits.contains(crate::ast::AstFuncTraits::VARARG) {
                    fp_traits |= FuncPtrTraits::VARARG;
                }
                if traits.contains(crate::ast::AstFuncTraits::STDCALL) {
                    fp_traits |= FuncPtrTraits::STDCALL;
                }
                Ok(module.types.alloc(IrType::FuncPtr { args: arg_types, return_type: return_ty, traits: fp_traits }))
            }
            AstTypeElem::Anonymous(bone) => lower_bone(bone, self, module),
            AstTypeElem::GenericBase { name, .. } => {
                Err(format!("polymorphic composite '{name}' referenced without instantiation"))
            }
            AstTypeElem::PolyType(name) => Err(format!("unresolved polymorphic type parameter '${name}'")),
            AstTypeElem::PolyCount(name) => Err(format!("unresolved polymorphic count parameter '$#{name}'")),
        }
    }
}

impl Default for TypeMap {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowers a [`Bone`] layout tree to an [`IrType`] (spec.md §4.2 "Layout
/// bones → IR type"). A `Type` bone whose AST type is any pointer always
/// resolves to the opaque `ptr` type, preserving the cyclic-struct
/// discipline from spec.md §9 even before the real pointee type exists.
pub(crate) fn lower_bone(bone: &Bone, map: &TypeMap, module: &mut IrModule) -> Result<TypeId, ()> {
    match bone {
        Bone::Type(ast_type) if ast_type.is_pointer() => Ok(module.common.ir_ptr.expect("ptr seeded")),
        Bone::Type(ast_type) => map.resolve_type(ast_type, module).map_err(|_| ()),
        Bone::Struct { children, packed } => {
            let mut subtypes = Vec::with_capacity(children.len());
            for (_, child) in children {
                subtypes.push(lower_bone(child, map, module)?);
            }
            let traits = if *packed { CompositeTraits::PACKED } else { CompositeTraits::empty() };
            Ok(module.types.alloc(IrType::Structure { subtypes, traits }))
        }
        Bone::Union { children, packed } => {
            let mut subtypes = Vec::with_capacity(children.len());
            for (_, child) in children {
                subtypes.push(lower_bone(child, map, module)?);
            }
            let traits = if *packed { CompositeTraits::PACKED } else { CompositeTraits::empty() };
            Ok(module.types.alloc(IrType::Union { subtypes, traits }))
        }
    }
}

/// Every syntactically written type name, recorded during inference and
/// later sorted/deduplicated/relocated into the RTTI table (spec.md §3
/// "Type table", §4.9). Distinct from [`TypeMap`]: this tracks references
/// for RTTI purposes, not resolved bodies.
pub struct TypeTable {
    records: Vec<TypeTableRecord>,
    reduced: bool,
}

pub struct TypeTableRecord {
    pub name: String,
    pub ast_type: AstType,
    pub ir_type: Option<TypeId>,
    pub is_alias: bool,
}

impl TypeTable {
    pub fn new() -> Self {
        Self { records: Vec::new(), reduced: false }
    }

    /// Mentions `ast_type`: records it, plus (per `type_table.c`'s
    /// documented "HACK") an extra entry for a pointer to it (skipped for
    /// `void`), and recurses one pointer layer inward when `ast_type` is
    /// itself already a pointer.
    pub fn mention(&mut self, ast_type: &AstType, name: String) {
        self.records.push(TypeTableRecord { name: name.clone(), ast_type: ast_type.clone(), ir_type: None, is_alias: false });

        if name != "void" {
            let with_ptr = ast_type.clone().pointer_to();
            let ptr_name = format!("*{name}");
            self.records.push(TypeTableRecord { name: ptr_name, ast_type: with_ptr, ir_type: None, is_alias: false });
        }

        if ast_type.is_pointer() {
            let subtype = ast_type.unwrapped_view();
            let sub_name = name.strip_prefix('*').unwrap_or(&name).to_string();
            self.mention(&subtype, sub_name);
        }
    }

    /// Sorts by name, then drops consecutive duplicates (spec.md §3, §8
    /// "For all `TypeMap` entries, names are unique").
    pub fn reduce(&mut self) {
        if self.reduced {
            return;
        }
        self.records.sort_by(|a, b| a.name.cmp(&b.name));
        self.records.dedup_by(|a, b| a.name == b.name);
        self.reduced = true;
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.records.iter().position(|r| r.name == name)
    }

    pub fn records(&self) -> &[TypeTableRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [TypeTableRecord] {
        &mut self.records
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_resolve_by_name() {
        let mut module = IrModule::new();
        let mut map = TypeMap::new();
        map.seed_primitives(&mut module);
        let int_ty = map.find(Symbol::intern("int")).expect("int seeded");
        assert_eq!(*module.types.get(int_ty), IrType::S32);
    }

    #[test]
    fn type_table_mention_adds_pointer_entry_except_for_void() {
        let mut table = TypeTable::new();
        table.mention(&AstType::base(Symbol::intern("int")), "int".into());
        table.mention(&AstType::base(Symbol::intern("void")), "void".into());
        table.reduce();
        assert!(table.find("*int").is_some());
        assert!(table.find("*void").is_none());
    }

    #[test]
    fn type_table_reduce_drops_duplicate_names() {
        let mut table = TypeTable::new();
        table.mention(&AstType::base(Symbol::intern("int")), "int".into());
        table.mention(&AstType::base(Symbol::intern("int")), "int".into());
        table.reduce();
        assert_eq!(table.records().iter().filter(|r| r.name == "int").count(), 1);
    }
}
