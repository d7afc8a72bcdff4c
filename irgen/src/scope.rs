//! Lexical variable scopes, kept as a tree (spec.md §9 "Scopes as a tree,
//! not a stack") so that labeled `break`/`continue` can walk from the
//! current scope up to a named outer scope's boundary and defer exactly
//! the variables in between. Grounded on `BRIDGE/bridge.h`'s
//! `bridge_scope_t`/`bridge_var_t`.

use latticec_hir::{TypeId, ValueId};
use latticec_symbol::Symbol;

use crate::ast::AstType;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct VarTraits: u8 {
        /// Declared but not yet given a value; skip the zero-init store.
        const UNDEF = 1 << 0;
        /// Storage already holds a pointer; loads/stores auto-dereference
        /// once rather than treating it as a `T` stored at a stack slot.
        const REFERENCE = 1 << 1;
        /// Plain-old-data: skip `__defer__`/`__pass__`/`__assign__`.
        const POD = 1 << 2;
        /// Module-lifetime storage, addressed via `static_id` instead of
        /// a per-function stack slot.
        const STATIC = 1 << 3;
    }
}

/// Where a [`BridgeVar`]'s storage lives.
#[derive(Debug, Clone, Copy)]
pub enum VarStorage {
    /// Per-function stack slot id, and the [`ValueId`] of the `Alloc`
    /// pointer [`latticec_hir::IrBuilder::build_alloc`] returned for it.
    Stack { id: u32, ptr: ValueId },
    /// Module-lifetime static variable index.
    Static { id: u32, ptr: ValueId },
}

#[derive(Debug, Clone)]
pub struct BridgeVar {
    pub name: Symbol,
    pub ast_type: AstType,
    pub ir_type: TypeId,
    pub storage: VarStorage,
    pub traits: VarTraits,
    /// Anonymous global backing a compile-time-constant aggregate used as
    /// this variable's zero-init/default value, if one was materialized.
    pub optional_anon_global: Option<ValueId>,
}

impl BridgeVar {
    pub fn is_pod(&self) -> bool {
        self.traits.contains(VarTraits::POD)
    }

    pub fn is_reference(&self) -> bool {
        self.traits.contains(VarTraits::REFERENCE)
    }

    /// Whether this variable needs `__defer__` run on scope exit (spec.md
    /// §4.4 "`__defer__` runs on a non-POD value going out of scope").
    pub fn needs_defer(&self) -> bool {
        !self.is_pod() && !self.is_reference()
    }

    pub fn ptr(&self) -> ValueId {
        match self.storage {
            VarStorage::Stack { ptr, .. } | VarStorage::Static { ptr, .. } => ptr,
        }
    }
}

/// A node in the scope tree. `first_var_id`/`following_var_id` bound the
/// half-open range of stack variable ids introduced by this scope or any
/// of its descendants, letting `find_var_by_id` binary-search by id.
#[derive(Debug, Default)]
pub struct Scope {
    pub variables: Vec<BridgeVar>,
    pub first_var_id: u32,
    pub following_var_id: u32,
    pub children: Vec<Scope>,
}

impl Scope {
    pub fn open_child(&mut self, first_var_id: u32) -> &mut Scope {
        self.children.push(Scope { first_var_id, following_var_id: first_var_id, ..Scope::default() });
        self.children.last_mut().expect("just pushed")
    }

    pub fn declare(&mut self, var: BridgeVar, next_id: u32) {
        self.variables.push(var);
        self.following_var_id = self.following_var_id.max(next_id);
    }

    pub fn already_declared(&self, name: Symbol) -> bool {
        self.variables.iter().any(|v| v.name == name)
    }

    /// Non-POD, non-reference variables in declaration order — the set
    /// `__defer__` must run over when this scope closes, in LIFO-friendly
    /// (reverse declaration) order.
    pub fn defer_candidates(&self) -> impl Iterator<Item = &BridgeVar> {
        self.variables.iter().rev().filter(|v| v.needs_defer())
    }
}

/// A path from the innermost open scope up to the function root, used to
/// walk scopes during variable lookup and defer-on-exit.
pub struct ScopeStack {
    /// Index path into nested `Scope::children`, root-to-leaf.
    frames: Vec<usize>,
    root: Scope,
    next_var_id: u32,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self { frames: Vec::new(), root: Scope::default(), next_var_id: 0 }
    }

    fn path(&self) -> Vec<&Scope> {
        let mut scope = &self.root;
        let mut path = vec![scope];
        for &idx in &self.frames {
            scope = &scope.children[idx];
            path.push(scope);
        }
        path
    }

    fn current_mut(&mut self) -> &mut Scope {
        let mut scope = &mut self.root;
        for &idx in &self.frames {
            scope = &mut scope.children[idx];
        }
        scope
    }

    pub fn push_scope(&mut self) {
        let first = self.next_var_id;
        let idx = {
            let scope = self.current_mut();
            scope.children.push(Scope { first_var_id: first, following_var_id: first, ..Scope::default() });
            scope.children.len() - 1
        };
        self.frames.push(idx);
    }

    pub fn pop_scope(&mut self) {
        self.frames.pop();
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Declares `name` with the given type/storage/traits in the current
    /// (innermost) scope, allocating a fresh stack variable id.
    pub fn declare(
        &mut self,
        name: Symbol,
        ast_type: AstType,
        ir_type: TypeId,
        ptr: ValueId,
        traits: VarTraits,
    ) -> u32 {
        let id = self.next_var_id;
        self.next_var_id += 1;
        let var = BridgeVar { name, ast_type, ir_type, storage: VarStorage::Stack { id, ptr }, traits, optional_anon_global: None };
        self.current_mut().declare(var, self.next_var_id);
        id
    }

    /// Walks from the current scope to the root looking for `name`
    /// (`bridge_scope_find_var`).
    pub fn find_var(&self, name: Symbol) -> Option<&BridgeVar> {
        for scope in self.path().into_iter().rev() {
            if let Some(v) = scope.variables.iter().rev().find(|v| v.name == name) {
                return Some(v);
            }
        }
        None
    }

    /// Same walk as [`Self::find_var`], but when nothing matches exactly,
    /// additionally returns the visited name with the smallest Levenshtein
    /// distance (≤ 3) for "did you mean" diagnostics
    /// (`bridge_scope_var_nearest`, spec.md §4.5).
    pub fn find_var_or_nearest<'a>(&'a self, name: &str) -> Result<&'a BridgeVar, Option<Symbol>> {
        let mut best: Option<(Symbol, usize)> = None;
        for scope in self.path().into_iter().rev() {
            for v in scope.variables.iter().rev() {
                if v.name.as_str() == name {
                    return Ok(v);
                }
                let d = edit_distance(name, &v.name.as_str());
                if d <= 3 && best.as_ref().is_none_or(|(_, bd)| d < *bd) {
                    best = Some((v.name, d));
                }
            }
        }
        Err(best.map(|(s, _)| s))
    }

    /// All variables from the current scope up to (but not including) the
    /// scope at `target_depth`, reverse-declaration order, flattened — the
    /// defer set for `break`/`continue` targeting an outer loop scope.
    pub fn defer_set_up_to(&self, target_depth: usize) -> Vec<&BridgeVar> {
        let path = self.path();
        let mut out = Vec::new();
        for scope in path[target_depth + 1..].iter().rev() {
            out.extend(scope.defer_candidates());
        }
        out
    }

    /// The same walk as [`Self::defer_set_up_to`], but over every open
    /// scope including the function root — the defer set for a `return`
    /// statement, which unwinds the whole function regardless of loop
    /// nesting (spec.md §4.7 "Return").
    pub fn defer_set_to_root(&self) -> Vec<&BridgeVar> {
        let path = self.path();
        let mut out = Vec::new();
        for scope in path.iter().rev() {
            out.extend(scope.defer_candidates());
        }
        out
    }

    /// A clone of the innermost open scope's own variables, in declaration
    /// order (used by [`crate::funcbuilder::FuncGen::close_scope`] to run
    /// defers after releasing the borrow on `self.scope`).
    pub fn current_scope_vars(&self) -> Vec<BridgeVar> {
        let mut scope = &self.root;
        for &idx in &self.frames {
            scope = &scope.children[idx];
        }
        scope.variables.clone()
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

/// Levenshtein edit distance, used for nearest-name suggestions.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0usize; b.len() + 1];
    for i in 1..=a.len() {
        cur[0] = i;
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            cur[j] = (prev[j] + 1).min(cur[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_value_id() -> ValueId {
        // ValueId wraps a private PoolIndex; tests only need a distinct
        // placeholder, obtained by allocating into a throwaway pool.
        let mut pool: latticec_hir::ValuePool = latticec_hir::ValuePool::new();
        let mut types: latticec_hir::TypePool = latticec_hir::TypePool::new();
        let ty = types.alloc(latticec_hir::IrType::S32);
        pool.alloc(ty, latticec_hir::IrValueData::NullPtr)
    }

    #[test]
    fn inner_scope_shadows_outer() {
        let mut stack = ScopeStack::new();
        let x = Symbol::intern("x");
        let ty = dummy_value_id();
        let mut types = latticec_hir::TypePool::new();
        let s32 = types.alloc(latticec_hir::IrType::S32);
        stack.declare(x, crate::ast::AstType::base(Symbol::intern("int")), s32, ty, VarTraits::POD);
        stack.push_scope();
        stack.declare(x, crate::ast::AstType::base(Symbol::intern("int")), s32, ty, VarTraits::POD);
        assert!(stack.find_var(x).is_some());
        stack.pop_scope();
        assert!(stack.find_var(x).is_some());
    }

    #[test]
    fn nearest_name_suggestion_within_edit_distance() {
        let mut stack = ScopeStack::new();
        let mut types = latticec_hir::TypePool::new();
        let s32 = types.alloc(latticec_hir::IrType::S32);
        let ty = dummy_value_id();
        stack.declare(Symbol::intern("count"), crate::ast::AstType::base(Symbol::intern("int")), s32, ty, VarTraits::POD);
        match stack.find_var_or_nearest("counnt") {
            Err(Some(sym)) => assert_eq!(sym.as_str(), "count"),
            other => panic!("expected nearest-name suggestion, got {other:?}"),
        }
    }

    #[test]
    fn missing_var_with_no_close_name_suggests_nothing() {
        let stack = ScopeStack::new();
        assert!(matches!(stack.find_var_or_nearest("anything"), Err(None)));
    }
}
