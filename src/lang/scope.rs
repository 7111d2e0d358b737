//! Arena-backed scope tree.
//!
//! Scopes live in a flat vector and refer to their parents by index, so the
//! whole tree is an owned value passed through the phases and the evaluator,
//! with no shared mutable singletons. `define` inserts into one scope's table;
//! `resolve` walks parent links toward the global scope and returns the first
//! match. Shadowing policy is not enforced here; the phases own it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::symbol::Symbol;

/// Index of a scope inside a [`ScopeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeId(pub usize);

/// The global scope is always the first entry of the arena.
pub const GLOBAL_SCOPE: ScopeId = ScopeId(0);

/// What lexical region a scope covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeKind {
    /// The root scope holding attributes, units, and the program symbol.
    Global,
    /// The behavior entry point's own scope (holds its parameters).
    Program,
    /// A function's own scope (holds its parameters).
    Function,
    /// A brace-delimited block scope.
    Block,
}

/// One lexical scope: a symbol table plus a parent link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scope {
    /// What region this scope covers.
    pub kind: ScopeKind,
    /// Enclosing scope; `None` only for the global scope.
    pub parent: Option<ScopeId>,
    symbols: HashMap<String, Symbol>,
}

impl Scope {
    fn new(kind: ScopeKind, parent: Option<ScopeId>) -> Self {
        Self {
            kind,
            parent,
            symbols: HashMap::new(),
        }
    }

    /// Iterate over the symbols defined directly in this scope.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }
}

/// The scope arena built by the definition phase and consulted by the
/// reference phase and the evaluator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    /// Create a tree containing only the global scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(ScopeKind::Global, None)],
        }
    }

    /// Append a child scope and return its id.
    pub fn push_scope(&mut self, kind: ScopeKind, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope::new(kind, Some(parent)));
        id
    }

    /// Insert a symbol into the given scope, keyed by name. An existing
    /// symbol of the same name in that scope is replaced; duplicate policy
    /// belongs to the phases.
    pub fn define(&mut self, scope: ScopeId, symbol: Symbol) {
        self.scopes[scope.0]
            .symbols
            .insert(symbol.name.clone(), symbol);
    }

    /// Walk from `scope` toward the root and return the first symbol with
    /// the given name.
    pub fn resolve(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        self.resolve_with_scope(scope, name).map(|(_, sym)| sym)
    }

    /// Like [`ScopeTree::resolve`], also reporting the scope that owns the
    /// match.
    pub fn resolve_with_scope(&self, scope: ScopeId, name: &str) -> Option<(ScopeId, &Symbol)> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let entry = &self.scopes[id.0];
            if let Some(symbol) = entry.symbols.get(name) {
                return Some((id, symbol));
            }
            current = entry.parent;
        }
        None
    }

    /// Mutable resolution along the parent chain. Used by the reference
    /// phase for its single sanctioned post-definition mutation: copying
    /// resolved import segments onto timer symbols.
    pub fn resolve_mut(&mut self, scope: ScopeId, name: &str) -> Option<&mut Symbol> {
        let owner = self.resolve_with_scope(scope, name)?.0;
        self.scopes[owner.0].symbols.get_mut(name)
    }

    /// Look the name up in the given scope only, ignoring parents.
    pub fn resolve_local(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        self.scopes[scope.0].symbols.get(name)
    }

    /// Access a scope by id.
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    /// Number of scopes in the arena.
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// True when only the global scope exists.
    pub fn is_empty(&self) -> bool {
        self.scopes.len() <= 1
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::symbol::SymbolKind;
    use crate::runtime::value::ValueType;

    fn variable(name: &str) -> Symbol {
        Symbol::new(name, SymbolKind::Variable, ValueType::Int)
    }

    #[test]
    fn resolves_through_parent_chain() {
        let mut tree = ScopeTree::new();
        tree.define(GLOBAL_SCOPE, variable("a"));
        let inner = tree.push_scope(ScopeKind::Block, GLOBAL_SCOPE);

        assert!(tree.resolve(inner, "a").is_some());
        assert!(tree.resolve(inner, "b").is_none());
    }

    #[test]
    fn inner_definition_shadows_outer() {
        let mut tree = ScopeTree::new();
        tree.define(GLOBAL_SCOPE, variable("a"));
        let inner = tree.push_scope(ScopeKind::Block, GLOBAL_SCOPE);
        let mut shadow = variable("a");
        shadow.declared_type = ValueType::Float;
        tree.define(inner, shadow);

        let resolved = tree.resolve(inner, "a").expect("resolves");
        assert_eq!(resolved.declared_type, ValueType::Float);
        let outer = tree.resolve(GLOBAL_SCOPE, "a").expect("resolves");
        assert_eq!(outer.declared_type, ValueType::Int);
    }

    #[test]
    fn local_lookup_ignores_parents() {
        let mut tree = ScopeTree::new();
        tree.define(GLOBAL_SCOPE, variable("a"));
        let inner = tree.push_scope(ScopeKind::Block, GLOBAL_SCOPE);

        assert!(tree.resolve_local(inner, "a").is_none());
        assert!(tree.resolve_local(GLOBAL_SCOPE, "a").is_some());
    }
}
