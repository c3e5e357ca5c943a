//! The scoped symbol table.
//!
//! Scopes are stored in a table of record and never destroyed; the active
//! chain is a stack of scope ids. Leaving a scope only removes it from the
//! chain, so every declaration stays available for later reporting.

use crate::scope::{Scope, ScopeKind};
use crate::symbol::Symbol;
use kestrel_ast::types::{ScopeId, SymbolId};
use thiserror::Error;

/// Name of the global scope.
pub const GLOBAL_SCOPE_NAME: &str = "GLOBAL";

/// Why a declaration was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclareError {
    #[error("'{name}' is already declared in scope '{scope}'")]
    Duplicate {
        name: String,
        scope: String,
        /// The symbol that was there first.
        existing: SymbolId,
    },
}

/// A stack of named scopes with lexical shadowing.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    /// Every scope ever entered, indexed by `ScopeId`.
    scopes: Vec<Scope>,
    /// The active chain, innermost last. Always starts with the global scope.
    active: Vec<ScopeId>,
    /// Next symbol ID to assign.
    next_symbol_id: u32,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(ScopeId::GLOBAL, GLOBAL_SCOPE_NAME, 0, ScopeKind::Global, None)],
            active: vec![ScopeId::GLOBAL],
            next_symbol_id: 0,
        }
    }

    // ========================================================================
    // Scope management
    // ========================================================================

    /// Push a new scope at `level = current depth`; it becomes the active scope.
    pub fn enter_scope(&mut self, name: &str, kind: ScopeKind) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        let level = self.active.len() as u32;
        let parent = self.active.last().copied();
        self.scopes.push(Scope::new(id, name, level, kind, parent));
        self.active.push(id);
        id
    }

    /// Pop the active scope. The global scope is never popped; returns `None`
    /// when only it remains.
    pub fn exit_scope(&mut self) -> Option<ScopeId> {
        if self.active.len() > 1 {
            self.active.pop()
        } else {
            None
        }
    }

    /// The innermost active scope.
    pub fn current_scope(&self) -> &Scope {
        &self.scopes[self.current_id().index()]
    }

    fn current_id(&self) -> ScopeId {
        self.active.last().copied().unwrap_or(ScopeId::GLOBAL)
    }

    pub fn global_scope(&self) -> &Scope {
        &self.scopes[ScopeId::GLOBAL.index()]
    }

    /// Number of active scopes below the global one.
    pub fn depth(&self) -> usize {
        self.active.len() - 1
    }

    pub fn is_global(&self) -> bool {
        self.active.len() == 1
    }

    /// Every scope entered so far, in creation order.
    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn scope(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.index())
    }

    // ========================================================================
    // Declaration and lookup
    // ========================================================================

    /// Add a symbol to the active scope. Shadowing an outer scope is legal;
    /// a second declaration in the same scope is rejected and leaves the
    /// first untouched.
    pub fn declare(&mut self, mut symbol: Symbol) -> Result<SymbolId, DeclareError> {
        let scope_id = self.current_id();
        let scope = &mut self.scopes[scope_id.index()];
        if let Some(existing) = scope.get(&symbol.name) {
            return Err(DeclareError::Duplicate {
                name: symbol.name.clone(),
                scope: scope.name.clone(),
                existing: existing.id,
            });
        }

        let id = SymbolId(self.next_symbol_id);
        self.next_symbol_id += 1;
        symbol.id = id;
        symbol.scope_id = scope_id;
        symbol.scope_name = scope.name.clone();
        scope.insert(symbol);
        Ok(id)
    }

    /// Search the active chain from the innermost scope outward.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.active
            .iter()
            .rev()
            .find_map(|id| self.scopes[id.index()].get(name))
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        let scope_id = self
            .active
            .iter()
            .rev()
            .copied()
            .find(|id| self.scopes[id.index()].contains(name))?;
        self.scopes[scope_id.index()].get_mut(name)
    }

    /// Search only the active scope.
    pub fn lookup_local(&self, name: &str) -> Option<&Symbol> {
        self.current_scope().get(name)
    }

    /// Search only the global scope, regardless of the active chain.
    pub fn lookup_global(&self, name: &str) -> Option<&Symbol> {
        self.global_scope().get(name)
    }

    /// Total symbols declared so far, across all scopes.
    pub fn symbol_count(&self) -> usize {
        self.next_symbol_id as usize
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
