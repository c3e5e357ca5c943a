//! Scope management for the symbol table.

use crate::symbol::Symbol;
use indexmap::IndexMap;
use kestrel_ast::types::ScopeId;
use std::fmt;

/// The role a scope plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Global,
    Function,
    Parameter,
    Block,
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKind::Global => write!(f, "GLOBAL"),
            ScopeKind::Function => write!(f, "FUNCTION"),
            ScopeKind::Parameter => write!(f, "PARAMETER"),
            ScopeKind::Block => write!(f, "BLOCK"),
        }
    }
}

/// A named, leveled binding environment.
#[derive(Debug, Clone)]
pub struct Scope {
    pub id: ScopeId,
    pub name: String,
    /// Depth from the global scope (global is 0).
    pub level: u32,
    pub kind: ScopeKind,
    /// The enclosing scope (None for the global scope).
    pub parent: Option<ScopeId>,
    /// Symbols in declaration order.
    symbols: IndexMap<String, Symbol>,
}

impl Scope {
    pub(crate) fn new(id: ScopeId, name: &str, level: u32, kind: ScopeKind, parent: Option<ScopeId>) -> Self {
        Self {
            id,
            name: name.to_string(),
            level,
            kind,
            parent,
            symbols: IndexMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        self.symbols.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub(crate) fn insert(&mut self, symbol: Symbol) {
        self.symbols.insert(symbol.name.clone(), symbol);
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
