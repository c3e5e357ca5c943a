//! Symbol definitions.

use kestrel_ast::types::{array_words, ScopeId, SymbolFlags, SymbolId, Type, TypeSpec};
use kestrel_core::text::Position;

/// What a symbol names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Variable,
    Parameter,
    Function,
}

/// One declared name.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    /// Assigned by the table on a successful declare; `INVALID` before that.
    pub id: SymbolId,
    pub name: String,
    pub kind: SymbolKind,
    /// For functions, the return type.
    pub declared_type: Type,
    /// Filled in by the table on a successful declare.
    pub scope_id: ScopeId,
    /// Name of the declaring scope, filled in on declare.
    pub scope_name: String,
    pub flags: SymbolFlags,
    pub dimensions: Vec<u32>,
    /// Parameter types, in order. Empty for non-functions.
    pub parameters: Vec<Type>,
    pub position: Option<Position>,
}

impl Symbol {
    fn new(name: &str, kind: SymbolKind, declared_type: Type) -> Self {
        Self {
            id: SymbolId::INVALID,
            name: name.to_string(),
            kind,
            declared_type,
            scope_id: ScopeId::GLOBAL,
            scope_name: String::new(),
            flags: SymbolFlags::NONE,
            dimensions: Vec::new(),
            parameters: Vec::new(),
            position: None,
        }
    }

    /// A variable with the given resolved type.
    pub fn variable(name: &str, spec: TypeSpec) -> Self {
        let mut symbol = Self::new(name, SymbolKind::Variable, spec.ty);
        if symbol.declared_type.is_array() {
            symbol.flags |= SymbolFlags::ARRAY;
        }
        symbol.dimensions = spec.dimensions;
        symbol
    }

    /// A parameter; parameters always arrive initialized.
    pub fn parameter(name: &str, spec: TypeSpec) -> Self {
        let mut symbol = Self::variable(name, spec);
        symbol.kind = SymbolKind::Parameter;
        symbol.flags |= SymbolFlags::INITIALIZED;
        symbol
    }

    pub fn function(name: &str, return_type: Type, parameters: Vec<Type>) -> Self {
        let mut symbol = Self::new(name, SymbolKind::Function, return_type);
        symbol.parameters = parameters;
        symbol.flags |= SymbolFlags::INITIALIZED;
        symbol
    }

    pub fn with_position(mut self, position: Option<Position>) -> Self {
        self.position = position;
        self
    }

    pub fn initialized(mut self, initialized: bool) -> Self {
        self.flags.set(SymbolFlags::INITIALIZED, initialized);
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.flags.contains(SymbolFlags::INITIALIZED)
    }

    pub fn is_array(&self) -> bool {
        self.flags.contains(SymbolFlags::ARRAY)
    }

    pub fn is_constant(&self) -> bool {
        self.flags.contains(SymbolFlags::CONSTANT)
    }

    /// Number of 4-byte words of storage. Arrays occupy the product of
    /// their dimensions; `None` if that does not fit a stack frame.
    pub fn word_count(&self) -> Option<u32> {
        if self.is_array() {
            array_words(&self.dimensions)
        } else {
            Some(1)
        }
    }

    pub fn is_function(&self) -> bool {
        self.kind == SymbolKind::Function
    }

    pub fn mark_initialized(&mut self) {
        self.flags |= SymbolFlags::INITIALIZED;
    }
}
