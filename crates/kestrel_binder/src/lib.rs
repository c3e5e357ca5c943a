//! kestrel_binder: Scoped symbol table.
//!
//! A stack of named scopes mapping identifiers to symbol records, with
//! nearest-enclosing-scope lookup. The analyzer populates it; the code
//! generator reads the global scope back to find global storage and
//! function signatures.

mod scope;
mod symbol;
mod table;

pub use scope::{Scope, ScopeKind};
pub use symbol::{Symbol, SymbolKind};
pub use table::{DeclareError, SymbolTable, GLOBAL_SCOPE_NAME};
