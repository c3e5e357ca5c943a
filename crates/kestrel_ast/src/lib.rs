//! kestrel_ast: Syntax tree definitions for the kestrel compiler back end.
//!
//! The tree is produced by the external parser, is exclusively owned, and is
//! never mutated by the analysis or generation passes. This crate defines
//! the closed node vocabulary, the operator set, the nominal type set, and a
//! node factory for building trees in code.

pub mod builder;
pub mod node;
pub mod operators;
pub mod types;

// Re-export key types
pub use node::{FunctionParts, Node, NodeKind};
pub use operators::{Operator, OperatorClass};
pub use types::*;
