//! Code generation failures.
//!
//! The generator assumes an error-free tree, so everything here except
//! register exhaustion indicates a tree that never went through the analyzer.

use kestrel_ast::NodeKind;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodegenError {
    /// An expression needed more simultaneous temporaries than the pool has.
    #[error("all {capacity} temporary registers are in use")]
    RegisterExhausted { capacity: usize },

    #[error("malformed '{kind}' node: {detail}")]
    MalformedTree { kind: NodeKind, detail: String },

    /// A name with neither a frame slot nor a global label.
    #[error("'{0}' has no storage location")]
    UnresolvedName(String),

    #[error("'{0}' has no enclosing construct to leave")]
    NoJumpTarget(&'static str),

    /// Storage that does not fit a signed 32-bit frame offset.
    #[error("'{0}' needs more storage than a frame can address")]
    StorageOverflow(String),
}

impl CodegenError {
    pub(crate) fn malformed(kind: NodeKind, detail: impl Into<String>) -> Self {
        CodegenError::MalformedTree { kind, detail: detail.into() }
    }
}

pub type CodegenResult<T> = Result<T, CodegenError>;
