//! kestrel_checker: The semantic analyzer.
//!
//! Walks the whole tree once, populating the scoped symbol table, inferring
//! expression types and validating operator and assignment compatibility.
//! Problems are accumulated as diagnostics; the walk never stops early.

mod checker;
mod types;

pub use checker::{analyze, Analysis, Checker};
pub use types::{arithmetic_result, assignable};
