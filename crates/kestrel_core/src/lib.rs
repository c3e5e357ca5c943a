//! kestrel_core: Core utilities for the kestrel compiler back end.
//!
//! Provides source positions and the small collection types shared by the
//! analysis and generation passes.

pub mod collections;
pub mod text;

// Re-export commonly used types
pub use collections::{FxMap, ShadowMap};
pub use text::Position;
