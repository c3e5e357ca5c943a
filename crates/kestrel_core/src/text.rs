//! Source location tracking.
//!
//! The external parser stamps each node with the line and column of the
//! token that produced it. Positions are carried through to diagnostics.

use std::cmp::Ordering;
use std::fmt;

/// A 1-based line/column position in the original source text.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    #[inline]
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Build a position from the optional pair a parser may supply.
    /// A missing or zero line means "no position".
    pub fn from_parts(line: Option<u32>, column: Option<u32>) -> Option<Self> {
        match line {
            Some(line) if line > 0 => Some(Self::new(line, column.unwrap_or(0))),
            _ => None,
        }
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.line
            .cmp(&other.line)
            .then_with(|| self.column.cmp(&other.column))
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
