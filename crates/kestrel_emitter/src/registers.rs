//! The temporary register pool.

use crate::error::{CodegenError, CodegenResult};
use std::fmt;

/// Number of `$t` registers the target provides.
pub const MAX_TEMP_REGISTERS: usize = 10;

/// A scratch register, `$t0` through `$t9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reg(u8);

impl Reg {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$t{}", self.0)
    }
}

/// Allocation counters, for checking that expressions leave the pool balanced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub allocations: u64,
    pub frees: u64,
}

/// A fixed set of interchangeable scratch registers, kept as a stack of free
/// ids. Running out is an error; there is no fallback register.
#[derive(Debug, Clone)]
pub struct RegisterPool {
    free: Vec<Reg>,
    capacity: usize,
    stats: PoolStats,
}

impl RegisterPool {
    /// A pool of `capacity` registers, clamped to `1..=MAX_TEMP_REGISTERS`.
    /// `$t0` is handed out first.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_TEMP_REGISTERS);
        Self {
            free: (0..capacity as u8).rev().map(Reg).collect(),
            capacity,
            stats: PoolStats::default(),
        }
    }

    pub fn alloc(&mut self) -> CodegenResult<Reg> {
        let reg = self
            .free
            .pop()
            .ok_or(CodegenError::RegisterExhausted { capacity: self.capacity })?;
        self.stats.allocations += 1;
        Ok(reg)
    }

    pub fn free(&mut self, reg: Reg) {
        debug_assert!(!self.free.contains(&reg), "{} freed twice", reg);
        self.free.push(reg);
        self.stats.frees += 1;
    }

    /// Registers currently allocated, in ascending order.
    pub fn in_use(&self) -> Vec<Reg> {
        (0..self.capacity as u8)
            .map(Reg)
            .filter(|r| !self.free.contains(r))
            .collect()
    }

    pub fn available(&self) -> usize {
        self.free.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }
}

impl Default for RegisterPool {
    fn default() -> Self {
        Self::new(MAX_TEMP_REGISTERS)
    }
}
