//! Custom collection types used throughout the compiler.

use rustc_hash::FxHashMap;
use std::borrow::Borrow;
use std::hash::Hash;

/// A map where each key holds a stack of values and only the most recent
/// binding is visible. Removing a key pops its innermost binding, which
/// re-exposes the one it shadowed.
#[derive(Debug, Clone)]
pub struct ShadowMap<K, V> {
    map: FxHashMap<K, Vec<V>>,
}

impl<K: Eq + Hash, V> ShadowMap<K, V> {
    pub fn new() -> Self {
        Self {
            map: FxHashMap::default(),
        }
    }

    /// Bind `key` to `value`, shadowing any earlier binding.
    pub fn push(&mut self, key: K, value: V) {
        self.map.entry(key).or_default().push(value);
    }

    /// Remove the innermost binding of `key`.
    pub fn pop<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
    {
        let stack = self.map.get_mut(key)?;
        let value = stack.pop();
        if stack.is_empty() {
            self.map.remove(key);
        }
        value
    }

    /// The visible (innermost) binding of `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
    {
        self.map.get(key).and_then(|stack| stack.last())
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
    {
        self.map.contains_key(key)
    }

    /// Number of keys with at least one binding.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}

impl<K: Eq + Hash, V> Default for ShadowMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Re-export FxHashMap for convenience.
pub type FxMap<K, V> = FxHashMap<K, V>;
