//! Insertion-ordered maps keyed by arbitrary [`Value`]s.

use super::hash::{hash_value, values_equal};
use super::Value;
use crate::error::RuntimeError;
use rustc_hash::FxHashMap;

/// A ProtoScript map.
///
/// Iteration order is insertion order, per the runtime's data model — this
/// is why entries live in a `Vec` rather than only in the hash index. The
/// `FxHashMap` buckets content hashes to entry indices so lookup stays
/// average O(1) even though keys can be any [`Value`], including floats and
/// other non-`Eq` Rust types; collisions are resolved with
/// [`values_equal`].
#[derive(Debug, Default)]
pub struct PsMap {
    entries: Vec<(Value, Value)>,
    buckets: FxHashMap<u64, Vec<usize>>,
}

impl PsMap {
    pub fn new() -> Self {
        PsMap::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find(&self, key: &Value) -> Option<usize> {
        let h = hash_value(key);
        self.buckets
            .get(&h)?
            .iter()
            .copied()
            .find(|&idx| values_equal(&self.entries[idx].0, key))
    }

    pub fn get(&self, key: &Value) -> Result<&Value, RuntimeError> {
        self.find(key)
            .map(|idx| &self.entries[idx].1)
            .ok_or(RuntimeError::MissingKey)
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.find(key).is_some()
    }

    /// Inserts or overwrites `key`. Overwriting preserves the key's original
    /// insertion position, matching the runtime's "update in place" map
    /// semantics.
    pub fn set(&mut self, key: Value, value: Value) {
        if let Some(idx) = self.find(&key) {
            self.entries[idx].1 = value;
            return;
        }
        let idx = self.entries.len();
        let h = hash_value(&key);
        self.entries.push((key, value));
        self.buckets.entry(h).or_default().push(idx);
    }

    pub fn remove(&mut self, key: &Value) -> Result<Value, RuntimeError> {
        let idx = self.find(key).ok_or(RuntimeError::MissingKey)?;
        let (removed_key, removed_value) = self.entries.remove(idx);
        self.rebuild_buckets();
        let _ = removed_key;
        Ok(removed_value)
    }

    fn rebuild_buckets(&mut self) {
        self.buckets.clear();
        for (idx, (key, _)) in self.entries.iter().enumerate() {
            self.buckets.entry(hash_value(key)).or_default().push(idx);
        }
    }

    /// First key in insertion order, used by the interpreter's default
    /// `Map` iterator construction.
    pub fn first_key(&self) -> Option<&Value> {
        self.entries.first().map(|(k, _)| k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(k, _)| k)
    }
}
