//! In-process cache store.

use crate::{CacheError, CacheStore};
use dashmap::{DashMap, DashSet};

/// Concurrent map-backed store; contents live for the duration of the process.
#[derive(Debug, Default)]
pub struct MemoryCache {
    values: DashMap<String, Vec<String>>,
    empty: DashSet<String>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys holding values or an empty marker.
    pub fn len(&self) -> usize {
        self.values.len() + self.empty.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Vec<String>>, CacheError> {
        Ok(self.values.get(key).map(|entry| entry.value().clone()))
    }

    fn put(&self, key: &str, values: &[String]) -> Result<(), CacheError> {
        self.values.insert(key.to_string(), values.to_vec());
        Ok(())
    }

    fn mark_empty(&self, key: &str) -> Result<(), CacheError> {
        self.empty.insert(key.to_string());
        Ok(())
    }

    fn is_marked_empty(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.empty.contains(key))
    }
}
