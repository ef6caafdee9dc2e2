use crate::{CacheKey, CacheStore, MemoryCache};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fmt::Display;
use std::sync::Arc;

/// Shared lookaside cache service, injected into every component that needs it.
#[derive(Clone)]
pub struct CacheGateway {
    store: Arc<dyn CacheStore>,
    inflight: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl CacheGateway {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            inflight: Arc::new(DashMap::new()),
        }
    }

    /// Gateway over a fresh in-process store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCache::new()))
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Cached values for `key`, or `Some(vec![])` when the key is marked empty.
    ///
    /// Backend failures are logged and reported as a miss.
    pub fn cached(&self, key: &str) -> Option<Vec<String>> {
        match self.store.get(key) {
            Ok(Some(values)) if !values.is_empty() => return Some(values),
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(key, error = %err, "cache read failed");
                return None;
            }
        }
        match self.store.is_marked_empty(key) {
            Ok(true) => Some(Vec::new()),
            Ok(false) => None,
            Err(err) => {
                tracing::warn!(key, error = %err, "cache read failed");
                None
            }
        }
    }

    /// Serve `key` from the cache, or run `load` once and remember its result.
    ///
    /// Concurrent callers missing on the same key are serialized on a per-key
    /// gate, so `load` runs at most once per key while its result is
    /// cacheable. A failed `load` is returned to the caller and not memoized.
    pub fn get_or_load<E, F>(&self, key: &CacheKey, load: F) -> Result<Vec<String>, E>
    where
        E: Display,
        F: FnOnce() -> Result<Vec<String>, E>,
    {
        let key = key.to_string();
        if let Some(values) = self.cached(&key) {
            return Ok(values);
        }

        let gate = self
            .inflight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = gate.lock();

        if let Some(values) = self.cached(&key) {
            return Ok(values);
        }

        let loaded = load();
        if let Ok(values) = &loaded {
            self.remember(&key, values);
        }
        self.inflight.remove(&key);
        loaded
    }

    fn remember(&self, key: &str, values: &[String]) {
        let stored = if values.is_empty() {
            self.store.mark_empty(key)
        } else {
            self.store.put(key, values)
        };
        if let Err(err) = stored {
            tracing::warn!(key, error = %err, "cache write failed");
        }
    }
}
