//! Unbounded base store
//!
//! The innermost layer of every chain: a plain map from key to value with no
//! eviction. Decorators decide what to evict; this store only holds values.

use super::traits::Cache;
use crate::error::{CacheError, CacheResult};
use crate::key::CacheKey;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Base cache store
pub struct PerpetualCache<V> {
    id: String,
    entries: Mutex<HashMap<CacheKey, Arc<V>>>,
}

impl<V> PerpetualCache<V> {
    /// Create a new store with the given identifier
    pub fn new(id: impl Into<String>) -> CacheResult<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(CacheError::MissingId);
        }
        Ok(Self { id, entries: Mutex::new(HashMap::new()) })
    }

    /// True if `key` is stored, without touching any decorator bookkeeping
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.lock().contains_key(key)
    }
}

impl<V: Send + Sync> Cache<V> for PerpetualCache<V> {
    fn id(&self) -> &str {
        &self.id
    }

    fn put(&self, key: CacheKey, value: Arc<V>) -> CacheResult<()> {
        self.entries.lock().insert(key, value);
        Ok(())
    }

    fn get(&self, key: &CacheKey) -> CacheResult<Option<Arc<V>>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn remove(&self, key: &CacheKey) -> Option<Arc<V>> {
        self.entries.lock().remove(key)
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }

    fn size(&self) -> usize {
        self.entries.lock().len()
    }
}
