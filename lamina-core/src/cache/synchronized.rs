//! Serializing decorator
//!
//! Every call into the wrapped chain runs under one mutex, so compound
//! operations inside the chain (an LRU put and its eviction, a scheduled
//! flush and the lookup that triggered it) are never interleaved between
//! callers.

use super::traits::Cache;
use crate::error::CacheResult;
use crate::key::CacheKey;
use parking_lot::Mutex;
use std::sync::Arc;

pub struct SynchronizedCache<V> {
    delegate: Box<dyn Cache<V>>,
    lock: Mutex<()>,
}

impl<V: Send + Sync + 'static> SynchronizedCache<V> {
    pub fn new(delegate: Box<dyn Cache<V>>) -> Self {
        Self { delegate, lock: Mutex::new(()) }
    }
}

impl<V: Send + Sync + 'static> Cache<V> for SynchronizedCache<V> {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: CacheKey, value: Arc<V>) -> CacheResult<()> {
        let _guard = self.lock.lock();
        self.delegate.put(key, value)
    }

    fn get(&self, key: &CacheKey) -> CacheResult<Option<Arc<V>>> {
        let _guard = self.lock.lock();
        self.delegate.get(key)
    }

    fn remove(&self, key: &CacheKey) -> Option<Arc<V>> {
        let _guard = self.lock.lock();
        self.delegate.remove(key)
    }

    fn clear(&self) {
        let _guard = self.lock.lock();
        self.delegate.clear()
    }

    fn size(&self) -> usize {
        let _guard = self.lock.lock();
        self.delegate.size()
    }

    fn release(&self, key: &CacheKey) {
        let _guard = self.lock.lock();
        self.delegate.release(key)
    }
}
