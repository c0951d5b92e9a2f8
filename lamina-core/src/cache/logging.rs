//! Hit-ratio logging decorator

use super::traits::{Cache, CacheStats};
use crate::error::CacheResult;
use crate::key::CacheKey;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counts lookups and hits, logging the running hit ratio at debug level
pub struct LoggingCache<V> {
    delegate: Box<dyn Cache<V>>,
    requests: AtomicU64,
    hits: AtomicU64,
}

impl<V: Send + Sync + 'static> LoggingCache<V> {
    pub fn new(delegate: Box<dyn Cache<V>>) -> Self {
        Self { delegate, requests: AtomicU64::new(0), hits: AtomicU64::new(0) }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            requests: self.requests.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
        }
    }
}

impl<V: Send + Sync + 'static> Cache<V> for LoggingCache<V> {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: CacheKey, value: Arc<V>) -> CacheResult<()> {
        self.delegate.put(key, value)
    }

    fn get(&self, key: &CacheKey) -> CacheResult<Option<Arc<V>>> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let value = self.delegate.get(key)?;
        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        if log::log_enabled!(log::Level::Debug) {
            log::debug!("Cache Hit Ratio [{}]: {:.4}", self.id(), self.stats().hit_ratio());
        }
        Ok(value)
    }

    fn remove(&self, key: &CacheKey) -> Option<Arc<V>> {
        self.delegate.remove(key)
    }

    fn clear(&self) {
        self.delegate.clear()
    }

    fn size(&self) -> usize {
        self.delegate.size()
    }

    fn release(&self, key: &CacheKey) {
        self.delegate.release(key)
    }
}
