//! One unit of work's set of transactional caches

use super::cache::TransactionalCache;
use crate::cache::SharedCache;
use crate::error::CacheResult;
use crate::key::CacheKey;
use indexmap::IndexMap;
use std::sync::Arc;

/// Holds exactly one [`TransactionalCache`] per shared cache identifier
///
/// Participants are created on first use and committed or rolled back as a
/// group. There is no atomicity across caches: [`commit`](Self::commit) stops
/// at the first participant that fails and returns its error, leaving the
/// remaining participants pending so the caller can still roll them back.
pub struct TransactionalCacheManager<V> {
    transactional_caches: IndexMap<String, TransactionalCache<V>>,
}

impl<V: Send + Sync + 'static> Default for TransactionalCacheManager<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Send + Sync + 'static> TransactionalCacheManager<V> {
    pub fn new() -> Self {
        Self { transactional_caches: IndexMap::new() }
    }

    pub fn get_object(&mut self, cache: &SharedCache<V>, key: &CacheKey) -> CacheResult<Option<Arc<V>>> {
        self.transactional_cache(cache).get_object(key)
    }

    pub fn put_object(&mut self, cache: &SharedCache<V>, key: CacheKey, value: Arc<V>) {
        self.transactional_cache(cache).put_object(key, value)
    }

    pub fn clear(&mut self, cache: &SharedCache<V>) {
        self.transactional_cache(cache).clear()
    }

    pub fn commit(&mut self) -> CacheResult<()> {
        while let Some((id, mut participant)) = self.transactional_caches.shift_remove_index(0) {
            if let Err(err) = participant.commit() {
                log::warn!("commit of cache {} failed: {}", id, err);
                self.transactional_caches.shift_insert(0, id, participant);
                return Err(err);
            }
        }
        Ok(())
    }

    pub fn rollback(&mut self) {
        for (_, mut participant) in self.transactional_caches.drain(..) {
            participant.rollback();
        }
    }

    /// Number of caches touched since the last commit or rollback
    pub fn participants(&self) -> usize {
        self.transactional_caches.len()
    }

    fn transactional_cache(&mut self, cache: &SharedCache<V>) -> &mut TransactionalCache<V> {
        self.transactional_caches
            .entry(cache.id().to_string())
            .or_insert_with(|| TransactionalCache::new(Arc::clone(cache)))
    }
}
