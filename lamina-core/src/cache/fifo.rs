//! FIFO (First In, First Out) eviction decorator
//!
//! Keeps a bounded queue of keys in put order. Every put appends its key,
//! even when the key is already queued, so the most recent put governs when a
//! key reaches the front. At most one entry is evicted per put.

use super::traits::Cache;
use crate::error::CacheResult;
use crate::key::CacheKey;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Default number of keys tracked before evicting
pub const DEFAULT_CAPACITY: usize = 1024;

struct FifoState {
    keys: VecDeque<CacheKey>,
    capacity: usize,
}

/// FIFO eviction decorator
pub struct FifoCache<V> {
    delegate: Box<dyn Cache<V>>,
    state: Mutex<FifoState>,
}

impl<V: Send + Sync + 'static> FifoCache<V> {
    pub fn new(delegate: Box<dyn Cache<V>>) -> Self {
        Self::with_capacity(delegate, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(delegate: Box<dyn Cache<V>>, capacity: usize) -> Self {
        Self { delegate, state: Mutex::new(FifoState { keys: VecDeque::new(), capacity }) }
    }

    /// Change the bound; a shrink is applied one eviction per later put
    pub fn set_capacity(&self, capacity: usize) {
        self.state.lock().capacity = capacity;
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().capacity
    }

    /// Queue `key` and pick the oldest key to evict if the queue is over capacity
    fn cycle_key_list(&self, key: &CacheKey) -> Option<CacheKey> {
        let mut state = self.state.lock();
        state.keys.push_back(key.clone());
        if state.keys.len() > state.capacity {
            state.keys.pop_front()
        } else {
            None
        }
    }
}

impl<V: Send + Sync + 'static> Cache<V> for FifoCache<V> {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: CacheKey, value: Arc<V>) -> CacheResult<()> {
        if let Some(oldest) = self.cycle_key_list(&key) {
            log::trace!("fifo cache {} evicting {}", self.id(), oldest);
            self.delegate.remove(&oldest);
        }
        self.delegate.put(key, value)
    }

    fn get(&self, key: &CacheKey) -> CacheResult<Option<Arc<V>>> {
        self.delegate.get(key)
    }

    fn remove(&self, key: &CacheKey) -> Option<Arc<V>> {
        self.delegate.remove(key)
    }

    fn clear(&self) {
        self.delegate.clear();
        self.state.lock().keys.clear();
    }

    fn size(&self) -> usize {
        self.delegate.size()
    }

    fn release(&self, key: &CacheKey) {
        self.delegate.release(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PerpetualCache;

    fn key(i: i64) -> CacheKey {
        CacheKey::from_parts(vec![i])
    }

    fn fifo(capacity: usize) -> FifoCache<i64> {
        FifoCache::with_capacity(Box::new(PerpetualCache::<i64>::new("fifo").unwrap()), capacity)
    }

    #[test]
    fn test_evicts_first_inserted() {
        let cache = fifo(5);
        for i in 0..6 {
            cache.put(key(i), Arc::new(i)).unwrap();
        }

        assert!(cache.get(&key(0)).unwrap().is_none());
        for i in 1..6 {
            assert_eq!(cache.get(&key(i)).unwrap().as_deref(), Some(&i));
        }
        assert_eq!(cache.size(), 5);
    }

    #[test]
    fn test_reads_do_not_change_order() {
        let cache = fifo(2);
        cache.put(key(0), Arc::new(0)).unwrap();
        cache.put(key(1), Arc::new(1)).unwrap();
        cache.get(&key(0)).unwrap();
        cache.put(key(2), Arc::new(2)).unwrap();

        assert!(cache.get(&key(0)).unwrap().is_none());
        assert!(cache.get(&key(1)).unwrap().is_some());
    }

    #[test]
    fn test_reinsert_queues_a_new_slot() {
        let cache = fifo(2);
        cache.put(key(0), Arc::new(0)).unwrap();
        cache.put(key(0), Arc::new(10)).unwrap();
        // queue is [0, 0]; the next put pops the first slot of key 0
        cache.put(key(1), Arc::new(1)).unwrap();
        assert!(cache.get(&key(0)).unwrap().is_none());
        assert_eq!(cache.size(), 1);

        // an evicted slot of the key being put does not drop the new value
        let cache = fifo(1);
        cache.put(key(7), Arc::new(1)).unwrap();
        cache.put(key(7), Arc::new(2)).unwrap();
        assert_eq!(cache.get(&key(7)).unwrap().as_deref(), Some(&2));
    }

    #[test]
    fn test_shrink_evicts_one_per_put() {
        let cache = fifo(4);
        for i in 0..4 {
            cache.put(key(i), Arc::new(i)).unwrap();
        }
        cache.set_capacity(2);
        cache.put(key(4), Arc::new(4)).unwrap();

        assert_eq!(cache.size(), 4);
        assert!(cache.get(&key(0)).unwrap().is_none());
        assert!(cache.get(&key(1)).unwrap().is_some());
    }

    #[test]
    fn test_clear_empties_queue() {
        let cache = fifo(2);
        cache.put(key(0), Arc::new(0)).unwrap();
        cache.put(key(1), Arc::new(1)).unwrap();
        cache.clear();
        assert_eq!(cache.size(), 0);

        cache.put(key(2), Arc::new(2)).unwrap();
        cache.put(key(3), Arc::new(3)).unwrap();
        assert_eq!(cache.size(), 2);
    }
}
