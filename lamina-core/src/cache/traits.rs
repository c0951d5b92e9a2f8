//! Core traits for cache layers

use crate::error::CacheResult;
use crate::key::CacheKey;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A cache shared between callers and transactions
pub type SharedCache<V> = Arc<dyn Cache<V>>;

/// Core caching trait
///
/// Every layer of a chain implements this trait. Decorators own the layer
/// they wrap and forward [`Cache::id`] unchanged, so a cache and any stack of
/// decorators over it share one identity. Values are stored as `Arc<V>`: all
/// readers of a layer without copy-on-read see the same instance and must
/// treat it as read-only.
///
/// Methods take `&self`. A layer guards its own bookkeeping with its own
/// lock; wrap a chain in [`SynchronizedCache`](super::SynchronizedCache) when
/// compound operations must not interleave.
pub trait Cache<V>: Send + Sync {
    /// Identifier shared by the base store and all its decorators
    fn id(&self) -> &str;

    /// Store a value
    fn put(&self, key: CacheKey, value: Arc<V>) -> CacheResult<()>;

    /// Look up a value; `Ok(None)` is a miss
    fn get(&self, key: &CacheKey) -> CacheResult<Option<Arc<V>>>;

    /// Remove a value, returning it if present
    fn remove(&self, key: &CacheKey) -> Option<Arc<V>>;

    /// Remove every value
    fn clear(&self);

    /// Number of values held by the innermost store
    fn size(&self) -> usize;

    /// A caller that observed a miss for `key` will not populate it.
    ///
    /// Only layers that hand out per-key latches act on this.
    fn release(&self, _key: &CacheKey) {}

    /// Check if the cache is empty
    fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

impl<V> PartialEq for dyn Cache<V> + '_ {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl<V> Eq for dyn Cache<V> + '_ {}

impl<V> Hash for dyn Cache<V> + '_ {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl<V> std::fmt::Debug for dyn Cache<V> + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache").field("id", &self.id()).field("size", &self.size()).finish()
    }
}

// Allow boxed and shared chains to be used wherever a layer is expected
impl<V, C: Cache<V> + ?Sized> Cache<V> for Box<C> {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn put(&self, key: CacheKey, value: Arc<V>) -> CacheResult<()> {
        (**self).put(key, value)
    }

    fn get(&self, key: &CacheKey) -> CacheResult<Option<Arc<V>>> {
        (**self).get(key)
    }

    fn remove(&self, key: &CacheKey) -> Option<Arc<V>> {
        (**self).remove(key)
    }

    fn clear(&self) {
        (**self).clear()
    }

    fn size(&self) -> usize {
        (**self).size()
    }

    fn release(&self, key: &CacheKey) {
        (**self).release(key)
    }
}

impl<V, C: Cache<V> + ?Sized> Cache<V> for Arc<C> {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn put(&self, key: CacheKey, value: Arc<V>) -> CacheResult<()> {
        (**self).put(key, value)
    }

    fn get(&self, key: &CacheKey) -> CacheResult<Option<Arc<V>>> {
        (**self).get(key)
    }

    fn remove(&self, key: &CacheKey) -> Option<Arc<V>> {
        (**self).remove(key)
    }

    fn clear(&self) {
        (**self).clear()
    }

    fn size(&self) -> usize {
        (**self).size()
    }

    fn release(&self, key: &CacheKey) {
        (**self).release(key)
    }
}

/// Statistics about cache usage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    /// Number of lookups
    pub requests: u64,
    /// Number of lookups that found a value
    pub hits: u64,
}

impl CacheStats {
    pub fn misses(&self) -> u64 {
        self.requests - self.hits
    }

    /// Calculate the hit rate (0.0 to 1.0)
    pub fn hit_ratio(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.hits as f64 / self.requests as f64
        }
    }
}
