//! Weak-reference decorator
//!
//! Same structure as [`SoftCache`](super::SoftCache) with a shorter lease:
//! every stored value is pinned only until the layer's next collection cycle.
//! A cycle runs every `collect_every` operations (puts, reads, removals and
//! size queries) and whenever the shared [`PressureSignal`] is raised. After
//! that a value stays reachable only while a caller or the hard-reference
//! queue holds a strong reference to it.

use super::reclaim::{
    PressureSignal, ReclaimCore, Reclaimable, Retention, DEFAULT_COLLECT_EVERY, DEFAULT_HARD_LINKS,
};
use super::traits::Cache;
use crate::error::CacheResult;
use crate::key::CacheKey;
use std::sync::Arc;

/// Weak-reference decorator
pub struct WeakCache<V> {
    core: ReclaimCore<V>,
}

impl<V: Send + Sync + 'static> WeakCache<V> {
    pub fn new(delegate: Box<dyn Cache<Reclaimable<V>>>) -> Self {
        Self::with_options(
            delegate,
            DEFAULT_HARD_LINKS,
            DEFAULT_COLLECT_EVERY,
            Arc::new(PressureSignal::new()),
        )
    }

    pub fn with_hard_links(delegate: Box<dyn Cache<Reclaimable<V>>>, hard_links: usize) -> Self {
        Self::with_options(delegate, hard_links, DEFAULT_COLLECT_EVERY, Arc::new(PressureSignal::new()))
    }

    /// `collect_every = 0` leaves collection to the pressure signal alone
    pub fn with_options(
        delegate: Box<dyn Cache<Reclaimable<V>>>,
        hard_links: usize,
        collect_every: usize,
        pressure: Arc<PressureSignal>,
    ) -> Self {
        let retention = Retention::weak(collect_every, pressure);
        Self { core: ReclaimCore::new(delegate, hard_links, retention) }
    }

    pub fn pressure(&self) -> &Arc<PressureSignal> {
        self.core.pressure()
    }

    pub fn collect_every(&self) -> usize {
        self.core.collect_every().unwrap_or_default()
    }

    pub fn hard_links(&self) -> usize {
        self.core.hard_link_capacity()
    }

    pub fn set_hard_links(&self, size: usize) {
        self.core.set_hard_link_capacity(size)
    }

    pub fn hard_link_count(&self) -> usize {
        self.core.hard_link_count()
    }

    /// Run a collection cycle now; returns how many values were pinned
    pub fn collect(&self) -> usize {
        self.core.release_pins()
    }

    /// Remove values nobody holds any more; returns how many
    pub fn purge_reclaimed(&self) -> usize {
        self.core.purge_reclaimed()
    }
}

impl<V: Send + Sync + 'static> Cache<V> for WeakCache<V> {
    fn id(&self) -> &str {
        self.core.id()
    }

    fn put(&self, key: CacheKey, value: Arc<V>) -> CacheResult<()> {
        self.core.put(key, value)
    }

    fn get(&self, key: &CacheKey) -> CacheResult<Option<Arc<V>>> {
        self.core.get(key)
    }

    fn remove(&self, key: &CacheKey) -> Option<Arc<V>> {
        self.core.remove(key)
    }

    fn clear(&self) {
        self.core.clear()
    }

    fn size(&self) -> usize {
        self.core.size()
    }

    fn release(&self, key: &CacheKey) {
        self.core.release(key)
    }
}
