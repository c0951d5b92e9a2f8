//! Soft-reference decorator
//!
//! Values are pinned when stored and stay alive until one of two things
//! unpins them:
//!
//! - the retention bound: once more than `retention` values are pinned, the
//!   oldest pin is dropped on the next put;
//! - memory pressure: raising the layer's [`PressureSignal`] drops every pin
//!   on the next operation.
//!
//! An unpinned value survives as long as a caller or the hard-reference queue
//! still holds it. The hard-reference queue keeps the most recently *read*
//! values alive, so hot entries outlast a pressure event.

use super::reclaim::{PressureSignal, ReclaimCore, Reclaimable, Retention, DEFAULT_HARD_LINKS};
use super::traits::Cache;
use crate::error::CacheResult;
use crate::key::CacheKey;
use std::sync::Arc;

/// Default number of pinned values, as a multiple of the hard-reference queue
pub const DEFAULT_RETENTION_FACTOR: usize = 8;

/// Soft-reference decorator
pub struct SoftCache<V> {
    core: ReclaimCore<V>,
}

impl<V: Send + Sync + 'static> SoftCache<V> {
    pub fn new(delegate: Box<dyn Cache<Reclaimable<V>>>) -> Self {
        Self::with_options(
            delegate,
            DEFAULT_HARD_LINKS,
            DEFAULT_HARD_LINKS * DEFAULT_RETENTION_FACTOR,
            Arc::new(PressureSignal::new()),
        )
    }

    /// Create a soft layer with explicit bounds and a shared pressure signal
    pub fn with_options(
        delegate: Box<dyn Cache<Reclaimable<V>>>,
        hard_links: usize,
        retention: usize,
        pressure: Arc<PressureSignal>,
    ) -> Self {
        let retention = Retention::soft(retention, pressure);
        Self { core: ReclaimCore::new(delegate, hard_links, retention) }
    }

    /// Signal observed by this layer
    pub fn pressure(&self) -> &Arc<PressureSignal> {
        self.core.pressure()
    }

    pub fn hard_links(&self) -> usize {
        self.core.hard_link_capacity()
    }

    pub fn set_hard_links(&self, size: usize) {
        self.core.set_hard_link_capacity(size)
    }

    /// Values currently held by the hard-reference queue
    pub fn hard_link_count(&self) -> usize {
        self.core.hard_link_count()
    }

    pub fn retention(&self) -> usize {
        self.core.retention_limit().unwrap_or_default()
    }

    /// Unpin every stored value right away; returns how many were pinned
    pub fn relieve_pressure(&self) -> usize {
        self.core.release_pins()
    }

    /// Remove values nobody holds any more; returns how many
    pub fn purge_reclaimed(&self) -> usize {
        self.core.purge_reclaimed()
    }
}

impl<V: Send + Sync + 'static> Cache<V> for SoftCache<V> {
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
