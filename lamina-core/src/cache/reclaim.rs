//! Reclaimable value handles shared by [`SoftCache`](super::SoftCache) and
//! [`WeakCache`](super::WeakCache)
//!
//! Values are stored in the wrapped cache inside a [`Reclaimable`] handle that
//! holds a `Weak<V>` plus an optional strong pin. A value is reclaimed once
//! no strong reference remains anywhere: not in a caller, not in the
//! hard-reference queue, not in a pin. Reclaimed keys are discovered by
//! sweeping the layer's registry at the start of each operation and are then
//! removed from the wrapped cache.
//!
//! Both layers pin what they store. A collection cycle drops every pin: it
//! runs whenever the [`PressureSignal`] is raised and, for the weak layer,
//! every `collect_every` operations as well.
//!
//! Lock order: `registry` before any delegate call. The hard-reference queue
//! and the retention queue have their own locks and are never held together
//! with `registry`.

use super::traits::Cache;
use crate::error::CacheResult;
use crate::key::CacheKey;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

/// Default size of the hard-reference queue
pub const DEFAULT_HARD_LINKS: usize = 256;

/// Default number of operations between two weak-layer collection cycles
pub const DEFAULT_COLLECT_EVERY: usize = 64;

/// Handle stored in the wrapped cache in place of the value
#[derive(Debug)]
pub struct Reclaimable<V> {
    referent: Weak<V>,
    pin: Mutex<Option<Arc<V>>>,
}

impl<V> Reclaimable<V> {
    /// Handle that keeps the value alive until unpinned
    pub fn pinned(value: Arc<V>) -> Self {
        Self { referent: Arc::downgrade(&value), pin: Mutex::new(Some(value)) }
    }

    /// Handle that does not keep the value alive
    pub fn unpinned(value: &Arc<V>) -> Self {
        Self { referent: Arc::downgrade(value), pin: Mutex::new(None) }
    }

    pub fn upgrade(&self) -> Option<Arc<V>> {
        self.referent.upgrade()
    }

    /// Drop the pin; returns true if one was held
    pub fn unpin(&self) -> bool {
        self.pin.lock().take().is_some()
    }

    pub fn is_pinned(&self) -> bool {
        self.pin.lock().is_some()
    }

    pub fn is_reclaimed(&self) -> bool {
        self.referent.strong_count() == 0
    }
}

/// Shared memory-pressure signal
///
/// Raising the signal asks every soft or weak layer observing it to drop its
/// pins on its next operation.
#[derive(Debug, Default)]
pub struct PressureSignal {
    generation: AtomicU64,
}

impl PressureSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

/// How long a reclaimable layer keeps values alive on its own
pub(crate) enum Retention {
    /// Values are pinned until the next collection cycle
    Weak { collect_every: usize, ops: AtomicUsize, pressure: Arc<PressureSignal>, seen: AtomicU64 },
    /// Values are pinned until the retention bound or memory pressure unpins them
    Soft { limit: usize, pressure: Arc<PressureSignal>, seen: AtomicU64 },
}

impl Retention {
    pub(crate) fn weak(collect_every: usize, pressure: Arc<PressureSignal>) -> Self {
        let seen = AtomicU64::new(pressure.generation());
        Retention::Weak { collect_every, ops: AtomicUsize::new(0), pressure, seen }
    }

    pub(crate) fn soft(limit: usize, pressure: Arc<PressureSignal>) -> Self {
        let seen = AtomicU64::new(pressure.generation());
        Retention::Soft { limit, pressure, seen }
    }

    fn pressure(&self) -> &Arc<PressureSignal> {
        match self {
            Retention::Weak { pressure, .. } | Retention::Soft { pressure, .. } => pressure,
        }
    }
}

pub(crate) struct ReclaimCore<V> {
    delegate: Box<dyn Cache<Reclaimable<V>>>,
    registry: Mutex<HashMap<CacheKey, Weak<Reclaimable<V>>>>,
    hard_links: Mutex<VecDeque<Arc<V>>>,
    hard_link_capacity: AtomicUsize,
    pinned: Mutex<VecDeque<Weak<Reclaimable<V>>>>,
    retention: Retention,
}

impl<V: Send + Sync + 'static> ReclaimCore<V> {
    pub(crate) fn new(
        delegate: Box<dyn Cache<Reclaimable<V>>>,
        hard_links: usize,
        retention: Retention,
    ) -> Self {
        Self {
            delegate,
            registry: Mutex::new(HashMap::new()),
            hard_links: Mutex::new(VecDeque::new()),
            hard_link_capacity: AtomicUsize::new(hard_links),
            pinned: Mutex::new(VecDeque::new()),
            retention,
        }
    }

    pub(crate) fn id(&self) -> &str {
        self.delegate.id()
    }

    pub(crate) fn hard_link_capacity(&self) -> usize {
        self.hard_link_capacity.load(Ordering::Relaxed)
    }

    pub(crate) fn set_hard_link_capacity(&self, capacity: usize) {
        self.hard_link_capacity.store(capacity, Ordering::Relaxed);
        let mut links = self.hard_links.lock();
        while links.len() > capacity {
            links.pop_front();
        }
    }

    pub(crate) fn hard_link_count(&self) -> usize {
        self.hard_links.lock().len()
    }

    pub(crate) fn retention_limit(&self) -> Option<usize> {
        match &self.retention {
            Retention::Weak { .. } => None,
            Retention::Soft { limit, .. } => Some(*limit),
        }
    }

    pub(crate) fn collect_every(&self) -> Option<usize> {
        match &self.retention {
            Retention::Weak { collect_every, .. } => Some(*collect_every),
            Retention::Soft { .. } => None,
        }
    }

    pub(crate) fn pressure(&self) -> &Arc<PressureSignal> {
        self.retention.pressure()
    }

    /// Unpin every value held by this layer
    pub(crate) fn release_pins(&self) -> usize {
        self.pinned.lock().clear();
        let handles: Vec<Arc<Reclaimable<V>>> =
            self.registry.lock().values().filter_map(Weak::upgrade).collect();
        handles.iter().filter(|handle| handle.unpin()).count()
    }

    /// Run a collection cycle when the pressure signal moved or the weak
    /// layer's operation count reached its interval
    fn observe_collection(&self) {
        let (pressure, seen) = match &self.retention {
            Retention::Weak { pressure, seen, .. } | Retention::Soft { pressure, seen, .. } => {
                (pressure, seen)
            }
        };
        let generation = pressure.generation();
        let pressured = seen.swap(generation, Ordering::AcqRel) != generation;
        let scheduled = match &self.retention {
            Retention::Weak { collect_every, ops, .. } if *collect_every > 0 => {
                (ops.fetch_add(1, Ordering::AcqRel) + 1) % *collect_every == 0
            }
            _ => false,
        };

        if pressured || scheduled {
            let released = self.release_pins();
            if pressured {
                log::debug!("memory pressure on cache {}: released {} pins", self.id(), released);
            } else {
                log::trace!("collection cycle on cache {}: released {} pins", self.id(), released);
            }
        }
    }

    /// Remove reclaimed values from the wrapped cache; returns how many
    pub(crate) fn purge_reclaimed(&self) -> usize {
        self.observe_collection();

        let mut registry = self.registry.lock();
        let mut purged = Vec::new();
        registry.retain(|key, handle| match handle.upgrade() {
            // the wrapped cache already dropped this handle
            None => false,
            Some(handle) if handle.is_reclaimed() => {
                purged.push(key.clone());
                false
            }
            Some(_) => true,
        });
        for key in &purged {
            self.delegate.remove(key);
        }
        if !purged.is_empty() {
            log::trace!("cache {} purged {} reclaimed values", self.id(), purged.len());
        }
        purged.len()
    }

    fn remember_hard_link(&self, value: Arc<V>) {
        let capacity = self.hard_link_capacity();
        let mut links = self.hard_links.lock();
        links.push_back(value);
        if links.len() > capacity {
            links.pop_front();
        }
    }

    fn track_pin(&self, handle: &Arc<Reclaimable<V>>) {
        let Retention::Soft { limit, .. } = &self.retention else {
            return;
        };
        let mut pinned = self.pinned.lock();
        pinned.push_back(Arc::downgrade(handle));
        while pinned.len() > *limit {
            if let Some(oldest) = pinned.pop_front().and_then(|weak| weak.upgrade()) {
                oldest.unpin();
            }
        }
    }

    pub(crate) fn put(&self, key: CacheKey, value: Arc<V>) -> CacheResult<()> {
        self.purge_reclaimed();

        let handle = Arc::new(Reclaimable::pinned(value));
        {
            let mut registry = self.registry.lock();
            self.delegate.put(key.clone(), handle.clone())?;
            registry.insert(key, Arc::downgrade(&handle));
        }
        self.track_pin(&handle);
        Ok(())
    }

    pub(crate) fn get(&self, key: &CacheKey) -> CacheResult<Option<Arc<V>>> {
        self.purge_reclaimed();

        let Some(handle) = self.delegate.get(key)? else {
            return Ok(None);
        };
        match handle.upgrade() {
            Some(value) => {
                self.remember_hard_link(value.clone());
                Ok(Some(value))
            }
            None => {
                let mut registry = self.registry.lock();
                let current = registry.get(key).map(|w| w.as_ptr() == Arc::as_ptr(&handle));
                if current.unwrap_or(true) {
                    registry.remove(key);
                    self.delegate.remove(key);
                }
                Ok(None)
            }
        }
    }

    pub(crate) fn remove(&self, key: &CacheKey) -> Option<Arc<V>> {
        self.purge_reclaimed();
        let handle = {
            let mut registry = self.registry.lock();
            registry.remove(key);
            self.delegate.remove(key)?
        };
        handle.upgrade()
    }

    pub(crate) fn clear(&self) {
        self.hard_links.lock().clear();
        self.pinned.lock().clear();
        let mut registry = self.registry.lock();
        registry.clear();
        self.delegate.clear();
    }

    pub(crate) fn size(&self) -> usize {
        self.purge_reclaimed();
        self.delegate.size()
    }

    pub(crate) fn release(&self, key: &CacheKey) {
        self.delegate.release(key)
    }
}
