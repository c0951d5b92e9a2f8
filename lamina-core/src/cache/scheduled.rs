//! Time-windowed flushing decorator
//!
//! Clears the wrapped cache once `clear_interval` has elapsed since the last
//! clear. The check runs inline, on the calling thread, before every
//! `get`/`put`/`remove`/`size`; there is no timer thread. A lookup that
//! triggers the flush therefore always misses.

use super::traits::Cache;
use crate::error::CacheResult;
use crate::key::CacheKey;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default flush window
pub const DEFAULT_CLEAR_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`]
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self { origin: Instant::now(), offset: Mutex::new(Duration::ZERO) }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock()
    }
}

/// Flushes the wrapped cache at most once per interval
pub struct ScheduledCache<V> {
    delegate: Box<dyn Cache<V>>,
    clear_interval: Duration,
    last_clear: Mutex<Instant>,
    clock: Arc<dyn Clock>,
}

impl<V: Send + Sync + 'static> ScheduledCache<V> {
    pub fn new(delegate: Box<dyn Cache<V>>) -> Self {
        Self::with_interval(delegate, DEFAULT_CLEAR_INTERVAL)
    }

    pub fn with_interval(delegate: Box<dyn Cache<V>>, clear_interval: Duration) -> Self {
        Self::with_clock(delegate, clear_interval, Arc::new(SystemClock))
    }

    pub fn with_clock(
        delegate: Box<dyn Cache<V>>,
        clear_interval: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let last_clear = Mutex::new(clock.now());
        Self { delegate, clear_interval, last_clear, clock }
    }

    pub fn clear_interval(&self) -> Duration {
        self.clear_interval
    }

    /// Clear the delegate if the window has elapsed; returns true if it did
    fn clear_when_stale(&self) -> bool {
        let now = self.clock.now();
        let mut last_clear = self.last_clear.lock();
        if now.saturating_duration_since(*last_clear) > self.clear_interval {
            log::debug!("scheduled flush of cache {}", self.delegate.id());
            self.delegate.clear();
            *last_clear = now;
            true
        } else {
            false
        }
    }
}

impl<V: Send + Sync + 'static> Cache<V> for ScheduledCache<V> {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: CacheKey, value: Arc<V>) -> CacheResult<()> {
        self.clear_when_stale();
        self.delegate.put(key, value)
    }

    fn get(&self, key: &CacheKey) -> CacheResult<Option<Arc<V>>> {
        if self.clear_when_stale() {
            // The key may be latched by a blocking layer below; let it go
            self.delegate.release(key);
            Ok(None)
        } else {
            self.delegate.get(key)
        }
    }

    fn remove(&self, key: &CacheKey) -> Option<Arc<V>> {
        self.clear_when_stale();
        self.delegate.remove(key)
    }

    fn clear(&self) {
        let mut last_clear = self.last_clear.lock();
        *last_clear = self.clock.now();
        self.delegate.clear();
    }

    fn size(&self) -> usize {
        self.clear_when_stale();
        self.delegate.size()
    }

    fn release(&self, key: &CacheKey) {
        self.delegate.release(key)
    }
}
