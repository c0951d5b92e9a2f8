//! Single-populator decorator
//!
//! A `get` takes a per-key latch before looking the key up. A hit hands the
//! latch back at once. A miss keeps it: the caller is expected to compute the
//! value and `put` it (or `remove`/`release` the key), and every other caller
//! asking for the same key waits for that instead of computing it again.
//!
//! The latch belongs to the thread that took it. That thread passes straight
//! through on later reads of the same key, so a unit of work that missed a
//! key and deferred its `put` can read the key again without waiting on
//! itself.
//!
//! With a timeout configured, a waiter gives up with
//! [`CacheError::LockTimeout`]; without one it waits indefinitely.

use super::traits::Cache;
use crate::error::{CacheError, CacheResult};
use crate::key::CacheKey;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Latch {
    owner: ThreadId,
    released: Mutex<bool>,
    cv: Condvar,
}

impl Latch {
    fn new() -> Self {
        Self { owner: thread::current().id(), released: Mutex::new(false), cv: Condvar::new() }
    }

    fn open(&self) {
        *self.released.lock() = true;
        self.cv.notify_all();
    }
}

pub struct BlockingCache<V> {
    delegate: Box<dyn Cache<V>>,
    timeout: Option<Duration>,
    latches: Mutex<HashMap<CacheKey, Arc<Latch>>>,
}

impl<V: Send + Sync + 'static> BlockingCache<V> {
    pub fn new(delegate: Box<dyn Cache<V>>) -> Self {
        Self::with_timeout(delegate, None)
    }

    /// `None` waits forever
    pub fn with_timeout(delegate: Box<dyn Cache<V>>, timeout: Option<Duration>) -> Self {
        Self { delegate, timeout, latches: Mutex::new(HashMap::new()) }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Number of keys currently latched by a populating caller
    pub fn latched(&self) -> usize {
        self.latches.lock().len()
    }

    fn acquire_lock(&self, key: &CacheKey) -> CacheResult<()> {
        let started = Instant::now();
        loop {
            let latch = {
                let mut latches = self.latches.lock();
                match latches.get(key) {
                    Some(latch) if latch.owner == thread::current().id() => return Ok(()),
                    Some(latch) => latch.clone(),
                    None => {
                        latches.insert(key.clone(), Arc::new(Latch::new()));
                        return Ok(());
                    }
                }
            };

            let mut released = latch.released.lock();
            while !*released {
                match self.timeout {
                    None => latch.cv.wait(&mut released),
                    Some(timeout) => {
                        let remaining = timeout.checked_sub(started.elapsed()).unwrap_or_default();
                        if remaining.is_zero()
                            || (latch.cv.wait_for(&mut released, remaining).timed_out()
                                && !*released)
                        {
                            log::warn!(
                                "gave up waiting for key {} in cache {} after {:?}",
                                key,
                                self.id(),
                                timeout
                            );
                            return Err(CacheError::LockTimeout {
                                cache: self.id().to_string(),
                                key: key.to_string(),
                                waited: started.elapsed(),
                            });
                        }
                    }
                }
            }
        }
    }

    fn release_lock(&self, key: &CacheKey) {
        let latch = self.latches.lock().remove(key);
        if let Some(latch) = latch {
            latch.open();
        }
    }
}

impl<V: Send + Sync + 'static> Cache<V> for BlockingCache<V> {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: CacheKey, value: Arc<V>) -> CacheResult<()> {
        let result = self.delegate.put(key.clone(), value);
        self.release_lock(&key);
        result
    }

    fn get(&self, key: &CacheKey) -> CacheResult<Option<Arc<V>>> {
        self.acquire_lock(key)?;
        match self.delegate.get(key) {
            Ok(Some(value)) => {
                self.release_lock(key);
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(err) => {
                self.release_lock(key);
                Err(err)
            }
        }
    }

    fn remove(&self, key: &CacheKey) -> Option<Arc<V>> {
        let removed = self.delegate.remove(key);
        self.release_lock(key);
        removed
    }

    fn clear(&self) {
        self.delegate.clear()
    }

    fn size(&self) -> usize {
        self.delegate.size()
    }

    fn release(&self, key: &CacheKey) {
        self.release_lock(key);
        self.delegate.release(key)
    }
}
