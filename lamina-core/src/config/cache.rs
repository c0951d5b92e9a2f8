//! Per-namespace cache configuration

use crate::builder::{Eviction, Implementation};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// One cache namespace
///
/// ```toml
/// [caches.users]
/// eviction = "fifo"
/// size = 512
/// flush_interval = 60000
/// blocking = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Base store
    /// Default: "perpetual"
    pub implementation: String,

    /// Eviction decorator: "lru", "fifo", "soft" or "weak"
    /// Default: "lru"
    pub eviction: String,

    /// Capacity for lru/fifo, hard-reference count for soft/weak
    /// Default: 1024 (lru/fifo), 256 (soft/weak)
    pub size: Option<usize>,

    /// Milliseconds between scheduled flushes, 0 = never
    /// Default: 0
    pub flush_interval: u64,

    /// Hand every reader its own copy of a cached value
    /// Default: true
    pub read_write: bool,

    /// Let one caller populate a missing key while others wait
    /// Default: false
    pub blocking: bool,

    /// Milliseconds a blocked reader waits, 0 = forever
    /// Default: 0
    pub blocking_timeout: u64,

    /// Extra settings for the eviction decorator
    pub properties: BTreeMap<String, String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            implementation: "perpetual".to_string(),
            eviction: "lru".to_string(),
            size: None,
            flush_interval: 0,
            read_write: true,
            blocking: false,
            blocking_timeout: 0,
            properties: BTreeMap::new(),
        }
    }
}

impl CacheConfig {
    pub fn flush_interval(&self) -> Option<Duration> {
        (self.flush_interval > 0).then(|| Duration::from_millis(self.flush_interval))
    }

    pub fn blocking_timeout(&self) -> Option<Duration> {
        (self.blocking_timeout > 0).then(|| Duration::from_millis(self.blocking_timeout))
    }

    pub fn validate(&self) -> Result<()> {
        self.implementation.parse::<Implementation>()?;
        self.eviction.parse::<Eviction>()?;

        if self.size == Some(0) {
            bail!("Invalid size: must be greater than 0");
        }

        if self.blocking_timeout > 0 && !self.blocking {
            bail!("Invalid blocking_timeout: only applies when blocking is enabled");
        }

        Ok(())
    }
}
