//! Configuration system for Lamina
//!
//! Values are resolved in the following order (highest priority wins):
//!
//! 1. **Code** (builder setters on [`CacheBuilder`](crate::builder::CacheBuilder))
//! 2. **Environment Variables** (`LAMINA_LOG_LEVEL`, `LAMINA_LOG_FORMAT`)
//! 3. **Config File** (lamina.toml)
//! 4. **Defaults**
//!
//! ```toml
//! [logging]
//! level = "debug"
//!
//! [caches.users]
//! eviction = "lru"
//! size = 2048
//!
//! [caches.sessions]
//! eviction = "soft"
//! read_write = false
//! properties = { retention = "4096" }
//! ```

pub mod cache;

pub use crate::logging::LoggingConfig;
pub use cache::CacheConfig;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Complete Lamina configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaminaConfig {
    pub logging: LoggingConfig,
    /// Cache namespaces by identifier
    pub caches: BTreeMap<String, CacheConfig>,
}

impl LaminaConfig {
    /// Load configuration with full supersedence chain
    pub fn load() -> Result<Self> {
        Self::load_from("lamina.toml")
    }

    /// Defaults, then the file if it exists, then the environment
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let mut config = Self::default();

        if path.exists() {
            let file_config = Self::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.merge(file_config);
        }

        config
            .apply_env_vars()
            .context("Failed to apply environment overrides")?;

        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.as_ref().display()))
    }

    /// Merge another config into this one (other takes priority)
    ///
    /// Namespaces present in `other` replace ours wholesale.
    pub fn merge(&mut self, other: Self) {
        self.logging.merge(other.logging);
        self.caches.extend(other.caches);
    }

    pub fn apply_env_vars(&mut self) -> Result<()> {
        self.logging.apply_env_vars()
    }

    pub fn validate(&self) -> Result<()> {
        self.logging.validate()?;
        for (id, cache) in &self.caches {
            if id.is_empty() {
                anyhow::bail!("Cache namespaces require a non-empty identifier");
            }
            cache.validate().with_context(|| format!("Invalid configuration for cache {}", id))?;
        }
        Ok(())
    }

    pub fn cache(&self, id: &str) -> Option<&CacheConfig> {
        self.caches.get(id)
    }
}
