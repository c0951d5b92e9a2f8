//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use lamina_core::prelude::*;
//! ```

// === Keys and the cache trait ===
pub use crate::cache::{Cache, CacheStats, SharedCache};
pub use crate::key::{CacheKey, KeyPart};

// === Chain construction ===
pub use crate::builder::{build_chain, CacheBuilder, CacheRegistry, Eviction, Implementation, Layer};
pub use crate::cache::PressureSignal;

// === Transactions ===
pub use crate::transaction::{TransactionalCache, TransactionalCacheManager};

// === Configuration ===
pub use crate::config::{CacheConfig, LaminaConfig};
pub use crate::logging::LoggingConfig;

// === Errors ===
pub use crate::error::{CacheError, CacheResult};
