//! Lamina - Core
//!
//! Composable cache chains with transactional write buffering.
//!
//! # Overview
//!
//! A cache is a stack of decorators over an unbounded base store. Each
//! decorator adds one policy (eviction, scheduled flushing, copy-on-read,
//! hit-ratio logging, serialized access, single-populator blocking) and the
//! whole stack keeps the base store's identifier. Units of work read and
//! write through a [`TransactionalCacheManager`], which hides their writes
//! from everyone else until commit.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lamina_core::prelude::*;
//! use std::sync::Arc;
//!
//! let users: SharedCache<String> = CacheBuilder::new("users")
//!     .eviction(Eviction::Fifo)
//!     .size(512)
//!     .build()?;
//!
//! let mut tx = TransactionalCacheManager::new();
//! let key = CacheKey::from_parts(vec![KeyPart::from("user"), KeyPart::from(42)]);
//! if tx.get_object(&users, &key)?.is_none() {
//!     tx.put_object(&users, key, Arc::new("ada".to_string()));
//! }
//! tx.commit()?;
//! ```
//!
//! # Architecture
//!
//! - [`key`] - Composite cache keys
//! - [`cache`] - The [`Cache`] trait, the base store and every decorator
//! - [`builder`] - Turning configuration into decorator chains
//! - [`transaction`] - Per-transaction write buffering
//! - [`config`] - TOML configuration with environment overrides
//! - [`logging`] - Optional process-wide logger over the `log` facade

pub mod builder;
pub mod cache;
pub mod config; // TOML configuration per cache namespace
pub mod error;
pub mod key;
pub mod logging; // Logger installation for binaries
pub mod transaction;

// Prelude module for convenient imports
pub mod prelude;

// Re-exports of main types and traits
pub use builder::{build_chain, CacheBuilder, CacheRegistry, Eviction, Implementation, Layer};
pub use cache::{Cache, SharedCache};
pub use config::LaminaConfig;
pub use error::{CacheError, CacheResult};
pub use key::{CacheKey, KeyPart};
pub use transaction::{TransactionalCache, TransactionalCacheManager};
