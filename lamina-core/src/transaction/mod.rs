//! Transactional buffering over shared caches
//!
//! A unit of work owns one [`TransactionalCacheManager`] and drives it to a
//! single `commit` or `rollback`. Nothing it writes is visible to other
//! readers of the shared caches before commit.

pub mod cache;
pub mod manager;

pub use cache::TransactionalCache;
pub use manager::TransactionalCacheManager;
