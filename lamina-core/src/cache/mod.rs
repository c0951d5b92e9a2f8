//! Cache layers
//!
//! A cache is a chain of layers over a [`PerpetualCache`] base store. Every
//! layer implements [`Cache`], owns the layer it wraps, and reports the base
//! store's identifier, so any stack of decorators over a store compares
//! equal to the store itself.
//!
//! Eviction layers: [`FifoCache`], [`LruCache`], [`SoftCache`], [`WeakCache`].
//! Freshness: [`ScheduledCache`]. Access control and instrumentation:
//! [`SerializedCache`], [`LoggingCache`], [`SynchronizedCache`],
//! [`BlockingCache`].

pub mod blocking;
pub mod fifo;
pub mod logging;
pub mod lru;
pub mod perpetual;
pub mod reclaim;
pub mod scheduled;
pub mod serialized;
pub mod soft;
pub mod synchronized;
pub mod traits;
pub mod weak;

pub use blocking::BlockingCache;
pub use fifo::FifoCache;
pub use logging::LoggingCache;
pub use lru::LruCache;
pub use perpetual::PerpetualCache;
pub use reclaim::{PressureSignal, Reclaimable};
pub use scheduled::{Clock, ManualClock, ScheduledCache, SystemClock};
pub use serialized::SerializedCache;
pub use soft::SoftCache;
pub use synchronized::SynchronizedCache;
pub use traits::{Cache, CacheStats, SharedCache};
pub use weak::WeakCache;
