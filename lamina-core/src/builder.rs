//! Decorator chain construction
//!
//! A [`CacheBuilder`] turns the per-namespace settings into an ordered list of
//! [`Layer`]s, innermost first, and stacks them over a fresh
//! [`PerpetualCache`]:
//!
//! ```text
//! eviction -> scheduled? -> serialized? -> logging -> synchronized -> blocking?
//! ```
//!
//! Explicit layer lists go through [`build_chain`], which checks the two
//! stacking rules: reclaimable layers wrap the base store directly, and at
//! most one serialized layer appears.

use crate::cache::reclaim::{DEFAULT_COLLECT_EVERY, DEFAULT_HARD_LINKS};
use crate::cache::soft::DEFAULT_RETENTION_FACTOR;
use crate::cache::{
    fifo, lru, BlockingCache, Cache, FifoCache, LoggingCache, LruCache, PerpetualCache,
    PressureSignal, Reclaimable, ScheduledCache, SerializedCache, SharedCache, SoftCache,
    SynchronizedCache, WeakCache,
};
use crate::config::{CacheConfig, LaminaConfig};
use crate::error::{CacheError, CacheResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Base store kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Implementation {
    #[default]
    Perpetual,
}

impl FromStr for Implementation {
    type Err = CacheError;

    fn from_str(s: &str) -> CacheResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "perpetual" => Ok(Implementation::Perpetual),
            _ => Err(CacheError::UnknownImplementation(s.to_string())),
        }
    }
}

impl fmt::Display for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Implementation::Perpetual => write!(f, "perpetual"),
        }
    }
}

/// Eviction decorator placed directly over the base store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Eviction {
    #[default]
    Lru,
    Fifo,
    Soft,
    Weak,
}

impl Eviction {
    /// Capacity used when neither `size` nor the `size` property is set
    pub fn default_size(self) -> usize {
        match self {
            Eviction::Lru => lru::DEFAULT_CAPACITY,
            Eviction::Fifo => fifo::DEFAULT_CAPACITY,
            Eviction::Soft | Eviction::Weak => DEFAULT_HARD_LINKS,
        }
    }
}

impl FromStr for Eviction {
    type Err = CacheError;

    fn from_str(s: &str) -> CacheResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "lru" => Ok(Eviction::Lru),
            "fifo" => Ok(Eviction::Fifo),
            "soft" => Ok(Eviction::Soft),
            "weak" => Ok(Eviction::Weak),
            _ => Err(CacheError::UnknownEviction(s.to_string())),
        }
    }
}

impl fmt::Display for Eviction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Eviction::Lru => "lru",
            Eviction::Fifo => "fifo",
            Eviction::Soft => "soft",
            Eviction::Weak => "weak",
        };
        f.write_str(name)
    }
}

/// One decorator in a chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layer {
    Lru { capacity: usize },
    Fifo { capacity: usize },
    Soft { hard_refs: usize, retention: usize },
    Weak { hard_refs: usize, collect_every: usize },
    Scheduled { interval: Duration },
    Serialized,
    Logging,
    Synchronized,
    Blocking { timeout: Option<Duration> },
}

impl Layer {
    fn is_reclaimable(&self) -> bool {
        matches!(self, Layer::Soft { .. } | Layer::Weak { .. })
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layer::Lru { capacity } => write!(f, "lru(capacity={})", capacity),
            Layer::Fifo { capacity } => write!(f, "fifo(capacity={})", capacity),
            Layer::Soft { hard_refs, retention } => {
                write!(f, "soft(hard_refs={}, retention={})", hard_refs, retention)
            }
            Layer::Weak { hard_refs, collect_every } => {
                write!(f, "weak(hard_refs={}, collect_every={})", hard_refs, collect_every)
            }
            Layer::Scheduled { interval } => write!(f, "scheduled(interval={:?})", interval),
            Layer::Serialized => write!(f, "serialized"),
            Layer::Logging => write!(f, "logging"),
            Layer::Synchronized => write!(f, "synchronized"),
            Layer::Blocking { timeout: Some(timeout) } => {
                write!(f, "blocking(timeout={:?})", timeout)
            }
            Layer::Blocking { timeout: None } => write!(f, "blocking"),
        }
    }
}

/// Fluent construction of one cache namespace
#[derive(Debug, Clone)]
pub struct CacheBuilder {
    id: String,
    implementation: Implementation,
    eviction: Eviction,
    size: Option<usize>,
    flush_interval: Option<Duration>,
    read_write: bool,
    blocking: bool,
    blocking_timeout: Option<Duration>,
    properties: BTreeMap<String, String>,
    pressure: Option<Arc<PressureSignal>>,
}

impl CacheBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            implementation: Implementation::default(),
            eviction: Eviction::default(),
            size: None,
            flush_interval: None,
            read_write: true,
            blocking: false,
            blocking_timeout: None,
            properties: BTreeMap::new(),
            pressure: None,
        }
    }

    /// Builder for a configured namespace; fails on unknown names
    pub fn from_config(id: impl Into<String>, config: &CacheConfig) -> CacheResult<Self> {
        let mut builder = Self::new(id)
            .implementation(config.implementation.parse()?)
            .eviction(config.eviction.parse()?)
            .flush_interval(config.flush_interval())
            .read_write(config.read_write)
            .blocking(config.blocking)
            .blocking_timeout(config.blocking_timeout());
        builder.size = config.size;
        builder.properties = config.properties.clone();
        Ok(builder)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn implementation(mut self, implementation: Implementation) -> Self {
        self.implementation = implementation;
        self
    }

    pub fn eviction(mut self, eviction: Eviction) -> Self {
        self.eviction = eviction;
        self
    }

    pub fn size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    /// `None` disables scheduled flushing
    pub fn flush_interval(mut self, interval: Option<Duration>) -> Self {
        self.flush_interval = interval.filter(|interval| !interval.is_zero());
        self
    }

    pub fn read_write(mut self, read_write: bool) -> Self {
        self.read_write = read_write;
        self
    }

    pub fn blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    /// `None` waits forever
    pub fn blocking_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.blocking_timeout = timeout.filter(|timeout| !timeout.is_zero());
        self
    }

    pub fn property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Signal that makes a soft layer drop its pins; a fresh one is used otherwise
    pub fn pressure_signal(mut self, pressure: Arc<PressureSignal>) -> Self {
        self.pressure = Some(pressure);
        self
    }

    /// The chain this builder would assemble, innermost first
    pub fn layers(&self) -> CacheResult<Vec<Layer>> {
        if self.id.is_empty() {
            return Err(CacheError::MissingId);
        }

        let mut layers = vec![self.eviction_layer()?];
        if let Some(interval) = self.flush_interval {
            layers.push(Layer::Scheduled { interval });
        }
        if self.read_write {
            layers.push(Layer::Serialized);
        }
        layers.push(Layer::Logging);
        layers.push(Layer::Synchronized);
        if self.blocking {
            layers.push(Layer::Blocking { timeout: self.blocking_timeout });
        }
        Ok(layers)
    }

    pub fn build<V>(&self) -> CacheResult<SharedCache<V>>
    where
        V: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let layers = self.layers()?;
        let pressure = self.pressure.clone().unwrap_or_default();
        assemble(&self.id, &layers, pressure)
    }

    /// Eviction layer with the `size` and `retention` properties applied
    fn eviction_layer(&self) -> CacheResult<Layer> {
        let mut size = self.size.unwrap_or_else(|| self.eviction.default_size());
        let mut retention = None;
        let mut collect_every = None;

        for (name, value) in &self.properties {
            match name.as_str() {
                "size" => size = self.parse_count(name, value)?,
                "retention" if self.eviction == Eviction::Soft => {
                    retention = Some(self.parse_count(name, value)?)
                }
                "collect_every" if self.eviction == Eviction::Weak => {
                    collect_every = Some(self.parse_count(name, value)?)
                }
                _ => {
                    return Err(CacheError::UnknownProperty {
                        cache: self.id.clone(),
                        property: name.clone(),
                    })
                }
            }
        }

        Ok(match self.eviction {
            Eviction::Lru => Layer::Lru { capacity: size },
            Eviction::Fifo => Layer::Fifo { capacity: size },
            Eviction::Soft => Layer::Soft {
                hard_refs: size,
                retention: retention.unwrap_or(size * DEFAULT_RETENTION_FACTOR),
            },
            Eviction::Weak => Layer::Weak {
                hard_refs: size,
                collect_every: collect_every.unwrap_or(DEFAULT_COLLECT_EVERY),
            },
        })
    }

    fn parse_count(&self, name: &str, value: &str) -> CacheResult<usize> {
        match value.trim().parse::<usize>() {
            Ok(count) if count > 0 => Ok(count),
            _ => Err(CacheError::InvalidProperty {
                cache: self.id.clone(),
                property: name.to_string(),
                value: value.to_string(),
            }),
        }
    }
}

/// Stack an explicit list of layers, innermost first, over a new base store
pub fn build_chain<V>(id: &str, layers: &[Layer]) -> CacheResult<SharedCache<V>>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    assemble(id, layers, Arc::new(PressureSignal::new()))
}

fn assemble<V>(id: &str, layers: &[Layer], pressure: Arc<PressureSignal>) -> CacheResult<SharedCache<V>>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    if id.is_empty() {
        return Err(CacheError::MissingId);
    }
    validate_chain(id, layers)?;

    let cache: Box<dyn Cache<V>> = match layers.iter().position(|l| *l == Layer::Serialized) {
        Some(split) => {
            let bytes = stack::<Vec<u8>>(id, &layers[..split], &pressure)?;
            let mut cache: Box<dyn Cache<V>> = Box::new(SerializedCache::new(bytes));
            for layer in &layers[split + 1..] {
                cache = decorate(id, cache, layer)?;
            }
            cache
        }
        None => stack::<V>(id, layers, &pressure)?,
    };

    log::debug!("built cache {}: {}", id, describe(layers));
    Ok(Arc::from(cache))
}

fn validate_chain(id: &str, layers: &[Layer]) -> CacheResult<()> {
    let invalid = |reason: &str| CacheError::InvalidChain {
        cache: id.to_string(),
        reason: reason.to_string(),
    };

    if layers.iter().skip(1).any(Layer::is_reclaimable) {
        return Err(invalid("soft and weak layers must wrap the base store directly"));
    }
    if layers.iter().filter(|l| **l == Layer::Serialized).count() > 1 {
        return Err(invalid("at most one serialized layer is allowed"));
    }
    let zero_capacity = layers.iter().any(|layer| match layer {
        Layer::Lru { capacity } | Layer::Fifo { capacity } => *capacity == 0,
        Layer::Soft { hard_refs, retention } => *hard_refs == 0 || *retention == 0,
        Layer::Weak { hard_refs, .. } => *hard_refs == 0,
        _ => false,
    });
    if zero_capacity {
        return Err(invalid("capacities must be greater than 0"));
    }
    Ok(())
}

/// Base store plus every layer up to the first type-changing one
fn stack<T: Send + Sync + 'static>(
    id: &str,
    layers: &[Layer],
    pressure: &Arc<PressureSignal>,
) -> CacheResult<Box<dyn Cache<T>>> {
    let (mut cache, rest): (Box<dyn Cache<T>>, &[Layer]) = match layers.first() {
        Some(Layer::Soft { hard_refs, retention }) => {
            let store = PerpetualCache::<Reclaimable<T>>::new(id)?;
            let soft =
                SoftCache::with_options(Box::new(store), *hard_refs, *retention, pressure.clone());
            (Box::new(soft), &layers[1..])
        }
        Some(Layer::Weak { hard_refs, collect_every }) => {
            let store = PerpetualCache::<Reclaimable<T>>::new(id)?;
            let weak =
                WeakCache::with_options(Box::new(store), *hard_refs, *collect_every, pressure.clone());
            (Box::new(weak), &layers[1..])
        }
        _ => (Box::new(PerpetualCache::<T>::new(id)?), layers),
    };

    for layer in rest {
        cache = decorate(id, cache, layer)?;
    }
    Ok(cache)
}

fn decorate<T: Send + Sync + 'static>(
    id: &str,
    inner: Box<dyn Cache<T>>,
    layer: &Layer,
) -> CacheResult<Box<dyn Cache<T>>> {
    Ok(match layer {
        Layer::Lru { capacity } => Box::new(LruCache::with_capacity(inner, *capacity)),
        Layer::Fifo { capacity } => Box::new(FifoCache::with_capacity(inner, *capacity)),
        Layer::Scheduled { interval } => Box::new(ScheduledCache::with_interval(inner, *interval)),
        Layer::Logging => Box::new(LoggingCache::new(inner)),
        Layer::Synchronized => Box::new(SynchronizedCache::new(inner)),
        Layer::Blocking { timeout } => Box::new(BlockingCache::with_timeout(inner, *timeout)),
        Layer::Soft { .. } | Layer::Weak { .. } | Layer::Serialized => {
            return Err(CacheError::InvalidChain {
                cache: id.to_string(),
                reason: format!("{} cannot be stacked at this position", layer),
            })
        }
    })
}

/// Render a chain as `base -> layer -> layer`
pub fn describe(layers: &[Layer]) -> String {
    let mut out = Implementation::Perpetual.to_string();
    for layer in layers {
        out.push_str(" -> ");
        out.push_str(&layer.to_string());
    }
    out
}

/// Every configured namespace, built and ready to share
pub struct CacheRegistry<V> {
    caches: BTreeMap<String, SharedCache<V>>,
}

impl<V> Default for CacheRegistry<V> {
    fn default() -> Self {
        Self { caches: BTreeMap::new() }
    }
}

impl<V> CacheRegistry<V>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn from_config(config: &LaminaConfig) -> CacheResult<Self> {
        let mut registry = Self::default();
        for (id, cache) in &config.caches {
            registry.register(CacheBuilder::from_config(id.as_str(), cache)?.build()?);
        }
        Ok(registry)
    }

    /// Add a cache under its own identifier, returning any cache it replaces
    pub fn register(&mut self, cache: SharedCache<V>) -> Option<SharedCache<V>> {
        self.caches.insert(cache.id().to_string(), cache)
    }

    pub fn get(&self, id: &str) -> Option<SharedCache<V>> {
        self.caches.get(id).cloned()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.caches.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.caches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::CacheKey;

    fn key(i: i64) -> CacheKey {
        CacheKey::from_parts(vec![i])
    }

    #[test]
    fn test_default_layers() {
        let layers = CacheBuilder::new("users").layers().unwrap();
        assert_eq!(
            layers,
            vec![
                Layer::Lru { capacity: 1024 },
                Layer::Serialized,
                Layer::Logging,
                Layer::Synchronized,
            ]
        );
    }

    #[test]
    fn test_full_layers_in_order() {
        let layers = CacheBuilder::new("users")
            .eviction(Eviction::Fifo)
            .size(10)
            .flush_interval(Some(Duration::from_secs(60)))
            .blocking(true)
            .blocking_timeout(Some(Duration::from_millis(500)))
            .layers()
            .unwrap();
        assert_eq!(
            layers,
            vec![
                Layer::Fifo { capacity: 10 },
                Layer::Scheduled { interval: Duration::from_secs(60) },
                Layer::Serialized,
                Layer::Logging,
                Layer::Synchronized,
                Layer::Blocking { timeout: Some(Duration::from_millis(500)) },
            ]
        );
    }

    #[test]
    fn test_zero_durations_disable_layers() {
        let layers = CacheBuilder::new("users")
            .flush_interval(Some(Duration::ZERO))
            .read_write(false)
            .blocking(true)
            .blocking_timeout(Some(Duration::ZERO))
            .layers()
            .unwrap();
        assert!(!layers.iter().any(|l| matches!(l, Layer::Scheduled { .. })));
        assert!(!layers.contains(&Layer::Serialized));
        assert_eq!(layers.last(), Some(&Layer::Blocking { timeout: None }));
    }

    #[test]
    fn test_reclaimable_defaults() {
        let soft = CacheBuilder::new("s").eviction(Eviction::Soft).layers().unwrap();
        assert_eq!(soft[0], Layer::Soft { hard_refs: 256, retention: 2048 });

        let weak = CacheBuilder::new("w").eviction(Eviction::Weak).layers().unwrap();
        assert_eq!(weak[0], Layer::Weak { hard_refs: 256, collect_every: 64 });
    }

    #[test]
    fn test_properties_override_size() {
        let layers = CacheBuilder::new("s")
            .eviction(Eviction::Soft)
            .size(16)
            .property("size", "32")
            .property("retention", "100")
            .layers()
            .unwrap();
        assert_eq!(layers[0], Layer::Soft { hard_refs: 32, retention: 100 });
    }

    #[test]
    fn test_weak_collection_property() {
        let layers = CacheBuilder::new("w")
            .eviction(Eviction::Weak)
            .property("collect_every", "8")
            .layers()
            .unwrap();
        assert_eq!(layers[0], Layer::Weak { hard_refs: 256, collect_every: 8 });

        let soft = CacheBuilder::new("s").eviction(Eviction::Soft).property("collect_every", "8");
        assert!(matches!(soft.layers(), Err(CacheError::UnknownProperty { .. })));
    }

    #[test]
    fn test_unknown_and_invalid_properties() {
        let unknown = CacheBuilder::new("users").property("retention", "10").layers();
        assert!(matches!(unknown, Err(CacheError::UnknownProperty { .. })));

        let invalid = CacheBuilder::new("users").property("size", "lots").layers();
        assert!(matches!(invalid, Err(CacheError::InvalidProperty { .. })));

        let zero = CacheBuilder::new("users").property("size", "0").layers();
        assert!(matches!(zero, Err(CacheError::InvalidProperty { .. })));
    }

    #[test]
    fn test_unknown_names() {
        let config = CacheConfig { eviction: "random".to_string(), ..CacheConfig::default() };
        let err = CacheBuilder::from_config("users", &config).unwrap_err();
        assert!(matches!(err, CacheError::UnknownEviction(ref name) if name == "random"));
        assert!(err.is_configuration());

        let config = CacheConfig { implementation: "redis".to_string(), ..CacheConfig::default() };
        assert!(matches!(
            CacheBuilder::from_config("users", &config),
            Err(CacheError::UnknownImplementation(_))
        ));
    }

    #[test]
    fn test_missing_id() {
        assert!(matches!(CacheBuilder::new("").layers(), Err(CacheError::MissingId)));
        assert!(matches!(
            build_chain::<String>("", &[Layer::Logging]),
            Err(CacheError::MissingId)
        ));
    }

    #[test]
    fn test_read_write_chain_returns_copies() {
        let cache: SharedCache<String> = CacheBuilder::new("users").build().unwrap();
        cache.put(key(1), Arc::new("ada".to_string())).unwrap();

        let first = cache.get(&key(1)).unwrap().unwrap();
        let second = cache.get(&key(1)).unwrap().unwrap();
        assert_eq!(first, second);
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(cache.id(), "users");
    }

    #[test]
    fn test_read_only_chain_shares_instances() {
        let cache: SharedCache<String> =
            CacheBuilder::new("users").read_write(false).build().unwrap();
        cache.put(key(1), Arc::new("ada".to_string())).unwrap();

        let first = cache.get(&key(1)).unwrap().unwrap();
        let second = cache.get(&key(1)).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_fifo_chain_bounds_size() {
        let cache: SharedCache<String> =
            CacheBuilder::new("users").eviction(Eviction::Fifo).size(3).build().unwrap();
        for i in 0..5 {
            cache.put(key(i), Arc::new(i.to_string())).unwrap();
        }
        assert_eq!(cache.size(), 3);
        assert!(cache.get(&key(0)).unwrap().is_none());
        assert!(cache.get(&key(4)).unwrap().is_some());
    }

    #[test]
    fn test_soft_chain_under_serialized_layer() {
        let pressure = Arc::new(PressureSignal::new());
        let cache: SharedCache<String> = CacheBuilder::new("sessions")
            .eviction(Eviction::Soft)
            .pressure_signal(pressure.clone())
            .build()
            .unwrap();
        cache.put(key(1), Arc::new("token".to_string())).unwrap();
        assert_eq!(cache.size(), 1);

        // the encoded bytes were never read, so only the pin holds them
        pressure.raise();
        assert!(cache.get(&key(1)).unwrap().is_none());
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_weak_chain_under_serialized_layer() {
        let pressure = Arc::new(PressureSignal::new());
        let cache: SharedCache<String> = CacheBuilder::new("scratch")
            .eviction(Eviction::Weak)
            .pressure_signal(pressure.clone())
            .build()
            .unwrap();
        cache.put(key(1), Arc::new("token".to_string())).unwrap();
        assert_eq!(cache.get(&key(1)).unwrap().as_deref(), Some(&"token".to_string()));

        // the read moved the bytes into the hard-reference queue
        pressure.raise();
        assert_eq!(cache.size(), 1);
        cache.put(key(2), Arc::new("cold".to_string())).unwrap();
        pressure.raise();
        assert!(cache.get(&key(2)).unwrap().is_none());
    }

    #[test]
    fn test_invalid_chains() {
        let weak = Layer::Weak { hard_refs: 4, collect_every: 64 };
        let reclaim_not_innermost = build_chain::<String>("c", &[Layer::Logging, weak]);
        assert!(matches!(reclaim_not_innermost, Err(CacheError::InvalidChain { .. })));

        let double_serialized =
            build_chain::<String>("c", &[Layer::Serialized, Layer::Logging, Layer::Serialized]);
        assert!(matches!(double_serialized, Err(CacheError::InvalidChain { .. })));

        let zero = build_chain::<String>("c", &[Layer::Lru { capacity: 0 }]);
        assert!(matches!(zero, Err(CacheError::InvalidChain { .. })));
    }

    #[test]
    fn test_describe() {
        let layers = vec![Layer::Lru { capacity: 8 }, Layer::Serialized, Layer::Logging];
        assert_eq!(describe(&layers), "perpetual -> lru(capacity=8) -> serialized -> logging");
    }

    #[test]
    fn test_registry_from_config() {
        let config: LaminaConfig = toml::from_str(
            "[caches.users]\neviction = \"fifo\"\n\n[caches.sessions]\neviction = \"weak\"\n",
        )
        .unwrap();
        let registry = CacheRegistry::<String>::from_config(&config).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["sessions", "users"]);
        assert_eq!(registry.get("users").unwrap().id(), "users");
        assert!(registry.get("orders").is_none());
    }
}
