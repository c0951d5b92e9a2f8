//! Copy-on-read decorator for read-write caches
//!
//! Values are encoded with bincode on put and decoded into a fresh instance
//! on every get, so no two callers ever share a cached value. The wrapped
//! chain stores the encoded bytes; this layer must sit outside any
//! reclaimable layer.

use super::traits::Cache;
use crate::error::CacheResult;
use crate::key::CacheKey;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;

pub struct SerializedCache<V> {
    delegate: Box<dyn Cache<Vec<u8>>>,
    _value: PhantomData<fn() -> V>,
}

impl<V> SerializedCache<V>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(delegate: Box<dyn Cache<Vec<u8>>>) -> Self {
        Self { delegate, _value: PhantomData }
    }

    fn encode(value: &V) -> CacheResult<Vec<u8>> {
        Ok(bincode::serde::encode_to_vec(value, bincode::config::standard())?)
    }

    fn decode(bytes: &[u8]) -> CacheResult<V> {
        let (value, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())?;
        Ok(value)
    }
}

impl<V> Cache<V> for SerializedCache<V>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: CacheKey, value: Arc<V>) -> CacheResult<()> {
        let bytes = Self::encode(&value)?;
        self.delegate.put(key, Arc::new(bytes))
    }

    fn get(&self, key: &CacheKey) -> CacheResult<Option<Arc<V>>> {
        match self.delegate.get(key)? {
            Some(bytes) => Ok(Some(Arc::new(Self::decode(&bytes)?))),
            None => Ok(None),
        }
    }

    fn remove(&self, key: &CacheKey) -> Option<Arc<V>> {
        let bytes = self.delegate.remove(key)?;
        match Self::decode(&bytes) {
            Ok(value) => Some(Arc::new(value)),
            Err(err) => {
                log::warn!("cache {} dropped an undecodable value for {}: {}", self.id(), key, err);
                None
            }
        }
    }

    fn clear(&self) {
        self.delegate.clear()
    }

    fn size(&self) -> usize {
        self.delegate.size()
    }

    fn release(&self, key: &CacheKey) {
        self.delegate.release(key)
    }
}
