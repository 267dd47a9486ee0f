use super::{CacheError, LruCache, OrderCache};
use parking_lot::Mutex;
use shared::Order;
use std::num::NonZeroUsize;

/// In-process LRU order cache.
///
/// A plain mutex: even `get` reorders the recency list. The lock is only held
/// for map operations.
pub struct MemoryOrderCache {
    inner: Mutex<LruCache<String, Order>>,
}

impl MemoryOrderCache {
    pub fn new(capacity: usize) -> Result<Self, CacheError> {
        let capacity = NonZeroUsize::new(capacity).ok_or(CacheError::ZeroCapacity)?;
        Ok(Self {
            inner: Mutex::new(LruCache::new(capacity)),
        })
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl OrderCache for MemoryOrderCache {
    fn get(&self, order_uid: &str) -> Result<Option<Order>, CacheError> {
        Ok(self.inner.lock().get(order_uid).cloned())
    }

    fn set(&self, order_uid: &str, order: Order) -> Result<(), CacheError> {
        let evicted = self.inner.lock().put(order_uid.to_string(), order);
        if let Some((key, _)) = evicted {
            tracing::debug!(order_uid = %key, "Evicted least recently used order from cache");
        }
        Ok(())
    }

    fn delete(&self, order_uid: &str) -> Result<bool, CacheError> {
        Ok(self.inner.lock().remove(order_uid).is_some())
    }

    fn keys(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.inner.lock().keys())
    }
}
