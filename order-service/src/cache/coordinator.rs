//! Cache-aside coordinator
//!
//! Reads go cache first, then the store, filling the cache on a miss. Writes
//! go to the store; a committed write drops the cached entry and installs the
//! post-commit aggregate. A failed write may still have committed, so it drops
//! the entry too. An invalidation epoch makes a read-miss fill that started
//! before a write give up instead of caching pre-write data.

use super::OrderCache;
use crate::db::repository::{OrderStore, RepoResult, UpsertOutcome};
use parking_lot::Mutex;
use shared::Order;
use std::sync::Arc;

pub struct CachedOrderStore {
    store: Arc<dyn OrderStore>,
    cache: Arc<dyn OrderCache>,
    /// Bumped under the lock on every write-side invalidation
    epoch: Mutex<u64>,
}

impl CachedOrderStore {
    pub fn new(store: Arc<dyn OrderStore>, cache: Arc<dyn OrderCache>) -> Self {
        Self {
            store,
            cache,
            epoch: Mutex::new(0),
        }
    }

    /// Cache hit returns without touching the store. A miss reads the store
    /// and fills the cache when the order exists.
    pub async fn get_with_cache(&self, order_uid: &str) -> RepoResult<Option<Order>> {
        match self.cache.get(order_uid) {
            Ok(Some(order)) => {
                tracing::debug!(order_uid = %order_uid, "Cache hit");
                return Ok(Some(order));
            }
            Ok(None) => tracing::debug!(order_uid = %order_uid, "Cache miss"),
            Err(e) => {
                tracing::warn!(order_uid = %order_uid, error = %e, "Cache read failed, falling back to store")
            }
        }

        let seen = *self.epoch.lock();
        let order = self.store.fetch_by_uid(order_uid).await?;
        if let Some(order) = &order {
            self.fill(order_uid, order.clone(), seen);
        }
        Ok(order)
    }

    /// Upsert through the store, then refresh the cache if a write happened.
    /// On error the cached entry is dropped: the commit may have gone through.
    pub async fn upsert(&self, order: &Order) -> RepoResult<UpsertOutcome> {
        match self.store.upsert(order).await {
            Ok(outcome) => {
                if let UpsertOutcome::Written(fresh) = &outcome {
                    self.refresh(fresh);
                }
                Ok(outcome)
            }
            Err(e) => {
                drop(self.invalidate(&order.order_uid));
                Err(e)
            }
        }
    }

    fn fill(&self, order_uid: &str, order: Order, seen: u64) {
        let epoch = self.epoch.lock();
        if *epoch != seen {
            tracing::debug!(order_uid = %order_uid, "Write observed during read, skipping cache fill");
            return;
        }
        if let Err(e) = self.cache.set(order_uid, order) {
            tracing::warn!(order_uid = %order_uid, error = %e, "Cache fill failed");
        }
    }

    fn refresh(&self, fresh: &Order) {
        let uid = fresh.order_uid.as_str();
        let _epoch = self.invalidate(uid);
        if let Err(e) = self.cache.set(uid, fresh.clone()) {
            tracing::warn!(order_uid = %uid, error = %e, "Cache refresh failed");
        }
    }

    /// Bump the epoch and drop the entry. The returned guard keeps fills out
    /// until the caller is done with the cache.
    fn invalidate(&self, order_uid: &str) -> parking_lot::MutexGuard<'_, u64> {
        let mut epoch = self.epoch.lock();
        *epoch = epoch.wrapping_add(1);
        if let Err(e) = self.cache.delete(order_uid) {
            tracing::warn!(order_uid = %order_uid, error = %e, "Cache invalidation failed");
        }
        epoch
    }
}
