//! Order lookup
//!
//! Read side exposed to clients. Lookups go through the cache-aside
//! coordinator; an unknown UID is a normal answer, not an error.

use crate::cache::CachedOrderStore;
use crate::db::repository::RepoError;
use shared::Order;
use shared::error::AppError;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderLookup {
    Found(Order),
    NotFound,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Store error: {0}")]
    Store(#[from] RepoError),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        tracing::error!(error = %err, "Order lookup failed");
        AppError::internal("Failed to load order")
    }
}

#[derive(Clone)]
pub struct OrderQueryService {
    orders: Arc<CachedOrderStore>,
}

impl OrderQueryService {
    pub fn new(orders: Arc<CachedOrderStore>) -> Self {
        Self { orders }
    }

    pub async fn get_order(&self, order_uid: &str) -> Result<OrderLookup, ServiceError> {
        let order_uid = order_uid.trim();
        if order_uid.is_empty() {
            return Ok(OrderLookup::NotFound);
        }

        Ok(match self.orders.get_with_cache(order_uid).await? {
            Some(order) => OrderLookup::Found(order),
            None => OrderLookup::NotFound,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryOrderCache, OrderCache};
    use crate::db::DbService;
    use crate::db::repository::{OrderRepository, OrderStore, RepoResult, UpsertOutcome};
    use crate::test_support::sample_order;
    use async_trait::async_trait;
    use shared::error::ErrorCode;

    struct OfflineStore;

    #[async_trait]
    impl OrderStore for OfflineStore {
        async fn fetch_by_uid(&self, _: &str) -> RepoResult<Option<Order>> {
            Err(RepoError::Database("connection refused".into()))
        }
        async fn upsert(&self, _: &Order) -> RepoResult<UpsertOutcome> {
            Err(RepoError::Database("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_found_and_not_found() {
        let db = DbService::in_memory().await.unwrap();
        let cache = Arc::new(MemoryOrderCache::new(5).unwrap());
        let orders = Arc::new(CachedOrderStore::new(
            Arc::new(OrderRepository::new(db.pool)),
            cache,
        ));
        let order = sample_order("q1");
        orders.upsert(&order).await.unwrap();
        let service = OrderQueryService::new(orders);

        assert_eq!(service.get_order("q1").await.unwrap(), OrderLookup::Found(order));
        assert_eq!(service.get_order("q2").await.unwrap(), OrderLookup::NotFound);
    }

    #[tokio::test]
    async fn test_blank_uid_touches_nothing() {
        let cache = Arc::new(MemoryOrderCache::new(5).unwrap());
        let service = OrderQueryService::new(Arc::new(CachedOrderStore::new(
            Arc::new(OfflineStore),
            cache.clone(),
        )));

        assert_eq!(service.get_order("").await.unwrap(), OrderLookup::NotFound);
        assert_eq!(service.get_order("   ").await.unwrap(), OrderLookup::NotFound);
        assert!(cache.keys().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_key_is_trimmed() {
        let db = DbService::in_memory().await.unwrap();
        let cache = Arc::new(MemoryOrderCache::new(5).unwrap());
        let orders = Arc::new(CachedOrderStore::new(
            Arc::new(OrderRepository::new(db.pool)),
            cache,
        ));
        let order = sample_order("spaced");
        orders.upsert(&order).await.unwrap();
        let service = OrderQueryService::new(orders);

        assert_eq!(service.get_order("  spaced\n").await.unwrap(), OrderLookup::Found(order));
    }

    #[tokio::test]
    async fn test_store_error_surfaces() {
        let cache = Arc::new(MemoryOrderCache::new(5).unwrap());
        let service =
            OrderQueryService::new(Arc::new(CachedOrderStore::new(Arc::new(OfflineStore), cache)));

        let err = service.get_order("x").await.unwrap_err();
        assert!(matches!(err, ServiceError::Store(_)));
        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::InternalError);
    }
}
