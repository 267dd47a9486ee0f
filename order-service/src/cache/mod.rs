//! Order cache
//!
//! - [`OrderCache`]: get/set/delete/keys capability keyed by order UID
//! - [`MemoryOrderCache`]: bounded in-process LRU implementation
//! - [`CachedOrderStore`]: cache-aside coordinator over an [`OrderStore`](crate::db::repository::OrderStore)

pub mod coordinator;
pub mod lru;
pub mod memory;

pub use coordinator::CachedOrderStore;
pub use lru::LruCache;
pub use memory::MemoryOrderCache;

use shared::Order;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache capacity must be greater than zero")]
    ZeroCapacity,

    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),
}

/// Key/value cache of order aggregates.
///
/// Fallible so a remote backend can sit behind the same interface; callers
/// treat every error as a miss.
pub trait OrderCache: Send + Sync {
    fn get(&self, order_uid: &str) -> Result<Option<Order>, CacheError>;

    fn set(&self, order_uid: &str, order: Order) -> Result<(), CacheError>;

    /// Returns whether an entry was removed
    fn delete(&self, order_uid: &str) -> Result<bool, CacheError>;

    /// Cached UIDs, most recently used first
    fn keys(&self) -> Result<Vec<String>, CacheError>;
}
