//! Repository Module
//!
//! Persistence of the order aggregate. [`OrderStore`] is the seam the cache
//! coordinator and ingestion worker depend on; [`OrderRepository`] is the
//! SQLite implementation.

pub mod order;

pub use order::OrderRepository;

use async_trait::async_trait;
use shared::Order;
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Database error: {0}")]
    Database(String),

    /// A stored row could not be mapped back into the model
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Result of an upsert
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// Stored aggregate already had identical content; nothing was written
    Unchanged(Order),
    /// A transaction committed; holds the aggregate as re-read after commit
    Written(Order),
}

impl UpsertOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, UpsertOutcome::Written(_))
    }

    pub fn order(&self) -> &Order {
        match self {
            UpsertOutcome::Unchanged(order) | UpsertOutcome::Written(order) => order,
        }
    }

    pub fn into_order(self) -> Order {
        match self {
            UpsertOutcome::Unchanged(order) | UpsertOutcome::Written(order) => order,
        }
    }
}

/// Durable store for order aggregates
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Load the full aggregate (order, delivery, payment, items) in one
    /// consistent read. `Ok(None)` when the UID is unknown.
    async fn fetch_by_uid(&self, order_uid: &str) -> RepoResult<Option<Order>>;

    /// Insert or update the aggregate atomically.
    ///
    /// Items are upserted by `rid`; stored items missing from `order` are
    /// kept.
    async fn upsert(&self, order: &Order) -> RepoResult<UpsertOutcome>;
}
