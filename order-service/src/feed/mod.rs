//! Message feed
//!
//! Pull/commit source the ingestion worker consumes. Delivery is
//! at-least-once: a message that is fetched but never committed comes back
//! when the feed is reopened.

pub mod inbox;
pub mod memory;

pub use inbox::SqliteInbox;
pub use memory::MemoryFeed;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// One raw message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedMessage {
    /// Feed-assigned, increasing
    pub id: i64,
    pub key: Option<String>,
    pub payload: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Feed storage error: {0}")]
    Storage(String),

    #[error("Unknown message id {0}")]
    UnknownMessage(i64),
}

impl From<sqlx::Error> for FeedError {
    fn from(err: sqlx::Error) -> Self {
        FeedError::Storage(err.to_string())
    }
}

#[async_trait]
pub trait MessageFeed: Send + Sync {
    /// Wait for the next message. `Ok(None)` once `cancel` fires.
    async fn fetch(&self, cancel: &CancellationToken) -> Result<Option<FeedMessage>, FeedError>;

    /// Acknowledge a message so it is never redelivered
    async fn commit(&self, message: &FeedMessage) -> Result<(), FeedError>;
}
