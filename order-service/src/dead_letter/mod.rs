//! Dead-letter routing
//!
//! Payloads that cannot be ingested (undecodable, invalid, or rejected by the
//! store) are quarantined in a secondary channel. Forwarding is best effort:
//! bounded by a timeout, failures are logged and swallowed.

pub mod memory;
pub mod storage;

pub use memory::MemoryDeadLetters;
pub use storage::SqliteDeadLetters;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeadLetterReason {
    /// Payload is neither an order array nor a single order
    Decode,
    /// Order decoded but broke field constraints
    Validation,
    /// Order was valid but the store rejected the write
    Store,
}

impl DeadLetterReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeadLetterReason::Decode => "decode",
            DeadLetterReason::Validation => "validation",
            DeadLetterReason::Store => "store",
        }
    }
}

impl fmt::Display for DeadLetterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A quarantined payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    /// Feed message the payload arrived in, if it came from a feed
    pub message_id: Option<i64>,
    /// Order UID when it could be recovered from the payload
    pub key: Option<String>,
    pub reason: DeadLetterReason,
    pub error: String,
    /// Raw bytes exactly as received
    pub payload: Vec<u8>,
    pub created_at: i64,
}

#[derive(Debug, Error)]
pub enum DeadLetterError {
    #[error("Dead-letter storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for DeadLetterError {
    fn from(err: sqlx::Error) -> Self {
        DeadLetterError::Storage(err.to_string())
    }
}

/// Secondary channel receiving quarantined payloads
#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    async fn publish(&self, letter: &DeadLetter) -> Result<(), DeadLetterError>;
}

/// Best-effort forwarder in front of a [`DeadLetterSink`]
#[derive(Clone)]
pub struct DeadLetterRouter {
    sink: Arc<dyn DeadLetterSink>,
    timeout: Duration,
}

impl DeadLetterRouter {
    pub fn new(sink: Arc<dyn DeadLetterSink>, timeout: Duration) -> Self {
        Self { sink, timeout }
    }

    /// Forward a payload. Never fails: errors and timeouts are logged.
    ///
    /// Returns whether the sink accepted the letter.
    pub async fn send(
        &self,
        message_id: Option<i64>,
        payload: &[u8],
        key: Option<&str>,
        reason: DeadLetterReason,
        error: &str,
    ) -> bool {
        let letter = DeadLetter {
            message_id,
            key: key.map(str::to_string),
            reason,
            error: error.to_string(),
            payload: payload.to_vec(),
            created_at: shared::util::now_millis(),
        };

        match tokio::time::timeout(self.timeout, self.sink.publish(&letter)).await {
            Ok(Ok(())) => {
                tracing::warn!(
                    message_id,
                    key = key.unwrap_or("-"),
                    reason = %reason,
                    error = %error,
                    bytes = payload.len(),
                    "Payload routed to dead-letter queue"
                );
                true
            }
            Ok(Err(e)) => {
                tracing::error!(
                    key = key.unwrap_or("-"),
                    reason = %reason,
                    error = %e,
                    "Failed to publish dead letter"
                );
                false
            }
            Err(_) => {
                tracing::error!(
                    key = key.unwrap_or("-"),
                    reason = %reason,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Dead-letter publish timed out"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSink;

    #[async_trait]
    impl DeadLetterSink for FailingSink {
        async fn publish(&self, _: &DeadLetter) -> Result<(), DeadLetterError> {
            Err(DeadLetterError::Storage("unreachable".into()))
        }
    }

    struct StalledSink;

    #[async_trait]
    impl DeadLetterSink for StalledSink {
        async fn publish(&self, _: &DeadLetter) -> Result<(), DeadLetterError> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    #[test]
    fn test_reason_strings() {
        assert_eq!(DeadLetterReason::Decode.to_string(), "decode");
        assert_eq!(DeadLetterReason::Validation.to_string(), "validation");
        assert_eq!(DeadLetterReason::Store.to_string(), "store");
    }

    #[tokio::test]
    async fn test_send_records_letter() {
        let sink = Arc::new(MemoryDeadLetters::new());
        let router = DeadLetterRouter::new(sink.clone(), Duration::from_secs(1));

        assert!(
            router
                .send(Some(7), b"{bad", Some("uid-1"), DeadLetterReason::Decode, "eof")
                .await
        );

        let letters = sink.letters();
        assert_eq!(letters.len(), 1);
        assert_eq!(letters[0].message_id, Some(7));
        assert_eq!(letters[0].key.as_deref(), Some("uid-1"));
        assert_eq!(letters[0].payload, b"{bad");
        assert_eq!(letters[0].reason, DeadLetterReason::Decode);
    }

    #[tokio::test]
    async fn test_sink_failure_is_swallowed() {
        let router = DeadLetterRouter::new(Arc::new(FailingSink), Duration::from_secs(1));
        assert!(!router.send(None, b"x", None, DeadLetterReason::Store, "db").await);
    }

    #[tokio::test]
    async fn test_stalled_sink_times_out() {
        let router = DeadLetterRouter::new(Arc::new(StalledSink), Duration::from_millis(50));
        assert!(!router.send(None, b"x", None, DeadLetterReason::Validation, "bad").await);
    }
}
