//! Ingestion worker
//!
//! Pulls messages from the feed one at a time, decodes and validates them,
//! quarantines what cannot be ingested and writes the rest through the
//! cache-aside coordinator. A message is committed only when every valid
//! order in it reached the store.

use super::decode::{decode_orders, peek_order_uid};
use crate::cache::CachedOrderStore;
use crate::dead_letter::{DeadLetterReason, DeadLetterRouter};
use crate::db::repository::UpsertOutcome;
use crate::feed::{FeedMessage, MessageFeed};
use crate::validation::validate_order;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Pause before fetching again after a feed error
const FETCH_RETRY_DELAY: Duration = Duration::from_secs(1);

/// What happened to one message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageOutcome {
    pub message_id: i64,
    /// Payload could not be decoded at all
    pub malformed: bool,
    pub decoded: usize,
    /// Orders that caused a write
    pub stored: usize,
    /// Valid orders identical to what was already stored
    pub unchanged: usize,
    pub invalid: usize,
    /// Valid orders the store rejected
    pub failed: usize,
    pub acknowledged: bool,
}

impl MessageOutcome {
    fn new(message_id: i64) -> Self {
        Self {
            message_id,
            ..Default::default()
        }
    }
}

pub struct IngestWorker {
    feed: Arc<dyn MessageFeed>,
    orders: Arc<CachedOrderStore>,
    dead_letters: DeadLetterRouter,
    shutdown: CancellationToken,
}

impl IngestWorker {
    pub fn new(
        feed: Arc<dyn MessageFeed>,
        orders: Arc<CachedOrderStore>,
        dead_letters: DeadLetterRouter,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            feed,
            orders,
            dead_letters,
            shutdown,
        }
    }

    /// Run until the shutdown token fires. The in-flight message is finished
    /// before returning.
    pub async fn run(self) {
        tracing::info!("IngestWorker started");

        loop {
            let message = match self.feed.fetch(&self.shutdown).await {
                Ok(Some(message)) => message,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to fetch from feed");
                    tokio::select! {
                        _ = self.shutdown.cancelled() => break,
                        _ = tokio::time::sleep(FETCH_RETRY_DELAY) => continue,
                    }
                }
            };

            self.process_message(&message).await;
        }

        tracing::info!("IngestWorker stopped");
    }

    /// Ingest one message and commit it when appropriate
    pub async fn process_message(&self, message: &FeedMessage) -> MessageOutcome {
        let mut outcome = MessageOutcome::new(message.id);

        let orders = match decode_orders(&message.payload) {
            Ok(orders) => orders,
            Err(e) => {
                outcome.malformed = true;
                let key = message
                    .key
                    .clone()
                    .or_else(|| peek_order_uid(&message.payload));
                self.dead_letters
                    .send(
                        Some(message.id),
                        &message.payload,
                        key.as_deref(),
                        DeadLetterReason::Decode,
                        &e.to_string(),
                    )
                    .await;
                tracing::warn!(message_id = message.id, error = %e, "Malformed message left uncommitted");
                return outcome;
            }
        };
        outcome.decoded = orders.len();

        let mut batch = Vec::with_capacity(orders.len());
        for order in orders {
            match validate_order(&order) {
                Ok(()) => batch.push(order),
                Err(e) => {
                    outcome.invalid += 1;
                    tracing::warn!(
                        message_id = message.id,
                        order_uid = %order.order_uid,
                        violations = e.violations.len(),
                        "Order failed validation"
                    );
                    self.dead_letters
                        .send(
                            Some(message.id),
                            &message.payload,
                            non_blank(&order.order_uid),
                            DeadLetterReason::Validation,
                            &e.to_string(),
                        )
                        .await;
                }
            }
        }

        if batch.is_empty() {
            tracing::warn!(message_id = message.id, "No valid orders in message, left uncommitted");
            return outcome;
        }

        for order in &batch {
            match self.orders.upsert(order).await {
                Ok(UpsertOutcome::Written(_)) => outcome.stored += 1,
                Ok(UpsertOutcome::Unchanged(_)) => outcome.unchanged += 1,
                Err(e) => {
                    outcome.failed += 1;
                    tracing::error!(
                        message_id = message.id,
                        order_uid = %order.order_uid,
                        error = %e,
                        "Failed to store order"
                    );
                    self.dead_letters
                        .send(
                            Some(message.id),
                            &message.payload,
                            non_blank(&order.order_uid),
                            DeadLetterReason::Store,
                            &e.to_string(),
                        )
                        .await;
                }
            }
        }

        if outcome.failed > 0 {
            tracing::warn!(
                message_id = message.id,
                failed = outcome.failed,
                "Store failures in message, left uncommitted for redelivery"
            );
            return outcome;
        }

        match self.feed.commit(message).await {
            Ok(()) => outcome.acknowledged = true,
            Err(e) => {
                tracing::error!(message_id = message.id, error = %e, "Failed to commit message")
            }
        }

        tracing::info!(
            message_id = message.id,
            decoded = outcome.decoded,
            stored = outcome.stored,
            unchanged = outcome.unchanged,
            invalid = outcome.invalid,
            acknowledged = outcome.acknowledged,
            "Message processed"
        );
        outcome
    }
}

fn non_blank(uid: &str) -> Option<&str> {
    Some(uid).filter(|uid| !uid.trim().is_empty())
}
