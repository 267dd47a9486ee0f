//! Durable feed backed by the `inbox` table
//!
//! Producers append rows; the consumer polls for rows past its in-session
//! cursor that are not committed yet. The cursor starts at zero, so a restart
//! redelivers everything left uncommitted. Committed rows are deleted by a
//! periodic retention sweep.

use super::{FeedError, FeedMessage, MessageFeed};
use async_trait::async_trait;
use parking_lot::Mutex;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub struct SqliteInbox {
    pool: SqlitePool,
    poll_interval: Duration,
    cursor: Mutex<i64>,
}

#[derive(sqlx::FromRow)]
struct InboxRow {
    id: i64,
    message_key: Option<String>,
    payload: Vec<u8>,
}

impl SqliteInbox {
    pub fn new(pool: SqlitePool, poll_interval: Duration) -> Self {
        Self {
            pool,
            poll_interval,
            cursor: Mutex::new(0),
        }
    }

    /// Append a raw message; returns its id
    pub async fn publish(&self, key: Option<&str>, payload: &[u8]) -> Result<i64, FeedError> {
        let result = sqlx::query(
            "INSERT INTO inbox (message_key, payload, received_at) VALUES (?, ?, ?)",
        )
        .bind(key)
        .bind(payload)
        .bind(shared::util::now_millis())
        .execute(&self.pool)
        .await?;
        let id = result.last_insert_rowid();
        tracing::debug!(id, bytes = payload.len(), "Message appended to inbox");
        Ok(id)
    }

    /// Messages not yet committed
    pub async fn pending(&self) -> Result<i64, FeedError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM inbox WHERE committed_at IS NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    pub async fn is_committed(&self, id: i64) -> Result<bool, FeedError> {
        let row: Option<(Option<i64>,)> =
            sqlx::query_as("SELECT committed_at FROM inbox WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        match row {
            Some((committed_at,)) => Ok(committed_at.is_some()),
            None => Err(FeedError::UnknownMessage(id)),
        }
    }

    /// Delete rows committed at least `retention` ago; returns how many
    pub async fn prune_committed(&self, retention: Duration) -> Result<u64, FeedError> {
        let cutoff = shared::util::now_millis() - retention.as_millis() as i64;
        let result =
            sqlx::query("DELETE FROM inbox WHERE committed_at IS NOT NULL AND committed_at <= ?")
                .bind(cutoff)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    /// Sweep committed rows every `every` until `shutdown` fires
    pub async fn run_retention(
        self: Arc<Self>,
        retention: Duration,
        every: Duration,
        shutdown: CancellationToken,
    ) {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }
            match self.prune_committed(retention).await {
                Ok(0) => {}
                Ok(pruned) => tracing::info!(pruned, "Pruned committed inbox messages"),
                Err(e) => tracing::warn!(error = %e, "Inbox retention sweep failed"),
            }
        }
    }

    async fn next_after(&self, cursor: i64) -> Result<Option<InboxRow>, FeedError> {
        let row = sqlx::query_as::<_, InboxRow>(
            "SELECT id, message_key, payload FROM inbox WHERE committed_at IS NULL AND id > ? ORDER BY id LIMIT 1",
        )
        .bind(cursor)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl MessageFeed for SqliteInbox {
    async fn fetch(&self, cancel: &CancellationToken) -> Result<Option<FeedMessage>, FeedError> {
        loop {
            if cancel.is_cancelled() {
                return Ok(None);
            }

            let cursor = *self.cursor.lock();
            if let Some(row) = self.next_after(cursor).await? {
                *self.cursor.lock() = row.id;
                return Ok(Some(FeedMessage {
                    id: row.id,
                    key: row.message_key,
                    payload: row.payload,
                }));
            }

            tokio::select! {
                _ = cancel.cancelled() => return Ok(None),
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    async fn commit(&self, message: &FeedMessage) -> Result<(), FeedError> {
        let result = sqlx::query("UPDATE inbox SET committed_at = ? WHERE id = ?")
            .bind(shared::util::now_millis())
            .bind(message.id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(FeedError::UnknownMessage(message.id));
        }
        Ok(())
    }
}
