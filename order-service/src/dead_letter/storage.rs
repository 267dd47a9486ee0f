//! Durable dead-letter sink backed by the `dead_letters` table
//!
//! A letter repeating the (message, reason, key) of a stored one is dropped,
//! so redelivered messages are not quarantined twice.

use super::{DeadLetter, DeadLetterError, DeadLetterSink};
use async_trait::async_trait;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct SqliteDeadLetters {
    pool: SqlitePool,
}

impl SqliteDeadLetters {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn count(&self) -> Result<i64, DeadLetterError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM dead_letters")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl DeadLetterSink for SqliteDeadLetters {
    async fn publish(&self, letter: &DeadLetter) -> Result<(), DeadLetterError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO dead_letters (message_id, message_key, reason, error, payload, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(letter.message_id)
        .bind(&letter.key)
        .bind(letter.reason.as_str())
        .bind(&letter.error)
        .bind(&letter.payload)
        .bind(letter.created_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            tracing::debug!(
                message_id = letter.message_id,
                reason = %letter.reason,
                "Dead letter already recorded for this message"
            );
        }
        Ok(())
    }
}
