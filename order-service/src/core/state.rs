use super::config::{Config, ConfigError};
use crate::cache::{CacheError, CachedOrderStore, MemoryOrderCache};
use crate::db::DbService;
use crate::db::repository::{OrderRepository, RepoError};
use crate::dead_letter::{DeadLetterRouter, SqliteDeadLetters};
use crate::feed::SqliteInbox;
use crate::ingest::IngestWorker;
use crate::query::OrderQueryService;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] RepoError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared service state, cheap to clone into handlers
#[derive(Clone)]
pub struct ServiceState {
    pub config: Config,
    pub db: DbService,
    pub orders: Arc<CachedOrderStore>,
    pub query: OrderQueryService,
    pub inbox: Arc<SqliteInbox>,
    pub dead_letters: Arc<SqliteDeadLetters>,
}

impl ServiceState {
    /// Open the database named by the config and wire every component
    pub async fn initialize(config: &Config) -> Result<Self, StartupError> {
        let db = DbService::new(&config.database_url).await?;
        Self::with_db(config, db)
    }

    /// Wire components over an already opened database
    pub fn with_db(config: &Config, db: DbService) -> Result<Self, StartupError> {
        let cache = Arc::new(MemoryOrderCache::new(config.cache_size)?);
        let store = Arc::new(OrderRepository::new(db.pool.clone()));
        let orders = Arc::new(CachedOrderStore::new(store, cache));

        tracing::info!(
            cache_size = config.cache_size,
            environment = %config.environment,
            "Service state initialized"
        );

        Ok(Self {
            config: config.clone(),
            query: OrderQueryService::new(orders.clone()),
            orders,
            inbox: Arc::new(SqliteInbox::new(db.pool.clone(), config.feed_poll_interval())),
            dead_letters: Arc::new(SqliteDeadLetters::new(db.pool.clone())),
            db,
        })
    }

    /// Ingestion worker consuming the inbox
    pub fn ingest_worker(&self, shutdown: CancellationToken) -> IngestWorker {
        IngestWorker::new(
            self.inbox.clone(),
            self.orders.clone(),
            DeadLetterRouter::new(self.dead_letters.clone(), self.config.dlq_timeout()),
            shutdown,
        )
    }
}
