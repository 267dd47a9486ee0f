//! order-service — order ingestion and lookup
//!
//! Long-running service that:
//! - Consumes raw order messages from the SQLite inbox
//! - Validates and upserts them, quarantining bad payloads
//! - Serves `GET /api/orders/{uid}` through an LRU front cache

use order_service::core::{Config, Server, ServiceState};
use order_service::init_logger_with_file;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;

    init_logger_with_file(
        Some(&config.log_level),
        config.log_json,
        config.log_dir.as_deref(),
    );

    tracing::info!(
        "Starting order-service v{} (env: {})",
        env!("CARGO_PKG_VERSION"),
        config.environment
    );

    let state = ServiceState::initialize(&config).await?;
    Server::new(state).run().await?;

    Ok(())
}
