//! Process runtime: ingestion worker, inbox retention and HTTP API under one
//! shutdown token

use super::state::{ServiceState, StartupError};
use super::tasks::{BackgroundTasks, TaskKind};
use crate::api;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// How often committed inbox rows are swept
const RETENTION_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

pub struct Server {
    state: ServiceState,
}

impl Server {
    pub fn new(state: ServiceState) -> Self {
        Self { state }
    }

    /// Serve until SIGINT/SIGTERM
    pub async fn run(self) -> Result<(), StartupError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.config.http_port));
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("HTTP API listening on {addr}");

        let stop = CancellationToken::new();
        let trigger = stop.clone();
        tokio::spawn(async move {
            wait_for_signal().await;
            tracing::info!("Shutdown signal received");
            trigger.cancel();
        });

        self.serve(listener, stop).await;
        Ok(())
    }

    /// Run every task until `stop` fires (or the HTTP server dies), then give
    /// them `SHUTDOWN_TIMEOUT_MS` in total before aborting and close the pool.
    pub async fn serve(self, listener: TcpListener, stop: CancellationToken) {
        let mut tasks = BackgroundTasks::new();
        let shutdown = tasks.shutdown_token();

        let worker = self.state.ingest_worker(shutdown.clone());
        tasks.spawn("ingest_worker", TaskKind::Worker, worker.run());

        tasks.spawn(
            "inbox_retention",
            TaskKind::Periodic,
            self.state.inbox.clone().run_retention(
                self.state.config.inbox_retention(),
                RETENTION_SWEEP_INTERVAL,
                shutdown.clone(),
            ),
        );

        let app = api::router(self.state.clone());
        let http_shutdown = shutdown.clone();
        let http_failed = stop.clone();
        tasks.spawn("http", TaskKind::Server, async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(http_shutdown.cancelled_owned())
                .await;
            if let Err(e) = served {
                tracing::error!(error = %e, "HTTP server failed");
                http_failed.cancel();
            }
        });
        tracing::info!("Started {} background tasks", tasks.len());

        stop.cancelled().await;

        // 在途请求与 worker 共用同一个超时窗口
        let timeout = self.state.config.shutdown_timeout();
        tasks.shutdown(timeout).await;
        if tokio::time::timeout(timeout, self.state.db.pool.close())
            .await
            .is_err()
        {
            tracing::warn!("Database pool did not close in time");
        }
        tracing::info!("Server stopped");
    }
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CachedOrderStore, MemoryOrderCache};
    use crate::core::Config;
    use crate::db::DbService;
    use crate::db::repository::{OrderStore, RepoResult, UpsertOutcome};
    use crate::query::OrderQueryService;
    use async_trait::async_trait;
    use shared::Order;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::sync::Notify;

    /// Store whose reads never complete
    struct HangingStore {
        entered: Arc<Notify>,
    }

    #[async_trait]
    impl OrderStore for HangingStore {
        async fn fetch_by_uid(&self, _: &str) -> RepoResult<Option<Order>> {
            self.entered.notify_one();
            std::future::pending().await
        }
        async fn upsert(&self, _: &Order) -> RepoResult<UpsertOutcome> {
            std::future::pending().await
        }
    }

    async fn state(shutdown_timeout_ms: u64) -> ServiceState {
        let config = Config {
            feed_poll_interval_ms: 5,
            shutdown_timeout_ms,
            ..Config::default()
        };
        let db = DbService::in_memory().await.unwrap();
        ServiceState::with_db(&config, db).unwrap()
    }

    async fn listener() -> TcpListener {
        TcpListener::bind("127.0.0.1:0").await.unwrap()
    }

    #[tokio::test]
    async fn test_serves_until_stopped() {
        let listener = listener().await;
        let addr = listener.local_addr().unwrap();
        let stop = CancellationToken::new();
        let server = tokio::spawn(Server::new(state(1000).await).serve(listener, stop.clone()));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        assert!(response.starts_with(b"HTTP/1.1 200"));

        stop.cancel();
        tokio::time::timeout(Duration::from_secs(2), server)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_stuck_request_does_not_block_shutdown() {
        let mut state = state(100).await;
        let entered = Arc::new(Notify::new());
        let orders = Arc::new(CachedOrderStore::new(
            Arc::new(HangingStore {
                entered: entered.clone(),
            }),
            Arc::new(MemoryOrderCache::new(5).unwrap()),
        ));
        state.query = OrderQueryService::new(orders);

        let listener = listener().await;
        let addr = listener.local_addr().unwrap();
        let stop = CancellationToken::new();
        let server = tokio::spawn(Server::new(state).serve(listener, stop.clone()));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /api/orders/stuck HTTP/1.1\r\nHost: test\r\n\r\n")
            .await
            .unwrap();
        entered.notified().await;

        stop.cancel();
        tokio::time::timeout(Duration::from_secs(2), server)
            .await
            .expect("shutdown waited on the in-flight request")
            .unwrap();
    }
}
