//! Order Service - order ingestion and lookup
//!
//! # Overview
//!
//! Orders arrive as raw JSON on an at-least-once feed. The ingestion worker
//! decodes and validates them, quarantines bad input in a dead-letter table,
//! and upserts valid aggregates into SQLite through a cache-aside LRU. Clients
//! read orders back by UID over HTTP.
//!
//! # Module layout
//!
//! ```text
//! order-service/src/
//! ├── core/          # config, shared state, background tasks, server
//! ├── db/            # SQLite pool, migrations, order repository
//! ├── cache/         # LRU, order cache, cache-aside coordinator
//! ├── feed/          # message feed (SQLite inbox, in-memory)
//! ├── dead_letter/   # dead-letter router and sinks
//! ├── ingest/        # decoding and the ingestion worker
//! ├── validation.rs  # order field constraints
//! ├── query.rs       # GetOrder
//! ├── api/           # HTTP routes
//! └── utils/         # logging
//! ```

pub mod api;
pub mod cache;
pub mod core;
pub mod db;
pub mod dead_letter;
pub mod feed;
pub mod ingest;
pub mod query;
pub mod utils;
pub mod validation;

pub use cache::{CachedOrderStore, MemoryOrderCache, OrderCache};
pub use core::{Config, Server, ServiceState};
pub use db::DbService;
pub use db::repository::{OrderRepository, OrderStore, UpsertOutcome};
pub use ingest::{IngestWorker, MessageOutcome};
pub use query::{OrderLookup, OrderQueryService};
pub use utils::logger::init_logger_with_file;
