//! Ingestion Module
//!
//! Feed message → decode → validate → store (through the cache), with
//! dead-letter routing for everything that cannot be ingested.

pub mod decode;
pub mod worker;

pub use decode::{DecodeError, decode_orders, peek_order_uid};
pub use worker::{IngestWorker, MessageOutcome};
