//! Shared types for the order service
//!
//! Order aggregate models (the wire shape of the feed and of the lookup API),
//! error codes and the unified API response envelope.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use models::{Delivery, Item, Order, Payment};
