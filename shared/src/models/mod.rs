//! Data models shared between the service and its clients

pub mod order;

pub use order::{Delivery, Item, Order, Payment};
