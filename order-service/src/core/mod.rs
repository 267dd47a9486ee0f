//! Core Module
//!
//! Configuration, shared state, background tasks and the server runtime

pub mod config;
pub mod server;
pub mod state;
pub mod tasks;

pub use config::{Config, ConfigError};
pub use server::Server;
pub use state::{ServiceState, StartupError};
pub use tasks::{BackgroundTasks, TaskKind};
