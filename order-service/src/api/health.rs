//! Health check endpoint

use crate::core::ServiceState;
use axum::routing::get;
use axum::{Json, Router};

pub fn router() -> Router<ServiceState> {
    Router::new().route("/health", get(health_check))
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "order-service",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
