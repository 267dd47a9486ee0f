//! HTTP API
//!
//! - `GET  /health`
//! - `GET  /api/orders/{uid}`
//! - `POST /api/feed/orders`

pub mod feed;
pub mod health;
pub mod orders;

use crate::core::ServiceState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use http::HeaderName;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

/// Largest payload accepted on the feed endpoint
const MAX_FEED_BODY_BYTES: usize = 4 * 1024 * 1024;

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Routes only, without middleware
pub fn build_router() -> Router<ServiceState> {
    Router::new()
        .merge(health::router())
        .merge(orders::router())
        .merge(feed::router())
}

/// Fully layered application, used by the server and by handler tests
pub fn router(state: ServiceState) -> Router {
    build_router()
        .layer(DefaultBodyLimit::max(MAX_FEED_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
        .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
        .with_state(state)
}
