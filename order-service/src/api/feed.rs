//! Feed producer endpoint
//!
//! Appends a raw payload to the inbox. Only JSON syntax is checked here: the
//! ingestion worker owns decoding into orders and quarantine.

use crate::core::ServiceState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use shared::error::{AppError, AppResult, ErrorCode};

/// Optional message key header
const MESSAGE_KEY_HEADER: &str = "x-message-key";

pub fn router() -> Router<ServiceState> {
    Router::new().route("/api/feed/orders", post(publish))
}

/// POST /api/feed/orders - enqueue a raw order payload
pub async fn publish(
    State(state): State<ServiceState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    if body.is_empty() {
        return Err(AppError::invalid_request("Request body must not be empty"));
    }
    if let Err(e) = serde_json::from_slice::<serde::de::IgnoredAny>(&body) {
        return Err(AppError::invalid_payload(ErrorCode::OrderPayloadInvalid.message())
            .with_detail("error", e.to_string()));
    }
    let key = headers
        .get(MESSAGE_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());

    let id = state.inbox.publish(key, &body).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to append message to inbox");
        AppError::database("Failed to enqueue message")
    })?;

    Ok((StatusCode::ACCEPTED, Json(serde_json::json!({ "id": id }))))
}
