//! Order lookup endpoint

use crate::core::ServiceState;
use crate::query::OrderLookup;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use shared::Order;
use shared::error::{AppError, AppResult, ErrorCode};

pub fn router() -> Router<ServiceState> {
    Router::new().route("/api/orders/{uid}", get(get_order))
}

/// GET /api/orders/{uid} - full order aggregate
pub async fn get_order(
    State(state): State<ServiceState>,
    Path(uid): Path<String>,
) -> AppResult<Json<Order>> {
    match state.query.get_order(&uid).await? {
        OrderLookup::Found(order) => Ok(Json(order)),
        OrderLookup::NotFound => Err(AppError::new(ErrorCode::OrderNotFound)
            .with_detail("order_uid", uid)),
    }
}
