//! REST endpoints for orders.
//!
//! Mutations here produce no fan-out of their own; the notification trigger
//! fires on commit and the change reaches WebSocket clients through the
//! listener like any other mutation.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::{Order, OrderCreate, OrderUpdate};
use crate::state::AppState;

/// Order CRUD routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(list_orders).post(create_order))
        .route(
            "/api/orders/:id",
            get(get_order).put(update_order).delete(delete_order),
        )
}

/// Get all orders, most recently updated first.
async fn list_orders(State(state): State<AppState>) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.store.list().await?))
}

/// Create a new order.
async fn create_order(
    State(state): State<AppState>,
    Json(order): Json<OrderCreate>,
) -> Result<Json<Order>> {
    Ok(Json(state.store.create(&order).await?))
}

/// Get a specific order.
async fn get_order(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Order>> {
    let order = state.store.get(id).await?.ok_or(Error::OrderNotFound(id))?;
    Ok(Json(order))
}

/// Apply a partial update to an order.
async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(updates): Json<OrderUpdate>,
) -> Result<Json<Order>> {
    if updates.is_empty() {
        return Err(Error::InvalidRequest("no fields to update".to_string()));
    }

    let order = state
        .store
        .update(id, &updates)
        .await?
        .ok_or(Error::OrderNotFound(id))?;
    Ok(Json(order))
}

/// Delete response body.
#[derive(Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub order: Order,
}

/// Delete an order.
async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResponse>> {
    let order = state
        .store
        .delete(id)
        .await?
        .ok_or(Error::OrderNotFound(id))?;

    Ok(Json(DeleteResponse {
        message: "Order deleted successfully".to_string(),
        order,
    }))
}
