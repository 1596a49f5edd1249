//! Real-time orders service.
//!
//! Exposes an order store over a REST API and a WebSocket push channel.
//! Every committed mutation — from REST, from a WebSocket request, or
//! applied directly against the database — raises a `pg_notify` on a change
//! channel; a dedicated listener decodes each notification and fans it out
//! to every connected client.

pub mod broadcast;
pub mod config;
pub mod error;
pub mod listener;
pub mod models;
pub mod registry;
pub mod routes;
pub mod state;
pub mod store;
pub mod ws;

pub use config::{Args, ServerConfig};
pub use error::Error;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::health::routes())
        .merge(routes::orders::routes())
        .route("/ws", get(ws::ws_orders))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
