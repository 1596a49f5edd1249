//! Shared application state.

use std::sync::Arc;

use crate::broadcast::Broadcaster;
use crate::config::ServerConfig;
use crate::registry::ConnectionRegistry;
use crate::store::OrderStore;

/// Application state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<OrderStore>,
    pub registry: Arc<ConnectionRegistry>,
    pub broadcaster: Arc<Broadcaster>,
    pub config: ServerConfig,
}

impl AppState {
    /// Create new application state around a store.
    pub fn new(store: OrderStore, config: ServerConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster = Arc::new(Broadcaster::new(registry.clone()));

        Self {
            store: Arc::new(store),
            registry,
            broadcaster,
            config,
        }
    }
}
