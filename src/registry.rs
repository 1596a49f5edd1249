//! Registry of live WebSocket connections.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio::sync::RwLock;

/// Identifier for one registered connection.
pub type ClientId = u64;

/// Outbound frame queue for one connection.
///
/// The registry never touches the socket itself: each connection owns a
/// writer task that drains the paired receiver into the socket, so a slow
/// peer cannot stall the broadcaster and per-connection delivery stays FIFO.
pub type ClientSender = mpsc::UnboundedSender<String>;

/// Tracks the set of live connections.
///
/// This is the only shared mutable state in the fan-out path. All membership
/// changes go through [`register`](Self::register) and
/// [`unregister`](Self::unregister); broadcasts iterate over a
/// [`snapshot`](Self::snapshot) so concurrent changes never race an
/// in-flight delivery.
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ClientId, ClientSender>>,
    next_client_id: AtomicU64,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            next_client_id: AtomicU64::new(1),
        }
    }

    /// Add a connection to the live set and return its id.
    pub async fn register(&self, sender: ClientSender) -> ClientId {
        let client_id = self.next_client_id.fetch_add(1, Ordering::SeqCst);

        let total = {
            let mut connections = self.connections.write().await;
            connections.insert(client_id, sender);
            connections.len()
        };

        tracing::info!(client_id, total, "client connected");
        client_id
    }

    /// Remove a connection from the live set.
    ///
    /// Idempotent: removing an absent id is a no-op and returns `false`.
    pub async fn unregister(&self, client_id: ClientId) -> bool {
        let (removed, total) = {
            let mut connections = self.connections.write().await;
            let removed = connections.remove(&client_id).is_some();
            (removed, connections.len())
        };

        if removed {
            tracing::info!(client_id, total, "client disconnected");
        }
        removed
    }

    /// Number of live connections.
    pub async fn count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Point-in-time copy of the live set for safe iteration.
    pub async fn snapshot(&self) -> Vec<(ClientId, ClientSender)> {
        let connections = self.connections.read().await;
        connections
            .iter()
            .map(|(&id, sender)| (id, sender.clone()))
            .collect()
    }

    /// Look up the sender for one connection.
    pub async fn sender(&self, client_id: ClientId) -> Option<ClientSender> {
        self.connections.read().await.get(&client_id).cloned()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_unregister() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let id = registry.register(tx).await;
        assert_eq!(registry.count().await, 1);
        assert!(registry.sender(id).await.is_some());

        assert!(registry.unregister(id).await);
        assert_eq!(registry.count().await, 0);
        assert!(registry.sender(id).await.is_none());
    }

    #[tokio::test]
    async fn test_unregister_absent_is_noop() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.register(tx).await;

        assert!(!registry.unregister(9999).await);
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn test_snapshot_is_point_in_time_copy() {
        let registry = ConnectionRegistry::new();
        let (tx_a, _rx_a) = mpsc::unbounded_channel();
        let (tx_b, _rx_b) = mpsc::unbounded_channel();
        let id_a = registry.register(tx_a).await;
        let id_b = registry.register(tx_b).await;

        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.len(), 2);

        // Mutating the registry does not affect the snapshot already taken.
        registry.unregister(id_a).await;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(registry.count().await, 1);

        let ids: Vec<ClientId> = snapshot.iter().map(|(id, _)| *id).collect();
        assert!(ids.contains(&id_a));
        assert!(ids.contains(&id_b));
    }

    #[tokio::test]
    async fn test_concurrent_registrations() {
        let registry = std::sync::Arc::new(ConnectionRegistry::new());

        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let (tx, rx) = mpsc::unbounded_channel();
                let id = registry.register(tx).await;
                (id, rx)
            }));
        }

        let mut ids = Vec::new();
        let mut receivers = Vec::new();
        for handle in handles {
            let (id, rx) = handle.await.unwrap();
            ids.push(id);
            receivers.push(rx);
        }

        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 16);
        assert_eq!(registry.count().await, 16);
    }
}
