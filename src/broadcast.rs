//! Fan-out delivery of server messages to registered connections.

use std::sync::Arc;

use crate::models::ServerMessage;
use crate::registry::{ClientId, ConnectionRegistry};

/// Delivers one message to every registered connection.
///
/// Delivery to each connection is attempted independently: a dead connection
/// is unregistered on the spot and never blocks or drops delivery to the
/// rest. Connections that register after the snapshot was taken do not see
/// the in-flight message.
pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
}

impl Broadcaster {
    /// Create a broadcaster over the given registry.
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Send a message to every connection in the current snapshot.
    pub async fn broadcast(&self, message: &ServerMessage) {
        let payload = match serde_json::to_string(message) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("failed to serialize outbound message: {}", e);
                return;
            }
        };

        for (client_id, sender) in self.registry.snapshot().await {
            if sender.send(payload.clone()).is_err() {
                tracing::warn!(client_id, "send failed during broadcast, dropping client");
                self.registry.unregister(client_id).await;
            }
        }
    }

    /// Send a message to exactly one connection.
    ///
    /// Used for the initial full-state push on attach and for per-client
    /// error replies. A failed send unregisters the connection the same way
    /// a broadcast failure does.
    pub async fn send_direct(&self, message: &ServerMessage, client_id: ClientId) {
        let Some(sender) = self.registry.sender(client_id).await else {
            return;
        };

        let payload = match serde_json::to_string(message) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(client_id, "failed to serialize outbound message: {}", e);
                return;
            }
        };

        if sender.send(payload).is_err() {
            tracing::warn!(client_id, "direct send failed, dropping client");
            self.registry.unregister(client_id).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChangeEvent, ChangeOperation, Order, OrderStatus};
    use tokio::sync::mpsc;

    fn test_order(id: i64, status: OrderStatus) -> Order {
        Order {
            id,
            customer_name: "Alice".to_string(),
            product_name: "Widget".to_string(),
            status,
            updated_at: chrono::Utc::now(),
        }
    }

    fn update_event(id: i64) -> ServerMessage {
        ServerMessage::DatabaseChange {
            data: ChangeEvent {
                operation: ChangeOperation::Update,
                data: Some(test_order(id, OrderStatus::Shipped)),
                old_data: None,
                new_data: None,
            },
        }
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_connections() {
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster = Broadcaster::new(registry.clone());

        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let (tx_c, mut rx_c) = mpsc::unbounded_channel();
        registry.register(tx_a).await;
        registry.register(tx_b).await;
        registry.register(tx_c).await;

        broadcaster.broadcast(&update_event(1)).await;

        for rx in [&mut rx_a, &mut rx_b, &mut rx_c] {
            let frame = rx.try_recv().unwrap();
            let json: serde_json::Value = serde_json::from_str(&frame).unwrap();
            assert_eq!(json["type"], "database_change");
            assert_eq!(json["data"]["operation"], "UPDATE");
            assert_eq!(json["data"]["data"]["id"], 1);
            // Exactly one copy each.
            assert!(rx.try_recv().is_err());
        }
    }

    #[tokio::test]
    async fn test_failed_connection_is_dropped_others_still_deliver() {
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster = Broadcaster::new(registry.clone());

        let (tx_a, rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let (tx_c, mut rx_c) = mpsc::unbounded_channel();
        registry.register(tx_a).await;
        registry.register(tx_b).await;
        registry.register(tx_c).await;

        // Client A goes away: its receiver is gone, so sends to it fail.
        drop(rx_a);

        broadcaster.broadcast(&update_event(2)).await;
        assert_eq!(registry.count().await, 2);
        assert!(rx_b.try_recv().is_ok());
        assert!(rx_c.try_recv().is_ok());

        // A stays absent from every subsequent broadcast.
        broadcaster.broadcast(&update_event(3)).await;
        assert_eq!(registry.count().await, 2);
        assert!(rx_b.try_recv().is_ok());
        assert!(rx_c.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_late_registration_misses_earlier_event() {
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster = Broadcaster::new(registry.clone());

        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        registry.register(tx_a).await;

        broadcaster.broadcast(&update_event(1)).await;

        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        registry.register(tx_b).await;

        broadcaster.broadcast(&update_event(2)).await;

        // A saw both events, in publish order.
        let first: serde_json::Value =
            serde_json::from_str(&rx_a.try_recv().unwrap()).unwrap();
        let second: serde_json::Value =
            serde_json::from_str(&rx_a.try_recv().unwrap()).unwrap();
        assert_eq!(first["data"]["data"]["id"], 1);
        assert_eq!(second["data"]["data"]["id"], 2);

        // B only saw the event published after it registered.
        let only: serde_json::Value = serde_json::from_str(&rx_b.try_recv().unwrap()).unwrap();
        assert_eq!(only["data"]["data"]["id"], 2);
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_direct_failure_unregisters() {
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster = Broadcaster::new(registry.clone());

        let (tx, rx) = mpsc::unbounded_channel();
        let id = registry.register(tx).await;
        drop(rx);

        broadcaster
            .send_direct(
                &ServerMessage::Error {
                    message: "nope".to_string(),
                },
                id,
            )
            .await;

        assert_eq!(registry.count().await, 0);
    }

    #[tokio::test]
    async fn test_send_direct_to_unknown_client_is_noop() {
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster = Broadcaster::new(registry.clone());

        broadcaster
            .send_direct(
                &ServerMessage::Error {
                    message: "gone".to_string(),
                },
                42,
            )
            .await;

        assert_eq!(registry.count().await, 0);
    }
}
