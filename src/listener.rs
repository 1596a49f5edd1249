//! Subscription to the store's change channel.
//!
//! A single long-lived `LISTEN` subscription receives one notification per
//! committed mutation, decodes it into a [`ChangeEvent`] and hands it to the
//! [`Broadcaster`] for fan-out.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::broadcast::Broadcaster;
use crate::models::{ChangeEvent, ServerMessage};

/// Channel name the mutation triggers publish on.
pub const CHANGE_CHANNEL: &str = "order_changes";

/// Pause before retrying after a dropped channel connection.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Decode a change-channel payload.
pub fn decode_change(payload: &str) -> Result<ChangeEvent, serde_json::Error> {
    serde_json::from_str(payload)
}

/// Decode one notification payload and broadcast it.
///
/// A malformed payload is logged and discarded; it never stops the
/// subscription or the processing of later notifications.
async fn dispatch_payload(broadcaster: &Broadcaster, payload: &str) {
    match decode_change(payload) {
        Ok(event) => {
            info!(operation = ?event.operation, "database change detected");
            broadcaster
                .broadcast(&ServerMessage::DatabaseChange { data: event })
                .await;
        }
        Err(e) => {
            warn!(payload, "discarding malformed change notification: {}", e);
        }
    }
}

/// Long-lived listener on the store's change channel.
///
/// Holds a dedicated connection, separate from the query pool: a `LISTEN`
/// subscription occupies its connection for its entire lifetime and would
/// otherwise starve pooled queries.
pub struct ChangeListener {
    listener: PgListener,
    broadcaster: Arc<Broadcaster>,
}

impl ChangeListener {
    /// Open the dedicated connection and subscribe to the change channel.
    ///
    /// Failure here is fatal to startup: the process must not serve traffic
    /// without a working subscription.
    pub async fn connect(
        database_url: &str,
        broadcaster: Arc<Broadcaster>,
    ) -> Result<Self, sqlx::Error> {
        let mut listener = PgListener::connect(database_url).await?;
        listener.listen(CHANGE_CHANNEL).await?;
        info!(channel = CHANGE_CHANNEL, "listening for order changes");

        Ok(Self {
            listener,
            broadcaster,
        })
    }

    /// Process notifications until shutdown is signalled.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("change listener stopping");
                    break;
                }
                notification = self.listener.recv() => match notification {
                    Ok(notification) => {
                        dispatch_payload(&self.broadcaster, notification.payload()).await;
                    }
                    Err(e) => {
                        // PgListener re-establishes the subscription on the
                        // next recv after a dropped connection. Back off so a
                        // database outage does not become a hot retry loop.
                        warn!("change channel connection error: {}", e);
                        tokio::time::sleep(RECONNECT_DELAY).await;
                    }
                }
            }
        }
        // Dropping the PgListener closes the dedicated connection.
    }

    /// Spawn the listener as a background task.
    pub fn spawn(self) -> ListenerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));

        ListenerHandle { shutdown_tx, task }
    }
}

/// Handle for a running [`ChangeListener`] task.
pub struct ListenerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// Signal shutdown and wait for the listener to finish.
    ///
    /// Safe to call even if no notification has ever arrived.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
    }
}
