//! WebSocket push channel.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::error::Error;
use crate::models::{ClientMessage, ServerMessage};
use crate::registry::ClientId;
use crate::state::AppState;

/// WebSocket upgrade handler for the push channel.
pub async fn ws_orders(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle one client connection for its lifetime.
///
/// The socket is split: a writer task drains the connection's outbound queue
/// into the sink while this task reads client requests. The broadcaster only
/// ever sees the queue's sender, so nothing in the fan-out path waits on
/// this peer.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let client_id = state.registry.register(tx).await;

    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    // Full current state on attach.
    match state.store.list().await {
        Ok(orders) => {
            state
                .broadcaster
                .send_direct(&ServerMessage::InitialData { data: orders }, client_id)
                .await;
        }
        Err(e) => {
            tracing::error!(client_id, "failed to load initial orders: {}", e);
            state
                .broadcaster
                .send_direct(
                    &ServerMessage::Error {
                        message: "failed to load initial data".to_string(),
                    },
                    client_id,
                )
                .await;
        }
    }

    while let Some(message) = stream.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!(client_id, "WebSocket error: {}", e);
                break;
            }
        };

        let request: ClientMessage = match serde_json::from_str(&text) {
            Ok(request) => request,
            Err(e) => {
                send_error(&state, client_id, format!("invalid request: {}", e)).await;
                continue;
            }
        };

        if let Err(e) = dispatch(&state, request).await {
            send_error(&state, client_id, e.to_string()).await;
        }
    }

    state.registry.unregister(client_id).await;
    writer.abort();
}

/// Apply one client request against the store.
///
/// Successful mutations get no direct reply: the committed change comes back
/// to every client, this one included, through the change channel.
async fn dispatch(state: &AppState, request: ClientMessage) -> Result<(), Error> {
    match request {
        ClientMessage::CreateOrder { data } => {
            state.store.create(&data).await?;
        }
        ClientMessage::UpdateOrder { id, updates } => {
            if updates.is_empty() {
                return Err(Error::InvalidRequest("no fields to update".to_string()));
            }
            state
                .store
                .update(id, &updates)
                .await?
                .ok_or(Error::OrderNotFound(id))?;
        }
        ClientMessage::DeleteOrder { id } => {
            state
                .store
                .delete(id)
                .await?
                .ok_or(Error::OrderNotFound(id))?;
        }
    }
    Ok(())
}

async fn send_error(state: &AppState, client_id: ClientId, message: String) {
    state
        .broadcaster
        .send_direct(&ServerMessage::Error { message }, client_id)
        .await;
}
