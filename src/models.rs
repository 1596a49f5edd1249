//! Order records and wire messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Shipped,
    Delivered,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

/// A persisted order row.
///
/// `id` is assigned by the store and immutable; `updated_at` is set by a
/// database trigger on every insert and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: i64,
    pub customer_name: String,
    pub product_name: String,
    pub status: OrderStatus,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a new order.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderCreate {
    pub customer_name: String,
    pub product_name: String,
    #[serde(default)]
    pub status: OrderStatus,
}

/// Partial update for an order; only the fields present are applied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderUpdate {
    pub customer_name: Option<String>,
    pub product_name: Option<String>,
    pub status: Option<OrderStatus>,
}

impl OrderUpdate {
    /// True when no field is set, i.e. there is nothing to apply.
    pub fn is_empty(&self) -> bool {
        self.customer_name.is_none() && self.product_name.is_none() && self.status.is_none()
    }
}

/// Kind of committed mutation described by a change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeOperation {
    Insert,
    Update,
    Delete,
}

/// One committed mutation as published on the change channel.
///
/// Inserts and deletes carry the affected row in `data`; updates carry the
/// before and after images in `old_data`/`new_data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub operation: ChangeOperation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Order>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_data: Option<Order>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_data: Option<Order>,
}

/// Messages pushed to WebSocket clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A committed mutation, fanned out to every connected client.
    DatabaseChange { data: ChangeEvent },
    /// Full order list, sent once on attach.
    InitialData { data: Vec<Order> },
    /// A rejected request, sent only to the requester.
    Error { message: String },
}

/// Requests received from WebSocket clients.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    CreateOrder { data: OrderCreate },
    UpdateOrder { id: i64, updates: OrderUpdate },
    DeleteOrder { id: i64 },
}
