//! Order persistence over PostgreSQL.
//!
//! Also owns the schema bootstrap, including the notification triggers that
//! publish one change-channel message per committed mutation.

use sqlx::{PgPool, QueryBuilder};

use crate::models::{Order, OrderCreate, OrderUpdate};

/// Idempotent schema bootstrap.
///
/// The `orders_notify_change` trigger is the producer side of the change
/// pipeline: it runs inside the mutating transaction, so the notification is
/// atomic with the commit. There is no backlog; a notification published
/// while no listener is subscribed is simply lost.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS orders (
    id BIGSERIAL PRIMARY KEY,
    customer_name TEXT NOT NULL,
    product_name TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'shipped', 'delivered')),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE OR REPLACE FUNCTION orders_touch_updated_at() RETURNS trigger AS $$
BEGIN
    NEW.updated_at = now();
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

DROP TRIGGER IF EXISTS orders_touch ON orders;
CREATE TRIGGER orders_touch
    BEFORE INSERT OR UPDATE ON orders
    FOR EACH ROW EXECUTE FUNCTION orders_touch_updated_at();

CREATE OR REPLACE FUNCTION orders_notify_change() RETURNS trigger AS $$
DECLARE
    payload JSON;
BEGIN
    IF TG_OP = 'INSERT' THEN
        payload = json_build_object('operation', TG_OP, 'data', row_to_json(NEW));
    ELSIF TG_OP = 'UPDATE' THEN
        payload = json_build_object(
            'operation', TG_OP,
            'old_data', row_to_json(OLD),
            'new_data', row_to_json(NEW)
        );
    ELSE
        payload = json_build_object('operation', TG_OP, 'data', row_to_json(OLD));
    END IF;
    PERFORM pg_notify('order_changes', payload::text);
    RETURN COALESCE(NEW, OLD);
END;
$$ LANGUAGE plpgsql;

DROP TRIGGER IF EXISTS orders_notify ON orders;
CREATE TRIGGER orders_notify
    AFTER INSERT OR UPDATE OR DELETE ON orders
    FOR EACH ROW EXECUTE FUNCTION orders_notify_change();
"#;

const ORDER_COLUMNS: &str = "id, customer_name, product_name, status, updated_at";

/// Order CRUD over the shared connection pool.
pub struct OrderStore {
    pool: PgPool,
}

impl OrderStore {
    /// Create a store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool, for health checks.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the orders table and its notification triggers if missing.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        tracing::info!("orders schema ready");
        Ok(())
    }

    /// All orders, most recently updated first.
    pub async fn list(&self) -> Result<Vec<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY updated_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
    }

    /// One order by id.
    pub async fn get(&self, id: i64) -> Result<Option<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Insert a new order and return the stored row.
    pub async fn create(&self, order: &OrderCreate) -> Result<Order, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            "INSERT INTO orders (customer_name, product_name, status) \
             VALUES ($1, $2, $3) RETURNING {ORDER_COLUMNS}"
        ))
        .bind(&order.customer_name)
        .bind(&order.product_name)
        .bind(order.status)
        .fetch_one(&self.pool)
        .await
    }

    /// Apply a partial update, binding only the fields that are present.
    ///
    /// Returns `None` when the order does not exist. Callers must reject an
    /// empty patch before getting here.
    pub async fn update(
        &self,
        id: i64,
        changes: &OrderUpdate,
    ) -> Result<Option<Order>, sqlx::Error> {
        let mut builder = QueryBuilder::new("UPDATE orders SET ");
        {
            let mut fields = builder.separated(", ");
            if let Some(customer_name) = &changes.customer_name {
                fields
                    .push("customer_name = ")
                    .push_bind_unseparated(customer_name.clone());
            }
            if let Some(product_name) = &changes.product_name {
                fields
                    .push("product_name = ")
                    .push_bind_unseparated(product_name.clone());
            }
            if let Some(status) = changes.status {
                fields.push("status = ").push_bind_unseparated(status);
            }
        }
        builder.push(" WHERE id = ").push_bind(id);
        builder.push(format!(" RETURNING {ORDER_COLUMNS}"));

        builder
            .build_query_as::<Order>()
            .fetch_optional(&self.pool)
            .await
    }

    /// Delete an order, returning the row that was removed.
    pub async fn delete(&self, id: i64) -> Result<Option<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            "DELETE FROM orders WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }
}
