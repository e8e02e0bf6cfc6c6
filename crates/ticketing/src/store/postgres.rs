//! PostgreSQL store implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::Money;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};
use std::time::Duration;
use uuid::Uuid;

use crate::store::error::{StoreError, StoreResult};
use crate::store::traits::{OrderQuery, OrderStore};
use crate::types::{Order, OrderEvent, OrderItem, OrderStatus, Ticket, TicketStatus};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

/// PostgreSQL-backed store
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wrap an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with a bounded pool
    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self::new(pool))
    }

    /// Create tables and indexes if missing
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        tracing::info!("ticketing schema applied");
        Ok(())
    }
}

const TICKET_CODE_KEY: &str = "tickets_ticket_code_key";
const ORDER_CODE_KEY: &str = "orders_order_code_key";

/// Whether `err` is a unique violation (`23505`) on `constraint`
fn violates(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            is_constraint_clash(db.code().as_deref(), db.constraint(), constraint)
        }
        _ => false,
    }
}

fn is_constraint_clash(code: Option<&str>, actual: Option<&str>, expected: &str) -> bool {
    code == Some("23505") && actual == Some(expected)
}

fn map_err(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Connection(err.to_string())
        }
        other => StoreError::Query(other.to_string()),
    }
}

fn parse_column<T: std::str::FromStr<Err = String>>(row: &PgRow, column: &str) -> StoreResult<T> {
    let raw: String = row.try_get(column).map_err(map_err)?;
    raw.parse().map_err(StoreError::Query)
}

fn row_to_ticket(row: &PgRow) -> StoreResult<Ticket> {
    Ok(Ticket {
        ticket_id: row.try_get("ticket_id").map_err(map_err)?,
        ticket_code: row.try_get("ticket_code").map_err(map_err)?,
        status: parse_column::<TicketStatus>(row, "status")?,
        created_at: row.try_get("created_at").map_err(map_err)?,
    })
}

fn row_to_order(row: &PgRow) -> StoreResult<Order> {
    Ok(Order {
        order_id: row.try_get("order_id").map_err(map_err)?,
        order_code: row.try_get("order_code").map_err(map_err)?,
        vendor_id: row.try_get("vendor_id").map_err(map_err)?,
        ticket_id: row.try_get("ticket_id").map_err(map_err)?,
        total: Money::from_minor(row.try_get("total").map_err(map_err)?),
        net: Money::from_minor(row.try_get("net").map_err(map_err)?),
        tax: Money::from_minor(row.try_get("tax").map_err(map_err)?),
        tax_rate: row.try_get("tax_rate").map_err(map_err)?,
        status: parse_column::<OrderStatus>(row, "status")?,
        payment_method: parse_column(row, "payment_method")?,
        preparing_at: row.try_get("preparing_at").map_err(map_err)?,
        ready_at: row.try_get("ready_at").map_err(map_err)?,
        collected_at: row.try_get("collected_at").map_err(map_err)?,
        created_at: row.try_get("created_at").map_err(map_err)?,
    })
}

fn row_to_item(row: &PgRow) -> StoreResult<OrderItem> {
    let quantity: i32 = row.try_get("quantity").map_err(map_err)?;
    Ok(OrderItem {
        item_id: row.try_get("item_id").map_err(map_err)?,
        order_id: row.try_get("order_id").map_err(map_err)?,
        menu_item_id: row.try_get("menu_item_id").map_err(map_err)?,
        name: row.try_get("name").map_err(map_err)?,
        unit_price: Money::from_minor(row.try_get("unit_price").map_err(map_err)?),
        quantity: u32::try_from(quantity)
            .map_err(|_| StoreError::Query(format!("negative quantity {}", quantity)))?,
        notes: row.try_get("notes").map_err(map_err)?,
    })
}

fn row_to_event(row: &PgRow) -> StoreResult<OrderEvent> {
    let from_status: Option<String> = row.try_get("from_status").map_err(map_err)?;
    Ok(OrderEvent {
        event_id: row.try_get("event_id").map_err(map_err)?,
        order_id: row.try_get("order_id").map_err(map_err)?,
        from_status: from_status
            .map(|s| s.parse::<OrderStatus>())
            .transpose()
            .map_err(StoreError::Query)?,
        to_status: parse_column::<OrderStatus>(row, "to_status")?,
        actor: parse_column(row, "actor")?,
        created_at: row.try_get("created_at").map_err(map_err)?,
    })
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn insert_ticket(&self, ticket: &Ticket) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO tickets (ticket_id, ticket_code, status, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(ticket.ticket_id)
        .bind(&ticket.ticket_code)
        .bind(ticket.status.as_str())
        .bind(ticket.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if violates(&e, TICKET_CODE_KEY) {
                StoreError::Duplicate {
                    field: "ticket_code",
                    value: ticket.ticket_code.clone(),
                }
            } else {
                map_err(e)
            }
        })?;

        Ok(())
    }

    async fn get_ticket(&self, ticket_id: Uuid) -> StoreResult<Option<Ticket>> {
        let row = sqlx::query("SELECT * FROM tickets WHERE ticket_id = $1")
            .bind(ticket_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;

        row.as_ref().map(row_to_ticket).transpose()
    }

    async fn get_ticket_by_code(&self, ticket_code: &str) -> StoreResult<Option<Ticket>> {
        let row = sqlx::query("SELECT * FROM tickets WHERE ticket_code = $1")
            .bind(ticket_code)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;

        row.as_ref().map(row_to_ticket).transpose()
    }

    async fn set_ticket_status(
        &self,
        ticket_id: Uuid,
        status: TicketStatus,
    ) -> StoreResult<Option<Ticket>> {
        let row = sqlx::query("UPDATE tickets SET status = $2 WHERE ticket_id = $1 RETURNING *")
            .bind(ticket_id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;

        row.as_ref().map(row_to_ticket).transpose()
    }

    async fn insert_order(
        &self,
        order: &Order,
        items: &[OrderItem],
        created: &OrderEvent,
    ) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Transaction(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                order_id, order_code, vendor_id, ticket_id, total, net, tax, tax_rate,
                status, payment_method, preparing_at, ready_at, collected_at, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(order.order_id)
        .bind(&order.order_code)
        .bind(order.vendor_id)
        .bind(order.ticket_id)
        .bind(order.total.minor())
        .bind(order.net.minor())
        .bind(order.tax.minor())
        .bind(order.tax_rate)
        .bind(order.status.as_str())
        .bind(order.payment_method.as_str())
        .bind(order.preparing_at)
        .bind(order.ready_at)
        .bind(order.collected_at)
        .bind(order.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if violates(&e, ORDER_CODE_KEY) {
                StoreError::Duplicate {
                    field: "order_code",
                    value: order.order_code.clone(),
                }
            } else {
                map_err(e)
            }
        })?;

        for (position, item) in items.iter().enumerate() {
            let quantity = i32::try_from(item.quantity)
                .map_err(|_| StoreError::Query(format!("quantity {} out of range", item.quantity)))?;

            sqlx::query(
                r#"
                INSERT INTO order_items (
                    item_id, order_id, position, menu_item_id, name, unit_price, quantity, notes
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(item.item_id)
            .bind(item.order_id)
            .bind(position as i32)
            .bind(item.menu_item_id)
            .bind(&item.name)
            .bind(item.unit_price.minor())
            .bind(quantity)
            .bind(&item.notes)
            .execute(&mut *tx)
            .await
            .map_err(map_err)?;
        }

        sqlx::query(
            r#"
            INSERT INTO order_events (event_id, order_id, from_status, to_status, actor, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(created.event_id)
        .bind(created.order_id)
        .bind(created.from_status.map(|s| s.as_str()))
        .bind(created.to_status.as_str())
        .bind(created.actor.as_str())
        .bind(created.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_err)?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Transaction(e.to_string()))?;

        Ok(())
    }

    async fn get_order(&self, order_id: Uuid) -> StoreResult<Option<Order>> {
        let row = sqlx::query("SELECT * FROM orders WHERE order_id = $1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;

        row.as_ref().map(row_to_order).transpose()
    }

    async fn get_order_by_code(&self, order_code: &str) -> StoreResult<Option<Order>> {
        let row = sqlx::query("SELECT * FROM orders WHERE order_code = $1")
            .bind(order_code)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;

        row.as_ref().map(row_to_order).transpose()
    }

    async fn transition_status(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Order>> {
        let row = sqlx::query(
            r#"
            UPDATE orders SET
                status = $3::text,
                preparing_at = CASE WHEN $3::text = 'preparing' THEN COALESCE(preparing_at, $4) ELSE preparing_at END,
                ready_at = CASE WHEN $3::text = 'ready' THEN COALESCE(ready_at, $4) ELSE ready_at END,
                collected_at = CASE WHEN $3::text = 'collected' THEN COALESCE(collected_at, $4) ELSE collected_at END
            WHERE order_id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_err)?;

        row.as_ref().map(row_to_order).transpose()
    }

    async fn append_event(&self, event: &OrderEvent) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO order_events (event_id, order_id, from_status, to_status, actor, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event.event_id)
        .bind(event.order_id)
        .bind(event.from_status.map(|s| s.as_str()))
        .bind(event.to_status.as_str())
        .bind(event.actor.as_str())
        .bind(event.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;

        Ok(())
    }

    async fn list_events(&self, order_id: Uuid) -> StoreResult<Vec<OrderEvent>> {
        let rows = sqlx::query("SELECT * FROM order_events WHERE order_id = $1 ORDER BY seq ASC")
            .bind(order_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_err)?;

        rows.iter().map(row_to_event).collect()
    }

    async fn list_orders(&self, query: &OrderQuery) -> StoreResult<Vec<Order>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM orders WHERE TRUE");

        if let Some(from) = query.created_from {
            builder.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(before) = query.created_before {
            builder.push(" AND created_at < ").push_bind(before);
        }
        if let Some(vendor_id) = query.vendor_id {
            builder.push(" AND vendor_id = ").push_bind(vendor_id);
        }
        if let Some(ticket_id) = query.ticket_id {
            builder.push(" AND ticket_id = ").push_bind(ticket_id);
        }
        if !query.statuses.is_empty() {
            let statuses: Vec<String> = query.statuses.iter().map(|s| s.as_str().to_string()).collect();
            builder.push(" AND status = ANY(").push_bind(statuses).push(")");
        }

        if query.newest_first {
            builder.push(" ORDER BY created_at DESC, order_code DESC");
        } else {
            builder.push(" ORDER BY created_at ASC, order_code ASC");
        }

        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(limit as i64);
        }

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(map_err)?;

        rows.iter().map(row_to_order).collect()
    }

    async fn list_items(&self, order_ids: &[Uuid]) -> StoreResult<Vec<OrderItem>> {
        if order_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT * FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY array_position($1, order_id), position
            "#,
        )
        .bind(order_ids.to_vec())
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;

        rows.iter().map(row_to_item).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_code_constraints_are_collisions() {
        assert!(is_constraint_clash(Some("23505"), Some(TICKET_CODE_KEY), TICKET_CODE_KEY));
        assert!(is_constraint_clash(Some("23505"), Some(ORDER_CODE_KEY), ORDER_CODE_KEY));

        // primary key clash is not a code collision
        assert!(!is_constraint_clash(Some("23505"), Some("orders_pkey"), ORDER_CODE_KEY));
        assert!(!is_constraint_clash(Some("23505"), None, TICKET_CODE_KEY));
        assert!(!is_constraint_clash(Some("23503"), Some(ORDER_CODE_KEY), ORDER_CODE_KEY));
    }

    #[test]
    fn test_non_database_errors_are_not_collisions() {
        assert!(!violates(&sqlx::Error::PoolTimedOut, TICKET_CODE_KEY));
        assert!(matches!(map_err(sqlx::Error::PoolTimedOut), StoreError::Connection(_)));
    }
}
