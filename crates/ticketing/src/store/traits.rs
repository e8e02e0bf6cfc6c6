//! OrderStore trait definition

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::store::error::StoreResult;
use crate::types::{Order, OrderEvent, OrderItem, OrderStatus, Ticket, TicketStatus};

/// Query filters for listing orders.
///
/// Results are always ordered by creation time, oldest first unless
/// `newest_first` is set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderQuery {
    /// Created at or after this instant.
    pub created_from: Option<DateTime<Utc>>,
    /// Created strictly before this instant.
    pub created_before: Option<DateTime<Utc>>,
    pub vendor_id: Option<Uuid>,
    pub ticket_id: Option<Uuid>,
    /// Any of these statuses; empty means all.
    pub statuses: Vec<OrderStatus>,
    pub newest_first: bool,
    pub limit: Option<usize>,
}

impl OrderQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Half-open creation window `[from, before)`.
    pub fn with_window(mut self, from: DateTime<Utc>, before: DateTime<Utc>) -> Self {
        self.created_from = Some(from);
        self.created_before = Some(before);
        self
    }

    pub fn with_vendor(mut self, vendor_id: Uuid) -> Self {
        self.vendor_id = Some(vendor_id);
        self
    }

    pub fn with_ticket(mut self, ticket_id: Uuid) -> Self {
        self.ticket_id = Some(ticket_id);
        self
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = OrderStatus>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    pub fn newest_first(mut self) -> Self {
        self.newest_first = true;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check if an order matches the filters (ordering and limit aside).
    pub fn matches(&self, order: &Order) -> bool {
        if let Some(from) = self.created_from {
            if order.created_at < from {
                return false;
            }
        }

        if let Some(before) = self.created_before {
            if order.created_at >= before {
                return false;
            }
        }

        if let Some(vendor_id) = self.vendor_id {
            if order.vendor_id != vendor_id {
                return false;
            }
        }

        if let Some(ticket_id) = self.ticket_id {
            if order.ticket_id != ticket_id {
                return false;
            }
        }

        if !self.statuses.is_empty() && !self.statuses.contains(&order.status) {
            return false;
        }

        true
    }
}

/// OrderStore trait - the durable system of record
///
/// Implementations must enforce uniqueness of `ticket_code` and `order_code`
/// (reported as [`StoreError::Duplicate`](crate::store::StoreError::Duplicate))
/// and provide the atomicity documented on each method.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert a new ticket
    ///
    /// Fails with `Duplicate` when the ticket code is taken.
    async fn insert_ticket(&self, ticket: &Ticket) -> StoreResult<()>;

    /// Get a ticket by id
    async fn get_ticket(&self, ticket_id: Uuid) -> StoreResult<Option<Ticket>>;

    /// Get a ticket by its code
    async fn get_ticket_by_code(&self, ticket_code: &str) -> StoreResult<Option<Ticket>>;

    /// Overwrite a ticket's status, returning the updated ticket
    async fn set_ticket_status(
        &self,
        ticket_id: Uuid,
        status: TicketStatus,
    ) -> StoreResult<Option<Ticket>>;

    /// Insert an order, its items and its creation event as one unit
    ///
    /// Either all rows become visible or none do. Fails with `Duplicate`
    /// when the order code is taken.
    async fn insert_order(
        &self,
        order: &Order,
        items: &[OrderItem],
        created: &OrderEvent,
    ) -> StoreResult<()>;

    /// Get an order by id
    async fn get_order(&self, order_id: Uuid) -> StoreResult<Option<Order>>;

    /// Get an order by its code
    async fn get_order_by_code(&self, order_code: &str) -> StoreResult<Option<Order>>;

    /// Conditionally move an order from `from` to `to`
    ///
    /// A single atomic write: applies only while the stored status still
    /// equals `from`, and stamps the timestamp of `to` only if it is unset.
    /// Returns the updated order, or `None` when the order is missing or
    /// its status no longer matches.
    async fn transition_status(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Order>>;

    /// Append an audit event
    async fn append_event(&self, event: &OrderEvent) -> StoreResult<()>;

    /// Events for an order in append order
    async fn list_events(&self, order_id: Uuid) -> StoreResult<Vec<OrderEvent>>;

    /// List orders matching a query
    async fn list_orders(&self, query: &OrderQuery) -> StoreResult<Vec<Order>>;

    /// Items of the given orders, grouped in the order of `order_ids` and
    /// in insertion order within each order
    async fn list_items(&self, order_ids: &[Uuid]) -> StoreResult<Vec<OrderItem>>;
}
