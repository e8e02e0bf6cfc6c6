//! In-memory store implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use crate::store::error::{StoreError, StoreResult};
use crate::store::traits::{OrderQuery, OrderStore};
use crate::types::{Order, OrderEvent, OrderItem, OrderStatus, Ticket, TicketStatus};

#[derive(Default)]
struct State {
    tickets: HashMap<Uuid, Ticket>,
    ticket_codes: HashMap<String, Uuid>,
    orders: HashMap<Uuid, Order>,
    order_codes: HashMap<String, Uuid>,
    items: HashMap<Uuid, Vec<OrderItem>>,
    events: HashMap<Uuid, Vec<OrderEvent>>,
}

/// Switches that make individual operations fail, for exercising
/// degradation and atomicity paths in tests
#[derive(Default)]
struct Faults {
    order_scan: AtomicBool,
    item_scan: AtomicBool,
    event_append: AtomicBool,
    order_insert: AtomicBool,
}

/// In-memory store for tests and single-node development
///
/// All state sits behind one lock, so every trait method is atomic.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
    faults: Faults,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `list_orders` fail
    pub fn fail_order_scan(&self, fail: bool) {
        self.faults.order_scan.store(fail, Ordering::SeqCst);
    }

    /// Make `list_items` fail
    pub fn fail_item_scan(&self, fail: bool) {
        self.faults.item_scan.store(fail, Ordering::SeqCst);
    }

    /// Make `append_event` fail
    pub fn fail_event_append(&self, fail: bool) {
        self.faults.event_append.store(fail, Ordering::SeqCst);
    }

    /// Make `insert_order` fail after validation, writing nothing
    pub fn fail_order_insert(&self, fail: bool) {
        self.faults.order_insert.store(fail, Ordering::SeqCst);
    }

    pub fn order_count(&self) -> usize {
        self.state.read().orders.len()
    }

    pub fn ticket_count(&self) -> usize {
        self.state.read().tickets.len()
    }

    fn injected(flag: &AtomicBool, what: &str) -> StoreResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Query(format!("injected failure: {}", what)));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn insert_ticket(&self, ticket: &Ticket) -> StoreResult<()> {
        let mut state = self.state.write();

        if state.ticket_codes.contains_key(&ticket.ticket_code) {
            return Err(StoreError::Duplicate {
                field: "ticket_code",
                value: ticket.ticket_code.clone(),
            });
        }

        state
            .ticket_codes
            .insert(ticket.ticket_code.clone(), ticket.ticket_id);
        state.tickets.insert(ticket.ticket_id, ticket.clone());
        Ok(())
    }

    async fn get_ticket(&self, ticket_id: Uuid) -> StoreResult<Option<Ticket>> {
        Ok(self.state.read().tickets.get(&ticket_id).cloned())
    }

    async fn get_ticket_by_code(&self, ticket_code: &str) -> StoreResult<Option<Ticket>> {
        let state = self.state.read();
        Ok(state
            .ticket_codes
            .get(ticket_code)
            .and_then(|id| state.tickets.get(id))
            .cloned())
    }

    async fn set_ticket_status(
        &self,
        ticket_id: Uuid,
        status: TicketStatus,
    ) -> StoreResult<Option<Ticket>> {
        let mut state = self.state.write();
        Ok(state.tickets.get_mut(&ticket_id).map(|ticket| {
            ticket.status = status;
            ticket.clone()
        }))
    }

    async fn insert_order(
        &self,
        order: &Order,
        items: &[OrderItem],
        created: &OrderEvent,
    ) -> StoreResult<()> {
        let mut state = self.state.write();

        if state.order_codes.contains_key(&order.order_code) {
            return Err(StoreError::Duplicate {
                field: "order_code",
                value: order.order_code.clone(),
            });
        }

        if !state.tickets.contains_key(&order.ticket_id) {
            return Err(StoreError::NotFound(format!("ticket {}", order.ticket_id)));
        }

        Self::injected(&self.faults.order_insert, "insert_order")?;

        state
            .order_codes
            .insert(order.order_code.clone(), order.order_id);
        state.orders.insert(order.order_id, order.clone());
        state.items.insert(order.order_id, items.to_vec());
        state.events.insert(order.order_id, vec![created.clone()]);
        Ok(())
    }

    async fn get_order(&self, order_id: Uuid) -> StoreResult<Option<Order>> {
        Ok(self.state.read().orders.get(&order_id).cloned())
    }

    async fn get_order_by_code(&self, order_code: &str) -> StoreResult<Option<Order>> {
        let state = self.state.read();
        Ok(state
            .order_codes
            .get(order_code)
            .and_then(|id| state.orders.get(id))
            .cloned())
    }

    async fn transition_status(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Order>> {
        let mut state = self.state.write();

        match state.orders.get_mut(&order_id) {
            Some(order) if order.status == from => {
                order.status = to;
                order.stamp_status(to, at);
                Ok(Some(order.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn append_event(&self, event: &OrderEvent) -> StoreResult<()> {
        Self::injected(&self.faults.event_append, "append_event")?;

        let mut state = self.state.write();
        if !state.orders.contains_key(&event.order_id) {
            return Err(StoreError::NotFound(format!("order {}", event.order_id)));
        }
        state
            .events
            .entry(event.order_id)
            .or_default()
            .push(event.clone());
        Ok(())
    }

    async fn list_events(&self, order_id: Uuid) -> StoreResult<Vec<OrderEvent>> {
        Ok(self
            .state
            .read()
            .events
            .get(&order_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_orders(&self, query: &OrderQuery) -> StoreResult<Vec<Order>> {
        Self::injected(&self.faults.order_scan, "list_orders")?;

        let state = self.state.read();
        let mut result: Vec<Order> = state
            .orders
            .values()
            .filter(|o| query.matches(o))
            .cloned()
            .collect();

        // HashMap iteration is unordered; ties on created_at fall back to the code
        result.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.order_code.cmp(&b.order_code))
        });
        if query.newest_first {
            result.reverse();
        }

        if let Some(limit) = query.limit {
            result.truncate(limit);
        }

        Ok(result)
    }

    async fn list_items(&self, order_ids: &[Uuid]) -> StoreResult<Vec<OrderItem>> {
        Self::injected(&self.faults.item_scan, "list_items")?;

        let state = self.state.read();
        Ok(order_ids
            .iter()
            .filter_map(|id| state.items.get(id))
            .flat_map(|items| items.iter().cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Actor, PaymentMethod};
    use chrono::{Duration, TimeZone};
    use common::Money;

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::minutes(minute)
    }

    fn order_for(ticket: &Ticket, code: &str, created_at: DateTime<Utc>) -> Order {
        Order {
            order_id: Uuid::new_v4(),
            order_code: code.to_string(),
            vendor_id: Uuid::new_v4(),
            ticket_id: ticket.ticket_id,
            total: Money::from_minor(1000),
            net: Money::from_minor(1000),
            tax: Money::ZERO,
            tax_rate: 0.0,
            status: OrderStatus::Preparing,
            payment_method: PaymentMethod::Cash,
            preparing_at: Some(created_at),
            ready_at: None,
            collected_at: None,
            created_at,
        }
    }

    async fn seeded(store: &InMemoryStore, code: &str, created_at: DateTime<Utc>) -> Order {
        let ticket = Ticket::open(format!("T-{}", &code[2..]), created_at);
        store.insert_ticket(&ticket).await.unwrap();
        let order = order_for(&ticket, code, created_at);
        let event = OrderEvent::new(order.order_id, None, OrderStatus::Preparing, Actor::Cashier, created_at);
        store.insert_order(&order, &[], &event).await.unwrap();
        order
    }

    #[tokio::test]
    async fn test_duplicate_ticket_code() {
        let store = InMemoryStore::new();
        store.insert_ticket(&Ticket::open("T-1000".into(), at(0))).await.unwrap();

        let err = store
            .insert_ticket(&Ticket::open("T-1000".into(), at(1)))
            .await
            .unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(store.ticket_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_order_code() {
        let store = InMemoryStore::new();
        let first = seeded(&store, "O-1000", at(0)).await;

        let mut clash = first.clone();
        clash.order_id = Uuid::new_v4();
        let event = OrderEvent::new(clash.order_id, None, OrderStatus::Preparing, Actor::Cashier, at(1));
        let err = store.insert_order(&clash, &[], &event).await.unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(store.order_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_insert_writes_nothing() {
        let store = InMemoryStore::new();
        let ticket = Ticket::open("T-2000".into(), at(0));
        store.insert_ticket(&ticket).await.unwrap();

        store.fail_order_insert(true);
        let order = order_for(&ticket, "O-2000", at(0));
        let event = OrderEvent::new(order.order_id, None, OrderStatus::Preparing, Actor::Cashier, at(0));
        assert!(store.insert_order(&order, &[], &event).await.is_err());

        assert_eq!(store.order_count(), 0);
        assert!(store.list_events(order.order_id).await.unwrap().is_empty());
        assert!(store.get_order_by_code("O-2000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transition_is_conditional() {
        let store = InMemoryStore::new();
        let order = seeded(&store, "O-3000", at(0)).await;

        let moved = store
            .transition_status(order.order_id, OrderStatus::Preparing, OrderStatus::Ready, at(4))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(moved.status, OrderStatus::Ready);
        assert_eq!(moved.ready_at, Some(at(4)));

        // stale `from` loses
        let stale = store
            .transition_status(order.order_id, OrderStatus::Preparing, OrderStatus::Ready, at(9))
            .await
            .unwrap();
        assert!(stale.is_none());
        let current = store.get_order(order.order_id).await.unwrap().unwrap();
        assert_eq!(current.ready_at, Some(at(4)));
    }

    #[tokio::test]
    async fn test_list_orders_window_and_order() {
        let store = InMemoryStore::new();
        seeded(&store, "O-1001", at(10)).await;
        seeded(&store, "O-1002", at(0)).await;
        seeded(&store, "O-1003", at(60 * 24)).await;

        let day = OrderQuery::new().with_window(at(0), at(60 * 24));
        let orders = store.list_orders(&day).await.unwrap();
        let codes: Vec<_> = orders.iter().map(|o| o.order_code.as_str()).collect();
        assert_eq!(codes, vec!["O-1002", "O-1001"]);

        let newest = store
            .list_orders(&OrderQuery::new().newest_first().with_limit(1))
            .await
            .unwrap();
        assert_eq!(newest[0].order_code, "O-1003");
    }

    #[tokio::test]
    async fn test_injected_scan_failures() {
        let store = InMemoryStore::new();
        store.fail_order_scan(true);
        assert!(store.list_orders(&OrderQuery::new()).await.is_err());
        store.fail_item_scan(true);
        assert!(store.list_items(&[Uuid::new_v4()]).await.is_err());
    }
}
