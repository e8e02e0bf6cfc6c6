//! Resolve a spoken or printed code to a ticket or an order

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::codes::{CodeAllocator, CodeKind};
use crate::error::Result;
use crate::store::{OrderQuery, OrderStore};
use crate::types::{Order, Ticket};

/// Outcome of a code lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LookupResult {
    /// A ticket and every vendor order under it
    Ticket { ticket: Ticket, orders: Vec<Order> },
    Order { order: Order },
    NotFound,
}

/// Code lookup for the status screens
///
/// A code carrying the ticket or order prefix is resolved only in that
/// namespace. Anything else is tried as a ticket code, then as an order code.
#[derive(Clone)]
pub struct StatusLookup {
    store: Arc<dyn OrderStore>,
    codes: CodeAllocator,
}

impl StatusLookup {
    pub fn new(store: Arc<dyn OrderStore>, codes: CodeAllocator) -> Self {
        Self { store, codes }
    }

    pub async fn lookup(&self, raw: &str) -> Result<LookupResult> {
        let code = raw.trim().to_uppercase();
        if code.is_empty() {
            return Ok(LookupResult::NotFound);
        }

        let result = match self.codes.kind_of(&code) {
            Some(CodeKind::Ticket) => self.as_ticket(&code).await?,
            Some(CodeKind::Order) => self.as_order(&code).await?,
            None => match self.as_ticket(&code).await? {
                LookupResult::NotFound => self.as_order(&code).await?,
                found => found,
            },
        };

        debug!(code = %code, found = !matches!(result, LookupResult::NotFound), "code lookup");
        Ok(result)
    }

    async fn as_ticket(&self, code: &str) -> Result<LookupResult> {
        let Some(ticket) = self.store.get_ticket_by_code(code).await? else {
            return Ok(LookupResult::NotFound);
        };
        let orders = self
            .store
            .list_orders(&OrderQuery::new().with_ticket(ticket.ticket_id))
            .await?;
        Ok(LookupResult::Ticket { ticket, orders })
    }

    async fn as_order(&self, code: &str) -> Result<LookupResult> {
        Ok(match self.store.get_order_by_code(code).await? {
            Some(order) => LookupResult::Order { order },
            None => LookupResult::NotFound,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::SequenceCodeGenerator;
    use crate::store::InMemoryStore;
    use crate::types::{Actor, OrderEvent, OrderStatus, PaymentMethod};
    use assert_matches::assert_matches;
    use chrono::Utc;
    use common::Money;
    use uuid::Uuid;

    fn preparing_order(ticket_id: Uuid, order_code: &str) -> Order {
        let now = Utc::now();
        Order {
            order_id: Uuid::new_v4(),
            order_code: order_code.into(),
            vendor_id: Uuid::new_v4(),
            ticket_id,
            total: Money::from_minor(800),
            net: Money::from_minor(800),
            tax: Money::ZERO,
            tax_rate: 0.0,
            status: OrderStatus::Preparing,
            payment_method: PaymentMethod::Cash,
            preparing_at: Some(now),
            ready_at: None,
            collected_at: None,
            created_at: now,
        }
    }

    async fn insert(store: &InMemoryStore, order: &Order) {
        let event = OrderEvent::new(
            order.order_id,
            None,
            OrderStatus::Preparing,
            Actor::Cashier,
            order.created_at,
        );
        store.insert_order(order, &[], &event).await.unwrap();
    }

    fn lookup_over(store: Arc<InMemoryStore>) -> StatusLookup {
        let codes = CodeAllocator::new(Arc::new(SequenceCodeGenerator::new(Vec::new())), "T", "O", 5);
        StatusLookup::new(store, codes)
    }

    async fn seeded() -> (StatusLookup, Ticket, Order) {
        let store = Arc::new(InMemoryStore::new());
        let ticket = Ticket::open("T-4821".into(), Utc::now());
        store.insert_ticket(&ticket).await.unwrap();

        let order = preparing_order(ticket.ticket_id, "O-4821");
        insert(&store, &order).await;

        (lookup_over(store), ticket, order)
    }

    #[tokio::test]
    async fn test_prefix_picks_namespace() {
        let (lookup, ticket, order) = seeded().await;

        assert_matches!(
            lookup.lookup("t-4821").await.unwrap(),
            LookupResult::Ticket { ticket: t, orders } if t == ticket && orders == vec![order.clone()]
        );
        assert_matches!(
            lookup.lookup(" O-4821 ").await.unwrap(),
            LookupResult::Order { order: o } if o == order
        );
    }

    #[tokio::test]
    async fn test_unknown_codes() {
        let (lookup, _, _) = seeded().await;
        assert_eq!(lookup.lookup("T-1111").await.unwrap(), LookupResult::NotFound);
        assert_eq!(lookup.lookup("Z-4821").await.unwrap(), LookupResult::NotFound);
        assert_eq!(lookup.lookup("   ").await.unwrap(), LookupResult::NotFound);
    }

    #[tokio::test]
    async fn test_unprefixed_codes_try_ticket_then_order() {
        let store = Arc::new(InMemoryStore::new());
        let ticket = Ticket::open("4821".into(), Utc::now());
        store.insert_ticket(&ticket).await.unwrap();

        let under_ticket = preparing_order(ticket.ticket_id, "4821");
        let legacy = preparing_order(ticket.ticket_id, "LEGACY-7");
        insert(&store, &under_ticket).await;
        insert(&store, &legacy).await;
        let lookup = lookup_over(store);

        // a ticket wins when both namespaces hold the code
        assert_matches!(
            lookup.lookup("4821").await.unwrap(),
            LookupResult::Ticket { ticket: t, orders } if t == ticket && orders.len() == 2
        );
        assert_matches!(
            lookup.lookup("legacy-7").await.unwrap(),
            LookupResult::Order { order } if order == legacy
        );
    }
}
