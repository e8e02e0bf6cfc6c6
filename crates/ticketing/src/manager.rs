//! Order Engine - validates carts, prices them and persists orders

use common::Clock;
use observability::TicketingMetrics;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::catalog::CatalogGateway;
use crate::codes::{CodeAllocator, CodeKind};
use crate::error::{Result, TicketingError};
use crate::lifecycle::load_order;
use crate::notify::{ChangeEvent, ChangeNotifier};
use crate::pricing::{compute_totals, validate_tax_rate};
use crate::store::{OrderQuery, OrderStore};
use crate::tickets::TicketManager;
use crate::types::{
    Actor, Cart, CartLine, CartResult, MenuItem, NewOrder, Order, OrderEvent, OrderItem,
    OrderRef, OrderResult, OrderStatus, Ticket, TicketStatus,
};

/// An order with its line items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Order Engine
#[derive(Clone)]
pub struct OrderEngine {
    store: Arc<dyn OrderStore>,
    catalog: Arc<dyn CatalogGateway>,
    tickets: TicketManager,
    codes: CodeAllocator,
    clock: Arc<dyn Clock>,
    notifier: ChangeNotifier,
    default_tax_rate: f64,
}

impl OrderEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn OrderStore>,
        catalog: Arc<dyn CatalogGateway>,
        tickets: TicketManager,
        codes: CodeAllocator,
        clock: Arc<dyn Clock>,
        notifier: ChangeNotifier,
        default_tax_rate: f64,
    ) -> Self {
        Self {
            store,
            catalog,
            tickets,
            codes,
            clock,
            notifier,
            default_tax_rate,
        }
    }

    /// Place one vendor's order
    ///
    /// Flow:
    /// 1. Reject empty carts and zero quantities
    /// 2. Resolve the given ticket, which must still be open
    /// 3. Check the vendor exists and is active
    /// 4. Load all menu items in one batch and check each one
    /// 5. Compute totals and tax from the snapshotted prices
    /// 6. Open a ticket if none was given
    /// 7. Allocate a code and write order, items and creation event as one unit
    #[instrument(skip(self, request), fields(vendor_id = %request.vendor_id, lines = request.items.len()))]
    pub async fn create_order(&self, request: NewOrder) -> Result<OrderResult> {
        if request.items.is_empty() {
            return Err(TicketingError::validation("order must contain at least one item"));
        }
        if let Some(line) = request.items.iter().find(|line| line.quantity == 0) {
            return Err(TicketingError::validation(format!(
                "quantity for menu item {} must be greater than zero",
                line.menu_item_id
            )));
        }
        let tax_rate = validate_tax_rate(request.tax_rate.unwrap_or(self.default_tax_rate))?;

        let existing = match request.ticket_id {
            Some(id) => Some(self.open_ticket_for_order(id).await?),
            None => None,
        };

        let vendor = self
            .catalog
            .get_vendor(request.vendor_id)
            .await?
            .ok_or_else(|| {
                TicketingError::not_found(format!("vendor {} not found", request.vendor_id))
            })?;
        if !vendor.active {
            return Err(TicketingError::unavailable(format!(
                "vendor '{}' is not active",
                vendor.name
            )));
        }

        let menu = self.load_menu_items(&request.items).await?;
        for line in &request.items {
            let item = &menu[&line.menu_item_id];
            if !item.is_orderable() {
                return Err(TicketingError::unavailable(format!(
                    "menu item '{}' is unavailable",
                    item.name
                )));
            }
        }
        if let Some(item) = request
            .items
            .iter()
            .map(|line| &menu[&line.menu_item_id])
            .find(|item| item.vendor_id != vendor.id)
        {
            return Err(TicketingError::validation(format!(
                "menu item '{}' does not belong to vendor '{}'",
                item.name, vendor.name
            )));
        }

        let totals = compute_totals(
            request
                .items
                .iter()
                .map(|line| (menu[&line.menu_item_id].price, line.quantity)),
            tax_rate,
        )?;

        let ticket = match existing {
            Some(ticket) => ticket,
            None => self.tickets.open_ticket().await?,
        };

        let now = self.clock.now();
        let order_id = Uuid::new_v4();
        let items: Vec<OrderItem> = request
            .items
            .iter()
            .map(|line| {
                let snapshot = &menu[&line.menu_item_id];
                OrderItem {
                    item_id: Uuid::new_v4(),
                    order_id,
                    menu_item_id: snapshot.id,
                    name: snapshot.name.clone(),
                    unit_price: snapshot.price,
                    quantity: line.quantity,
                    notes: line.notes.clone(),
                }
            })
            .collect();
        let created = OrderEvent::new(order_id, None, OrderStatus::Preparing, Actor::Cashier, now);

        let template = Order {
            order_id,
            order_code: String::new(),
            vendor_id: vendor.id,
            ticket_id: ticket.ticket_id,
            total: totals.total,
            net: totals.net,
            tax: totals.tax,
            tax_rate: totals.tax_rate,
            status: OrderStatus::Preparing,
            payment_method: request.payment_method,
            preparing_at: Some(now),
            ready_at: None,
            collected_at: None,
            created_at: now,
        };

        let store = &self.store;
        let items_ref = &items;
        let created_ref = &created;
        let template_ref = &template;
        let order = self
            .codes
            .allocate(CodeKind::Order, move |code| {
                let order = Order {
                    order_code: code,
                    ..template_ref.clone()
                };
                async move {
                    store
                        .insert_order(&order, items_ref, created_ref)
                        .await
                        .map(|_| order)
                }
            })
            .await?;

        info!(
            order_id = %order.order_id,
            order_code = %order.order_code,
            ticket_code = %ticket.ticket_code,
            total = %order.total,
            "order created"
        );
        TicketingMetrics::order_created(&vendor.id.to_string(), order.total.minor());
        self.notifier.notify(ChangeEvent::OrderCreated {
            order_id: order.order_id,
            ticket_id: ticket.ticket_id,
            vendor_id: vendor.id,
        });

        Ok(OrderResult {
            order_id: order.order_id,
            order_code: order.order_code,
            vendor_id: order.vendor_id,
            status: order.status,
            total: order.total,
            net: order.net,
            tax: order.tax,
            tax_rate: order.tax_rate,
            ticket_id: ticket.ticket_id,
            ticket_code: ticket.ticket_code,
        })
    }

    /// Fan a multi-vendor cart out into one order per vendor under one ticket
    ///
    /// Vendors are processed in order of first appearance. The first failure
    /// stops the fan-out; orders already placed stay placed.
    #[instrument(skip(self, cart), fields(entries = cart.entries.len()))]
    pub async fn submit_cart(&self, cart: Cart) -> Result<CartResult> {
        if cart.entries.is_empty() {
            return Err(TicketingError::validation("cart must contain at least one item"));
        }

        let mut groups: Vec<(Uuid, Vec<CartLine>)> = Vec::new();
        for entry in cart.entries {
            let line = CartLine {
                menu_item_id: entry.menu_item_id,
                quantity: entry.quantity,
                notes: entry.notes,
            };
            match groups.iter_mut().find(|(vendor_id, _)| *vendor_id == entry.vendor_id) {
                Some((_, lines)) => lines.push(line),
                None => groups.push((entry.vendor_id, vec![line])),
            }
        }

        let mut ticket_id = cart.ticket_id;
        let mut orders = Vec::with_capacity(groups.len());
        for (vendor_id, items) in groups {
            let result = self
                .create_order(NewOrder {
                    vendor_id,
                    items,
                    payment_method: cart.payment_method,
                    tax_rate: cart.tax_rate,
                    ticket_id,
                })
                .await?;
            ticket_id = Some(result.ticket_id);
            orders.push(result);
        }

        // groups is non-empty, so at least one order exists
        let (ticket_id, ticket_code) = orders
            .first()
            .map(|o| (o.ticket_id, o.ticket_code.clone()))
            .ok_or_else(|| TicketingError::Internal("cart produced no orders".into()))?;

        Ok(CartResult {
            ticket_id,
            ticket_code,
            orders,
        })
    }

    pub async fn get_order(&self, order_ref: &OrderRef) -> Result<Order> {
        load_order(self.store.as_ref(), order_ref).await
    }

    /// Order plus its line items
    pub async fn get_order_details(&self, order_ref: &OrderRef) -> Result<OrderDetails> {
        let order = self.get_order(order_ref).await?;
        let items = self.store.list_items(&[order.order_id]).await?;
        Ok(OrderDetails { order, items })
    }

    /// Audit trail of an order, oldest first
    pub async fn order_events(&self, order_ref: &OrderRef) -> Result<Vec<OrderEvent>> {
        let order = self.get_order(order_ref).await?;
        Ok(self.store.list_events(order.order_id).await?)
    }

    /// A vendor's queue, oldest first
    ///
    /// An empty status list means the active statuses.
    pub async fn list_vendor_orders(
        &self,
        vendor_id: Uuid,
        statuses: Vec<OrderStatus>,
        limit: Option<usize>,
    ) -> Result<Vec<Order>> {
        let statuses = if statuses.is_empty() {
            vec![OrderStatus::Preparing, OrderStatus::Ready]
        } else {
            statuses
        };

        let mut query = OrderQuery::new()
            .with_vendor(vendor_id)
            .with_statuses(statuses);
        if let Some(limit) = limit {
            query = query.with_limit(limit);
        }
        Ok(self.store.list_orders(&query).await?)
    }

    async fn open_ticket_for_order(&self, ticket_id: Uuid) -> Result<Ticket> {
        let ticket = self.tickets.ensure_ticket(Some(ticket_id)).await?;
        if ticket.status != TicketStatus::Open {
            return Err(TicketingError::conflict(format!(
                "ticket {} is {}",
                ticket.ticket_code, ticket.status
            )));
        }
        Ok(ticket)
    }

    /// Batch-load the referenced menu items keyed by id
    async fn load_menu_items(&self, lines: &[CartLine]) -> Result<HashMap<Uuid, MenuItem>> {
        let mut seen = HashSet::new();
        let ids: Vec<Uuid> = lines
            .iter()
            .map(|line| line.menu_item_id)
            .filter(|id| seen.insert(*id))
            .collect();

        let items = self.catalog.get_menu_items(&ids).await?;
        let menu: HashMap<Uuid, MenuItem> = items.into_iter().map(|item| (item.id, item)).collect();

        if menu.len() != ids.len() || ids.iter().any(|id| !menu.contains_key(id)) {
            let missing: Vec<String> = ids
                .iter()
                .filter(|id| !menu.contains_key(id))
                .map(Uuid::to_string)
                .collect();
            return Err(TicketingError::not_found(format!(
                "menu items not found: {}",
                missing.join(", ")
            )));
        }

        Ok(menu)
    }
}
