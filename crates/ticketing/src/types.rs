//! Ticketing domain types
//!
//! This module defines the records owned by the ticketing core (tickets,
//! orders, order items, audit events) and the read-only catalog records it
//! consumes.

use chrono::{DateTime, Utc};
use common::Money;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Vendor record owned by the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub active: bool,
}

/// Menu item record owned by the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub name: String,
    /// Unit price in minor units
    pub price: Money,
    pub active: bool,
    pub available: bool,
}

impl MenuItem {
    /// Whether the item can be put on a new order
    pub fn is_orderable(&self) -> bool {
        self.active && self.available
    }
}

/// Ticket (pickup slip) status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Open,
    Paid,
    Closed,
    Cancelled,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::Paid => "paid",
            TicketStatus::Closed => "closed",
            TicketStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(TicketStatus::Open),
            "paid" => Ok(TicketStatus::Paid),
            "closed" => Ok(TicketStatus::Closed),
            "cancelled" | "canceled" => Ok(TicketStatus::Cancelled),
            other => Err(format!("unknown ticket status: {}", other)),
        }
    }
}

/// A pickup ticket grouping one order per vendor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub ticket_id: Uuid,
    pub ticket_code: String,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    /// A fresh open ticket
    pub fn open(ticket_code: String, created_at: DateTime<Utc>) -> Self {
        Self {
            ticket_id: Uuid::new_v4(),
            ticket_code,
            status: TicketStatus::Open,
            created_at,
        }
    }
}

/// Order preparation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Accepted by the cashier, vendor is preparing it
    Preparing,
    /// Ready at the vendor counter
    Ready,
    /// Handed to the customer
    Collected,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 3] = [
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Collected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Collected => "collected",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "preparing" => Ok(OrderStatus::Preparing),
            "ready" => Ok(OrderStatus::Ready),
            "collected" => Ok(OrderStatus::Collected),
            other => Err(format!("unknown order status: {}", other)),
        }
    }
}

/// Party responsible for a status change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    Vendor,
    Cashier,
    System,
}

impl Actor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Actor::Vendor => "vendor",
            Actor::Cashier => "cashier",
            Actor::System => "system",
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Actor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vendor" => Ok(Actor::Vendor),
            "cashier" => Ok(Actor::Cashier),
            "system" => Ok(Actor::System),
            other => Err(format!("unknown actor: {}", other)),
        }
    }
}

/// How the customer paid at the cashier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    MobileMoney,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::MobileMoney => "mobile_money",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "mobile_money" | "mobile" => Ok(PaymentMethod::MobileMoney),
            other => Err(format!("unknown payment method: {}", other)),
        }
    }
}

/// One vendor's order under a ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: Uuid,
    pub order_code: String,
    pub vendor_id: Uuid,
    pub ticket_id: Uuid,
    /// Sum of line totals
    pub total: Money,
    pub net: Money,
    pub tax: Money,
    /// Tax rate in percent
    pub tax_rate: f64,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub preparing_at: Option<DateTime<Utc>>,
    pub ready_at: Option<DateTime<Utc>>,
    pub collected_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Orders stay active until collected
    pub fn is_active(&self) -> bool {
        self.status != OrderStatus::Collected
    }

    /// Timestamp recorded on first entry into `status`
    pub fn status_timestamp(&self, status: OrderStatus) -> Option<DateTime<Utc>> {
        match status {
            OrderStatus::Preparing => self.preparing_at,
            OrderStatus::Ready => self.ready_at,
            OrderStatus::Collected => self.collected_at,
        }
    }

    /// Set the timestamp for `status` unless one is already recorded
    pub fn stamp_status(&mut self, status: OrderStatus, at: DateTime<Utc>) {
        let slot = match status {
            OrderStatus::Preparing => &mut self.preparing_at,
            OrderStatus::Ready => &mut self.ready_at,
            OrderStatus::Collected => &mut self.collected_at,
        };
        if slot.is_none() {
            *slot = Some(at);
        }
    }

    /// Minutes from preparing to ready, when both are known and ordered
    pub fn prep_minutes(&self) -> Option<f64> {
        match (self.preparing_at, self.ready_at) {
            (Some(start), Some(ready)) if ready > start => {
                Some((ready - start).num_milliseconds() as f64 / 60_000.0)
            }
            _ => None,
        }
    }
}

/// Immutable line of an order with catalog snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub item_id: Uuid,
    pub order_id: Uuid,
    pub menu_item_id: Uuid,
    /// Item name at order time
    pub name: String,
    /// Unit price at order time
    pub unit_price: Money,
    pub quantity: u32,
    /// Free text, may carry a chosen variant such as "Option: Beef"
    pub notes: Option<String>,
}

impl OrderItem {
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price.checked_mul(self.quantity)
    }
}

/// Append-only audit row for a status change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub event_id: Uuid,
    pub order_id: Uuid,
    /// `None` for the creation event
    pub from_status: Option<OrderStatus>,
    pub to_status: OrderStatus,
    pub actor: Actor,
    pub created_at: DateTime<Utc>,
}

impl OrderEvent {
    pub fn new(
        order_id: Uuid,
        from_status: Option<OrderStatus>,
        to_status: OrderStatus,
        actor: Actor,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            order_id,
            from_status,
            to_status,
            actor,
            created_at,
        }
    }
}

/// A requested cart line for a single vendor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub menu_item_id: Uuid,
    pub quantity: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Input to the order engine for one vendor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub vendor_id: Uuid,
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    /// Percent; falls back to the configured default
    #[serde(default)]
    pub tax_rate: Option<f64>,
    /// Existing ticket to attach to
    #[serde(default)]
    pub ticket_id: Option<Uuid>,
}

/// What the caller needs back to keep fanning out under the same ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResult {
    pub order_id: Uuid,
    pub order_code: String,
    pub vendor_id: Uuid,
    pub status: OrderStatus,
    pub total: Money,
    pub net: Money,
    pub tax: Money,
    pub tax_rate: f64,
    pub ticket_id: Uuid,
    pub ticket_code: String,
}

/// A cart line tagged with its vendor, as the cashier screen builds it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartEntry {
    pub vendor_id: Uuid,
    pub menu_item_id: Uuid,
    pub quantity: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A multi-vendor cart submitted under one ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub entries: Vec<CartEntry>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub tax_rate: Option<f64>,
    #[serde(default)]
    pub ticket_id: Option<Uuid>,
}

/// Result of a cart fan-out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartResult {
    pub ticket_id: Uuid,
    pub ticket_code: String,
    pub orders: Vec<OrderResult>,
}

/// Reference to an order by id or by code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderRef {
    Id(Uuid),
    Code(String),
}

impl OrderRef {
    /// UUIDs resolve as ids, anything else as a code
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match Uuid::parse_str(raw) {
            Ok(id) => OrderRef::Id(id),
            Err(_) => OrderRef::Code(raw.to_uppercase()),
        }
    }
}

impl From<Uuid> for OrderRef {
    fn from(id: Uuid) -> Self {
        OrderRef::Id(id)
    }
}

impl fmt::Display for OrderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderRef::Id(id) => write!(f, "{}", id),
            OrderRef::Code(code) => f.write_str(code),
        }
    }
}
