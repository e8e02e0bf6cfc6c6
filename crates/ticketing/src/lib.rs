//! Order and ticket lifecycle engine for the food hall
//!
//! This crate takes cashier carts, fans them out into one order per vendor
//! under a shared pickup ticket, and tracks each order from preparing to
//! collected.
//!
//! # Features
//!
//! - Ticket and order code allocation with collision retry
//! - Order creation with catalog validation and tax-inclusive totals
//! - Order status state machine with audit events
//! - Daily summaries and CSV reports
//! - Ticket/order code lookup
//! - Debounced change notifications
//!
//! # Feature Flags
//!
//! - `postgres` - Enable PostgreSQL storage
//! - `api` - Enable HTTP API
//! - `client` - Enable the HTTP catalog client

pub mod types;
pub mod error;
pub mod store;
pub mod catalog;
pub mod codes;
pub mod pricing;
pub mod notify;
pub mod tickets;
pub mod lifecycle;
pub mod manager;
pub mod aggregation;
pub mod report;
pub mod lookup;
pub mod service;

#[cfg(feature = "api")]
pub mod api;

// Re-export commonly used types
pub use types::{
    Actor, Cart, CartEntry, CartLine, CartResult, MenuItem, NewOrder, Order, OrderEvent,
    OrderItem, OrderRef, OrderResult, OrderStatus, PaymentMethod, Ticket, TicketStatus, Vendor,
};
pub use error::{Result, TicketingError};
pub use manager::{OrderDetails, OrderEngine};
pub use tickets::TicketManager;
pub use lifecycle::LifecycleService;
pub use aggregation::{AggregationEngine, Summary};
pub use report::{ReportKind, ReportService};
pub use lookup::{LookupResult, StatusLookup};
pub use notify::{ChangeEvent, ChangeNotifier, Debouncer};
pub use codes::{CodeAllocator, CodeGenerator, RandomCodeGenerator, SequenceCodeGenerator};
pub use service::{TicketingServices, TicketingSettings};

// Store exports
pub use store::{InMemoryStore, OrderQuery, OrderStore, StoreError};

#[cfg(feature = "postgres")]
pub use store::PostgresStore;

// Catalog exports
pub use catalog::{CatalogGateway, CatalogSeed, InMemoryCatalog};

#[cfg(feature = "client")]
pub use catalog::HttpCatalogClient;
