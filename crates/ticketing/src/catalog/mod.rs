//! Catalog gateway - trait and implementations
//!
//! The catalog owns vendors and menu items. The ticketing core only reads
//! it, and copies prices and names into order items at creation time.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::types::{MenuItem, Vendor};

pub mod memory;

#[cfg(feature = "client")]
pub mod http;

pub use memory::{CatalogSeed, InMemoryCatalog, SeedItem, SeedVendor};

#[cfg(feature = "client")]
pub use http::HttpCatalogClient;

/// Errors from the catalog backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    /// Catalog service could not be reached or timed out
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    /// Catalog answered with something unusable
    #[error("Invalid catalog response: {0}")]
    InvalidResponse(String),
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// Client trait for the catalog - protocol agnostic
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Look up one vendor
    async fn get_vendor(&self, vendor_id: Uuid) -> CatalogResult<Option<Vendor>>;

    /// Look up several vendors; unknown ids are omitted
    async fn get_vendors(&self, vendor_ids: &[Uuid]) -> CatalogResult<Vec<Vendor>>;

    /// Look up menu items in one batch; unknown ids are omitted
    async fn get_menu_items(&self, item_ids: &[Uuid]) -> CatalogResult<Vec<MenuItem>>;
}
