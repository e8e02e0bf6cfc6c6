//! In-memory catalog, seeded from a file or built up in tests

use async_trait::async_trait;
use common::Money;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use super::{CatalogError, CatalogGateway, CatalogResult};
use crate::types::{MenuItem, Vendor};

/// Catalog seed document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub vendors: Vec<SeedVendor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedVendor {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub items: Vec<SeedItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedItem {
    pub id: Uuid,
    pub name: String,
    /// Minor units
    pub price: i64,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default = "default_true")]
    pub available: bool,
}

fn default_true() -> bool {
    true
}

/// Catalog held in memory
#[derive(Default)]
pub struct InMemoryCatalog {
    vendors: RwLock<HashMap<Uuid, Vendor>>,
    items: RwLock<HashMap<Uuid, MenuItem>>,
    fail_vendor_lookups: AtomicBool,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a seed document
    pub fn from_seed(seed: CatalogSeed) -> Self {
        let catalog = Self::new();
        for vendor in seed.vendors {
            catalog.upsert_vendor(Vendor {
                id: vendor.id,
                name: vendor.name,
                slug: vendor.slug,
                active: vendor.active,
            });
            for item in vendor.items {
                catalog.upsert_item(MenuItem {
                    id: item.id,
                    vendor_id: vendor.id,
                    name: item.name,
                    price: Money::from_minor(item.price),
                    active: item.active,
                    available: item.available,
                });
            }
        }
        catalog
    }

    pub fn upsert_vendor(&self, vendor: Vendor) {
        self.vendors.write().insert(vendor.id, vendor);
    }

    pub fn upsert_item(&self, item: MenuItem) {
        self.items.write().insert(item.id, item);
    }

    /// Add an active vendor, returning its id
    pub fn add_vendor(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.upsert_vendor(Vendor {
            id,
            name: name.to_string(),
            slug: name.to_lowercase().replace(' ', "-"),
            active: true,
        });
        id
    }

    /// Add an orderable item priced in minor units, returning its id
    pub fn add_item(&self, vendor_id: Uuid, name: &str, price: i64) -> Uuid {
        let id = Uuid::new_v4();
        self.upsert_item(MenuItem {
            id,
            vendor_id,
            name: name.to_string(),
            price: Money::from_minor(price),
            active: true,
            available: true,
        });
        id
    }

    pub fn set_vendor_active(&self, vendor_id: Uuid, active: bool) {
        if let Some(vendor) = self.vendors.write().get_mut(&vendor_id) {
            vendor.active = active;
        }
    }

    pub fn set_item_available(&self, item_id: Uuid, available: bool) {
        if let Some(item) = self.items.write().get_mut(&item_id) {
            item.available = available;
        }
    }

    pub fn set_item_active(&self, item_id: Uuid, active: bool) {
        if let Some(item) = self.items.write().get_mut(&item_id) {
            item.active = active;
        }
    }

    pub fn set_item_price(&self, item_id: Uuid, price: i64) {
        if let Some(item) = self.items.write().get_mut(&item_id) {
            item.price = Money::from_minor(price);
        }
    }

    /// Make vendor lookups fail
    pub fn fail_vendor_lookups(&self, fail: bool) {
        self.fail_vendor_lookups.store(fail, Ordering::SeqCst);
    }

    fn check_vendor_lookups(&self) -> CatalogResult<()> {
        if self.fail_vendor_lookups.load(Ordering::SeqCst) {
            return Err(CatalogError::Unavailable("injected vendor lookup failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogGateway for InMemoryCatalog {
    async fn get_vendor(&self, vendor_id: Uuid) -> CatalogResult<Option<Vendor>> {
        self.check_vendor_lookups()?;
        Ok(self.vendors.read().get(&vendor_id).cloned())
    }

    async fn get_vendors(&self, vendor_ids: &[Uuid]) -> CatalogResult<Vec<Vendor>> {
        self.check_vendor_lookups()?;
        let vendors = self.vendors.read();
        Ok(vendor_ids
            .iter()
            .filter_map(|id| vendors.get(id))
            .cloned()
            .collect())
    }

    async fn get_menu_items(&self, item_ids: &[Uuid]) -> CatalogResult<Vec<MenuItem>> {
        let items = self.items.read();
        Ok(item_ids
            .iter()
            .filter_map(|id| items.get(id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sample_seed_file() {
        let yaml = include_str!("../../../../config/catalog.yaml");
        let seed: CatalogSeed = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(seed.vendors.len(), 4);

        let closed = seed.vendors[3].id;
        let catalog = InMemoryCatalog::from_seed(seed);
        let vendor = catalog.get_vendor(closed).await.unwrap().unwrap();
        assert_eq!(vendor.name, "Night Noodles");
        assert!(!vendor.active);
    }

    #[tokio::test]
    async fn test_from_seed() {
        let vendor_id = Uuid::new_v4();
        let item_id = Uuid::new_v4();
        let seed = CatalogSeed {
            vendors: vec![SeedVendor {
                id: vendor_id,
                name: "Mama Grill".into(),
                slug: "mama-grill".into(),
                active: true,
                items: vec![SeedItem {
                    id: item_id,
                    name: "Nshima & Beef".into(),
                    price: 4500,
                    active: true,
                    available: false,
                }],
            }],
        };

        let catalog = InMemoryCatalog::from_seed(seed);
        let vendor = catalog.get_vendor(vendor_id).await.unwrap().unwrap();
        assert_eq!(vendor.slug, "mama-grill");

        let items = catalog.get_menu_items(&[item_id, Uuid::new_v4()]).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].vendor_id, vendor_id);
        assert!(!items[0].is_orderable());
    }

    #[tokio::test]
    async fn test_vendor_lookup_failure() {
        let catalog = InMemoryCatalog::new();
        let id = catalog.add_vendor("Curry Corner");
        catalog.fail_vendor_lookups(true);
        assert!(catalog.get_vendors(&[id]).await.is_err());
        // menu lookups are unaffected
        assert!(catalog.get_menu_items(&[]).await.unwrap().is_empty());
    }
}
