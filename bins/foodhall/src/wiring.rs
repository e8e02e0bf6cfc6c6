//! Builds the ticketing services from configuration

use anyhow::{Context, Result};
use config::{CatalogSource, FoodhallConfig, StorageBackend};
use std::fs;
use std::sync::Arc;
use ticketing::{
    CatalogGateway, CatalogSeed, HttpCatalogClient, InMemoryCatalog, InMemoryStore, OrderStore,
    PostgresStore, TicketingServices, TicketingSettings,
};
use tracing::info;

/// Core tunables taken from the config file
pub fn settings_from_config(config: &FoodhallConfig) -> Result<TicketingSettings> {
    let utc_offset = config
        .service
        .offset()
        .with_context(|| format!("Invalid utc_offset: {}", config.service.utc_offset))?;

    Ok(TicketingSettings {
        ticket_prefix: config.orders.ticket_code_prefix.trim().to_uppercase(),
        order_prefix: config.orders.order_code_prefix.trim().to_uppercase(),
        code_attempts: config.orders.code_attempts,
        default_tax_rate: config.orders.default_tax_rate,
        default_vat_rate: config.reports.default_vat_rate,
        latest_orders_limit: config.reports.latest_orders_limit,
        utc_offset,
        channel_capacity: config.notifications.channel_capacity,
        debounce: config.notifications.debounce(),
    })
}

pub async fn build_store(config: &FoodhallConfig) -> Result<Arc<dyn OrderStore>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            info!("Using in-memory store");
            Ok(Arc::new(InMemoryStore::new()))
        }
        StorageBackend::Postgres => {
            let pg = config
                .storage
                .postgres
                .as_ref()
                .context("storage.postgres section is required for the postgres backend")?;

            let store = PostgresStore::connect(&pg.url, pg.max_connections, pg.acquire_timeout())
                .await
                .context("Failed to connect to PostgreSQL")?;
            store.migrate().await.context("Failed to apply schema")?;

            info!(max_connections = pg.max_connections, "Using PostgreSQL store");
            Ok(Arc::new(store))
        }
    }
}

pub fn build_catalog(config: &FoodhallConfig) -> Result<Arc<dyn CatalogGateway>> {
    match config.catalog.source {
        CatalogSource::Seed => {
            let path = &config.catalog.seed_path;
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Failed to read catalog seed: {}", path))?;
            let seed: CatalogSeed = serde_yaml::from_str(&raw)
                .with_context(|| format!("Failed to parse catalog seed: {}", path))?;

            info!(path = %path, vendors = seed.vendors.len(), "Loaded catalog seed");
            Ok(Arc::new(InMemoryCatalog::from_seed(seed)))
        }
        CatalogSource::Http => {
            let base_url = config
                .catalog
                .base_url
                .as_deref()
                .context("catalog.base_url is required for the http catalog")?;
            let client = HttpCatalogClient::new(base_url, config.catalog.timeout())
                .context("Failed to build catalog client")?;

            info!(base_url, "Using remote catalog");
            Ok(Arc::new(client))
        }
    }
}

pub async fn build_services(config: &FoodhallConfig) -> Result<TicketingServices> {
    let settings = settings_from_config(config)?;
    let store = build_store(config).await?;
    let catalog = build_catalog(config)?;

    Ok(TicketingServices::builder(store, catalog)
        .settings(settings)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use std::time::Duration;

    fn sample_config() -> FoodhallConfig {
        let mut config = FoodhallConfig::default();
        config.catalog.seed_path =
            concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/catalog.yaml").to_string();
        config
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = sample_config();
        config.orders.ticket_code_prefix = " tk ".to_string();
        config.orders.default_tax_rate = 16.0;
        config.notifications.debounce_ms = 250;

        let settings = settings_from_config(&config).unwrap();
        assert_eq!(settings.ticket_prefix, "TK");
        assert_eq!(settings.order_prefix, "O");
        assert_eq!(settings.default_tax_rate, 16.0);
        assert_eq!(settings.utc_offset, FixedOffset::east_opt(7200).unwrap());
        assert_eq!(settings.debounce, Duration::from_millis(250));
    }

    #[test]
    fn test_bad_offset_is_an_error() {
        let mut config = sample_config();
        config.service.utc_offset = "noon".to_string();
        assert!(settings_from_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_build_services_from_seed() {
        let services = build_services(&sample_config()).await.unwrap();
        let vendor = uuid::Uuid::parse_str("5b0c6a1e-4a43-4c8e-9a55-0f7c1d2a9e01").unwrap();
        let orders = services
            .orders
            .list_vendor_orders(vendor, Vec::new(), None)
            .await
            .unwrap();
        assert!(orders.is_empty());
    }

    #[test]
    fn test_missing_seed_file() {
        let mut config = sample_config();
        config.catalog.seed_path = "does/not/exist.yaml".to_string();
        assert!(build_catalog(&config).is_err());
    }
}
