//! Wiring of the ticketing services over one store and one catalog

use chrono::{FixedOffset, Offset, Utc};
use common::{Clock, SystemClock};
use std::sync::Arc;
use std::time::Duration;

use crate::aggregation::{AggregationEngine, DEFAULT_LATEST_LIMIT, DEFAULT_VAT_RATE};
use crate::catalog::CatalogGateway;
use crate::codes::{CodeAllocator, CodeGenerator, RandomCodeGenerator, DEFAULT_CODE_ATTEMPTS};
use crate::lifecycle::LifecycleService;
use crate::lookup::StatusLookup;
use crate::manager::OrderEngine;
use crate::notify::{ChangeNotifier, DEFAULT_CHANNEL_CAPACITY, DEFAULT_DEBOUNCE};
use crate::report::ReportService;
use crate::store::OrderStore;
use crate::tickets::TicketManager;

/// Tunables of the ticketing core
#[derive(Debug, Clone, PartialEq)]
pub struct TicketingSettings {
    pub ticket_prefix: String,
    pub order_prefix: String,
    pub code_attempts: u32,
    /// Percent applied when an order names no rate
    pub default_tax_rate: f64,
    /// Percent used to derive tax in summaries when none was recorded
    pub default_vat_rate: f64,
    pub latest_orders_limit: usize,
    /// Offset defining the local business day
    pub utc_offset: FixedOffset,
    pub channel_capacity: usize,
    pub debounce: Duration,
}

impl Default for TicketingSettings {
    fn default() -> Self {
        Self {
            ticket_prefix: "T".to_string(),
            order_prefix: "O".to_string(),
            code_attempts: DEFAULT_CODE_ATTEMPTS,
            default_tax_rate: 0.0,
            default_vat_rate: DEFAULT_VAT_RATE,
            latest_orders_limit: DEFAULT_LATEST_LIMIT,
            utc_offset: FixedOffset::east_opt(2 * 3600).unwrap_or_else(|| Utc.fix()),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// All ticketing services, sharing store, catalog, clock and change feed
#[derive(Clone)]
pub struct TicketingServices {
    pub tickets: TicketManager,
    pub orders: OrderEngine,
    pub lifecycle: LifecycleService,
    pub aggregation: AggregationEngine,
    pub reports: ReportService,
    pub lookup: StatusLookup,
    pub notifier: ChangeNotifier,
    pub settings: TicketingSettings,
}

/// Builder for [`TicketingServices`]
pub struct TicketingServicesBuilder {
    store: Arc<dyn OrderStore>,
    catalog: Arc<dyn CatalogGateway>,
    clock: Arc<dyn Clock>,
    generator: Arc<dyn CodeGenerator>,
    settings: TicketingSettings,
}

impl TicketingServicesBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn code_generator(mut self, generator: Arc<dyn CodeGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn settings(mut self, settings: TicketingSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> TicketingServices {
        let settings = self.settings;
        let notifier = ChangeNotifier::new(settings.channel_capacity);
        let codes = CodeAllocator::new(
            self.generator,
            &settings.ticket_prefix,
            &settings.order_prefix,
            settings.code_attempts,
        );

        let tickets = TicketManager::new(
            self.store.clone(),
            codes.clone(),
            self.clock.clone(),
            notifier.clone(),
        );
        let orders = OrderEngine::new(
            self.store.clone(),
            self.catalog.clone(),
            tickets.clone(),
            codes.clone(),
            self.clock.clone(),
            notifier.clone(),
            settings.default_tax_rate,
        );
        let lifecycle =
            LifecycleService::new(self.store.clone(), self.clock.clone(), notifier.clone());
        let aggregation = AggregationEngine::new(
            self.store.clone(),
            self.catalog,
            self.clock,
            settings.utc_offset,
        )
        .with_vat_rate(settings.default_vat_rate)
        .with_latest_limit(settings.latest_orders_limit);
        let reports = ReportService::new(aggregation.clone());
        let lookup = StatusLookup::new(self.store, codes);

        TicketingServices {
            tickets,
            orders,
            lifecycle,
            aggregation,
            reports,
            lookup,
            notifier,
            settings,
        }
    }
}

impl TicketingServices {
    /// Start building with the system clock and random codes
    pub fn builder(
        store: Arc<dyn OrderStore>,
        catalog: Arc<dyn CatalogGateway>,
    ) -> TicketingServicesBuilder {
        TicketingServicesBuilder {
            store,
            catalog,
            clock: Arc::new(SystemClock),
            generator: Arc::new(RandomCodeGenerator),
            settings: TicketingSettings::default(),
        }
    }
}
