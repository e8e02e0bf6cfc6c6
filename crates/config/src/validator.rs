use crate::*;
use thiserror::Error;
use url::Url;

/// Inclusive bounds for the latest orders list
pub const LATEST_ORDERS_RANGE: std::ops::RangeInclusive<usize> = 1..=200;

/// Bounds outside of which the latest orders list is unusual on a kiosk screen
const LATEST_ORDERS_TYPICAL: std::ops::RangeInclusive<usize> = 12..=40;

const LOG_FORMATS: [&str; 3] = ["pretty", "json", "compact"];

#[derive(Error, Debug, Clone)]
pub enum ValidationError {
    #[error("Service name is required")]
    MissingServiceName,

    #[error("Invalid UTC offset '{0}'. Must look like +02:00")]
    InvalidUtcOffset(String),

    #[error("Server: {message}")]
    InvalidServer { message: String },

    #[error("Storage: {message}")]
    InvalidStorage { message: String },

    #[error("Catalog: {message}")]
    InvalidCatalog { message: String },

    #[error("Orders: {message}")]
    InvalidOrders { message: String },

    #[error("Reports: {message}")]
    InvalidReports { message: String },

    #[error("Notifications: {message}")]
    InvalidNotifications { message: String },

    #[error("Invalid log format '{0}'. Must be one of: pretty, json, compact")]
    InvalidLogFormat(String),

    #[error("{field} must be between 0 and 100")]
    InvalidPercentageRange { field: String },

    #[error("Environment variable '{var}' is missing or invalid: {message}")]
    InvalidEnvVar { var: String, message: String },
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct DefaultApplied {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub defaults_applied: Vec<DefaultApplied>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            defaults_applied: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationWarning {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn add_default(&mut self, field: &str, value: &str) {
        self.defaults_applied.push(DefaultApplied {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

pub fn validate_config(config: &FoodhallConfig) -> ValidationReport {
    let mut report = ValidationReport::new();

    validate_service(&config.service, &mut report);
    validate_server(&config.server, &mut report);
    validate_storage(&config.storage, &mut report);
    validate_catalog(&config.catalog, &mut report);
    validate_orders(&config.orders, &mut report);
    validate_reports(&config.reports, &mut report);
    validate_notifications(&config.notifications, &mut report);
    validate_logging(&config.logging, &mut report);
    validate_metrics(config, &mut report);

    report
}

fn validate_service(service: &ServiceConfig, report: &mut ValidationReport) {
    if service.name.trim().is_empty() {
        report.add_error(ValidationError::MissingServiceName);
    }

    if service.offset().is_none() {
        report.add_error(ValidationError::InvalidUtcOffset(service.utc_offset.clone()));
    }

    if service.currency.trim().is_empty() {
        report.add_default("service.currency", &default_currency());
    }
}

fn validate_server(server: &ServerConfig, report: &mut ValidationReport) {
    if server.host.trim().is_empty() {
        report.add_error(ValidationError::InvalidServer {
            message: "host is required".to_string(),
        });
    }

    if server.http_port == 0 {
        report.add_error(ValidationError::InvalidServer {
            message: "http_port must be a positive integer".to_string(),
        });
    }
}

fn validate_storage(storage: &StorageConfig, report: &mut ValidationReport) {
    if storage.backend != StorageBackend::Postgres {
        return;
    }

    let Some(ref pg) = storage.postgres else {
        report.add_error(ValidationError::InvalidStorage {
            message: "backend is 'postgres' but postgres configuration is missing".to_string(),
        });
        return;
    };

    if has_unresolved_env_vars(&pg.url) {
        report.add_error(ValidationError::InvalidEnvVar {
            var: "storage.postgres.url".to_string(),
            message: format!("unresolved placeholder in '{}'", pg.url),
        });
    } else {
        match Url::parse(&pg.url) {
            Ok(url) if matches!(url.scheme(), "postgres" | "postgresql") => {}
            Ok(url) => report.add_error(ValidationError::InvalidStorage {
                message: format!("url scheme must be postgres, got '{}'", url.scheme()),
            }),
            Err(e) => report.add_error(ValidationError::InvalidStorage {
                message: format!("invalid url: {}", e),
            }),
        }
    }

    if pg.max_connections == 0 {
        report.add_error(ValidationError::InvalidStorage {
            message: "max_connections must be a positive integer".to_string(),
        });
    }

    if pg.acquire_timeout_seconds == 0 {
        report.add_error(ValidationError::InvalidStorage {
            message: "acquire_timeout_seconds must be a positive integer".to_string(),
        });
    }
}

fn validate_catalog(catalog: &CatalogConfig, report: &mut ValidationReport) {
    match catalog.source {
        CatalogSource::Seed => {
            if catalog.seed_path.trim().is_empty() {
                report.add_error(ValidationError::InvalidCatalog {
                    message: "seed_path is required when source is 'seed'".to_string(),
                });
            }
        }
        CatalogSource::Http => match catalog.base_url.as_deref() {
            None => report.add_error(ValidationError::InvalidCatalog {
                message: "base_url is required when source is 'http'".to_string(),
            }),
            Some(raw) => match Url::parse(raw) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                Ok(url) => report.add_error(ValidationError::InvalidCatalog {
                    message: format!("base_url scheme must be http or https, got '{}'", url.scheme()),
                }),
                Err(e) => report.add_error(ValidationError::InvalidCatalog {
                    message: format!("invalid base_url: {}", e),
                }),
            },
        },
    }

    if catalog.timeout_ms == 0 {
        report.add_error(ValidationError::InvalidCatalog {
            message: "timeout_ms must be a positive integer".to_string(),
        });
    }
}

fn validate_orders(orders: &OrdersConfig, report: &mut ValidationReport) {
    if !(0.0..=100.0).contains(&orders.default_tax_rate) {
        report.add_error(ValidationError::InvalidPercentageRange {
            field: "orders.default_tax_rate".to_string(),
        });
    }

    if orders.code_attempts == 0 {
        report.add_error(ValidationError::InvalidOrders {
            message: "code_attempts must be a positive integer".to_string(),
        });
    }

    let ticket = orders.ticket_code_prefix.trim();
    let order = orders.order_code_prefix.trim();
    if ticket.is_empty() || order.is_empty() {
        report.add_error(ValidationError::InvalidOrders {
            message: "code prefixes must not be empty".to_string(),
        });
    } else if ticket.eq_ignore_ascii_case(order) {
        report.add_error(ValidationError::InvalidOrders {
            message: format!(
                "ticket and order code prefixes must differ, both are '{}'",
                ticket
            ),
        });
    }

    for (field, prefix) in [
        ("orders.ticket_code_prefix", ticket),
        ("orders.order_code_prefix", order),
    ] {
        if !prefix.chars().all(|c| c.is_ascii_alphabetic()) {
            report.add_error(ValidationError::InvalidOrders {
                message: format!("{} must contain only letters, got '{}'", field, prefix),
            });
        }
    }
}

fn validate_reports(reports: &ReportsConfig, report: &mut ValidationReport) {
    if !(0.0..=100.0).contains(&reports.default_vat_rate) {
        report.add_error(ValidationError::InvalidPercentageRange {
            field: "reports.default_vat_rate".to_string(),
        });
    }

    let limit = reports.latest_orders_limit;
    if !LATEST_ORDERS_RANGE.contains(&limit) {
        report.add_error(ValidationError::InvalidReports {
            message: format!(
                "latest_orders_limit must be between {} and {}, got {}",
                LATEST_ORDERS_RANGE.start(),
                LATEST_ORDERS_RANGE.end(),
                limit
            ),
        });
    } else if !LATEST_ORDERS_TYPICAL.contains(&limit) {
        report.add_warning(
            "reports.latest_orders_limit",
            &format!(
                "{} is outside the usual {}-{} range for the live screen",
                limit,
                LATEST_ORDERS_TYPICAL.start(),
                LATEST_ORDERS_TYPICAL.end()
            ),
        );
    }
}

fn validate_notifications(notifications: &NotificationsConfig, report: &mut ValidationReport) {
    if notifications.channel_capacity == 0 {
        report.add_error(ValidationError::InvalidNotifications {
            message: "channel_capacity must be a positive integer".to_string(),
        });
    }

    if notifications.debounce_ms == 0 {
        report.add_error(ValidationError::InvalidNotifications {
            message: "debounce_ms must be a positive integer".to_string(),
        });
    }
}

fn validate_logging(logging: &LoggingConfig, report: &mut ValidationReport) {
    if !LOG_FORMATS.contains(&logging.format.to_lowercase().as_str()) {
        report.add_error(ValidationError::InvalidLogFormat(logging.format.clone()));
    }

    if logging.level.trim().is_empty() {
        report.add_default("logging.level", &default_log_level());
    }
}

fn validate_metrics(config: &FoodhallConfig, report: &mut ValidationReport) {
    if config.metrics.enabled && config.metrics.port == config.server.http_port {
        report.add_error(ValidationError::InvalidServer {
            message: format!(
                "metrics port {} collides with http_port",
                config.metrics.port
            ),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_error(report: &ValidationReport, needle: &str) -> bool {
        report.errors.iter().any(|e| e.to_string().contains(needle))
    }

    #[test]
    fn test_defaults_are_valid() {
        let report = validate_config(&FoodhallConfig::default());
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_prefixes_must_differ() {
        let mut config = FoodhallConfig::default();
        config.orders.order_code_prefix = "t".to_string();
        let report = validate_config(&config);
        assert!(has_error(&report, "must differ"));

        config.orders.order_code_prefix = String::new();
        assert!(has_error(&validate_config(&config), "must not be empty"));

        config.orders.order_code_prefix = "O1".to_string();
        assert!(has_error(&validate_config(&config), "only letters"));
    }

    #[test]
    fn test_latest_orders_limit_bounds() {
        let mut config = FoodhallConfig::default();

        config.reports.latest_orders_limit = 0;
        assert!(has_error(&validate_config(&config), "latest_orders_limit"));

        config.reports.latest_orders_limit = 201;
        assert!(has_error(&validate_config(&config), "latest_orders_limit"));

        config.reports.latest_orders_limit = 100;
        let report = validate_config(&config);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].field, "reports.latest_orders_limit");
    }

    #[test]
    fn test_postgres_requires_resolved_url() {
        let mut config = FoodhallConfig::default();
        config.storage.backend = StorageBackend::Postgres;
        assert!(has_error(&validate_config(&config), "postgres configuration is missing"));

        config.storage.postgres = Some(PostgresConfig {
            url: "${FOODHALL_TEST_SURELY_UNSET}".to_string(),
            max_connections: 5,
            acquire_timeout_seconds: 5,
        });
        let report = validate_config(&config);
        assert!(report
            .errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidEnvVar { .. })));

        config.storage.postgres = Some(PostgresConfig {
            url: "mysql://localhost/foodhall".to_string(),
            max_connections: 5,
            acquire_timeout_seconds: 5,
        });
        assert!(has_error(&validate_config(&config), "scheme must be postgres"));
    }

    #[test]
    fn test_http_catalog_needs_base_url() {
        let mut config = FoodhallConfig::default();
        config.catalog.source = CatalogSource::Http;
        assert!(has_error(&validate_config(&config), "base_url is required"));

        config.catalog.base_url = Some("http://catalog:8000".to_string());
        assert!(validate_config(&config).is_valid());
    }

    #[test]
    fn test_rates_and_offset() {
        let mut config = FoodhallConfig::default();
        config.orders.default_tax_rate = 120.0;
        config.reports.default_vat_rate = -1.0;
        config.service.utc_offset = "CAT".to_string();

        let report = validate_config(&config);
        assert_eq!(report.errors.len(), 3);
        assert!(has_error(&report, "orders.default_tax_rate"));
        assert!(has_error(&report, "reports.default_vat_rate"));
        assert!(has_error(&report, "Invalid UTC offset"));
    }

    #[test]
    fn test_notifications_need_capacity_and_window() {
        let mut config = FoodhallConfig::default();
        config.notifications.channel_capacity = 0;
        config.notifications.debounce_ms = 0;
        let report = validate_config(&config);
        assert!(has_error(&report, "channel_capacity"));
        assert!(has_error(&report, "debounce_ms"));
    }

    #[test]
    fn test_metrics_port_collision() {
        let mut config = FoodhallConfig::default();
        config.metrics.enabled = true;
        config.metrics.port = config.server.http_port;
        assert!(has_error(&validate_config(&config), "collides"));
    }
}
