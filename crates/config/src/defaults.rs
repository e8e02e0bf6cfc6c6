pub fn default_service_name() -> String {
    "foodhall".to_string()
}

pub fn default_currency() -> String {
    "KW".to_string()
}

pub fn default_utc_offset() -> String {
    "+02:00".to_string()
}

pub fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub fn default_http_port() -> u16 {
    8080
}

pub fn default_max_connections() -> u32 {
    10
}

pub fn default_acquire_timeout_seconds() -> u64 {
    5
}

pub fn default_seed_path() -> String {
    "config/catalog.yaml".to_string()
}

pub fn default_catalog_timeout_ms() -> u64 {
    2000
}

pub fn default_tax_rate() -> f64 {
    0.0
}

pub fn default_code_attempts() -> u32 {
    5
}

pub fn default_ticket_code_prefix() -> String {
    "T".to_string()
}

pub fn default_order_code_prefix() -> String {
    "O".to_string()
}

pub fn default_vat_rate() -> f64 {
    16.0
}

pub fn default_latest_orders_limit() -> usize {
    12
}

pub fn default_channel_capacity() -> usize {
    256
}

pub fn default_debounce_ms() -> u64 {
    300
}

pub fn default_log_format() -> String {
    "pretty".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_metrics_port() -> u16 {
    9100
}
