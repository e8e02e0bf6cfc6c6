//! Prometheus metrics infrastructure
//!
//! Exporter setup plus the counters the food hall services record. All
//! recording goes through the `metrics` facade, so it is a no-op until an
//! exporter is installed.

use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Initialize the Prometheus metrics exporter
///
/// Starts an HTTP listener on `port` exposing `/metrics`.
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    tracing::info!(%addr, "Metrics server listening");
    Ok(())
}

/// Ticketing counters
///
/// * `foodhall_tickets_created_total`
/// * `foodhall_orders_created_total{vendor}`
/// * `foodhall_order_revenue_minor_total`
/// * `foodhall_status_transitions_total{from,to,actor}`
/// * `foodhall_code_collisions_total{kind}`
/// * `foodhall_code_exhausted_total{kind}`
/// * `foodhall_live_orders_today`, `foodhall_live_active_orders`,
///   `foodhall_live_revenue_minor` (gauges set by the summary refresher)
pub struct TicketingMetrics;

impl TicketingMetrics {
    pub fn ticket_created() {
        counter!("foodhall_tickets_created_total").increment(1);
    }

    /// Record a placed order and its total in minor units
    pub fn order_created(vendor_id: &str, total_minor: i64) {
        counter!("foodhall_orders_created_total", "vendor" => vendor_id.to_string()).increment(1);
        if total_minor > 0 {
            counter!("foodhall_order_revenue_minor_total").increment(total_minor as u64);
        }
    }

    pub fn status_transition(from: &str, to: &str, actor: &str) {
        counter!(
            "foodhall_status_transitions_total",
            "from" => from.to_string(),
            "to" => to.to_string(),
            "actor" => actor.to_string()
        )
        .increment(1);
    }

    pub fn code_collision(kind: &str) {
        counter!("foodhall_code_collisions_total", "kind" => kind.to_string()).increment(1);
    }

    /// Every attempt for one code collided
    pub fn code_exhausted(kind: &str) {
        counter!("foodhall_code_exhausted_total", "kind" => kind.to_string()).increment(1);
    }

    /// Publish the latest live summary
    pub fn live_summary(orders_today: u64, active_orders: u64, revenue_minor: i64) {
        gauge!("foodhall_live_orders_today").set(orders_today as f64);
        gauge!("foodhall_live_active_orders").set(active_orders as f64);
        gauge!("foodhall_live_revenue_minor").set(revenue_minor as f64);
    }
}

/// HTTP server metrics
///
/// * `foodhall_http_requests_total{server}`
/// * `foodhall_http_requests_by_status{status}`
/// * `foodhall_http_request_duration_seconds{server}`
/// * `foodhall_http_in_flight{server}`
#[derive(Clone)]
pub struct ServerMetrics {
    requests_total: Counter,
    request_duration: Histogram,
    in_flight: Gauge,
    server_name: String,
}

impl ServerMetrics {
    pub fn new(server_name: &str) -> Self {
        let name = server_name.to_string();

        Self {
            requests_total: counter!("foodhall_http_requests_total", "server" => name.clone()),
            request_duration: histogram!(
                "foodhall_http_request_duration_seconds",
                "server" => name.clone()
            ),
            in_flight: gauge!("foodhall_http_in_flight", "server" => name.clone()),
            server_name: name,
        }
    }

    /// Record a completed request
    pub fn record_request(&self, duration: Duration, status_code: u16) {
        self.requests_total.increment(1);
        counter!("foodhall_http_requests_by_status", "status" => status_code.to_string())
            .increment(1);
        self.request_duration.record(duration.as_secs_f64());
    }

    pub fn request_started(&self) {
        self.in_flight.increment(1.0);
    }

    pub fn request_finished(&self) {
        self.in_flight.decrement(1.0);
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_exporter() {
        let metrics = ServerMetrics::new("http");
        assert_eq!(metrics.server_name(), "http");
        metrics.request_started();
        metrics.record_request(Duration::from_millis(12), 201);
        metrics.request_finished();

        TicketingMetrics::ticket_created();
        TicketingMetrics::order_created("vendor-a", 2500);
        TicketingMetrics::status_transition("preparing", "ready", "vendor");
        TicketingMetrics::code_collision("order");
        TicketingMetrics::code_exhausted("ticket");
        TicketingMetrics::live_summary(4, 2, 9800);
    }
}
