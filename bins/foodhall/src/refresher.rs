//! Live summary refresher
//!
//! Waits on the debounced change feed and re-queries today's summary after
//! each burst, publishing the figures as gauges.

use observability::TicketingMetrics;
use ticketing::{Summary, TicketingServices};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Run until the token is cancelled or the change feed closes
///
/// Returns the number of refreshes performed.
pub async fn run_summary_refresher(services: TicketingServices, token: CancellationToken) -> u64 {
    let mut feed = services.notifier.debounced(services.settings.debounce);
    let mut refreshes = 0;

    info!(
        debounce_ms = services.settings.debounce.as_millis() as u64,
        "Live summary refresher started"
    );

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            batch = feed.next_batch() => {
                let Some(batch) = batch else { break };
                let summary = services.aggregation.summarize(None).await;
                publish(&summary);
                refreshes += 1;
                debug!(changes = batch.len(), "live summary refreshed");
            }
        }
    }

    info!(refreshes, "Live summary refresher stopped");
    refreshes
}

fn publish(summary: &Summary) {
    TicketingMetrics::live_summary(
        summary.orders_count,
        summary.active_orders,
        summary.revenue.minor(),
    );
    info!(
        date = %summary.date,
        orders = summary.orders_count,
        active = summary.active_orders,
        revenue = %summary.revenue.format_major(),
        "Live summary"
    );
}
