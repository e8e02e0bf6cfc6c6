//! API routes for the ticketing service

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::api::handlers::*;
use crate::api::{track_metrics, ApiState};

/// Create the ticketing router
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/orders", post(create_order))
        .route("/api/v1/carts", post(submit_cart))
        .route("/api/v1/orders/:order_ref", get(get_order))
        .route("/api/v1/orders/:order_ref/events", get(get_order_events))
        .route("/api/v1/orders/:order_ref/status", patch(update_order_status))
        .route("/api/v1/vendors/:vendor_id/orders", get(list_vendor_orders))
        .route("/api/v1/tickets/:ticket_id/status", patch(set_ticket_status))
        .route("/api/v1/lookup/:code", get(lookup_code))
        .route("/api/v1/summary", get(get_summary))
        .route("/api/v1/reports/summary.csv", get(summary_report))
        .route("/api/v1/reports/vendors.csv", get(vendor_report))
        .layer(middleware::from_fn_with_state(state.clone(), track_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
