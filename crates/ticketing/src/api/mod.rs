//! HTTP API for the ticketing services

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
    Json,
};
use observability::ServerMetrics;
use std::time::Instant;

use crate::error::TicketingError;
use crate::service::TicketingServices;

pub mod handlers;
pub mod models;
pub mod routes;

pub use routes::create_router;

use models::{ErrorDetail, ErrorResponse};

/// Shared state of the HTTP handlers
#[derive(Clone)]
pub struct ApiState {
    pub services: TicketingServices,
    pub metrics: ServerMetrics,
}

impl ApiState {
    pub fn new(services: TicketingServices) -> Self {
        Self {
            services,
            metrics: ServerMetrics::new("http"),
        }
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Render a ticketing error with its status code
pub fn api_error(err: TicketingError) -> ApiError {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let message = match &err {
        TicketingError::Validation(m)
        | TicketingError::NotFound(m)
        | TicketingError::Unavailable(m)
        | TicketingError::Conflict(m)
        | TicketingError::ResourceExhausted(m)
        | TicketingError::Internal(m) => m.clone(),
    };

    (
        status,
        Json(ErrorResponse {
            success: false,
            error: ErrorDetail {
                code: err.code().to_string(),
                message,
                details: None,
            },
        }),
    )
}

/// Record request count, latency and in-flight gauge
pub async fn track_metrics(State(state): State<ApiState>, req: Request, next: Next) -> Response {
    let start = Instant::now();
    state.metrics.request_started();
    let response = next.run(req).await;
    state.metrics.request_finished();
    state
        .metrics
        .record_request(start.elapsed(), response.status().as_u16());
    response
}
