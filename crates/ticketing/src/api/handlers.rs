//! API handlers for the ticketing HTTP endpoints

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::api::models::*;
use crate::api::{api_error, ApiResult, ApiState};
use crate::error::TicketingError;
use crate::lookup::LookupResult;
use crate::manager::OrderDetails;
use crate::report::ReportKind;
use crate::types::{
    Cart, CartResult, NewOrder, Order, OrderEvent, OrderRef, OrderResult, OrderStatus, Ticket,
};

/// Upper bound for list endpoints
const MAX_LIST_LIMIT: usize = 200;

/// Health check handler
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "foodhall".to_string(),
    })
}

/// Place a single-vendor order
pub async fn create_order(
    State(state): State<ApiState>,
    Json(req): Json<NewOrder>,
) -> ApiResult<(StatusCode, Json<DataResponse<OrderResult>>)> {
    let result = state.services.orders.create_order(req).await.map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(result))))
}

/// Fan a multi-vendor cart out under one ticket
pub async fn submit_cart(
    State(state): State<ApiState>,
    Json(cart): Json<Cart>,
) -> ApiResult<(StatusCode, Json<DataResponse<CartResult>>)> {
    let result = state.services.orders.submit_cart(cart).await.map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(result))))
}

/// Order with its items, by id or code
pub async fn get_order(
    State(state): State<ApiState>,
    Path(order_ref): Path<String>,
) -> ApiResult<Json<DataResponse<OrderDetails>>> {
    let details = state
        .services
        .orders
        .get_order_details(&OrderRef::parse(&order_ref))
        .await
        .map_err(api_error)?;
    Ok(Json(DataResponse::new(details)))
}

/// Audit trail of an order
pub async fn get_order_events(
    State(state): State<ApiState>,
    Path(order_ref): Path<String>,
) -> ApiResult<Json<DataResponse<Vec<OrderEvent>>>> {
    let events = state
        .services
        .orders
        .order_events(&OrderRef::parse(&order_ref))
        .await
        .map_err(api_error)?;
    Ok(Json(DataResponse::new(events)))
}

/// Move an order along its lifecycle
pub async fn update_order_status(
    State(state): State<ApiState>,
    Path(order_ref): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<Json<DataResponse<Order>>> {
    let order = state
        .services
        .lifecycle
        .update_status(&OrderRef::parse(&order_ref), req.status, req.actor, req.at)
        .await
        .map_err(api_error)?;
    Ok(Json(DataResponse::new(order)))
}

/// A vendor's queue
pub async fn list_vendor_orders(
    State(state): State<ApiState>,
    Path(vendor_id): Path<Uuid>,
    Query(params): Query<VendorOrdersParams>,
) -> ApiResult<Json<DataResponse<Vec<Order>>>> {
    let statuses = match params.status.as_deref() {
        Some(raw) => raw
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.parse::<OrderStatus>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| api_error(TicketingError::validation(e)))?,
        None => Vec::new(),
    };
    let limit = params.limit.unwrap_or(MAX_LIST_LIMIT).min(MAX_LIST_LIMIT);

    let orders = state
        .services
        .orders
        .list_vendor_orders(vendor_id, statuses, Some(limit))
        .await
        .map_err(api_error)?;
    Ok(Json(DataResponse::new(orders)))
}

/// Store a ticket status
pub async fn set_ticket_status(
    State(state): State<ApiState>,
    Path(ticket_id): Path<Uuid>,
    Json(req): Json<TicketStatusRequest>,
) -> ApiResult<Json<DataResponse<Ticket>>> {
    let ticket = state
        .services
        .tickets
        .set_ticket_status(ticket_id, req.status)
        .await
        .map_err(api_error)?;
    Ok(Json(DataResponse::new(ticket)))
}

/// Resolve a ticket or order code
pub async fn lookup_code(
    State(state): State<ApiState>,
    Path(code): Path<String>,
) -> ApiResult<Json<DataResponse<LookupResult>>> {
    match state.services.lookup.lookup(&code).await.map_err(api_error)? {
        LookupResult::NotFound => Err(api_error(TicketingError::not_found(format!(
            "no ticket or order with code {}",
            code.trim().to_uppercase()
        )))),
        found => Ok(Json(DataResponse::new(found))),
    }
}

/// Live or historical daily summary
pub async fn get_summary(
    State(state): State<ApiState>,
    Query(params): Query<DateParams>,
) -> Json<DataResponse<SummaryResponse>> {
    let summary = state.services.aggregation.summarize(params.date).await;
    Json(DataResponse::new(summary.into()))
}

pub async fn summary_report(
    State(state): State<ApiState>,
    Query(params): Query<DateParams>,
) -> ApiResult<Response> {
    render_report(&state, ReportKind::Summary, params).await
}

pub async fn vendor_report(
    State(state): State<ApiState>,
    Query(params): Query<DateParams>,
) -> ApiResult<Response> {
    render_report(&state, ReportKind::Vendors, params).await
}

async fn render_report(state: &ApiState, kind: ReportKind, params: DateParams) -> ApiResult<Response> {
    let (date, body) = state
        .services
        .reports
        .render(kind, params.date)
        .await
        .map_err(api_error)?;

    let disposition = format!("attachment; filename=\"{}\"", kind.file_name(date));
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
