//! API models for the ticketing HTTP endpoints

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregation::{LatestOrder, Summary, TopItem, VendorSales};
use crate::types::{Actor, OrderStatus, TicketStatus};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

/// Successful response envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Error response envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Body of `PATCH /orders/:order_ref/status`
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    #[serde(default = "default_actor")]
    pub actor: Actor,
    /// Transition time; defaults to now
    #[serde(default)]
    pub at: Option<DateTime<Utc>>,
}

fn default_actor() -> Actor {
    Actor::Vendor
}

/// Body of `PATCH /tickets/:ticket_id/status`
#[derive(Debug, Serialize, Deserialize)]
pub struct TicketStatusRequest {
    pub status: TicketStatus,
}

/// Query of the vendor queue
#[derive(Debug, Default, Deserialize)]
pub struct VendorOrdersParams {
    /// Comma-separated statuses
    pub status: Option<String>,
    pub limit: Option<usize>,
}

/// Query naming a business day
#[derive(Debug, Default, Deserialize)]
pub struct DateParams {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VendorSalesResponse {
    pub vendor_id: Uuid,
    pub vendor_name: Option<String>,
    pub total_major: f64,
    pub orders: u64,
}

impl From<VendorSales> for VendorSalesResponse {
    fn from(sales: VendorSales) -> Self {
        Self {
            vendor_id: sales.vendor_id,
            vendor_name: sales.vendor_name,
            total_major: sales.total.to_major(),
            orders: sales.orders,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LatestOrderResponse {
    pub order_id: Uuid,
    pub order_code: String,
    pub status: OrderStatus,
    pub total_major: f64,
    pub created_at: DateTime<Utc>,
}

impl From<LatestOrder> for LatestOrderResponse {
    fn from(order: LatestOrder) -> Self {
        Self {
            order_id: order.order_id,
            order_code: order.order_code,
            status: order.status,
            total_major: order.total.to_major(),
            created_at: order.created_at,
        }
    }
}

/// Daily summary in major currency units
#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub date: NaiveDate,
    pub orders_count: u64,
    pub revenue_major: f64,
    pub tax_major: f64,
    pub active_orders: u64,
    pub avg_prep_minutes: Option<f64>,
    pub vendor_sales: Vec<VendorSalesResponse>,
    pub top_vendor: Option<VendorSalesResponse>,
    pub top_item: Option<TopItem>,
    pub latest_orders: Vec<LatestOrderResponse>,
}

impl From<Summary> for SummaryResponse {
    fn from(summary: Summary) -> Self {
        Self {
            date: summary.date,
            orders_count: summary.orders_count,
            revenue_major: summary.revenue.to_major(),
            tax_major: summary.tax.to_major(),
            active_orders: summary.active_orders,
            avg_prep_minutes: summary.avg_prep_minutes,
            vendor_sales: summary.vendor_sales.into_iter().map(Into::into).collect(),
            top_vendor: summary.top_vendor.map(Into::into),
            top_item: summary.top_item,
            latest_orders: summary.latest_orders.into_iter().map(Into::into).collect(),
        }
    }
}
