//! Observability infrastructure for the food hall services
//!
//! - Structured logging via tracing
//! - Prometheus metrics and the ticketing counters
//!
//! ```ignore
//! use observability::{init_logging, LogFormat};
//!
//! init_logging("foodhall", LogFormat::Pretty, "info")?;
//! observability::init_metrics(9100)?;
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat};
pub use metrics::{init_metrics, ServerMetrics, TicketingMetrics};
