//! Ticketing error types

use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by the ticketing core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TicketingError {
    /// Malformed request (empty cart, bad quantity, bad tax rate)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Vendor, menu item, order or ticket absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Vendor inactive or menu item inactive/unavailable
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Illegal status transition or ticket no longer open
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Code allocation retries exhausted
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Unexpected store or catalog failure; detail is logged, not surfaced
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TicketingError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            TicketingError::Validation(_) => "VALIDATION_ERROR",
            TicketingError::NotFound(_) => "NOT_FOUND",
            TicketingError::Unavailable(_) => "UNAVAILABLE",
            TicketingError::Conflict(_) => "CONFLICT",
            TicketingError::ResourceExhausted(_) => "RESOURCE_EXHAUSTED",
            TicketingError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status the API answers with
    pub fn http_status(&self) -> u16 {
        match self {
            TicketingError::Validation(_) => 400,
            TicketingError::NotFound(_) => 404,
            TicketingError::Unavailable(_) => 422,
            TicketingError::Conflict(_) => 409,
            TicketingError::ResourceExhausted(_) => 503,
            TicketingError::Internal(_) => 500,
        }
    }
}

impl From<StoreError> for TicketingError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "store operation failed");
        TicketingError::Internal("storage failure".to_string())
    }
}

impl From<crate::catalog::CatalogError> for TicketingError {
    fn from(err: crate::catalog::CatalogError) -> Self {
        tracing::error!(error = %err, "catalog lookup failed");
        TicketingError::Internal("catalog failure".to_string())
    }
}

/// Result type for ticketing operations
pub type Result<T> = std::result::Result<T, TicketingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_do_not_leak_detail() {
        let err: TicketingError =
            StoreError::Query("relation \"orders\" does not exist".to_string()).into();
        assert_eq!(err.code(), "INTERNAL_ERROR");
        assert!(!err.to_string().contains("relation"));
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(TicketingError::validation("empty cart").http_status(), 400);
        assert_eq!(TicketingError::conflict("x").http_status(), 409);
        assert_eq!(
            TicketingError::ResourceExhausted("codes".into()).http_status(),
            503
        );
    }
}
