//! Store error types

use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Uniqueness constraint violated
    #[error("Duplicate {field}: {value}")]
    Duplicate { field: &'static str, value: String },

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query error
    #[error("Query error: {0}")]
    Query(String),

    /// Transaction error
    #[error("Transaction error: {0}")]
    Transaction(String),
}

impl StoreError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::Duplicate { .. })
    }
}

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;
