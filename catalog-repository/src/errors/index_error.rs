//! Index error types.
//!
//! This module defines the unified error type for all index gateway operations,
//! covering both backend failures and request validation.

use thiserror::Error;

/// Unified errors from index operations.
///
/// Used by the `IndexProvider` trait and `IndexGateway` for every operation.
/// `is_transient` tells the gateway which failures are worth a retry.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum IndexError {
    /// Validation error (e.g., empty ids, malformed field names).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Failed to reach the index backend.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// A search, get or scan request failed.
    #[error("Query error: {0}")]
    QueryError(String),

    /// Failed to write or patch a document.
    #[error("Update error: {0}")]
    UpdateError(String),

    /// Failed to delete a document.
    #[error("Delete error: {0}")]
    DeleteError(String),

    /// Failed to create an index.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// Failed to parse a response from the backend.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to serialize data for the backend.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Document not found.
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Batch size exceeds configured maximum.
    #[error("Batch size {provided} exceeds maximum {max}")]
    BatchSizeExceeded { provided: usize, max: usize },

    /// The backend kept failing after all retries.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Unknown error.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl IndexError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryError(msg.into())
    }

    /// Create an update error.
    pub fn update(msg: impl Into<String>) -> Self {
        Self::UpdateError(msg.into())
    }

    /// Create a delete error.
    pub fn delete(msg: impl Into<String>) -> Self {
        Self::DeleteError(msg.into())
    }

    /// Create an index creation error.
    pub fn index_creation(msg: impl Into<String>) -> Self {
        Self::IndexCreationError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Create a document not found error.
    pub fn document_not_found(core: &str, id: &str) -> Self {
        Self::DocumentNotFound(format!("core={}, id={}", core, id))
    }

    /// Create a batch size exceeded error.
    pub fn batch_size_exceeded(provided: usize, max: usize) -> Self {
        Self::BatchSizeExceeded { provided, max }
    }

    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    /// Create an unknown error.
    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::Unknown(msg.into())
    }

    /// Whether retrying the same request may succeed.
    ///
    /// Connection failures are transient, as are backend responses reporting a
    /// 5xx status, a timeout or a 429. Validation and not-found errors never are.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionError(_) => true,
            Self::QueryError(msg) | Self::UpdateError(msg) | Self::DeleteError(msg) => {
                transient_message(msg)
            }
            _ => false,
        }
    }
}

fn transient_message(msg: &str) -> bool {
    let lower = msg.to_lowercase();
    lower.contains("timed out")
        || lower.contains("timeout")
        || lower.contains("connection")
        || lower.contains("status 429")
        || ["500", "502", "503", "504"]
            .iter()
            .any(|code| lower.contains(&format!("status {}", code)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(IndexError::connection("refused").is_transient());
        assert!(IndexError::update("Bulk failed with status 503: unavailable").is_transient());
        assert!(IndexError::query("request timed out").is_transient());
        assert!(!IndexError::update("Bulk failed with status 400: mapper_parsing").is_transient());
        assert!(!IndexError::validation("empty id").is_transient());
        assert!(!IndexError::document_not_found("work", "W1").is_transient());
    }
}
