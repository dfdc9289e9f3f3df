//! Store error types
//!
//! Every repository operation returns `StoreError`. Faults reported by the
//! document database keep their native shape in `StoreError::Remote` so callers
//! can branch on the status code the store sent.

use std::time::Duration;
use thiserror::Error;

/// Result alias used by every repository operation
pub type StoreResult<T> = Result<T, StoreError>;

/// HTTP status codes the document database uses for its common faults
pub mod status {
    pub const BAD_REQUEST: u16 = 400;
    pub const UNAUTHORIZED: u16 = 401;
    pub const FORBIDDEN: u16 = 403;
    pub const NOT_FOUND: u16 = 404;
    pub const REQUEST_TIMEOUT: u16 = 408;
    pub const CONFLICT: u16 = 409;
    pub const PRECONDITION_FAILED: u16 = 412;
    pub const TOO_MANY_REQUESTS: u16 = 429;
    pub const SERVICE_UNAVAILABLE: u16 = 503;
}

/// Errors that can occur while talking to the document database
#[derive(Debug, Error)]
pub enum StoreError {
    /// A fault reported by the document database, carried as the store sent it
    #[error("Store returned {status}: {message}")]
    Remote {
        status: u16,
        sub_status: Option<u32>,
        code: Option<String>,
        message: String,
        activity_id: Option<String>,
        retry_after_ms: Option<u64>,
    },

    /// The request did not complete within the configured timeout
    #[error("Timeout after {duration_ms}ms: {operation}")]
    Timeout {
        operation: String,
        duration_ms: u64,
    },

    /// The store could not be reached
    #[error("Store unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The operation is deliberately not implemented by the repository
    #[error("Operation not supported: {operation}")]
    Unsupported {
        operation: String,
    },

    /// An entity could not be converted to or from its document form
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The repository settings are invalid
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl StoreError {
    /// Creates a remote fault with only a status and message
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        StoreError::Remote {
            status,
            sub_status: None,
            code: None,
            message: message.into(),
            activity_id: None,
            retry_after_ms: None,
        }
    }

    /// Creates the fault the store reports for a missing resource
    pub fn not_found(resource: &str, id: impl std::fmt::Display) -> Self {
        StoreError::Remote {
            status: status::NOT_FOUND,
            sub_status: None,
            code: Some("NotFound".to_string()),
            message: format!("{} '{}' does not exist", resource, id),
            activity_id: None,
            retry_after_ms: None,
        }
    }

    /// Creates the fault the store reports when a resource id is already taken
    pub fn conflict(resource: &str, id: impl std::fmt::Display) -> Self {
        StoreError::Remote {
            status: status::CONFLICT,
            sub_status: None,
            code: Some("Conflict".to_string()),
            message: format!("{} with id '{}' already exists", resource, id),
            activity_id: None,
            retry_after_ms: None,
        }
    }

    /// Creates the fault the store reports for a malformed request
    pub fn bad_request(message: impl Into<String>) -> Self {
        StoreError::Remote {
            status: status::BAD_REQUEST,
            sub_status: None,
            code: Some("BadRequest".to_string()),
            message: message.into(),
            activity_id: None,
            retry_after_ms: None,
        }
    }

    /// Creates an Unsupported error for the named operation
    pub fn unsupported(operation: impl Into<String>) -> Self {
        StoreError::Unsupported {
            operation: operation.into(),
        }
    }

    /// Creates a Timeout error for the named operation
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        StoreError::Timeout {
            operation: operation.into(),
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// Creates an Unavailable error without an underlying source
    pub fn unavailable(message: impl Into<String>) -> Self {
        StoreError::Unavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a Configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        StoreError::Configuration(message.into())
    }

    /// Returns the status code of a remote fault
    pub fn status(&self) -> Option<u16> {
        match self {
            StoreError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if the store reported the resource as missing
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(status::NOT_FOUND)
    }

    /// Returns true if the store reported an id conflict
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(status::CONFLICT)
    }

    /// Returns true if the store throttled the request
    pub fn is_throttled(&self) -> bool {
        self.status() == Some(status::TOO_MANY_REQUESTS)
    }

    /// Returns true for the deliberately unimplemented operations
    pub fn is_unsupported(&self) -> bool {
        matches!(self, StoreError::Unsupported { .. })
    }

    /// Returns true if this error indicates a transient failure that may succeed on retry
    ///
    /// The repository itself never retries; this is a hint for callers.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Timeout { .. } | StoreError::Unavailable { .. } => true,
            StoreError::Remote { status, .. } => matches!(
                *status,
                status::REQUEST_TIMEOUT | status::TOO_MANY_REQUESTS | status::SERVICE_UNAVAILABLE
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_remote_404() {
        let error = StoreError::not_found("Document", "abc");
        assert!(error.is_not_found());
        assert_eq!(error.status(), Some(404));
        assert!(error.to_string().contains("abc"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(StoreError::timeout("read", Duration::from_millis(10)).is_transient());
        assert!(StoreError::remote(status::TOO_MANY_REQUESTS, "slow down").is_transient());
        assert!(!StoreError::conflict("Document", "a").is_transient());
        assert!(!StoreError::unsupported("get_all").is_transient());
    }

    #[test]
    fn test_timeout_records_milliseconds() {
        match StoreError::timeout("provision", Duration::from_millis(1500)) {
            StoreError::Timeout { operation, duration_ms } => {
                assert_eq!(operation, "provision");
                assert_eq!(duration_ms, 1500);
            }
            other => panic!("Expected Timeout, got {other:?}"),
        }
    }
}
