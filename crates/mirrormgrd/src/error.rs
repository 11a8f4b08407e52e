//! Error types for mirrormgrd.
//!
//! The taxonomy follows the request lifecycle: validation failures are
//! rejected before any gateway or store interaction, not-found failures
//! come out of inventory checks, upstream failures surface the flow
//! programming gateway's own status and body, and storage failures are
//! reported only after the transient-retry policy is exhausted.

use thiserror::Error;

use crate::gateway::GatewayError;
use crate::store::StoreError;

/// Result type alias for mirror operations.
pub type MirrorResult<T> = Result<T, MirrorError>;

/// Errors surfaced by mirror operations.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// Missing or malformed required command field.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Feature flag present in the command but not supported.
    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    /// Switch, circuit, interface or mirror id absent from inventory.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// What was looked up ("switch", "circuit", "interface", "mirror").
        kind: &'static str,
        /// The identifier that was not found.
        id: String,
    },

    /// The flow programming gateway rejected a flow set.
    #[error("Flow programming gateway rejected the request: status={status} body={body}")]
    Upstream {
        /// HTTP status reported by the gateway.
        status: u16,
        /// Response body reported by the gateway.
        body: String,
    },

    /// A gateway could not be reached or answered with an unusable shape.
    #[error("Gateway request failed: {0}")]
    Gateway(String),

    /// A flow rule returned by the gateway cannot be mirrored.
    #[error("Malformed flow rule from flow gateway: {0}")]
    MalformedFlow(String),

    /// Store retries exhausted on a transient connectivity failure.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Non-transient storage failure (corrupt document, encoding error).
    #[error("Storage error: {0}")]
    Storage(String),
}

impl MirrorError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates an unsupported-feature error.
    pub fn unsupported(feature: impl Into<String>) -> Self {
        Self::Unsupported(feature.into())
    }

    /// Creates a not-found error.
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

impl From<GatewayError> for MirrorError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Rejected { status, body, .. } => Self::Upstream { status, body },
            other => Self::Gateway(other.to_string()),
        }
    }
}

impl From<StoreError> for MirrorError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Connection(message) => Self::StorageUnavailable(message),
            other => Self::Storage(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = MirrorError::not_found("switch", "00:00:00:00:00:00:00:01");
        assert_eq!(
            err.to_string(),
            "switch not found: 00:00:00:00:00:00:00:01"
        );
    }

    #[test]
    fn test_upstream_carries_status_and_body() {
        let err = MirrorError::from(GatewayError::Rejected {
            url: "http://c/flows/sw1".to_string(),
            status: 400,
            body: "bad flow".to_string(),
        });
        assert!(matches!(err, MirrorError::Upstream { status: 400, .. }));
        assert!(err.to_string().contains("status=400"));
        assert!(err.to_string().contains("bad flow"));
    }

    #[test]
    fn test_transient_store_error_maps_to_unavailable() {
        let err = MirrorError::from(StoreError::Connection("reconnecting".to_string()));
        assert!(matches!(err, MirrorError::StorageUnavailable(_)));

        let err = MirrorError::from(StoreError::Operation("oops".to_string()));
        assert!(matches!(err, MirrorError::Storage(_)));
    }
}
