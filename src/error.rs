//! Error types for the state layer
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Store Error Enum ==
/// Unified error type for caches, registries and the HTTP facade.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A required argument was missing or malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The remote channel rejected a request
    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// The local key-value store failed to read or write
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A persisted or remote payload could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Requested record is absent (HTTP facade only; caches return `None`)
    #[error("Not found: {0}")]
    NotFound(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = match &self {
            StoreError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            StoreError::RemoteUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            StoreError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            StoreError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the state layer.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (StoreError::InvalidArgument("x".into()), StatusCode::BAD_REQUEST),
            (StoreError::RemoteUnavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (StoreError::Persistence("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (StoreError::NotFound("x".into()), StatusCode::NOT_FOUND),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_serde_error_converts() {
        let err: StoreError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
