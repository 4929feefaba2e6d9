//! Error types for the batch cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the cache layer.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The backend connection could not be established or was lost
    #[error("Backend connection failed: {0}")]
    Connection(String),

    /// The backend rejected a command
    #[error("Backend error: {0}")]
    Backend(String),

    /// Cached content could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),
}

impl CacheError {
    /// Returns true when the error means the backend connection is unusable.
    pub fn is_connection(&self) -> bool {
        matches!(self, CacheError::Connection(_))
    }
}

// == Redis Conversion ==
impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_dropped()
            || err.is_io_error()
            || err.is_connection_refusal()
            || err.is_timeout()
        {
            CacheError::Connection(err.to_string())
        } else {
            CacheError::Backend(err.to_string())
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Serialization(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CacheError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Backend(_) => StatusCode::BAD_GATEWAY,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;
