//! Error types for the request/response boundary.

use thiserror::Error;

/// Errors raised by request and response handles.
#[derive(Debug, Error)]
pub enum Error {
    /// The HTTP method is not supported.
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// A required header is missing from the request.
    #[error("Required header is missing: {0}")]
    MissingHeader(String),

    /// The response was already ended; nothing more can be written to it.
    #[error("Response has already been ended")]
    ResponseEnded,

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
