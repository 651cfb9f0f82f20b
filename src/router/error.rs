//! Error types for routing and dispatch.

use thiserror::Error;

/// Errors raised while configuring routes or running a handler chain.
#[derive(Debug, Error)]
pub enum Error {
    /// A route path did not begin with `/`.
    #[error("Path must start with /: {0}")]
    InvalidPath(String),

    /// The same `:token` appeared more than once in one path pattern.
    #[error("Cannot use identifier {0} more than once in pattern string")]
    DuplicateToken(String),

    /// A path pattern or regex failed to compile.
    #[error("Invalid path pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// The operation is not allowed in the route's current state.
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// A handler reported a failure with a message.
    #[error("Internal server error: {0}")]
    InternalError(String),

    /// A handler failed with an application error.
    #[error("Handler error: {0}")]
    Handler(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A handler panicked.
    #[error("Handler panicked: {0}")]
    Panic(String),

    /// Error from the request/response boundary.
    #[error("HTTP error: {0}")]
    Http(#[from] crate::http::Error),
}

impl Error {
    /// Wrap any application error so a handler can return it with `?`-friendly `map_err`.
    pub fn handler<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Handler(Box::new(err))
    }
}
