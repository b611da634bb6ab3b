//! Redis error types.

use thiserror::Error;

/// Result type for Redis operations.
pub type Result<T> = std::result::Result<T, RedisError>;

/// Redis errors.
#[derive(Debug, Error)]
pub enum RedisError {
    /// The connection failed mid-command and was discarded from the pool.
    #[error("Connection error: {0}")]
    Connection(String),

    /// No connection could be checked out of the pool.
    #[error("Pool error: {0}")]
    Pool(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The command did not complete within the configured command timeout.
    #[error("Operation timed out")]
    Timeout,

    /// The server answered with an error; the connection itself is healthy.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl RedisError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout | Self::Pool(_))
    }

    /// Check if this error indicates connection loss.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout)
    }
}

/// Whether a raw client error means the connection can no longer be trusted.
///
/// Everything else (wrong type, script errors, `nil` replies to non-optional
/// reads) leaves the connection usable.
pub(crate) fn is_connectivity_failure(err: &redis::RedisError) -> bool {
    err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout()
}

impl<E> From<bb8::RunError<E>> for RedisError
where
    E: std::error::Error + 'static,
{
    fn from(err: bb8::RunError<E>) -> Self {
        Self::Pool(err.to_string())
    }
}

impl From<url::ParseError> for RedisError {
    fn from(err: url::ParseError) -> Self {
        Self::Config(err.to_string())
    }
}
