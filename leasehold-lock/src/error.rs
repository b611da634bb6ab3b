//! Error types for lease locks

use thiserror::Error;

/// Result type for lease lock operations
pub type LeaseResult<T> = Result<T, LeaseError>;

/// Lease lock errors
#[derive(Debug, Error)]
pub enum LeaseError {
    /// Invalid lease timing
    #[error("Lease configuration error: {0}")]
    Config(String),

    /// A lock with this key is already registered
    #[error("Lease lock already registered: {0}")]
    DuplicateLock(String),

    /// The key was never registered; this is a caller bug
    #[error("Lease lock not registered: {0}")]
    NotRegistered(String),

    /// Store backend failure (memory, custom backends)
    #[error("Lease store error: {0}")]
    Store(String),

    /// Redis failure
    #[error("Redis error: {0}")]
    Redis(#[from] leasehold_redis::RedisError),
}

impl LeaseError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new store error
    pub fn store<S: Into<String>>(msg: S) -> Self {
        Self::Store(msg.into())
    }

    /// Whether this error came from talking to the store
    pub fn is_store_error(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Redis(_))
    }
}
