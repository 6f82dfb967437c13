//! Error types for store operations.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Store-specific errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Embedded file database error
    #[cfg(feature = "file")]
    #[error("File store error: {0}")]
    File(#[from] redb::Error),

    /// Relational database error
    #[cfg(feature = "sql")]
    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    /// Redis-specific error
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A stored record could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// A record could not be encoded for storage
    #[error("Encode error: {0}")]
    Encode(String),

    /// Invalid construction parameters. Only returned while opening a store.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The store has been closed
    #[error("Store is closed")]
    Closed,

    /// Generic error
    #[error("Store error: {0}")]
    Other(String),
}

impl StoreError {
    /// Whether this error came from invalid configuration.
    pub fn is_config(&self) -> bool {
        matches!(self, StoreError::Config(_))
    }
}
