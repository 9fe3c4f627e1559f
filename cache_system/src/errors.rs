//! Error types for cache operations
//!
//! This module defines all error types that can occur
//! during cache operations and Redis interactions.

use thiserror::Error;

/// Cache system errors
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Cache operation timeout")]
    Timeout,

    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// Prefix deletion stopped part way; keys already removed stay removed
    #[error("Deleted {deleted} keys under '{prefix}' before failing: {source}")]
    PartialDelete {
        prefix: String,
        deleted: u64,
        #[source]
        source: Box<CacheError>,
    },

    #[error("General cache error: {0}")]
    General(String),
}

impl CacheError {
    /// Whether retrying the same idempotent operation may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            CacheError::Redis(e) => {
                e.is_io_error()
                    || e.is_timeout()
                    || e.is_connection_dropped()
                    || e.is_connection_refusal()
            }
            CacheError::Connection(_) | CacheError::Timeout | CacheError::Unavailable(_) => true,
            CacheError::PartialDelete { source, .. } => source.is_retryable(),
            CacheError::SerializationError(_) | CacheError::General(_) => false,
        }
    }
}
