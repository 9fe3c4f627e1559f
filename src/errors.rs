//! Error types for the regcache crate
//!
//! This module contains all error types that can be returned by regcache operations.

use cache_system::CacheError;
use config::ConfigError;
use store_object::{PersistError, ValidationError};
use thiserror::Error;

/// Errors raised while building or operating the [`crate::RegCache`] hub
#[derive(Error, Debug)]
pub enum RegCacheError {
    #[error("Database connection error: {0}")]
    DatabaseConnection(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Invalid entity kind: {0}")]
    InvalidKind(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Fatal outcome of a registration. Nothing was cached in either case.
#[derive(Error, Debug)]
pub enum RegisterError {
    #[error("Failed to persist {kind}: {source}")]
    PersistFailed {
        kind: String,
        #[source]
        source: PersistError,
    },

    #[error("Registration of {kind} cancelled before persisting")]
    Cancelled { kind: String },
}

impl RegisterError {
    /// Whether the caller may retry the whole registration
    pub fn is_retryable(&self) -> bool {
        match self {
            RegisterError::PersistFailed { source, .. } => source.is_retryable(),
            RegisterError::Cancelled { .. } => false,
        }
    }

    pub fn persist_error(&self) -> Option<&PersistError> {
        match self {
            RegisterError::PersistFailed { source, .. } => Some(source),
            RegisterError::Cancelled { .. } => None,
        }
    }
}

/// Failure of a retried cache step
#[derive(Error, Debug)]
pub enum RetryError {
    #[error("{source} (after {attempts} attempt(s))")]
    Failed {
        attempts: u32,
        #[source]
        source: CacheError,
    },

    #[error("abandoned after {attempts} attempt(s): registration cancelled")]
    Cancelled { attempts: u32 },
}

impl RetryError {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Failed { attempts, .. } | RetryError::Cancelled { attempts } => *attempts,
        }
    }
}
