//! Convenience re-exports for common regcache usage
//!
//! # Example
//!
//! ```rust
//! use regcache::prelude::*;
//! ```

// Core regcache components
pub use crate::context::{CancelHandle, RegisterContext};
pub use crate::coordinator::{CoordinatorSettings, WriteCoordinator};
pub use crate::core::RegCache;
pub use crate::errors::{RegCacheError, RegisterError, RetryError};
pub use crate::reader::CachedReader;
pub use crate::registration::{CacheStep, CacheWarning, Registration, RegistrationState};
pub use crate::retry::RetryPolicy;

// Re-export centralized config
pub use config::{AppConfig, CacheConfig, CoordinatorConfig, DatabaseConfig, RetryConfig};

// Entity model and persistence stores
pub use store_object::prelude::*;

// Re-export signal system for event handling
pub use signal_system::prelude::*;

// Re-export cache system
pub use cache_system::prelude::*;

// Common external dependencies
pub use anyhow;
pub use async_trait;
pub use sqlx;
pub use tokio;
