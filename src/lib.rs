//! # regcache
//!
//! Cache-coherent registration of records: persist to PostgreSQL, populate the
//! record's point entry in Redis, then invalidate every cached listing of its
//! kind.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use regcache::prelude::*;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct User {
//!     pub name: String,
//! }
//!
//! impl Entity for User {
//!     const KIND: &'static str = "user";
//!
//!     fn unique_key(&self) -> Option<String> {
//!         Some(self.name.clone())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let regcache = RegCache::new(AppConfig::load()?).await?;
//!     regcache.auto_migrate::<User>(false).await?;
//!
//!     let users = regcache.coordinator::<User>()?;
//!     let registration = users
//!         .register_and_cache(User { name: "alice".to_string() })
//!         .await?;
//!
//!     // Cached under "user:<id>"; every "users:" listing entry is dropped
//!     println!("registered {} ({})", registration.id(), registration.state());
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod context;
pub mod coordinator;
pub mod core;
pub mod errors;
pub mod migration;
pub mod prelude;
pub mod reader;
pub mod registration;
pub mod retry;

// Re-export the main public types for convenience
pub use context::{CancelHandle, RegisterContext};
pub use coordinator::{CoordinatorSettings, WriteCoordinator};
pub use core::RegCache;
pub use errors::{RegCacheError, RegisterError, RetryError};
pub use reader::CachedReader;
pub use registration::{CacheStep, CacheWarning, Registration, RegistrationState};
pub use retry::RetryPolicy;

// Re-export centralized config
pub use config::{AppConfig, CacheConfig, CoordinatorConfig, DatabaseConfig, RetryConfig};

// Re-export internal crates used in the public API
pub use cache_system;
pub use signal_system;
pub use store_object;

// Re-export external dependencies used in public API
pub use async_trait;
pub use sqlx;
