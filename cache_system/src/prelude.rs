//! Convenience re-exports for common cache-system usage

// Core cache system components
pub use crate::errors::CacheError;
pub use crate::keys::KeyNamer;
pub use crate::manager::CacheManager;
pub use crate::memory::MemoryCache;
pub use crate::store::CacheStore;

// Re-export centralized config
pub use config::CacheConfig;

// Common external dependencies
pub use redis;
