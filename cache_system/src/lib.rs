//! Cache system for point and listing entries
//!
//! This crate provides the [`CacheStore`] contract, key naming, value encoding
//! and two backends: Redis ([`CacheManager`]) and an in-process sorted map
//! ([`MemoryCache`]).

pub mod codec;
pub mod errors;
pub mod keys;
pub mod manager;
pub mod memory;
pub mod prelude;
pub mod store;

// Re-export centralized config
pub use config::CacheConfig;

pub use errors::CacheError;
pub use keys::KeyNamer;
pub use manager::CacheManager;
pub use memory::MemoryCache;
pub use store::CacheStore;
