//! Traits for persistence operations

pub mod core;

pub use core::PersistenceStore;
