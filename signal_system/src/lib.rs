//! Signal system for registration event handling
//!
//! This crate provides synchronous event fan-out for the write coordinator's
//! observability signals.

pub mod event;
pub mod manager;
pub mod prelude;
pub mod types;

pub use event::{EventType, RegistrationEvent};
pub use manager::SignalManager;
pub use types::EventCallback;
