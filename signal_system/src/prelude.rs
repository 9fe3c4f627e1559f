//! Convenience re-exports for common signal-system usage

// Core signal system components
pub use crate::event::{EventType, RegistrationEvent};
pub use crate::manager::SignalManager;
pub use crate::types::EventCallback;

// Common external dependencies
pub use serde_json;
