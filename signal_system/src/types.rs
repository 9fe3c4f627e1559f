//! Type definitions for signal system

use crate::event::RegistrationEvent;

/// Synchronous event callback; must not block
pub type EventCallback = Box<dyn Fn(&RegistrationEvent) + Send + Sync>;
