//! Registration event types and definitions
//!
//! This module defines the events emitted by the write coordinator so
//! operators can observe registrations and cache backend trouble.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Registration event type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    /// Record persisted and cache left coherent
    Registered,
    /// Record persisted but a cache step failed or was abandoned
    CacheDegraded,
    /// Record was not persisted
    PersistFailed,
}

/// Registration event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationEvent {
    pub event_type: EventType,
    /// Entity kind (singular name)
    pub kind: String,
    /// Record ID (absent when persisting failed)
    pub record_id: Option<String>,
    /// Additional data, e.g. the failing step and its error
    pub payload: HashMap<String, serde_json::Value>,
    /// Event timestamp (UTC)
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl RegistrationEvent {
    pub fn new(event_type: EventType, kind: String) -> Self {
        Self {
            event_type,
            kind,
            record_id: None,
            payload: HashMap::new(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_record_id(mut self, record_id: String) -> Self {
        self.record_id = Some(record_id);
        self
    }

    pub fn with_payload(mut self, key: &str, value: serde_json::Value) -> Self {
        self.payload.insert(key.to_string(), value);
        self
    }
}
