//! Audit trail for AI interactions.
//!
//! Events carry metadata only: hashed identifiers, counts, lengths and durations.
//! Note text and chat messages never enter an event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::sync::Mutex;
use tracing::info;

pub const NOTE_SERVICE: &str = "note_interpretation";
pub const CHAT_SERVICE: &str = "chatbot";

/// One-way identifier for audit correlation: first 8 hex chars of SHA-256.
pub fn hash_id(id: &str) -> String {
    let digest = Sha256::digest(id.as_bytes());
    digest.iter().take(4).map(|b| format!("{:02x}", b)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditResult {
    Requested,
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub hashed_user_id: String,
    pub action: String,
    pub service: String,
    pub result: AuditResult,
    pub metadata: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    /// `user_id` is hashed here; callers pass the raw identifier.
    pub fn new(user_id: &str, action: &str, service: &str, result: AuditResult) -> Self {
        Self {
            hashed_user_id: hash_id(user_id),
            action: action.to_string(),
            service: service.to_string(),
            result,
            metadata: Map::new(),
            timestamp: Utc::now(),
        }
    }

    /// Overrides the creation time with a reading from the caller's clock.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Destination for audit events. Implementations must not block for long.
pub trait AuditSink: Send + Sync + 'static {
    fn record(&self, event: AuditEvent);
}

/// Emits events as structured records on the `audit` tracing target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        let metadata = Value::Object(event.metadata);
        info!(
            target: "audit",
            user = %event.hashed_user_id,
            action = %event.action,
            service = %event.service,
            result = ?event.result,
            metadata = %metadata,
            "AI_AUDIT"
        );
    }
}

/// Keeps events in memory for hosts that forward them to their own store.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn actions(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.action).collect()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
