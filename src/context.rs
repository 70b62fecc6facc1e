//! Correlation context for validation sessions
//!
//! A [`SessionContext`] ties together every attempt and every log record
//! of one logical validation session. The correlation id is either
//! supplied by the caller or generated from a v4 UUID; the caller's
//! context fields are threaded through unchanged.

use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Correlation id plus caller-supplied context for one session.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    correlation_id: Option<String>,
    fields: HashMap<String, Value>,
}

impl SessionContext {
    /// Create an empty context; a correlation id is generated lazily
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a caller-supplied correlation id
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Attach a caller context field, included in every log record
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// The correlation id, generating one if the caller supplied none
    pub fn correlation_id(&mut self) -> String {
        self.correlation_id
            .get_or_insert_with(new_correlation_id)
            .clone()
    }

    /// Caller-supplied context fields
    pub fn fields(&self) -> &HashMap<String, Value> {
        &self.fields
    }
}

/// Generate a fresh collision-resistant correlation id
pub fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}
