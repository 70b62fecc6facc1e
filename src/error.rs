//! Error types for the agent-validator library
//!
//! Provides structured error types for schema construction, validation
//! sessions, logging, and configuration handling.

use thiserror::Error;

use crate::validate::FieldError;

/// Error raised when a schema definition is malformed.
///
/// Schema errors are detected at construction time and are never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The schema root is not an object of field specifiers
    #[error("Schema root must be an object, got {0}")]
    InvalidRoot(String),

    /// A type specifier tag is not one of the recognized forms
    #[error("Unsupported type specifier '{tag}' for field '{field}'")]
    UnknownType { field: String, tag: String },

    /// A list specifier must wrap exactly one inner specifier
    #[error("List specifier for field '{0}' must have exactly one element")]
    InvalidList(String),

    /// The same field name appears more than once
    #[error("Duplicate field '{0}' in schema")]
    DuplicateField(String),

    /// The schema JSON could not be parsed at all
    #[error("Schema parse error: {0}")]
    Parse(String),
}

/// Terminal outcome of a validation session.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Retry budget exhausted (or no retry generator was supplied).
    ///
    /// Carries the last attempt's full error list plus the session
    /// diagnostics needed to correlate it with emitted log records.
    #[error(
        "validation failed after {attempts} attempt(s) [{correlation_id}]: {}",
        format_errors(.errors)
    )]
    Exhausted {
        /// Path-qualified errors from the final attempt, in traversal order
        errors: Vec<FieldError>,
        /// Total attempts consumed (initial attempt + retries)
        attempts: u32,
        /// Correlation id of the session
        correlation_id: String,
        /// Cumulative session duration in milliseconds
        elapsed_ms: u64,
    },
}

impl ValidationError {
    /// The final attempt's error list.
    pub fn errors(&self) -> &[FieldError] {
        match self {
            ValidationError::Exhausted { errors, .. } => errors,
        }
    }

    /// Attempts consumed before the session gave up.
    pub fn attempts(&self) -> u32 {
        match self {
            ValidationError::Exhausted { attempts, .. } => *attempts,
        }
    }

    /// Correlation id shared with every log record of the session.
    pub fn correlation_id(&self) -> &str {
        match self {
            ValidationError::Exhausted { correlation_id, .. } => correlation_id,
        }
    }
}

fn format_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{} at {}", e.reason, e.path))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors from the logging collaborators.
///
/// Never fatal to a validation session: sinks report these separately
/// and the session result is returned regardless.
#[derive(Error, Debug)]
pub enum LogError {
    #[error("Failed to write log record: {0}")]
    Write(String),

    #[error("Failed to serialize log record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP transport error: {0}")]
    Http(String),

    #[error("Cloud sink rejected record: {0}")]
    Rejected(String),
}

impl From<std::io::Error> for LogError {
    fn from(err: std::io::Error) -> Self {
        LogError::Write(err.to_string())
    }
}

/// Errors from configuration resolution.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(String),

    #[error("Failed to parse config file: {0}")]
    Parse(String),

    #[error("Failed to write config file: {0}")]
    Write(String),
}
