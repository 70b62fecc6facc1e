//! Local validation log store
//!
//! One self-contained JSONL record per validation attempt, appended to a
//! local file. Appends open the file per write so concurrent sessions
//! interleave whole lines without shared state; records are never
//! mutated in place. Log failures are reported to the caller separately
//! and never affect the validation result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::error::LogError;
use crate::limits::Limits;
use crate::redact::Redactor;
use crate::validate::{FieldError, ValidationMode};

/// Longest raw-output sample stored in a record, in characters
pub const MAX_OUTPUT_SAMPLE: usize = 1_000;

/// One validation attempt, as logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Record timestamp
    pub ts: DateTime<Utc>,
    /// Correlation id of the session
    pub correlation_id: String,
    /// Whether the attempt validated successfully
    pub valid: bool,
    /// Ordered error list of the attempt (empty on success)
    pub errors: Vec<FieldError>,
    /// Attempt number within the session (1-based)
    pub attempts: u32,
    /// Cumulative session duration in milliseconds
    pub duration_ms: u64,
    /// Mode the attempt ran under
    pub mode: ValidationMode,
    /// Limits in force for the attempt
    pub limits: Limits,
    /// Caller-supplied context fields
    pub context: HashMap<String, Value>,
    /// Size-bounded sample of the raw output
    pub output_sample: String,
    /// SHA-256 over (output sample, schema) for traceability
    pub inputs_hash: String,
}

impl LogRecord {
    /// Apply a redactor to every field that can carry caller data
    pub fn redacted(&self, redactor: &Redactor) -> LogRecord {
        let mut record = self.clone();
        record.output_sample = redactor.redact_text(&self.output_sample);
        record.context = self
            .context
            .iter()
            .map(|(k, v)| (k.clone(), redactor.redact_value(v)))
            .collect();
        record.errors = self
            .errors
            .iter()
            .map(|e| FieldError {
                path: e.path.clone(),
                reason: e.reason,
                detail: e.detail.as_deref().map(|d| redactor.redact_text(d)),
            })
            .collect();
        record
    }
}

/// Truncate a raw output string for inclusion in a record
pub fn truncate_sample(raw: &str) -> String {
    if raw.chars().count() <= MAX_OUTPUT_SAMPLE {
        raw.to_string()
    } else {
        raw.chars().take(MAX_OUTPUT_SAMPLE).collect()
    }
}

/// SHA-256 hash of the attempt inputs, hex-encoded
pub fn inputs_hash(output_sample: &str, schema_json: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(output_sample.as_bytes());
    hasher.update(schema_json.as_bytes());
    hex::encode(hasher.finalize())
}

/// Append-only local record store.
#[derive(Debug, Clone)]
pub struct LocalLogStore {
    path: PathBuf,
}

impl LocalLogStore {
    /// Store writing to the given JSONL file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single JSONL line
    pub fn append(&self, record: &LogRecord) -> Result<(), LogError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let line = serde_json::to_string(record)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// The most recent `n` records, oldest first.
    ///
    /// Lines that fail to parse are skipped rather than failing the read.
    pub fn recent(&self, n: usize) -> Result<Vec<LogRecord>, LogError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = std::fs::File::open(&self.path)?;
        let records: Vec<LogRecord> = BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect();
        let skip = records.len().saturating_sub(n);
        Ok(records.into_iter().skip(skip).collect())
    }

    /// Remove all stored records
    pub fn clear(&self) -> Result<(), LogError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
