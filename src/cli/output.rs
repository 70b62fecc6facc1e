//! Output formatting for the agent-validator CLI
//!
//! Renders validation results as a human-readable table with coloring
//! or as JSON for machine processing.

use clap::ValueEnum;
use colored::Colorize;
use serde::{Deserialize, Serialize};

use super::CliError;
use crate::error::ValidationError;
use crate::retry::ValidationReport;
use crate::validate::FieldError;

/// Output format options for CLI results
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default)]
pub enum OutputFormat {
    /// Human-readable format with colors
    #[default]
    Table,
    /// JSON format for machine processing
    Json,
}

/// Validation output structure for rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOutput {
    /// Overall validation status
    pub valid: bool,
    /// Attempts consumed by the session
    pub attempts: u32,
    /// Correlation id of the session
    pub correlation_id: String,
    /// Session duration in milliseconds
    pub duration_ms: u64,
    /// Path-qualified errors (empty on success)
    pub errors: Vec<ErrorOutput>,
    /// Normalized value on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized: Option<serde_json::Value>,
    /// Summary message
    pub summary: String,
}

/// Individual error output structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorOutput {
    /// Path in the output where validation failed
    pub path: String,
    /// Machine-stable reason code
    pub reason: String,
    /// Human-readable detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorOutput {
    fn from_field_error(error: &FieldError) -> Self {
        Self {
            path: error.path.clone(),
            reason: error.reason.to_string(),
            detail: error.detail.clone(),
        }
    }
}

impl ValidationOutput {
    /// Build output from a successful session report
    pub fn from_report(report: &ValidationReport) -> Self {
        Self {
            valid: true,
            attempts: report.attempts,
            correlation_id: report.correlation_id.clone(),
            duration_ms: report.elapsed_ms,
            errors: Vec::new(),
            normalized: Some(report.value.clone()),
            summary: format!("Output is valid after {} attempt(s)", report.attempts),
        }
    }

    /// Build output from a terminal validation failure
    pub fn from_failure(failure: &ValidationError) -> Self {
        let errors: Vec<ErrorOutput> = failure
            .errors()
            .iter()
            .map(ErrorOutput::from_field_error)
            .collect();
        Self {
            valid: false,
            attempts: failure.attempts(),
            correlation_id: failure.correlation_id().to_string(),
            duration_ms: 0,
            summary: format!(
                "Output is invalid: {} error(s) after {} attempt(s)",
                errors.len(),
                failure.attempts()
            ),
            errors,
            normalized: None,
        }
    }

    /// Render output in the specified format
    pub fn render(&self, format: OutputFormat) -> Result<(), CliError> {
        match format {
            OutputFormat::Json => self.render_json(),
            OutputFormat::Table => self.render_table(),
        }
    }

    fn render_json(&self) -> Result<(), CliError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| CliError::Serialization(e.to_string()))?;
        println!("{}", json);
        Ok(())
    }

    fn render_table(&self) -> Result<(), CliError> {
        if self.valid {
            println!("{} {}", "✓".green().bold(), self.summary);
            if let Some(normalized) = &self.normalized {
                let pretty = serde_json::to_string_pretty(normalized)
                    .map_err(|e| CliError::Serialization(e.to_string()))?;
                println!("{}", pretty);
            }
        } else {
            println!("{} {}", "✗".red().bold(), self.summary);
            for error in &self.errors {
                match &error.detail {
                    Some(detail) => println!(
                        "  {} {} ({})",
                        error.path.bold(),
                        error.reason.red(),
                        detail
                    ),
                    None => println!("  {} {}", error.path.bold(), error.reason.red()),
                }
            }
        }
        println!(
            "{}",
            format!(
                "correlation: {}  attempts: {}",
                self.correlation_id, self.attempts
            )
            .dimmed()
        );
        Ok(())
    }
}
