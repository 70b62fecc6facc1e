//! CLI command definitions for the agent-validator binary
//!
//! Clap-based commands for one-shot validation, log inspection,
//! correlation id generation, and configuration management.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use super::output::{OutputFormat, ValidationOutput};
use super::{CliError, ExitCode};
use crate::config::{default_config_path, ValidatorConfig};
use crate::context::new_correlation_id;
use crate::logging::LocalLogStore;
use crate::schema::Schema;
use crate::validate::ValidationMode;
use crate::Validator;

/// Agent Validator CLI
///
/// Validate agent output files against schemas, inspect the local
/// validation log, and manage configuration.
#[derive(Parser, Debug)]
#[command(name = "agent-validator")]
#[command(about = "Validate LLM/agent outputs against schemas", long_about = None)]
#[command(version)]
pub struct ValidatorCli {
    /// Output verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: ValidatorCommands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum ValidatorCommands {
    /// Validate an output file against a schema
    ///
    /// Runs a single validation session (no retries) over the input
    /// file and prints the normalized value or the error list.
    Validate {
        /// Path to the schema JSON file
        #[arg(short, long)]
        schema: PathBuf,

        /// Path to the input file (JSON, or plain text in coerce mode)
        #[arg(short, long)]
        input: PathBuf,

        /// Validation mode (strict or coerce)
        #[arg(short, long, default_value = "strict")]
        mode: String,

        /// Output format for results
        #[arg(long, value_enum, default_value = "table")]
        format: Option<OutputFormat>,
    },

    /// Show recent validation log records
    Logs {
        /// Number of records to show
        #[arg(short = 'n', long, default_value_t = 20)]
        number: usize,

        /// Clear all stored records instead
        #[arg(long)]
        clear: bool,
    },

    /// Generate a new correlation id
    Id,

    /// Inspect or update the configuration file
    Config {
        /// Show the resolved configuration
        #[arg(long)]
        show: bool,

        /// Set the cloud sink API key
        #[arg(long)]
        set_api_key: Option<String>,

        /// Set the cloud sink endpoint
        #[arg(long)]
        set_endpoint: Option<String>,

        /// Enable or disable cloud logging
        #[arg(long)]
        set_cloud_logging: Option<bool>,
    },
}

/// Execute the validate command
pub fn execute_validate(
    schema_path: PathBuf,
    input_path: PathBuf,
    mode: String,
    format: Option<OutputFormat>,
) -> Result<ExitCode, CliError> {
    let mode: ValidationMode = mode.parse().map_err(CliError::InvalidInput)?;

    let schema_content = std::fs::read_to_string(&schema_path).map_err(|e| {
        CliError::File(format!(
            "Failed to read schema file '{}': {}",
            schema_path.display(),
            e
        ))
    })?;
    let schema = Schema::from_json(&schema_content)?;

    let input_content = std::fs::read_to_string(&input_path).map_err(|e| {
        CliError::File(format!(
            "Failed to read input file '{}': {}",
            input_path.display(),
            e
        ))
    })?;

    let config = ValidatorConfig::load()?;
    let validator = Validator::new(schema).with_config(config).mode(mode);

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::Internal(format!("Failed to start runtime: {}", e)))?;
    let result = runtime.block_on(validator.validate_with_report(input_content.as_str()));

    let output_format = format.unwrap_or(OutputFormat::Table);
    match result {
        Ok(report) => {
            ValidationOutput::from_report(&report).render(output_format)?;
            Ok(ExitCode::Success)
        }
        Err(failure) => {
            ValidationOutput::from_failure(&failure).render(output_format)?;
            Ok(ExitCode::ValidationError)
        }
    }
}

/// Execute the logs command
pub fn execute_logs(number: usize, clear: bool) -> Result<ExitCode, CliError> {
    let config = ValidatorConfig::load()?;
    let store = LocalLogStore::new(config.log_path);

    if clear {
        store.clear()?;
        println!("All logs cleared.");
        return Ok(ExitCode::Success);
    }

    let records = store.recent(number)?;
    if records.is_empty() {
        println!("No logs found.");
        return Ok(ExitCode::Success);
    }

    for record in records {
        let marker = if record.valid {
            "✓".green()
        } else {
            "✗".red()
        };
        println!(
            "{} {} {} {} (attempts: {}, duration: {}ms)",
            record.ts.to_rfc3339(),
            marker,
            record.correlation_id,
            record.mode,
            record.attempts,
            record.duration_ms
        );
    }

    Ok(ExitCode::Success)
}

/// Execute the id command
pub fn execute_id() -> Result<ExitCode, CliError> {
    println!("{}", new_correlation_id());
    Ok(ExitCode::Success)
}

/// Execute the config command
pub fn execute_config(
    show: bool,
    set_api_key: Option<String>,
    set_endpoint: Option<String>,
    set_cloud_logging: Option<bool>,
) -> Result<ExitCode, CliError> {
    let path = default_config_path();
    let mut config = if path.exists() {
        ValidatorConfig::from_file(&path)?
    } else {
        ValidatorConfig::default()
    };

    if show {
        println!("Current configuration ({}):", path.display());
        println!("  max_output_bytes: {}", config.limits.max_output_bytes);
        println!("  max_str_len: {}", config.limits.max_str_len);
        println!("  max_list_len: {}", config.limits.max_list_len);
        println!("  max_dict_keys: {}", config.limits.max_dict_keys);
        println!("  retries: {}", config.retries);
        println!("  timeout_s: {}", config.timeout_s);
        println!("  mode: {}", config.mode);
        println!("  log_path: {}", config.log_path.display());
        println!("  cloud_logging: {}", config.cloud.enabled);
        println!("  cloud_endpoint: {}", config.cloud.endpoint);
        println!(
            "  api_key: {}",
            if config.cloud.api_key.is_some() {
                "***"
            } else {
                "not set"
            }
        );
        return Ok(ExitCode::Success);
    }

    let mut changed = false;

    if let Some(key) = set_api_key {
        config.cloud.api_key = Some(key);
        println!("API key updated.");
        changed = true;
    }

    if let Some(endpoint) = set_endpoint {
        config.cloud.endpoint = endpoint;
        println!("Cloud endpoint updated.");
        changed = true;
    }

    if let Some(enabled) = set_cloud_logging {
        config.cloud.enabled = enabled;
        println!(
            "Cloud logging {}.",
            if enabled { "enabled" } else { "disabled" }
        );
        changed = true;
    }

    if changed {
        config.save(&path)?;
    }

    Ok(ExitCode::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        ValidatorCli::command().debug_assert();
    }

    #[test]
    fn test_parse_validate_command() {
        let cli = ValidatorCli::parse_from([
            "agent-validator",
            "validate",
            "--schema",
            "schema.json",
            "--input",
            "output.json",
            "--mode",
            "coerce",
        ]);
        match cli.command {
            ValidatorCommands::Validate { schema, mode, .. } => {
                assert_eq!(schema, PathBuf::from("schema.json"));
                assert_eq!(mode, "coerce");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_logs_defaults() {
        let cli = ValidatorCli::parse_from(["agent-validator", "logs"]);
        match cli.command {
            ValidatorCommands::Logs { number, clear } => {
                assert_eq!(number, 20);
                assert!(!clear);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_mode_is_rejected() {
        let result = execute_validate(
            PathBuf::from("schema.json"),
            PathBuf::from("input.json"),
            "lenient".to_string(),
            None,
        );
        assert!(matches!(result, Err(CliError::InvalidInput(_))));
    }
}
