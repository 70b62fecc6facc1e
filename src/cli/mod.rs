//! CLI module for the agent-validator binary
//!
//! Provides command-line access to one-shot validation, the local log
//! store, correlation id generation, and configuration management.

pub mod commands;
pub mod output;

pub use commands::{ValidatorCli, ValidatorCommands};
pub use output::OutputFormat;

use thiserror::Error;

use crate::error::{ConfigError, LogError, SchemaError};

/// Errors surfaced by CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid input data or arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// File access or I/O error
    #[error("File error: {0}")]
    File(String),

    /// Schema definition error
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Log store error
    #[error("Log error: {0}")]
    Log(#[from] LogError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CliError {
    /// Exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            CliError::InvalidInput(_) => ExitCode::InvalidInput,
            CliError::File(_) => ExitCode::FileError,
            CliError::Schema(_) => ExitCode::SchemaError,
            CliError::Config(_) | CliError::Log(_) => ExitCode::FileError,
            CliError::Serialization(_) | CliError::Internal(_) => ExitCode::InternalError,
        }
    }
}

/// Exit codes for CLI operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Successful execution, validation passed
    Success = 0,
    /// Validation failed
    ValidationError = 1,
    /// Invalid input or arguments
    InvalidInput = 3,
    /// File not found or inaccessible
    FileError = 4,
    /// Schema-related errors
    SchemaError = 5,
    /// Internal error
    InternalError = 10,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

/// Run the CLI with the given arguments and return the exit code
pub fn run(cli: ValidatorCli) -> Result<ExitCode, CliError> {
    match cli.command {
        ValidatorCommands::Validate {
            schema,
            input,
            mode,
            format,
        } => commands::execute_validate(schema, input, mode, format),
        ValidatorCommands::Logs { number, clear } => commands::execute_logs(number, clear),
        ValidatorCommands::Id => commands::execute_id(),
        ValidatorCommands::Config {
            show,
            set_api_key,
            set_endpoint,
            set_cloud_logging,
        } => commands::execute_config(show, set_api_key, set_endpoint, set_cloud_logging),
    }
}
