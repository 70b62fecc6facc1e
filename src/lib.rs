//! Agent Validator
//!
//! A drop-in library for validating LLM/agent outputs against declared
//! schemas, with optional type coercion, bounded retries, and durable
//! validation logging.
//!
//! ## Features
//!
//! - **Schema Validation**: Recursive structural validation against an
//!   explicit, closed set of type specifiers
//! - **Coercion Mode**: Permissive conversions ("42" -> 42) from a fixed
//!   table, applied only when requested
//! - **Size Limits**: Byte, string, list, and key-count bounds enforced
//!   before and during traversal
//! - **Retry Orchestration**: Exponential backoff with jitter and
//!   per-attempt timeouts around a caller-supplied generator callback
//! - **Correlation Tracking**: One id threads through every attempt and
//!   log record of a session
//! - **Durable Logging**: Append-only local JSONL records plus an
//!   optional authenticated cloud sink, always redacted first
//! - **CLI Support**: Validate files, inspect logs, and manage
//!   configuration from the command line
//!
//! ## Architecture
//!
//! 1. **Schema** (`schema`): Type specifiers and schema construction,
//!    validated once up front.
//!
//! 2. **Validation** (`validate`, `coerce`, `limits`): The structural
//!    validator, the coercion table, and size-limit enforcement.
//!
//! 3. **Orchestration** (`retry`, `context`): The session state machine
//!    driving generation-plus-validation attempts, and the correlation
//!    context threaded through them.
//!
//! 4. **Logging** (`logging`, `redact`, `client`): Local record store,
//!    redaction of sensitive substrings, and the cloud log client.
//!
//! 5. **Configuration** (`config`): Defaults, TOML file, and environment
//!    resolution into one immutable record.
//!
//! 6. **CLI** (`cli`): Command-line interface over the library.
//!
//! ## Example
//!
//! ```rust,no_run
//! use agent_validator::{Schema, TypeSpec, ValidationMode, Validator};
//!
//! #[tokio::main]
//! async fn main() {
//!     let schema = Schema::builder()
//!         .field("name", TypeSpec::String)
//!         .field("age", TypeSpec::Integer)
//!         .build()
//!         .unwrap();
//!
//!     let validator = Validator::new(schema).mode(ValidationMode::Coerce);
//!
//!     let normalized = validator
//!         .validate(r#"{"name": "Ada", "age": "36"}"#)
//!         .await
//!         .unwrap();
//!
//!     assert_eq!(normalized["age"], 36);
//! }
//! ```

// Core modules
pub mod cli;
pub mod client;
pub mod coerce;
pub mod config;
pub mod context;
pub mod error;
pub mod limits;
pub mod logging;
pub mod redact;
pub mod retry;
pub mod schema;
pub mod validate;

// Re-export the public surface
pub use client::{CloudLogClient, CloudLogClientBuilder, CloudLogClientConfig};
pub use config::{CloudConfig, ValidatorConfig};
pub use context::{new_correlation_id, SessionContext};
pub use error::{ConfigError, LogError, SchemaError, ValidationError};
pub use limits::Limits;
pub use logging::{LocalLogStore, LogRecord};
pub use redact::Redactor;
pub use retry::{
    generator_fn, Generator, GeneratorError, GeneratorFuture, RawOutput, RetryPolicy,
    SessionState, ValidationReport, Validator,
};
pub use schema::{Schema, SchemaBuilder, TypeSpec};
pub use validate::{FieldError, ReasonCode, ValidationMode};

/// Library version (from Cargo.toml)
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run the CLI application
///
/// This is the main entry point for the CLI binary.
pub fn run_cli(cli: cli::ValidatorCli) -> cli::ExitCode {
    match cli::run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}
