//! Agent Validator CLI
//!
//! Command-line interface for validating agent outputs against schemas.
//!
//! # Usage
//!
//! ```bash
//! # Validate an output file against a schema
//! agent-validator validate --schema schema.json --input output.json --mode coerce
//!
//! # Show recent validation log records
//! agent-validator logs -n 50
//!
//! # Generate a correlation id
//! agent-validator id
//! ```
//!
//! # Exit Codes
//!
//! - 0: Success - validation passed
//! - 1: Validation failed
//! - 3: Invalid input or arguments
//! - 4: File not found or inaccessible
//! - 5: Schema-related errors
//! - 10: Internal error

use agent_validator::{run_cli, cli::ValidatorCli};
use clap::Parser;

fn main() {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    // Parse CLI arguments
    let cli = ValidatorCli::parse();

    // Run the CLI and exit with appropriate code
    let exit_code = run_cli(cli);
    std::process::exit(exit_code.into());
}
