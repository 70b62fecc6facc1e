//! Validation with cloud logging enabled.
//!
//! Reads `AGENT_VALIDATOR_API_KEY` and `AGENT_VALIDATOR_ENDPOINT` from
//! the environment. Run with: `cargo run --example with_cloud`

use agent_validator::{
    generator_fn, GeneratorFuture, RawOutput, Schema, SessionContext, ValidationMode, Validator,
    ValidatorConfig,
};
use serde_json::json;

fn call_agent() -> String {
    json!({
        "name": "Alice Smith",
        "age": "25",          // string that needs coercion
        "email": "alice@example.com",
        "is_active": "true",  // string that needs coercion
        "preferences": {
            "theme": "dark",
            "notifications": true
        }
    })
    .to_string()
}

#[tokio::main]
async fn main() {
    let mut config = ValidatorConfig::default().apply_env();
    config.cloud.enabled = true;
    config.retries = 1;

    let schema = Schema::from_value(&json!({
        "name": "string",
        "age": "integer",
        "email": "string",
        "is_active": "boolean",
        "preferences": {
            "theme": "string",
            "notifications": "boolean"
        }
    }))
    .expect("schema");

    let agent_output = call_agent();
    println!("Agent output: {agent_output}");

    let validator = Validator::new(schema)
        .with_config(config)
        .mode(ValidationMode::Coerce)
        .context(
            SessionContext::new()
                .with_field("task_id", "456")
                .with_field("user_id", "user_123")
                .with_field("environment", "production"),
        )
        .generator(generator_fn(|_prompt: &str, _context: &SessionContext| {
            Box::pin(async { Ok(RawOutput::Text(call_agent())) }) as GeneratorFuture
        }));

    match validator.validate(agent_output).await {
        Ok(result) => {
            println!("✓ Validation successful!");
            println!("Result: {}", serde_json::to_string_pretty(&result).unwrap());
            println!("age is now an integer: {}", result["age"]);
            println!("is_active is now a boolean: {}", result["is_active"]);
        }
        Err(e) => println!("✗ Validation failed: {e}"),
    }
}
