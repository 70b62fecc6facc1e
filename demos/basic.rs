//! Basic usage: validate agent output with retries.
//!
//! Run with: `cargo run --example basic`

use agent_validator::{
    generator_fn, GeneratorFuture, RawOutput, Schema, SessionContext, TypeSpec, ValidationMode,
    Validator,
};
use serde_json::json;

fn call_agent() -> String {
    // Simulate an agent that sometimes returns malformed output
    if rand::random::<f64>() < 0.3 {
        return "This is not valid JSON".to_string();
    }

    json!({
        "name": "John Doe",
        "age": 30,
        "email": "john@example.com",
        "tags": ["developer", "rust"],
    })
    .to_string()
}

#[tokio::main]
async fn main() {
    let schema = Schema::builder()
        .field("name", TypeSpec::String)
        .field("age", TypeSpec::Integer)
        .field("email", TypeSpec::String)
        .field("tags", TypeSpec::List(Box::new(TypeSpec::String)))
        .build()
        .expect("schema");

    let agent_output = call_agent();
    println!("Agent output: {agent_output}");

    let validator = Validator::new(schema)
        .mode(ValidationMode::Coerce)
        .retries(2)
        .context(SessionContext::new().with_field("task_id", "123"))
        .generator(generator_fn(|_prompt: &str, _context: &SessionContext| {
            Box::pin(async { Ok(RawOutput::Text(call_agent())) }) as GeneratorFuture
        }));

    match validator.validate(agent_output).await {
        Ok(result) => {
            println!("✓ Validation successful!");
            println!("Result: {}", serde_json::to_string_pretty(&result).unwrap());
        }
        Err(e) => println!("✗ Validation failed: {e}"),
    }
}
