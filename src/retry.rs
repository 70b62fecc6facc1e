//! Retry orchestration for validation sessions
//!
//! Drives repeated generation-plus-validation attempts through an
//! explicit state machine: `Attempting -> {Succeeded, Retrying,
//! Exhausted}`. Termination conditions are states rather than unwinding
//! control flow, so the retry accounting stays auditable. Retries are
//! strictly sequential; the backoff sleep suspends only the session's
//! own task.

use rand::Rng;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::{sleep, timeout};

use crate::client::CloudLogClient;
use crate::config::ValidatorConfig;
use crate::context::SessionContext;
use crate::error::{LogError, ValidationError};
use crate::limits::Limits;
use crate::logging::{inputs_hash, truncate_sample, LocalLogStore, LogRecord};
use crate::redact::Redactor;
use crate::schema::Schema;
use crate::validate::{
    parse_candidate, validate_structure, FieldError, Outcome, ReasonCode, ValidationMode,
    ROOT_PATH,
};

/// Raw output handed to a validation attempt.
#[derive(Debug, Clone)]
pub enum RawOutput {
    /// Textual output, parsed to structured form before validation
    Text(String),
    /// Already-structured output
    Structured(Value),
}

impl RawOutput {
    /// String form used for the size-bounded log sample
    pub fn sample(&self) -> String {
        match self {
            RawOutput::Text(s) => truncate_sample(s),
            RawOutput::Structured(v) => truncate_sample(&v.to_string()),
        }
    }
}

impl From<String> for RawOutput {
    fn from(s: String) -> Self {
        RawOutput::Text(s)
    }
}

impl From<&str> for RawOutput {
    fn from(s: &str) -> Self {
        RawOutput::Text(s.to_string())
    }
}

impl From<Value> for RawOutput {
    fn from(v: Value) -> Self {
        RawOutput::Structured(v)
    }
}

/// Error returned by a generator callback
#[derive(Error, Debug, Clone)]
#[error("generator failed: {0}")]
pub struct GeneratorError(pub String);

/// Future returned by a generator callback
pub type GeneratorFuture =
    Pin<Box<dyn Future<Output = Result<RawOutput, GeneratorError>> + Send>>;

/// Caller-supplied callback that produces fresh output for a retry.
///
/// Must be safely callable multiple times with the same arguments; the
/// orchestrator assumes nothing beyond that.
pub trait Generator: Send + Sync {
    /// Produce new raw output for the given prompt and session context
    fn generate(&self, prompt: &str, context: &SessionContext) -> GeneratorFuture;
}

struct FnGenerator<F>(F);

impl<F> Generator for FnGenerator<F>
where
    F: Fn(&str, &SessionContext) -> GeneratorFuture + Send + Sync,
{
    fn generate(&self, prompt: &str, context: &SessionContext) -> GeneratorFuture {
        (self.0)(prompt, context)
    }
}

/// Wrap a closure as a [`Generator`]
pub fn generator_fn<F>(f: F) -> impl Generator
where
    F: Fn(&str, &SessionContext) -> GeneratorFuture + Send + Sync,
{
    FnGenerator(f)
}

/// States of a validation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// An attempt is being validated
    Attempting,
    /// Terminal: normalized value produced
    Succeeded,
    /// Waiting out the backoff before the next generation call
    Retrying,
    /// Terminal: retry budget exhausted or no generator supplied
    Exhausted,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Attempting => write!(f, "attempting"),
            SessionState::Succeeded => write!(f, "succeeded"),
            SessionState::Retrying => write!(f, "retrying"),
            SessionState::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// Backoff schedule between attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retry budget after the initial attempt
    pub retries: u32,
    /// First delay in milliseconds
    pub initial_backoff_ms: u64,
    /// Delay ceiling in milliseconds
    pub max_backoff_ms: u64,
    /// Upper bound of the uniform random jitter per delay
    pub jitter_ms: u64,
}

impl RetryPolicy {
    /// Delay before the retry that follows `failed_attempt` (1-based):
    /// `initial * 2^(failed_attempt - 1)` capped, plus bounded jitter.
    pub fn delay_for(&self, failed_attempt: u32) -> Duration {
        let exp = failed_attempt.saturating_sub(1).min(16);
        let base = self
            .initial_backoff_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_backoff_ms);
        let jitter = if self.jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.jitter_ms)
        } else {
            0
        };
        Duration::from_millis(base.saturating_add(jitter))
    }
}

/// Successful session outcome with diagnostics.
#[derive(Debug)]
pub struct ValidationReport {
    /// Normalized value, same shape as the schema
    pub value: Value,
    /// Attempts consumed (initial attempt + retries)
    pub attempts: u32,
    /// Correlation id shared with every emitted log record
    pub correlation_id: String,
    /// Cumulative session duration in milliseconds
    pub elapsed_ms: u64,
    /// Logging failures observed during the session; never fatal
    pub log_errors: Vec<LogError>,
}

/// Validation session driver.
///
/// Holds the schema, resolved configuration, and collaborators for one
/// or more sessions. The schema and configuration are immutable once
/// built, so a `Validator` can be shared across concurrent sessions.
pub struct Validator {
    schema: Schema,
    config: ValidatorConfig,
    mode: ValidationMode,
    context: SessionContext,
    prompt: String,
    generator: Option<Arc<dyn Generator>>,
    local_log: Option<LocalLogStore>,
    cloud: Option<Arc<CloudLogClient>>,
    redactor: Arc<Redactor>,
}

impl Validator {
    /// Create a validator with default configuration
    pub fn new(schema: Schema) -> Self {
        let config = ValidatorConfig::default();
        Self {
            mode: config.mode,
            local_log: Some(LocalLogStore::new(config.log_path.clone())),
            schema,
            config,
            context: SessionContext::new(),
            prompt: String::new(),
            generator: None,
            cloud: None,
            redactor: Arc::new(Redactor::new()),
        }
    }

    /// Use a resolved configuration record
    pub fn with_config(mut self, config: ValidatorConfig) -> Self {
        self.mode = config.mode;
        self.local_log = Some(LocalLogStore::new(config.log_path.clone()));
        if config.cloud.enabled {
            self.cloud = Some(Arc::new(CloudLogClient::new(
                config.cloud.endpoint.clone(),
                config.cloud.api_key.clone(),
            )));
        }
        self.config = config;
        self
    }

    /// Set the validation mode
    pub fn mode(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the retry budget
    pub fn retries(mut self, retries: u32) -> Self {
        self.config.retries = retries;
        self
    }

    /// Set the per-attempt generator timeout in seconds
    pub fn timeout_s(mut self, timeout_s: u64) -> Self {
        self.config.timeout_s = timeout_s;
        self
    }

    /// Set the size limits
    pub fn limits(mut self, limits: Limits) -> Self {
        self.config.limits = limits;
        self
    }

    /// Set the backoff schedule
    pub fn backoff(mut self, initial_ms: u64, max_ms: u64, jitter_ms: u64) -> Self {
        self.config.initial_backoff_ms = initial_ms;
        self.config.max_backoff_ms = max_ms;
        self.config.jitter_ms = jitter_ms;
        self
    }

    /// Set the prompt passed to the generator on each retry
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Set the session context (correlation id and caller fields)
    pub fn context(mut self, context: SessionContext) -> Self {
        self.context = context;
        self
    }

    /// Supply the retry generator callback
    pub fn generator(mut self, generator: impl Generator + 'static) -> Self {
        self.generator = Some(Arc::new(generator));
        self
    }

    /// Write local records to the given path instead of the configured one
    pub fn local_log_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.local_log = Some(LocalLogStore::new(path.into()));
        self
    }

    /// Disable local and cloud logging entirely
    pub fn without_logging(mut self) -> Self {
        self.local_log = None;
        self.cloud = None;
        self
    }

    /// Ship records through the given cloud client
    pub fn cloud_client(mut self, client: CloudLogClient) -> Self {
        self.cloud = Some(Arc::new(client));
        self
    }

    /// Use a custom redactor for emitted records
    pub fn redactor(mut self, redactor: Redactor) -> Self {
        self.redactor = Arc::new(redactor);
        self
    }

    fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.config.retries,
            initial_backoff_ms: self.config.initial_backoff_ms,
            max_backoff_ms: self.config.max_backoff_ms,
            jitter_ms: self.config.jitter_ms,
        }
    }

    /// Validate raw output, returning only the normalized value
    pub async fn validate(
        &self,
        raw: impl Into<RawOutput>,
    ) -> Result<Value, ValidationError> {
        self.validate_with_report(raw).await.map(|report| report.value)
    }

    /// Validate raw output, returning the full session report
    pub async fn validate_with_report(
        &self,
        raw: impl Into<RawOutput>,
    ) -> Result<ValidationReport, ValidationError> {
        let mut context = self.context.clone();
        let correlation_id = context.correlation_id();
        let schema_json = self.schema.to_json();
        let policy = self.policy();
        let max_attempts = policy.retries + 1;
        let started = Instant::now();

        let mut state = SessionState::Attempting;
        let mut attempt: u32 = 1;
        let mut log_errors: Vec<LogError> = Vec::new();
        tracing::debug!(
            state = %state,
            correlation_id = %correlation_id,
            mode = %self.mode,
            max_attempts = max_attempts,
            "Validation session started"
        );

        let mut current: RawOutput = raw.into();
        let mut outcome = self.check_attempt(&current);

        loop {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            self.emit_record(
                &correlation_id,
                &context,
                &current,
                &outcome,
                attempt,
                elapsed_ms,
                &schema_json,
                &mut log_errors,
            );

            match outcome {
                Ok(value) => {
                    state = SessionState::Succeeded;
                    tracing::debug!(
                        state = %state,
                        correlation_id = %correlation_id,
                        attempts = attempt,
                        "Validation session finished"
                    );
                    return Ok(ValidationReport {
                        value,
                        attempts: attempt,
                        correlation_id,
                        elapsed_ms,
                        log_errors,
                    });
                }
                Err(errors) => {
                    let generator = match &self.generator {
                        Some(generator) if attempt < max_attempts => generator,
                        _ => {
                            state = SessionState::Exhausted;
                            tracing::debug!(
                                state = %state,
                                correlation_id = %correlation_id,
                                attempts = attempt,
                                errors = errors.len(),
                                "Validation session finished"
                            );
                            return Err(ValidationError::Exhausted {
                                errors,
                                attempts: attempt,
                                correlation_id,
                                elapsed_ms,
                            });
                        }
                    };

                    state = SessionState::Retrying;
                    let delay = policy.delay_for(attempt);
                    tracing::debug!(
                        state = %state,
                        correlation_id = %correlation_id,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Backing off before retry"
                    );
                    sleep(delay).await;

                    attempt += 1;
                    state = SessionState::Attempting;
                    tracing::debug!(
                        state = %state,
                        correlation_id = %correlation_id,
                        attempt = attempt,
                        "Requesting fresh output"
                    );

                    let budget = Duration::from_secs(self.config.timeout_s);
                    outcome = match timeout(budget, generator.generate(&self.prompt, &context))
                        .await
                    {
                        Ok(Ok(output)) => {
                            current = output;
                            self.check_attempt(&current)
                        }
                        Ok(Err(e)) => {
                            current = RawOutput::Text(String::new());
                            Err(vec![FieldError::new(ROOT_PATH, ReasonCode::GeneratorError)
                                .with_detail(e.to_string())])
                        }
                        Err(_) => {
                            current = RawOutput::Text(String::new());
                            Err(vec![FieldError::new(ROOT_PATH, ReasonCode::Timeout)
                                .with_detail(format!(
                                    "generator did not return within {}s",
                                    self.config.timeout_s
                                ))])
                        }
                    };
                }
            }
        }
    }

    /// One attempt: parse if textual, enforce limits, validate structure
    fn check_attempt(&self, raw: &RawOutput) -> Outcome {
        let value = match raw {
            RawOutput::Structured(value) => value.clone(),
            RawOutput::Text(text) => parse_candidate(text, &self.schema, self.mode)?,
        };
        validate_structure(&value, &self.schema, self.mode, &self.config.limits)
    }

    /// Emit one log record for an attempt. Failures are collected and
    /// warned about, never propagated as validation failures.
    #[allow(clippy::too_many_arguments)]
    fn emit_record(
        &self,
        correlation_id: &str,
        context: &SessionContext,
        current: &RawOutput,
        outcome: &Outcome,
        attempt: u32,
        elapsed_ms: u64,
        schema_json: &str,
        log_errors: &mut Vec<LogError>,
    ) {
        if self.local_log.is_none() && self.cloud.is_none() {
            return;
        }

        let sample = current.sample();
        let record = LogRecord {
            ts: chrono::Utc::now(),
            correlation_id: correlation_id.to_string(),
            valid: outcome.is_ok(),
            errors: outcome.as_ref().err().cloned().unwrap_or_default(),
            attempts: attempt,
            duration_ms: elapsed_ms,
            mode: self.mode,
            limits: self.config.limits,
            context: context.fields().clone(),
            inputs_hash: inputs_hash(&sample, schema_json),
            output_sample: sample,
        };
        // nothing leaves the process unredacted
        let record = record.redacted(&self.redactor);

        if let Some(store) = &self.local_log {
            if let Err(e) = store.append(&record) {
                tracing::warn!(
                    correlation_id = %correlation_id,
                    error = %e,
                    "Failed to append local log record"
                );
                log_errors.push(e);
            }
        }

        if let Some(cloud) = &self.cloud {
            let cloud = Arc::clone(cloud);
            tokio::spawn(async move {
                if let Err(e) = cloud.ship(&record).await {
                    tracing::warn!(
                        correlation_id = %record.correlation_id,
                        error = %e,
                        "Failed to ship log record to cloud sink"
                    );
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn schema(value: Value) -> Schema {
        Schema::from_value(&value).unwrap()
    }

    fn quiet(validator: Validator) -> Validator {
        validator.without_logging().backoff(1, 1, 0)
    }

    struct CountingGenerator {
        calls: Arc<AtomicU32>,
        output: RawOutput,
    }

    impl Generator for CountingGenerator {
        fn generate(&self, _prompt: &str, _context: &SessionContext) -> GeneratorFuture {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let output = self.output.clone();
            Box::pin(async move { Ok(output) })
        }
    }

    #[tokio::test]
    async fn test_valid_output_succeeds_first_attempt() {
        let validator = quiet(Validator::new(schema(json!({"age": "integer"}))));
        let report = validator
            .validate_with_report(json!({"age": 30}))
            .await
            .unwrap();
        assert_eq!(report.value, json!({"age": 30}));
        assert_eq!(report.attempts, 1);
    }

    #[tokio::test]
    async fn test_no_generator_fails_after_one_attempt() {
        let validator = quiet(Validator::new(schema(json!({"age": "integer"}))));
        let err = validator.validate(json!({"age": "thirty"})).await.unwrap_err();
        assert_eq!(err.attempts(), 1);
        assert_eq!(err.errors()[0].path, "age");
    }

    #[tokio::test]
    async fn test_retry_accounting_exact() {
        let calls = Arc::new(AtomicU32::new(0));
        let generator = CountingGenerator {
            calls: Arc::clone(&calls),
            output: RawOutput::Structured(json!({"age": "still wrong"})),
        };

        let validator = quiet(Validator::new(schema(json!({"age": "integer"}))))
            .retries(3)
            .generator(generator);

        let err = validator.validate(json!({"age": "wrong"})).await.unwrap_err();
        // R retries after the initial attempt, terminal attempt count R+1
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(err.attempts(), 4);
    }

    #[tokio::test]
    async fn test_retry_recovers_with_fresh_output() {
        let calls = Arc::new(AtomicU32::new(0));
        let generator = CountingGenerator {
            calls: Arc::clone(&calls),
            output: RawOutput::Structured(json!({"age": 31})),
        };

        let validator = quiet(Validator::new(schema(json!({"age": "integer"}))))
            .retries(2)
            .generator(generator);

        let report = validator
            .validate_with_report(json!({"age": "wrong"}))
            .await
            .unwrap();
        assert_eq!(report.value, json!({"age": 31}));
        assert_eq!(report.attempts, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_textual_output_roundtrip() {
        let validator = quiet(Validator::new(schema(json!({"age": "integer"}))))
            .mode(ValidationMode::Coerce);
        let value = validator.validate(r#"{"age": "30"}"#).await.unwrap();
        assert_eq!(value, json!({"age": 30}));
    }

    #[tokio::test(start_paused = true)]
    async fn test_generator_timeout_consumes_attempt() {
        struct StalledGenerator;
        impl Generator for StalledGenerator {
            fn generate(&self, _prompt: &str, _context: &SessionContext) -> GeneratorFuture {
                Box::pin(async {
                    sleep(Duration::from_secs(3_600)).await;
                    Ok(RawOutput::Text("{}".to_string()))
                })
            }
        }

        let validator = quiet(Validator::new(schema(json!({"age": "integer"}))))
            .retries(1)
            .timeout_s(1)
            .generator(StalledGenerator);

        let err = validator.validate(json!({"age": "wrong"})).await.unwrap_err();
        assert_eq!(err.attempts(), 2);
        assert_eq!(err.errors()[0].reason, ReasonCode::Timeout);
        assert_eq!(err.errors()[0].path, "root");
    }

    #[tokio::test]
    async fn test_generator_error_consumes_attempt() {
        struct FailingGenerator;
        impl Generator for FailingGenerator {
            fn generate(&self, _prompt: &str, _context: &SessionContext) -> GeneratorFuture {
                Box::pin(async { Err(GeneratorError("upstream unavailable".to_string())) })
            }
        }

        let validator = quiet(Validator::new(schema(json!({"age": "integer"}))))
            .retries(1)
            .generator(FailingGenerator);

        let err = validator.validate(json!({"age": "wrong"})).await.unwrap_err();
        assert_eq!(err.attempts(), 2);
        assert_eq!(err.errors()[0].reason, ReasonCode::GeneratorError);
    }

    #[tokio::test]
    async fn test_correlation_id_stable_across_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("validations.jsonl");

        let generator = CountingGenerator {
            calls: Arc::new(AtomicU32::new(0)),
            output: RawOutput::Structured(json!({"age": "nope"})),
        };

        let validator = Validator::new(schema(json!({"age": "integer"})))
            .backoff(1, 1, 0)
            .retries(2)
            .generator(generator)
            .context(SessionContext::new().with_correlation_id("corr-stable"))
            .local_log_path(&log_path);

        let err = validator.validate(json!({"age": "wrong"})).await.unwrap_err();
        assert_eq!(err.correlation_id(), "corr-stable");

        let records = LocalLogStore::new(&log_path).recent(10).unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.correlation_id == "corr-stable"));
        let attempts: Vec<u32> = records.iter().map(|r| r.attempts).collect();
        assert_eq!(attempts, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_log_failure_does_not_affect_result() {
        // a directory path cannot be appended to, so every write fails
        let dir = tempfile::tempdir().unwrap();
        let validator = Validator::new(schema(json!({"age": "integer"})))
            .backoff(1, 1, 0)
            .local_log_path(dir.path());

        let report = validator
            .validate_with_report(json!({"age": 30}))
            .await
            .unwrap();
        assert_eq!(report.value, json!({"age": 30}));
        assert!(!report.log_errors.is_empty());
    }

    #[tokio::test]
    async fn test_generator_fn_wrapper() {
        let generator = generator_fn(|_prompt: &str, _context: &SessionContext| {
            Box::pin(async { Ok(RawOutput::Structured(json!({"age": 7}))) }) as GeneratorFuture
        });

        let validator = quiet(Validator::new(schema(json!({"age": "integer"}))))
            .retries(1)
            .generator(generator);

        let value = validator.validate(json!({"age": "bad"})).await.unwrap();
        assert_eq!(value, json!({"age": 7}));
    }

    #[test]
    fn test_backoff_schedule_doubles_and_caps() {
        let policy = RetryPolicy {
            retries: 5,
            initial_backoff_ms: 100,
            max_backoff_ms: 500,
            jitter_ms: 0,
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(4), Duration::from_millis(500));
        assert_eq!(policy.delay_for(10), Duration::from_millis(500));
    }

    #[test]
    fn test_backoff_jitter_is_bounded() {
        let policy = RetryPolicy {
            retries: 1,
            initial_backoff_ms: 100,
            max_backoff_ms: 500,
            jitter_ms: 50,
        };
        for _ in 0..50 {
            let delay = policy.delay_for(1).as_millis() as u64;
            assert!((100..=150).contains(&delay));
        }
    }

    #[test]
    fn test_session_state_display() {
        assert_eq!(SessionState::Attempting.to_string(), "attempting");
        assert_eq!(SessionState::Exhausted.to_string(), "exhausted");
    }
}
