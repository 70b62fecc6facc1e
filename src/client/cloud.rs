//! Cloud log sink HTTP client
//!
//! Ships validation log records to a remote collector over an
//! authenticated channel. Delivery is best-effort: transient failures
//! are retried with exponential backoff, permanent rejections are not,
//! and nothing here ever affects the validation result itself.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::error::LogError;
use crate::logging::LogRecord;

/// Configuration for the cloud log client
#[derive(Debug, Clone)]
pub struct CloudLogClientConfig {
    /// Base URL of the collector
    pub base_url: String,
    /// Bearer token presented on every request
    pub api_key: Option<String>,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    /// Maximum retry attempts for transient failures
    pub max_retries: u32,
    /// Initial backoff delay in milliseconds
    pub initial_backoff_ms: u64,
    /// Maximum backoff delay in milliseconds
    pub max_backoff_ms: u64,
    /// Backoff multiplier
    pub backoff_multiplier: f64,
}

impl Default for CloudLogClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.agentvalidator.dev".to_string(),
            api_key: None,
            timeout_ms: 5_000,
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 5_000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Collector acknowledgement for a shipped record
#[derive(Debug, Deserialize, Serialize)]
pub struct ShipResponse {
    /// Whether the collector accepted the record
    pub accepted: bool,

    /// Record id assigned by the collector
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,

    /// Error message if rejected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// HTTP client for the cloud log collector
pub struct CloudLogClient {
    client: Client,
    config: CloudLogClientConfig,
}

impl CloudLogClient {
    /// Create a client with default retry settings
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let config = CloudLogClientConfig {
            base_url: base_url.into(),
            api_key,
            ..Default::default()
        };
        Self::with_config(config)
    }

    /// Create a client with custom configuration
    pub fn with_config(config: CloudLogClientConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    /// Ship one record with retry on transient failures
    pub async fn ship(&self, record: &LogRecord) -> Result<ShipResponse, LogError> {
        let url = format!("{}/api/v1/validations", self.config.base_url);

        let mut last_error = None;
        let mut backoff_ms = self.config.initial_backoff_ms;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tracing::debug!(
                    attempt = attempt,
                    backoff_ms = backoff_ms,
                    correlation_id = %record.correlation_id,
                    "Retrying log record shipment"
                );
                sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms = (backoff_ms as f64 * self.config.backoff_multiplier) as u64;
                backoff_ms = backoff_ms.min(self.config.max_backoff_ms);
            }

            match self.send_record(&url, record).await {
                Ok(response) => {
                    tracing::debug!(
                        correlation_id = %record.correlation_id,
                        "Shipped validation log record"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt,
                        error = %e,
                        correlation_id = %record.correlation_id,
                        "Failed to ship validation log record"
                    );
                    let permanent = is_permanent_error(&e);
                    last_error = Some(e);
                    if permanent {
                        break;
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| LogError::Http("Unknown error during record shipment".to_string())))
    }

    async fn send_record(&self, url: &str, record: &LogRecord) -> Result<ShipResponse, LogError> {
        let mut request = self
            .client
            .post(url)
            .json(record)
            .header("Content-Type", "application/json")
            .header("X-Correlation-Id", &record.correlation_id);

        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LogError::Http(e.to_string()))?;

        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| LogError::Http(format!("Failed to parse response: {}", e)))
        } else if status == StatusCode::BAD_REQUEST {
            let error_text = response.text().await.unwrap_or_default();
            Err(LogError::Rejected(format!("Bad request: {}", error_text)))
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Err(LogError::Rejected(format!(
                "Authentication failed: {}",
                status
            )))
        } else if status.is_server_error() {
            Err(LogError::Http(format!("Server error: {}", status)))
        } else {
            Err(LogError::Http(format!("Unexpected status: {}", status)))
        }
    }

    /// The collector base URL
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// The maximum retry count
    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }
}

/// Determine if an error is permanent (should not retry)
fn is_permanent_error(error: &LogError) -> bool {
    match error {
        LogError::Rejected(_) => true,
        LogError::Serialization(_) => true,
        _ => false,
    }
}

/// Builder for [`CloudLogClient`]
pub struct CloudLogClientBuilder {
    config: CloudLogClientConfig,
}

impl CloudLogClientBuilder {
    /// Create a builder with default configuration
    pub fn new() -> Self {
        Self {
            config: CloudLogClientConfig::default(),
        }
    }

    /// Set the collector base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the bearer token
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    /// Set the request timeout
    pub fn timeout_ms(mut self, timeout: u64) -> Self {
        self.config.timeout_ms = timeout;
        self
    }

    /// Set the maximum retry attempts
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set the initial backoff delay
    pub fn initial_backoff_ms(mut self, backoff: u64) -> Self {
        self.config.initial_backoff_ms = backoff;
        self
    }

    /// Build the client
    pub fn build(self) -> CloudLogClient {
        CloudLogClient::with_config(self.config)
    }
}

impl Default for CloudLogClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
