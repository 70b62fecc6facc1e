//! Configuration for validation sessions
//!
//! Resolves defaults, an optional TOML config file, and
//! `AGENT_VALIDATOR_*` environment variables into one immutable record.
//! Resolution happens once, up front; the validation engine itself never
//! reads process state.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::limits::Limits;
use crate::validate::ValidationMode;

/// Cloud log sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    /// Whether records are shipped to the cloud sink at all
    pub enabled: bool,
    /// Base URL of the sink
    pub endpoint: String,
    /// Bearer token for the sink
    pub api_key: Option<String>,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "https://api.agentvalidator.dev".to_string(),
            api_key: None,
            timeout_ms: 5_000,
        }
    }
}

/// Resolved configuration for validation and logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Size limits applied to every attempt
    pub limits: Limits,
    /// Retry budget after the initial attempt
    pub retries: u32,
    /// Per-attempt timeout for the generator callback, in seconds
    pub timeout_s: u64,
    /// Default validation mode
    pub mode: ValidationMode,
    /// First backoff delay in milliseconds
    pub initial_backoff_ms: u64,
    /// Backoff delay ceiling in milliseconds
    pub max_backoff_ms: u64,
    /// Upper bound of the random jitter added to each delay
    pub jitter_ms: u64,
    /// Path of the local JSONL log file
    pub log_path: PathBuf,
    /// Cloud sink settings
    pub cloud: CloudConfig,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            retries: 2,
            timeout_s: 20,
            mode: ValidationMode::Strict,
            initial_backoff_ms: 200,
            max_backoff_ms: 5_000,
            jitter_ms: 100,
            log_path: default_log_path(),
            cloud: CloudConfig::default(),
        }
    }
}

impl ValidatorConfig {
    /// Resolve configuration: defaults, then the config file (if any),
    /// then environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = default_config_path();
        let base = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        Ok(base.apply_env())
    }

    /// Read configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Write configuration to a TOML file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write(e.to_string()))?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Write(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::Write(e.to_string()))
    }

    /// Apply `AGENT_VALIDATOR_*` environment variable overrides
    pub fn apply_env(mut self) -> Self {
        self.limits.max_output_bytes =
            env_parse("AGENT_VALIDATOR_MAX_OUTPUT_BYTES", self.limits.max_output_bytes);
        self.limits.max_str_len = env_parse("AGENT_VALIDATOR_MAX_STR_LEN", self.limits.max_str_len);
        self.limits.max_list_len =
            env_parse("AGENT_VALIDATOR_MAX_LIST_LEN", self.limits.max_list_len);
        self.limits.max_dict_keys =
            env_parse("AGENT_VALIDATOR_MAX_DICT_KEYS", self.limits.max_dict_keys);
        self.retries = env_parse("AGENT_VALIDATOR_RETRIES", self.retries);
        self.timeout_s = env_parse("AGENT_VALIDATOR_TIMEOUT_S", self.timeout_s);
        self.mode = std::env::var("AGENT_VALIDATOR_MODE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(self.mode);
        self.cloud.enabled = env_parse("AGENT_VALIDATOR_LOG_TO_CLOUD", self.cloud.enabled);
        if let Ok(endpoint) = std::env::var("AGENT_VALIDATOR_ENDPOINT") {
            self.cloud.endpoint = endpoint;
        }
        if let Ok(key) = std::env::var("AGENT_VALIDATOR_API_KEY") {
            self.cloud.api_key = Some(key);
        }
        if let Ok(path) = std::env::var("AGENT_VALIDATOR_LOG_PATH") {
            self.log_path = PathBuf::from(path);
        }
        self
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Directory holding the config file and local logs
pub fn home_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("AGENT_VALIDATOR_HOME") {
        return PathBuf::from(dir);
    }
    std::env::var("HOME")
        .map(|home| PathBuf::from(home).join(".agent-validator"))
        .unwrap_or_else(|_| PathBuf::from(".agent-validator"))
}

/// Default location of the TOML config file
pub fn default_config_path() -> PathBuf {
    home_dir().join("config.toml")
}

/// Default location of the local JSONL log file
pub fn default_log_path() -> PathBuf {
    home_dir().join("validations.jsonl")
}
