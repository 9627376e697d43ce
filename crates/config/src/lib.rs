//! Configuration loading, validation, and management for AgentFlow.
//!
//! Loads configuration from `~/.agentflow/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.agentflow/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key used when a provider section has none of its own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Sampling temperature sent with every model call (provider default if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Max tokens per model response (provider default if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Provider-specific configurations, keyed by lowercase provider name
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    #[serde(default)]
    pub execution: ExecutionConfig,

    #[serde(default)]
    pub worker: WorkerConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Additional agents, on top of the built-in ones
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agents: Vec<AgentConfig>,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("providers", &self.providers)
            .field("execution", &self.execution)
            .field("worker", &self.worker)
            .field("retry", &self.retry)
            .field("timeouts", &self.timeouts)
            .field("agents", &self.agents)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Tool iterations allowed before the loop gives up with a diagnostic
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Wall-clock bound on one whole execution
    #[serde(default = "default_execution_timeout")]
    pub execution_timeout_secs: u64,
}

fn default_max_iterations() -> u32 {
    5
}
fn default_execution_timeout() -> u64 {
    300
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            execution_timeout_secs: default_execution_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Units (model or tool calls) allowed to run at once
    #[serde(default = "default_max_concurrent_units")]
    pub max_concurrent_units: usize,
}

fn default_max_concurrent_units() -> usize {
    8
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_units: default_max_concurrent_units(),
        }
    }
}

/// One retry policy, in config-file units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicyConfig {
    pub initial_interval_ms: u64,
    pub max_interval_ms: u64,
    pub max_attempts: u32,
    #[serde(default = "default_backoff_coefficient")]
    pub backoff_coefficient: f64,
}

fn default_backoff_coefficient() -> f64 {
    2.0
}

impl RetryPolicyConfig {
    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::ValidationError(format!(
                "retry.{name}.max_attempts must be at least 1"
            )));
        }
        if self.initial_interval_ms > self.max_interval_ms {
            return Err(ConfigError::ValidationError(format!(
                "retry.{name}.initial_interval_ms must not exceed max_interval_ms"
            )));
        }
        if !(self.backoff_coefficient >= 1.0) {
            return Err(ConfigError::ValidationError(format!(
                "retry.{name}.backoff_coefficient must be >= 1.0"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Model calls
    #[serde(default = "default_model_retry")]
    pub model: RetryPolicyConfig,

    /// The acknowledgment step
    #[serde(default = "default_quick_retry")]
    pub quick: RetryPolicyConfig,

    /// Tool calls
    #[serde(default = "default_tool_retry")]
    pub tool: RetryPolicyConfig,
}

fn default_model_retry() -> RetryPolicyConfig {
    RetryPolicyConfig {
        initial_interval_ms: 2_000,
        max_interval_ms: 30_000,
        max_attempts: 3,
        backoff_coefficient: 2.0,
    }
}
fn default_quick_retry() -> RetryPolicyConfig {
    RetryPolicyConfig {
        initial_interval_ms: 1_000,
        max_interval_ms: 10_000,
        max_attempts: 3,
        backoff_coefficient: 2.0,
    }
}
fn default_tool_retry() -> RetryPolicyConfig {
    RetryPolicyConfig {
        initial_interval_ms: 500,
        max_interval_ms: 5_000,
        max_attempts: 3,
        backoff_coefficient: 2.0,
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            model: default_model_retry(),
            quick: default_quick_retry(),
            tool: default_tool_retry(),
        }
    }
}

/// Per-unit timeouts, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_model_start_to_close")]
    pub model_start_to_close_secs: u64,

    /// How long a unit may wait for a free worker slot
    #[serde(default = "default_schedule_to_start")]
    pub schedule_to_start_secs: u64,

    #[serde(default = "default_short_timeout")]
    pub quick_start_to_close_secs: u64,

    #[serde(default = "default_short_timeout")]
    pub tool_start_to_close_secs: u64,
}

fn default_model_start_to_close() -> u64 {
    60
}
fn default_schedule_to_start() -> u64 {
    30
}
fn default_short_timeout() -> u64 {
    10
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            model_start_to_close_secs: default_model_start_to_close(),
            schedule_to_start_secs: default_schedule_to_start(),
            quick_start_to_close_secs: default_short_timeout(),
            tool_start_to_close_secs: default_short_timeout(),
        }
    }
}

/// An agent declared in the config file.
///
/// Tools are referenced by name and resolved against the built-in registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Lookup key used on the command line (e.g. "benefits")
    pub key: String,

    pub name: String,

    #[serde(default)]
    pub system_prompt: String,

    #[serde(default)]
    pub tools: Vec<String>,

    #[serde(default = "default_agent_provider")]
    pub provider: String,

    pub model: String,
}

fn default_agent_provider() -> String {
    "OPENAI".into()
}

impl AppConfig {
    /// Load configuration from the default path (~/.agentflow/config.toml).
    ///
    /// Environment overrides, highest priority first:
    /// - `AGENTFLOW_API_KEY`, then `OPENAI_API_KEY` (only when no key is configured)
    /// - `AGENTFLOW_MAX_ITERATIONS`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.api_key.is_none() {
            self.api_key = lookup("AGENTFLOW_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }

        if let Some(raw) = lookup("AGENTFLOW_MAX_ITERATIONS") {
            self.execution.max_iterations = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "AGENTFLOW_MAX_ITERATIONS must be a positive integer, got '{raw}'"
                ))
            })?;
        }

        self.validate()
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".agentflow")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(t) = self.temperature
            && !(0.0..=2.0).contains(&t)
        {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.execution.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "execution.max_iterations must be at least 1".into(),
            ));
        }
        if self.execution.execution_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "execution.execution_timeout_secs must be > 0".into(),
            ));
        }
        if self.worker.max_concurrent_units == 0 {
            return Err(ConfigError::ValidationError(
                "worker.max_concurrent_units must be at least 1".into(),
            ));
        }

        self.retry.model.validate("model")?;
        self.retry.quick.validate("quick")?;
        self.retry.tool.validate("tool")?;

        let t = &self.timeouts;
        if [
            t.model_start_to_close_secs,
            t.schedule_to_start_secs,
            t.quick_start_to_close_secs,
            t.tool_start_to_close_secs,
        ]
        .contains(&0)
        {
            return Err(ConfigError::ValidationError(
                "timeouts must all be > 0".into(),
            ));
        }

        let mut keys = HashSet::new();
        for agent in &self.agents {
            if agent.key.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "agents[].key must not be empty".into(),
                ));
            }
            if !keys.insert(agent.key.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate agent key '{}'",
                    agent.key
                )));
            }
        }

        Ok(())
    }

    /// The API key for a provider: its own section first, then the global key.
    pub fn api_key_for(&self, provider: &str) -> Option<&str> {
        self.providers
            .get(&provider.to_ascii_lowercase())
            .and_then(|p| p.api_key.as_deref())
            .or(self.api_key.as_deref())
    }

    /// The configured base URL for a provider, if any.
    pub fn api_url_for(&self, provider: &str) -> Option<&str> {
        self.providers
            .get(&provider.to_ascii_lowercase())
            .and_then(|p| p.api_url.as_deref())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            temperature: None,
            max_tokens: None,
            providers: HashMap::new(),
            execution: ExecutionConfig::default(),
            worker: WorkerConfig::default(),
            retry: RetryConfig::default(),
            timeouts: TimeoutConfig::default(),
            agents: vec![],
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
