//! Error types for the AgentFlow domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`Error`] is the top-level
//! type that unwinds to the orchestrator. [`Error::kind`] exposes a stable
//! classification so callers can tell a bad request from an upstream outage.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The top-level error type for all AgentFlow operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Request validation ---
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // --- Schema conversion ---
    #[error("Tool conversion error: {0}")]
    ToolConversion(#[from] ToolConversionError),

    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// A model-call unit gave up, either on a fatal error or after exhausting its retries.
    #[error("Model call {unit} failed after {attempts} attempt(s): {source}")]
    ModelCall {
        unit: String,
        attempts: u32,
        source: ProviderError,
    },

    /// A non-model unit (greeting, scheduling) failed.
    #[error("Unit {unit} failed: {reason}")]
    Unit { unit: String, reason: String },

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Execution control ---
    #[error("Execution cancelled")]
    Cancelled,

    #[error("Execution exceeded its deadline of {timeout_secs}s")]
    ExecutionTimeout { timeout_secs: u64 },

    #[error("Non-deterministic replay of {unit}: {reason}")]
    NonDeterminism { unit: String, reason: String },

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse error classification surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    ToolConversion,
    Provider(ProviderErrorKind),
    Tool,
    Cancelled,
    Timeout,
    NonDeterminism,
    Config,
    Internal,
}

impl Error {
    /// Classify this error for the caller.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Error::ToolConversion(_) => ErrorKind::ToolConversion,
            Error::Provider(e) => ErrorKind::Provider(e.kind()),
            Error::ModelCall { source, .. } => ErrorKind::Provider(source.kind()),
            Error::Unit { .. } => ErrorKind::Internal,
            Error::Tool(_) => ErrorKind::Tool,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::ExecutionTimeout { .. } => ErrorKind::Timeout,
            Error::NonDeterminism { .. } => ErrorKind::NonDeterminism,
            Error::Config { .. } => ErrorKind::Config,
            Error::Serialization(_) | Error::Internal(_) => ErrorKind::Internal,
        }
    }
}

// --- Bounded context errors ---

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Quota exhausted: {0}")]
    QuotaExceeded(String),

    #[error("Rate limited by provider{}", retry_hint(.retry_after_secs))]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Upstream server error (status: {status_code}): {message}")]
    ServerError { status_code: u16, message: String },

    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Invalid response from provider: {0}")]
    InvalidResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unknown provider failure: {0}")]
    Unknown(String),
}

fn retry_hint(retry_after_secs: &Option<u64>) -> String {
    match retry_after_secs {
        Some(secs) => format!(", retry after {secs}s"),
        None => String::new(),
    }
}

/// The provider failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    Authentication,
    Quota,
    RateLimit,
    ServerError,
    Network,
    NotConfigured,
    Unknown,
}

impl ProviderError {
    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            ProviderError::AuthenticationFailed(_) => ProviderErrorKind::Authentication,
            ProviderError::QuotaExceeded(_) => ProviderErrorKind::Quota,
            ProviderError::RateLimited { .. } => ProviderErrorKind::RateLimit,
            ProviderError::ServerError { .. } => ProviderErrorKind::ServerError,
            ProviderError::Network(_) | ProviderError::Timeout(_) => ProviderErrorKind::Network,
            ProviderError::NotConfigured(_) => ProviderErrorKind::NotConfigured,
            ProviderError::ApiError { .. }
            | ProviderError::InvalidResponse(_)
            | ProviderError::Unknown(_) => ProviderErrorKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool has no registered implementation: {0}")]
    NotImplemented(String),

    #[error("Malformed arguments for {tool_name}: {reason}")]
    MalformedArguments { tool_name: String, reason: String },

    #[error("Invalid argument '{field}' for {tool_name}: {reason}")]
    InvalidArguments {
        tool_name: String,
        field: String,
        reason: String,
    },

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool temporarily unavailable: {tool_name}: {reason}")]
    Unavailable { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_ms}ms")]
    Timeout { tool_name: String, timeout_ms: u64 },

    #[error("Duplicate tool call id '{call_id}' for {tool_name}; only the first call with this id runs")]
    DuplicateCallId { tool_name: String, call_id: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToolConversionError {
    #[error("Tool name must not be empty")]
    EmptyToolName,

    #[error("Tool '{tool}' has an empty description")]
    EmptyDescription { tool: String },

    #[error("Tool '{tool}' declares an input with an empty name")]
    EmptyInputName { tool: String },

    #[error("Unrecognized input type '{type_name}'")]
    UnrecognizedType { type_name: String },

    #[error("Duplicate tool name '{0}'")]
    DuplicateTool(String),

    #[error("Tool '{tool}' declares input '{input}' more than once")]
    DuplicateInput { tool: String, input: String },

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 400,
            message: "Bad request".into(),
        });
        assert!(err.to_string().contains("400"));
        assert!(err.to_string().contains("Bad request"));
    }

    #[test]
    fn rate_limit_display_includes_hint_when_present() {
        let with = ProviderError::RateLimited {
            retry_after_secs: Some(7),
        };
        let without = ProviderError::RateLimited {
            retry_after_secs: None,
        };
        assert!(with.to_string().contains("retry after 7s"));
        assert_eq!(without.to_string(), "Rate limited by provider");
    }

    #[test]
    fn tool_error_names_offending_field() {
        let err = Error::Tool(ToolError::InvalidArguments {
            tool_name: "calculate_pension".into(),
            field: "current_salary".into(),
            reason: "expected float".into(),
        });
        assert!(err.to_string().contains("current_salary"));
        assert!(err.to_string().contains("calculate_pension"));
    }

    #[test]
    fn model_call_kind_keeps_provider_classification() {
        let err = Error::ModelCall {
            unit: "model#1".into(),
            attempts: 3,
            source: ProviderError::RateLimited {
                retry_after_secs: None,
            },
        };
        assert_eq!(err.kind(), ErrorKind::Provider(ProviderErrorKind::RateLimit));
        assert!(err.to_string().contains("3 attempt"));
    }

    #[test]
    fn timeouts_classify_as_network() {
        assert_eq!(
            ProviderError::Timeout("slow".into()).kind(),
            ProviderErrorKind::Network
        );
        assert_eq!(
            ProviderError::InvalidResponse("garbage".into()).kind(),
            ProviderErrorKind::Unknown
        );
    }

    #[test]
    fn request_errors_are_distinguishable_from_outages() {
        let bad = Error::InvalidRequest("no agents".into());
        let outage = Error::Provider(ProviderError::ServerError {
            status_code: 503,
            message: "unavailable".into(),
        });
        assert_eq!(bad.kind(), ErrorKind::InvalidRequest);
        assert_eq!(
            outage.kind(),
            ErrorKind::Provider(ProviderErrorKind::ServerError)
        );
    }
}
