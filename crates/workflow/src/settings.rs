//! Runtime settings for executions, derived from [`AppConfig`].

use agentflow_config::{AppConfig, RetryPolicyConfig};
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Retry policy per unit family.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicies {
    pub model: RetryPolicy,
    /// Short units such as the greeting
    pub quick: RetryPolicy,
    pub tool: RetryPolicy,
}

impl Default for RetryPolicies {
    fn default() -> Self {
        Self {
            model: RetryPolicy::new(Duration::from_secs(2), Duration::from_secs(30), 3),
            quick: RetryPolicy::new(Duration::from_secs(1), Duration::from_secs(10), 3),
            tool: RetryPolicy::new(Duration::from_millis(500), Duration::from_secs(5), 3),
        }
    }
}

/// Per-unit timeouts. Start-to-close bounds one attempt; schedule-to-start
/// bounds the wait for a worker slot.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitTimeouts {
    pub model_start_to_close: Duration,
    pub schedule_to_start: Duration,
    pub quick_start_to_close: Duration,
    pub tool_start_to_close: Duration,
}

impl Default for UnitTimeouts {
    fn default() -> Self {
        Self {
            model_start_to_close: Duration::from_secs(60),
            schedule_to_start: Duration::from_secs(30),
            quick_start_to_close: Duration::from_secs(10),
            tool_start_to_close: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSettings {
    pub max_iterations: u32,
    pub execution_timeout: Duration,
    pub max_concurrent_units: usize,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub retry: RetryPolicies,
    pub timeouts: UnitTimeouts,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            execution_timeout: Duration::from_secs(300),
            max_concurrent_units: 8,
            temperature: None,
            max_tokens: None,
            retry: RetryPolicies::default(),
            timeouts: UnitTimeouts::default(),
        }
    }
}

impl WorkflowSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_iterations: config.execution.max_iterations,
            execution_timeout: Duration::from_secs(config.execution.execution_timeout_secs),
            max_concurrent_units: config.worker.max_concurrent_units,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            retry: RetryPolicies {
                model: (&config.retry.model).into(),
                quick: (&config.retry.quick).into(),
                tool: (&config.retry.tool).into(),
            },
            timeouts: UnitTimeouts {
                model_start_to_close: Duration::from_secs(config.timeouts.model_start_to_close_secs),
                schedule_to_start: Duration::from_secs(config.timeouts.schedule_to_start_secs),
                quick_start_to_close: Duration::from_secs(config.timeouts.quick_start_to_close_secs),
                tool_start_to_close: Duration::from_secs(config.timeouts.tool_start_to_close_secs),
            },
        }
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }
}

impl From<&RetryPolicyConfig> for RetryPolicy {
    fn from(config: &RetryPolicyConfig) -> Self {
        RetryPolicy {
            initial_interval: Duration::from_millis(config.initial_interval_ms),
            max_interval: Duration::from_millis(config.max_interval_ms),
            max_attempts: config.max_attempts,
            backoff_coefficient: config.backoff_coefficient,
        }
    }
}
