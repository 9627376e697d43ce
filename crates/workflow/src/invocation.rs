//! The tool invocation unit.
//!
//! Runs one tool call in isolation: parse → resolve → validate → execute,
//! with per-attempt timeouts and the tool retry policy. Nothing here ever
//! fails the execution; every problem becomes a captured [`ToolResult`].

use agentflow_core::error::ToolError;
use agentflow_core::tool::{ToolCallRequest, ToolRegistry, ToolResult, ToolSet};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::retry::{RetryFailure, RetryPolicy, run_with_retry};

/// Executes tool calls against a shared [`ToolRegistry`].
#[derive(Clone)]
pub struct ToolInvoker {
    registry: Arc<ToolRegistry>,
    policy: RetryPolicy,
    attempt_timeout: Duration,
}

impl ToolInvoker {
    pub fn new(registry: Arc<ToolRegistry>, policy: RetryPolicy, attempt_timeout: Duration) -> Self {
        Self {
            registry,
            policy,
            attempt_timeout,
        }
    }

    /// Invoke `call`, resolving its tool against `tools` (the agent's tool set).
    pub async fn invoke(
        &self,
        unit: &str,
        call: ToolCallRequest,
        tools: &ToolSet,
        cancel: &CancellationToken,
    ) -> ToolResult {
        match self.try_invoke(unit, &call, tools, cancel).await {
            Ok(output) => {
                debug!(unit, tool = %call.tool_name, "Tool call succeeded");
                ToolResult::success(call.call_id, output)
            }
            Err(e) => {
                warn!(unit, tool = %call.tool_name, error = %e, "Tool call failed, result captured");
                ToolResult::captured(call.call_id, &call.tool_name, &e)
            }
        }
    }

    async fn try_invoke(
        &self,
        unit: &str,
        call: &ToolCallRequest,
        tools: &ToolSet,
        cancel: &CancellationToken,
    ) -> Result<Value, ToolError> {
        let arguments = parse_arguments(&call.tool_name, &call.raw_arguments)?;

        let definition = tools
            .get(&call.tool_name)
            .ok_or_else(|| ToolError::NotFound(call.tool_name.clone()))?;
        definition.validate_arguments(&arguments)?;

        let tool = self
            .registry
            .get(&call.tool_name)
            .ok_or_else(|| ToolError::NotImplemented(call.tool_name.clone()))?;

        let timeout = self.attempt_timeout;
        let result = run_with_retry(&self.policy, cancel, unit, |_| {
            let tool = Arc::clone(&tool);
            let arguments = arguments.clone();
            let tool_name = call.tool_name.clone();
            async move {
                match tokio::time::timeout(timeout, tool.execute(arguments)).await {
                    Ok(result) => result,
                    Err(_) => Err(ToolError::Timeout {
                        tool_name,
                        timeout_ms: timeout.as_millis() as u64,
                    }),
                }
            }
        })
        .await;

        result.map_err(|failure| match failure {
            RetryFailure::Exhausted { error, .. } | RetryFailure::Fatal { error, .. } => error,
            RetryFailure::Cancelled { .. } => ToolError::Unavailable {
                tool_name: call.tool_name.clone(),
                reason: "execution cancelled".into(),
            },
        })
    }
}

/// Parse raw model-supplied arguments. An empty string means no arguments.
pub fn parse_arguments(tool_name: &str, raw: &str) -> Result<Map<String, Value>, ToolError> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    let malformed = |reason: String| ToolError::MalformedArguments {
        tool_name: tool_name.to_string(),
        reason,
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(malformed(format!(
            "arguments must be a JSON object, got {}",
            match other {
                Value::Null => "null",
                Value::Bool(_) => "a boolean",
                Value::Number(_) => "a number",
                Value::String(_) => "a string",
                Value::Array(_) => "an array",
                Value::Object(_) => "an object",
            }
        ))),
        Err(e) => Err(malformed(e.to_string())),
    }
}
