//! The conversation loop implementation.

use agentflow_core::agent::{Completion, ProviderKind};
use agentflow_core::error::{Error, Result, ToolError};
use agentflow_core::message::Message;
use agentflow_core::provider::{ProviderFunctionSpec, ProviderRequest};
use agentflow_core::tool::{ToolResult, ToolSet};
use agentflow_core::unit::{UnitExecutor, UnitId};
use futures::future::{Either, join_all, ready};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::state::{ExecutionState, LoopStatus};

/// Everything one run of the loop needs, fixed before the first model call.
#[derive(Debug, Clone)]
pub struct LoopSpec {
    pub provider: ProviderKind,
    pub model: String,
    pub system_prompt: String,
    pub user_text: String,
    pub file_urls: Vec<String>,
    /// The agent's tool set; tool calls are resolved against this and nothing else
    pub tools: ToolSet,
    pub max_iterations: u32,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// How a run ended, plus the state it ended in.
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    pub result_text: String,
    pub completion: Completion,
    pub state: ExecutionState,
}

/// Drives model calls and tool calls turn by turn.
///
/// The loop never talks to a provider or a tool directly; every effect is a
/// unit handed to the [`UnitExecutor`].
pub struct ConversationLoop<'a> {
    executor: &'a dyn UnitExecutor,
}

impl<'a> ConversationLoop<'a> {
    pub fn new(executor: &'a dyn UnitExecutor) -> Self {
        Self { executor }
    }

    /// Run the conversation to a final answer or to the iteration limit.
    pub async fn run(&self, spec: LoopSpec) -> Result<LoopOutcome> {
        if spec.max_iterations == 0 {
            return Err(Error::InvalidRequest(
                "max_iterations must be at least 1".into(),
            ));
        }

        // Converted once; every model call sees the same schema.
        let schema: Vec<ProviderFunctionSpec> =
            agentflow_providers::convert(spec.tools.definitions(), spec.provider)?;

        let mut state = ExecutionState::seed(&spec.system_prompt, &spec.user_text, &spec.file_urls);

        info!(
            model = %spec.model,
            tools = schema.len(),
            max_iterations = spec.max_iterations,
            "Starting conversation loop"
        );

        loop {
            let iteration = state.iteration_count() + 1;
            let request = ProviderRequest {
                provider: spec.provider,
                model: spec.model.clone(),
                messages: state.messages().to_vec(),
                tools: schema.clone(),
                temperature: spec.temperature,
                max_tokens: spec.max_tokens,
            };

            debug!(iteration, messages = request.messages.len(), "Calling model");

            let response = match self
                .executor
                .call_model(UnitId::Model { iteration }, request)
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    warn!(iteration, error = %e, "Model call failed");
                    state.fail();
                    return Err(e);
                }
            };

            let reply = response.message;
            let calls = reply.tool_calls.clone();
            if let Err(e) = state.append_model_reply(reply.clone()) {
                state.fail();
                return Err(e);
            }

            if calls.is_empty() {
                state.complete();
                let result_text = final_text(&reply)?;
                info!(iterations = state.iteration_count(), "Conversation complete");
                return Ok(LoopOutcome {
                    result_text,
                    completion: Completion::Answered,
                    state,
                });
            }

            debug!(iteration, count = calls.len(), "Dispatching tool calls");

            // A repeated call id still gets its own result, but only the first call runs.
            let mut seen = HashSet::new();
            let units: Vec<_> = calls
                .into_iter()
                .enumerate()
                .map(|(index, call)| {
                    if !seen.insert(call.call_id.clone()) {
                        warn!(iteration, call_id = %call.call_id, "Model repeated a tool call id");
                        let error = ToolError::DuplicateCallId {
                            tool_name: call.tool_name.clone(),
                            call_id: call.call_id.clone(),
                        };
                        return Either::Right(ready(ToolResult::captured(
                            call.call_id,
                            &call.tool_name,
                            &error,
                        )));
                    }
                    let unit = UnitId::Tool {
                        iteration,
                        index,
                        call_id: call.call_id.clone(),
                    };
                    Either::Left(self.executor.call_tool(unit, call, &spec.tools))
                })
                .collect();
            // join_all preserves input order, so results line up with the requests.
            let results = join_all(units).await;

            for result in results.iter().filter(|r| r.is_error) {
                debug!(call_id = %result.call_id, payload = %result.payload, "Tool call captured an error");
            }

            if let Err(e) = state.append_tool_results(results) {
                state.fail();
                return Err(e);
            }

            if state.iteration_count() >= spec.max_iterations {
                state.complete();
                let iterations = state.iteration_count();
                warn!(iterations, "Iteration limit reached without a final answer");
                return Ok(LoopOutcome {
                    result_text: format!(
                        "Reached the maximum of {} tool iterations without a final answer (completed {} iterations).",
                        spec.max_iterations, iterations
                    ),
                    completion: Completion::IterationLimit { iterations },
                    state,
                });
            }
        }
    }
}

/// Trimmed reply text, or the whole reply serialized when it has no text.
fn final_text(reply: &Message) -> Result<String> {
    let text = reply.text();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Ok(serde_json::to_string(reply)?)
    } else {
        Ok(trimmed.to_string())
    }
}

impl LoopOutcome {
    pub fn is_answered(&self) -> bool {
        matches!(self.completion, Completion::Answered) && self.state.status() == LoopStatus::Completed
    }
}
