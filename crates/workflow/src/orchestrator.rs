//! The orchestrator: the entry point for one execution.
//!
//! A small state machine with no I/O of its own:
//!
//! ```text
//! Created → Acknowledged → Invoking → Completed
//!                                   ↘ Failed
//! ```
//!
//! Requests are validated before any unit runs. The greeting unit moves the
//! execution to `Acknowledged`; handing over to the conversation loop moves it
//! to `Invoking`; the loop's outcome decides the terminal state.

use agentflow_agent::{ConversationLoop, LoopOutcome, LoopSpec};
use agentflow_core::agent::{AgentDefinition, ExecutionRequest, ExecutionResponse, ProviderKind};
use agentflow_core::error::{Error, Result};
use agentflow_core::unit::{UnitExecutor, UnitId};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::settings::WorkflowSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    Created,
    Acknowledged,
    Invoking,
    Completed,
    Failed,
}

impl OrchestratorState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrchestratorState::Completed | OrchestratorState::Failed)
    }

    fn can_move_to(self, next: OrchestratorState) -> bool {
        use OrchestratorState::*;
        matches!(
            (self, next),
            (Created, Acknowledged)
                | (Acknowledged, Invoking)
                | (Invoking, Completed)
                | (Created | Acknowledged | Invoking, Failed)
        )
    }
}

/// The agent and loop parameters a request resolves to.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub agent: AgentDefinition,
    pub provider: ProviderKind,
}

/// Check a request without running anything.
///
/// The first agent is the one that runs; others are ignored.
pub fn validate_request(request: &ExecutionRequest) -> Result<ValidatedRequest> {
    let agent = request.agents.first().ok_or_else(|| {
        Error::InvalidRequest("ExecutionRequest.agents must contain at least one agent".into())
    })?;
    if request.agents.len() > 1 {
        debug!(
            ignored = request.agents.len() - 1,
            agent = %agent.name,
            "Several agents supplied; using the first"
        );
    }
    let provider = agent.provider_kind()?;
    Ok(ValidatedRequest {
        agent: agent.clone(),
        provider,
    })
}

/// Runs one execution through its states.
pub struct Orchestrator {
    execution_id: String,
    settings: WorkflowSettings,
    state: Mutex<OrchestratorState>,
    transitions: Mutex<Vec<OrchestratorState>>,
}

impl Orchestrator {
    pub fn new(execution_id: impl Into<String>, settings: WorkflowSettings) -> Self {
        Self {
            execution_id: execution_id.into(),
            settings,
            state: Mutex::new(OrchestratorState::Created),
            transitions: Mutex::new(vec![OrchestratorState::Created]),
        }
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    pub fn state(&self) -> OrchestratorState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every state visited so far, starting with `Created`.
    pub fn transitions(&self) -> Vec<OrchestratorState> {
        self.transitions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn advance(&self, next: OrchestratorState) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if !state.can_move_to(next) {
            return Err(Error::Internal(format!(
                "illegal orchestrator transition {:?} -> {next:?}",
                *state
            )));
        }
        debug!(execution_id = %self.execution_id, from = ?*state, to = ?next, "Orchestrator transition");
        *state = next;
        self.transitions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(next);
        Ok(())
    }

    pub(crate) fn fail(&self) {
        // Failing from a terminal state is a no-op.
        if self.state().is_terminal() {
            return;
        }
        if let Err(e) = self.advance(OrchestratorState::Failed) {
            warn!(execution_id = %self.execution_id, error = %e, "Could not mark execution failed");
        }
    }

    /// Drive `request` to completion through `executor`.
    pub async fn execute(
        &self,
        request: ExecutionRequest,
        executor: &dyn UnitExecutor,
    ) -> Result<ExecutionResponse> {
        match self.run(request, executor).await {
            Ok(response) => Ok(response),
            Err(e) => {
                warn!(execution_id = %self.execution_id, error = %e, kind = ?e.kind(), "Execution failed");
                self.fail();
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        request: ExecutionRequest,
        executor: &dyn UnitExecutor,
    ) -> Result<ExecutionResponse> {
        if self.state() != OrchestratorState::Created {
            return Err(Error::Internal(format!(
                "execution {} has already started",
                self.execution_id
            )));
        }

        let ValidatedRequest { agent, provider } = validate_request(&request)?;
        info!(
            execution_id = %self.execution_id,
            agent = %agent.name,
            model = %agent.model,
            files = request.request_files.len(),
            "Execution started"
        );

        let ack = executor
            .greet(UnitId::Greeting, &request.request_text)
            .await?;
        debug!(execution_id = %self.execution_id, ack = %ack, "Request acknowledged");
        self.advance(OrchestratorState::Acknowledged)?;

        self.advance(OrchestratorState::Invoking)?;
        let spec = LoopSpec {
            provider,
            model: agent.model.clone(),
            system_prompt: agent.system_prompt.clone(),
            user_text: request.request_text,
            file_urls: request.request_files,
            tools: agent.tool_set(),
            max_iterations: self.settings.max_iterations,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };
        let LoopOutcome {
            result_text,
            completion,
            state,
        } = ConversationLoop::new(executor).run(spec).await?;

        self.advance(OrchestratorState::Completed)?;
        info!(
            execution_id = %self.execution_id,
            iterations = state.iteration_count(),
            messages = state.messages().len(),
            completion = ?completion,
            "Execution completed"
        );

        Ok(ExecutionResponse {
            result_text,
            completion,
            execution_id: self.execution_id.clone(),
        })
    }
}
