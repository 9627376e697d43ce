//! The workflow runtime: wires a worker, a journal and an orchestrator
//! together for each execution, and enforces the overall deadline and
//! external cancellation.

use agentflow_core::agent::{ExecutionRequest, ExecutionResponse};
use agentflow_core::error::{Error, Result};
use agentflow_core::tool::ToolRegistry;
use agentflow_providers::ProviderRouter;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};

use crate::history::{History, RecordingExecutor};
use crate::orchestrator::{Orchestrator, OrchestratorState};
use crate::settings::WorkflowSettings;
use crate::worker::LocalWorker;

/// Everything known about a finished (or abandoned) execution.
#[derive(Debug)]
pub struct ExecutionReport {
    pub execution_id: String,
    pub result: Result<ExecutionResponse>,
    /// The journal, including every unit completed before a failure
    pub history: History,
    /// Units answered from a previous journal rather than run again
    pub replayed_units: usize,
    pub transitions: Vec<OrchestratorState>,
}

/// Shared, immutable collaborators for all executions.
#[derive(Clone)]
pub struct WorkflowRuntime {
    providers: Arc<ProviderRouter>,
    tools: Arc<ToolRegistry>,
    settings: WorkflowSettings,
}

impl WorkflowRuntime {
    pub fn new(
        providers: Arc<ProviderRouter>,
        tools: Arc<ToolRegistry>,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            providers,
            tools,
            settings,
        }
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    /// Run a fresh execution to completion.
    pub async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResponse> {
        self.run(request, History::new(), CancellationToken::new())
            .await
            .result
    }

    /// Continue an execution from its journal.
    pub async fn resume(&self, request: ExecutionRequest, history: History) -> ExecutionReport {
        self.run(request, history, CancellationToken::new()).await
    }

    /// Run an execution, replaying whatever `history` already holds.
    ///
    /// Cancelling `cancel` aborts in-flight units and ends the execution with
    /// [`Error::Cancelled`].
    pub async fn run(
        &self,
        request: ExecutionRequest,
        mut history: History,
        cancel: CancellationToken,
    ) -> ExecutionReport {
        let execution_id = match history.execution_id() {
            Some(id) => id.to_string(),
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                history.set_execution_id(id.clone());
                id
            }
        };

        // Child token: cancelling the execution stops its units, never the caller's token.
        let units_cancel = cancel.child_token();
        let worker = LocalWorker::new(
            Arc::clone(&self.providers),
            Arc::clone(&self.tools),
            &self.settings,
        )
        .with_cancellation(units_cancel.clone());
        let recorder =
            RecordingExecutor::resume(Arc::new(worker), history).with_cancellation(units_cancel.clone());
        let orchestrator = Orchestrator::new(execution_id.clone(), self.settings.clone());

        let deadline = self.settings.execution_timeout;
        let span = info_span!("execution", execution_id = %execution_id);
        let work = orchestrator.execute(request, &recorder).instrument(span);

        let mut result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(execution_id = %execution_id, "Execution cancelled");
                Err(Error::Cancelled)
            }
            outcome = tokio::time::timeout(deadline, work) => match outcome {
                Ok(result) => result,
                Err(_) => {
                    warn!(execution_id = %execution_id, timeout_secs = deadline.as_secs(), "Execution deadline exceeded");
                    Err(Error::ExecutionTimeout {
                        timeout_secs: deadline.as_secs(),
                    })
                }
            },
        };

        if result.is_err() {
            units_cancel.cancel();
            orchestrator.fail();
        } else if let Some(divergence) = recorder.divergence() {
            orchestrator.fail();
            result = Err(divergence);
        }

        ExecutionReport {
            execution_id,
            result,
            history: recorder.history(),
            replayed_units: recorder.replayed_units(),
            transitions: orchestrator.transitions(),
        }
    }
}
