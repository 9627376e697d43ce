//! Durable execution of agent requests.
//!
//! The [`Orchestrator`] and the conversation loop only ever talk to a
//! [`UnitExecutor`](agentflow_core::unit::UnitExecutor). This crate supplies
//! the executors and the machinery around them:
//!
//! - [`LocalWorker`]: runs units on tokio tasks with retries, timeouts and a
//!   concurrency cap
//! - [`RecordingExecutor`]: journals completed units into a [`History`] and
//!   replays them on resume
//! - [`retry`]: failure classification and backoff
//! - [`WorkflowRuntime`]: one call per execution, with a deadline and cancellation

pub mod history;
pub mod invocation;
pub mod orchestrator;
pub mod retry;
pub mod runtime;
pub mod settings;
pub mod worker;

pub use history::{History, HistoryEntry, RecordingExecutor};
pub use invocation::ToolInvoker;
pub use orchestrator::{Orchestrator, OrchestratorState, validate_request};
pub use retry::{Classify, FailureClass, RetryDecision, RetryFailure, RetryPolicy};
pub use runtime::{ExecutionReport, WorkflowRuntime};
pub use settings::{RetryPolicies, UnitTimeouts, WorkflowSettings};
pub use worker::LocalWorker;
