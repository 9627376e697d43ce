//! The unit-of-work boundary.
//!
//! Orchestration code never performs I/O itself. Every effect (the greeting,
//! each model call, each tool call) is a *unit* with a stable [`UnitId`],
//! executed through a [`UnitExecutor`]. Because unit ids are derived only from
//! the position in the conversation, a second run over the same inputs asks
//! for exactly the same units in exactly the same order.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::provider::{ProviderRequest, ProviderResponse};
use crate::tool::{ToolCallRequest, ToolResult, ToolSet};

/// Stable identity of one unit of work within an execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "unit", rename_all = "snake_case")]
pub enum UnitId {
    /// The acknowledgment step that precedes the conversation
    Greeting,
    /// The model call for a 1-based iteration
    Model { iteration: u32 },
    /// The `index`-th tool call requested in `iteration`
    Tool {
        iteration: u32,
        index: usize,
        call_id: String,
    },
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitId::Greeting => write!(f, "greeting"),
            UnitId::Model { iteration } => write!(f, "model#{iteration}"),
            UnitId::Tool {
                iteration,
                index,
                call_id,
            } => write!(f, "tool#{iteration}.{index}({call_id})"),
        }
    }
}

/// Executes units on behalf of the orchestrator and conversation loop.
///
/// Implementations: the local worker (real I/O with retries and timeouts) and
/// the recording executor (journals outputs and replays them).
#[async_trait]
pub trait UnitExecutor: Send + Sync {
    /// Acknowledge an incoming request before the conversation starts.
    async fn greet(&self, unit: UnitId, request_text: &str) -> Result<String>;

    /// Perform one model call. Errors here fail the execution.
    async fn call_model(&self, unit: UnitId, request: ProviderRequest) -> Result<ProviderResponse>;

    /// Perform one tool call.
    ///
    /// Never fails: every problem comes back as a captured [`ToolResult`].
    async fn call_tool(&self, unit: UnitId, call: ToolCallRequest, tools: &ToolSet) -> ToolResult;
}
