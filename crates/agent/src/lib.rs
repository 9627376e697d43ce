//! The conversation loop.
//!
//! One execution is a short dialogue between a model and a set of tools:
//!
//! 1. **Seed** the conversation with the agent's system prompt and the request
//! 2. **Call the model** with the whole conversation and the converted tool schema
//! 3. **If tool calls**: run each one as its own unit, append the results in
//!    request order, loop back to step 2
//! 4. **If text**: that's the answer
//!
//! The loop stops at the first text-only reply or once the iteration limit is
//! reached. It never performs I/O; all effects go through a
//! [`UnitExecutor`](agentflow_core::unit::UnitExecutor).

pub mod loop_runner;
pub mod state;

pub use loop_runner::{ConversationLoop, LoopOutcome, LoopSpec};
pub use state::{ExecutionState, LoopStatus};
