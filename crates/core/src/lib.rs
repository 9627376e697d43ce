//! # AgentFlow Core
//!
//! Domain types, traits, and error definitions for the AgentFlow durable
//! tool-calling runtime. This crate has **zero framework dependencies**; it
//! defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every effectful subsystem is defined as a trait here. Implementations live
//! in their respective crates:
//! - [`Provider`]: the model transport (`agentflow-providers`)
//! - [`Tool`]: a callable tool (`agentflow-tools`)
//! - [`UnitExecutor`]: the boundary between the deterministic orchestration
//!   code and the worker that performs I/O (`agentflow-workflow`)
//!
//! The orchestrator and conversation loop only ever talk to these traits,
//! which is what makes an execution replayable from its recorded history.

pub mod agent;
pub mod error;
pub mod message;
pub mod provider;
pub mod tool;
pub mod unit;

// Re-export key types at crate root for ergonomics
pub use agent::{
    AgentDefinition, AgentRegistry, Completion, ExecutionRequest, ExecutionResponse, ProviderKind,
};
pub use error::{
    Error, ErrorKind, ProviderError, ProviderErrorKind, Result, ToolConversionError, ToolError,
};
pub use message::{ContentPart, Conversation, Message, MessageContent, Role};
pub use provider::{
    FunctionSpec, ParameterSchema, PropertySchema, Provider, ProviderFunctionSpec,
    ProviderRequest, ProviderResponse, Usage,
};
pub use tool::{
    InputType, Tool, ToolCallRequest, ToolDefinition, ToolInputSpec, ToolRegistry, ToolResult,
    ToolSet,
};
pub use unit::{UnitExecutor, UnitId};
