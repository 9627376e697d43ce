//! LLM provider implementations for AgentFlow.
//!
//! All providers implement the `agentflow_core::Provider` trait.
//! The router selects the transport for a [`ProviderKind`]; the converter
//! turns an agent's tool definitions into that provider's wire schema.
//!
//! [`ProviderKind`]: agentflow_core::ProviderKind

pub mod converter;
pub mod openai_compat;
pub mod router;

pub use converter::convert;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};
