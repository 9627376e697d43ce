//! Provider trait: the abstraction over LLM backends.
//!
//! A Provider knows how to send a conversation to an LLM and get one complete
//! assistant message back. The tool schema it receives has already been
//! converted to the provider's wire format.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::agent::ProviderKind;
use crate::error::ProviderError;
use crate::message::Message;

/// One model call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// Which backend family this request targets
    pub provider: ProviderKind,

    /// The model to use (e.g., "gpt-4o")
    pub model: String,

    /// The full conversation so far
    pub messages: Vec<Message>,

    /// Available tools, already in the provider's function-calling shape
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ProviderFunctionSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// A complete response from a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated assistant message, possibly carrying tool calls
    pub message: Message,

    /// Token usage statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

/// Token usage information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A tool in OpenAI's function-calling wire format.
///
/// Property maps are `BTreeMap`s so serialization is byte-stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderFunctionSpec {
    /// Always `"function"`
    #[serde(rename = "type")]
    pub kind: String,

    pub function: FunctionSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
    pub strict: bool,
}

/// The JSON-schema object describing a function's parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    pub schema_type: String,

    pub properties: BTreeMap<String, PropertySchema>,

    /// Declaration order, not map order
    pub required: Vec<String>,

    #[serde(rename = "additionalProperties")]
    pub additional_properties: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub json_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertySchema>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, PropertySchema>>,

    #[serde(
        rename = "additionalProperties",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<bool>,
}

impl PropertySchema {
    /// A bare `{"type": ...}` schema.
    pub fn of_type(json_type: impl Into<String>) -> Self {
        Self {
            json_type: json_type.into(),
            description: None,
            items: None,
            properties: None,
            additional_properties: None,
        }
    }
}

/// The core Provider trait.
///
/// Every LLM backend implements this. The model-call unit holds the provider
/// behind an `Arc<dyn Provider>` and never knows which backend it talks to.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable name of this provider (e.g., "openai").
    fn name(&self) -> &str;

    /// Send a conversation and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError>;
}
