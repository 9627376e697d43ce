//! Agent definitions, execution requests and responses.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::tool::{ToolDefinition, ToolSet};

/// A known LLM backend family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "OPENAI", alias = "openai")]
    OpenAi,
    #[serde(rename = "ANTHROPIC", alias = "anthropic")]
    Anthropic,
    #[serde(rename = "GEMINI", alias = "gemini")]
    Gemini,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::Gemini,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI",
            ProviderKind::Anthropic => "ANTHROPIC",
            ProviderKind::Gemini => "GEMINI",
        }
    }

    /// The models this provider family accepts.
    pub fn supported_models(&self) -> &'static [&'static str] {
        match self {
            ProviderKind::OpenAi => &[
                "gpt-5",
                "gpt-5-mini",
                "gpt-4",
                "gpt-4-turbo",
                "gpt-4o",
                "gpt-4o-mini",
                "gpt-3.5-turbo",
            ],
            ProviderKind::Anthropic => &[
                "claude-3-5-sonnet-20241022",
                "claude-3-opus-20240229",
                "claude-3-haiku-20240307",
            ],
            ProviderKind::Gemini => &[
                "gemini-pro",
                "gemini-pro-vision",
                "gemini-1.5-pro",
                "gemini-1.5-flash",
            ],
        }
    }

    pub fn supports_model(&self, model: &str) -> bool {
        self.supported_models().contains(&model)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OPENAI" => Ok(ProviderKind::OpenAi),
            "ANTHROPIC" => Ok(ProviderKind::Anthropic),
            "GEMINI" => Ok(ProviderKind::Gemini),
            _ => Err(Error::InvalidRequest(format!(
                "Unknown provider '{s}'. Known providers: OPENAI, ANTHROPIC, GEMINI"
            ))),
        }
    }
}

/// A named bundle of system prompt, tools and model choice.
///
/// Immutable for the duration of one execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub name: String,

    #[serde(default)]
    pub system_prompt: String,

    #[serde(default)]
    pub tools: Vec<ToolDefinition>,

    /// Provider family as written by the caller; checked when an execution starts
    pub provider: String,

    pub model: String,
}

impl AgentDefinition {
    /// Parse and check the provider/model pair.
    pub fn provider_kind(&self) -> Result<ProviderKind> {
        let kind: ProviderKind = self.provider.parse()?;
        if !kind.supports_model(&self.model) {
            return Err(Error::InvalidRequest(format!(
                "Model '{}' is not supported by provider {kind}. Supported models: {}",
                self.model,
                kind.supported_models().join(", ")
            )));
        }
        Ok(kind)
    }

    pub fn tool_set(&self) -> ToolSet {
        ToolSet::new(self.tools.clone())
    }
}

/// Name → agent definition. Built at startup and injected.
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    agents: BTreeMap<String, AgentDefinition>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent under a lookup key. Replaces any existing entry.
    pub fn register(&mut self, key: impl Into<String>, agent: AgentDefinition) {
        self.agents.insert(key.into(), agent);
    }

    pub fn get(&self, key: &str) -> Result<&AgentDefinition> {
        self.agents.get(key).ok_or_else(|| {
            Error::InvalidRequest(format!(
                "Agent '{key}' not found. Available agents: {}",
                self.names().join(", ")
            ))
        })
    }

    /// Look up several agents, keeping the requested order.
    pub fn resolve(&self, keys: &[String]) -> Result<Vec<AgentDefinition>> {
        keys.iter().map(|k| self.get(k).cloned()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.agents.keys().map(|k| k.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AgentDefinition)> {
        self.agents.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// What a caller submits to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub request_text: String,

    /// File references (URLs); never file contents
    #[serde(default)]
    pub request_files: Vec<String>,

    #[serde(default)]
    pub agents: Vec<AgentDefinition>,
}

/// How the conversation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Completion {
    /// The model produced a final answer
    Answered,
    /// The iteration cap was hit; the result text is a diagnostic
    IterationLimit { iterations: u32 },
}

/// What the orchestrator returns on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResponse {
    pub result_text: String,
    pub completion: Completion,
    pub execution_id: String,
}
