//! OpenAI-compatible provider implementation.
//!
//! Works with OpenAI and any endpoint exposing an OpenAI-compatible
//! `/v1/chat/completions` API (vLLM, llama.cpp, proxies).
//!
//! Every failure is mapped onto [`ProviderError`] so the retry classifier can
//! decide what to do with it; nothing here retries on its own.

use async_trait::async_trait;
use agentflow_core::error::ProviderError;
use agentflow_core::message::{ContentPart, Message, MessageContent, Role};
use agentflow_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use agentflow_core::tool::ToolCallRequest;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Transport-level ceiling; the worker applies the real per-unit timeout.
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::new("openai", DEFAULT_OPENAI_URL, api_key)
    }

    /// Convert our Message types to OpenAI API format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: match m.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::System => "system",
                    Role::Tool => "tool",
                },
                content: Self::to_api_content(m),
                tool_calls: if m.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        m.tool_calls
                            .iter()
                            .map(|tc| ApiToolCall {
                                id: tc.call_id.clone(),
                                r#type: "function".into(),
                                function: ApiFunction {
                                    name: tc.tool_name.clone(),
                                    arguments: tc.raw_arguments.clone(),
                                },
                            })
                            .collect(),
                    )
                },
                tool_call_id: m.tool_call_id.clone(),
            })
            .collect()
    }

    /// Chat completions have no URL-typed file part (files go by upload id or
    /// inline base64), so a file URL is sent as a text part naming it. The URL
    /// is never fetched or inlined here.
    fn to_api_content(message: &Message) -> Option<serde_json::Value> {
        match &message.content {
            MessageContent::Text(text) if text.is_empty() && !message.tool_calls.is_empty() => None,
            MessageContent::Text(text) => Some(serde_json::Value::String(text.clone())),
            MessageContent::Parts(parts) => Some(serde_json::Value::Array(
                parts
                    .iter()
                    .map(|part| match part {
                        ContentPart::Text { text } => {
                            serde_json::json!({ "type": "text", "text": text })
                        }
                        ContentPart::FileUrl { url } => {
                            serde_json::json!({ "type": "text", "text": format!("Attached file: {url}") })
                        }
                    })
                    .collect(),
            )),
        }
    }

    fn build_body(request: &ProviderRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
        });

        if let Some(temperature) = request.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(request.tools);
        }

        body
    }

    fn parse_response(body: &str) -> Result<ProviderResponse, ProviderError> {
        let api_response: ApiResponse = serde_json::from_str(body)
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".into()))?;

        let tool_calls: Vec<ToolCallRequest> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCallRequest {
                call_id: tc.id,
                tool_name: tc.function.name,
                raw_arguments: tc.function.arguments,
            })
            .collect();

        let message = Message::assistant_with_tool_calls(
            choice.message.content.unwrap_or_default(),
            tool_calls,
        );

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ProviderResponse {
            message,
            usage,
            model: api_response.model,
        })
    }
}

/// Map a non-success HTTP status onto the provider error taxonomy.
pub fn classify_status(status: u16, retry_after: Option<&str>, body: &str) -> ProviderError {
    match status {
        401 | 403 => ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        ),
        429 if body.contains("insufficient_quota") => {
            ProviderError::QuotaExceeded("Account quota exhausted".into())
        }
        429 => ProviderError::RateLimited {
            retry_after_secs: retry_after.and_then(|v| v.trim().parse().ok()),
        },
        500..=599 => ProviderError::ServerError {
            status_code: status,
            message: body.to_string(),
        },
        _ => ProviderError::ApiError {
            status_code: status,
            message: body.to_string(),
        },
    }
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NotConfigured(format!(
                "no API key configured for {}",
                self.name
            )));
        }

        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::build_body(&request);

        debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let text = response.text().await.map_err(transport_error)?;

        if !(200..300).contains(&status) {
            warn!(status, body = %text, "Provider returned error");
            return Err(classify_status(status, retry_after.as_deref(), &text));
        }

        Self::parse_response(&text)
    }
}

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    r#type: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
