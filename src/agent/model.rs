//! Language-model client.
//!
//! `ModelClient` is the only way the rest of the crate talks to a model. It
//! offers two modes: a free-text turn (optionally offering tools) and a
//! schema-constrained structured turn. `OpenAiClient` implements it against
//! an OpenAI-compatible `/chat/completions` endpoint.

use crate::config::ReasoningEffort;
use crate::error::AgentError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// Message in the chat history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    #[cfg(test)]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::with_role(Role::Tool, content)
        }
    }

    /// Text content, or an empty string for tool-call-only turns.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments, as sent by the model.
    pub arguments: String,
}

/// A tool offered to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A declared output schema for structured completions.
#[derive(Debug, Clone)]
pub struct OutputSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub schema: Value,
}

/// Completion interface used by the planner, replanner and step agent.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Name of the model behind this client.
    fn model_name(&self) -> &str;

    /// Free-text turn. When `tools` is non-empty the reply may carry tool
    /// calls instead of (or alongside) text.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatMessage, AgentError>;

    /// Structured turn. The returned value conforms to `schema`.
    async fn complete_structured(
        &self,
        messages: &[ChatMessage],
        schema: &OutputSchema,
    ) -> Result<Value, AgentError>;
}

/// Structured completion decoded into `T`.
pub async fn complete_as<T: DeserializeOwned>(
    client: &dyn ModelClient,
    messages: &[ChatMessage],
    schema: &OutputSchema,
) -> Result<T, AgentError> {
    let value = client.complete_structured(messages, schema).await?;
    serde_json::from_value(value).map_err(|e| {
        AgentError::model(format!(
            "output does not match the `{}` schema: {}",
            schema.name, e
        ))
    })
}

/// Settings for [`OpenAiClient`].
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub name: String,
    pub base_url: String,
    pub api_key: String,
    pub reasoning_effort: Option<ReasoningEffort>,
    pub temperature: Option<f32>,
    pub timeout_seconds: u64,
}

/// Chat completions request body.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<ReasoningEffort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Chat completions response body.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
    #[serde(default)]
    refusal: Option<String>,
}

/// Client for OpenAI-compatible chat completion APIs.
pub struct OpenAiClient {
    settings: ModelSettings,
    http_client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(settings: ModelSettings) -> Result<Self, AgentError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .map_err(|e| AgentError::model(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            settings,
            http_client,
        })
    }

    fn request<'a>(
        &'a self,
        messages: &'a [ChatMessage],
        tools: &[ToolDefinition],
        response_format: Option<Value>,
    ) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.settings.name,
            messages,
            tools: tools.iter().map(tool_to_json).collect(),
            response_format,
            reasoning_effort: self.settings.reasoning_effort,
            temperature: self.settings.temperature,
        }
    }

    async fn send(&self, request: &ChatCompletionRequest<'_>) -> Result<ResponseMessage, AgentError> {
        let url = format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        );

        debug!(
            "Sending chat request with {} messages and {} tools",
            request.messages.len(),
            request.tools.len()
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentError::model(format!(
                        "Request timed out after {}s",
                        self.settings.timeout_seconds
                    ))
                } else if e.is_connect() {
                    AgentError::model(format!(
                        "Cannot connect to model service at {}",
                        self.settings.base_url
                    ))
                } else {
                    AgentError::model(format!("Failed to send request: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::model(format!("Model API error {}: {}", status, body)));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AgentError::model(format!("Failed to parse model response: {}", e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| AgentError::model("Model response contained no choices"))
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    fn model_name(&self) -> &str {
        &self.settings.name
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatMessage, AgentError> {
        let message = self.send(&self.request(messages, tools, None)).await?;

        Ok(ChatMessage {
            role: Role::Assistant,
            content: message.content,
            tool_calls: message.tool_calls.unwrap_or_default(),
            tool_call_id: None,
        })
    }

    async fn complete_structured(
        &self,
        messages: &[ChatMessage],
        schema: &OutputSchema,
    ) -> Result<Value, AgentError> {
        let request = self.request(messages, &[], Some(response_format(schema)));
        let message = self.send(&request).await?;
        parse_structured(message, schema)
    }
}

fn tool_to_json(tool: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        }
    })
}

fn response_format(schema: &OutputSchema) -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": schema.name,
            "description": schema.description,
            "schema": schema.schema,
            "strict": true,
        }
    })
}

fn parse_structured(message: ResponseMessage, schema: &OutputSchema) -> Result<Value, AgentError> {
    if let Some(refusal) = message.refusal {
        return Err(AgentError::model(format!(
            "Model refused to produce `{}`: {}",
            schema.name, refusal
        )));
    }

    let content = message
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| AgentError::model(format!("Empty structured output for `{}`", schema.name)))?;

    serde_json::from_str(&content).map_err(|e| {
        AgentError::model(format!(
            "Structured output for `{}` is not valid JSON: {}",
            schema.name, e
        ))
    })
}
