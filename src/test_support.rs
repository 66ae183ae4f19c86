//! Scripted doubles for model and tool calls.

use crate::agent::model::{ChatMessage, FunctionCall, ModelClient, OutputSchema, ToolCall, ToolDefinition};
use crate::agent::tools::{Snippet, Tool};
use crate::error::{AgentError, ToolError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A recorded `complete` call: the messages sent and how many tools were offered.
#[derive(Debug, Clone)]
pub struct CompleteCall {
    pub messages: Vec<ChatMessage>,
    pub tool_count: usize,
}

/// Model client that replays queued replies in order.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<ChatMessage, AgentError>>>,
    structured: Mutex<VecDeque<Result<Value, AgentError>>>,
    complete_calls: Mutex<Vec<CompleteCall>>,
    structured_calls: Mutex<Vec<(Vec<ChatMessage>, &'static str)>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, reply: ChatMessage) -> Self {
        self.replies.lock().unwrap().push_back(Ok(reply));
        self
    }

    pub fn reply_err(self, err: AgentError) -> Self {
        self.replies.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn structured(self, value: Value) -> Self {
        self.structured.lock().unwrap().push_back(Ok(value));
        self
    }

    pub fn structured_err(self, err: AgentError) -> Self {
        self.structured.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn complete_calls(&self) -> Vec<CompleteCall> {
        self.complete_calls.lock().unwrap().clone()
    }

    pub fn structured_calls(&self) -> Vec<(Vec<ChatMessage>, &'static str)> {
        self.structured_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatMessage, AgentError> {
        self.complete_calls.lock().unwrap().push(CompleteCall {
            messages: messages.to_vec(),
            tool_count: tools.len(),
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AgentError::model("script exhausted")))
    }

    async fn complete_structured(
        &self,
        messages: &[ChatMessage],
        schema: &OutputSchema,
    ) -> Result<Value, AgentError> {
        self.structured_calls
            .lock()
            .unwrap()
            .push((messages.to_vec(), schema.name));
        self.structured
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AgentError::model("script exhausted")))
    }
}

/// Assistant turn that requests a single tool call.
pub fn tool_call_reply(id: &str, tool: &str, query: &str) -> ChatMessage {
    ChatMessage {
        tool_calls: vec![ToolCall {
            id: id.to_string(),
            kind: "function".to_string(),
            function: FunctionCall {
                name: tool.to_string(),
                arguments: serde_json::json!({ "query": query }).to_string(),
            },
        }],
        content: None,
        ..ChatMessage::assistant("")
    }
}

/// Tool with a fixed outcome that records every query.
pub struct StaticTool {
    name: &'static str,
    outcome: fn() -> Result<Vec<Snippet>, ToolError>,
    queries: Mutex<Vec<String>>,
}

impl StaticTool {
    pub fn new(name: &'static str, outcome: fn() -> Result<Vec<Snippet>, ToolError>) -> Self {
        Self {
            name,
            outcome,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Tool for StaticTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "test tool"
    }

    fn query_description(&self) -> &str {
        "query"
    }

    async fn invoke(&self, query: &str) -> Result<Vec<Snippet>, ToolError> {
        self.queries.lock().unwrap().push(query.to_string());
        (self.outcome)()
    }
}
