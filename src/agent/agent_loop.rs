//! Tool-calling agent that executes one plan step.
//!
//! Each turn the model either answers the step or asks for tool calls; tool
//! output is appended to the conversation and the model is asked again. The
//! loop is bounded by `max_turns`. Past the bound, one last call is made
//! without tools so the model has to answer.

use crate::agent::model::{ChatMessage, ModelClient, ToolCall};
use crate::agent::prompts::{step_task, AGENT_SYSTEM_PROMPT, FINAL_ANSWER_NUDGE};
use crate::agent::tools::{format_snippets, ToolBox};
use crate::error::{AgentError, ToolError};
use crate::models::PastStep;
use crate::workflow::StepExecutor;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Configuration for the step agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Model turns allowed per step before a final answer is forced.
    pub max_turns: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self { max_turns: 10 }
    }
}

/// Arguments every tool accepts.
#[derive(Debug, Deserialize)]
struct ToolArguments {
    query: String,
}

/// The step executor backed by a model and a tool box.
pub struct ToolAgent {
    config: AgentConfig,
    model: Arc<dyn ModelClient>,
    tools: ToolBox,
}

impl ToolAgent {
    pub fn new(config: AgentConfig, model: Arc<dyn ModelClient>, tools: ToolBox) -> Self {
        Self {
            config,
            model,
            tools,
        }
    }

    /// Drive the model until it answers `step`.
    async fn answer_step(&self, plan: &[String], step: &str) -> Result<String, AgentError> {
        let definitions = self.tools.definitions();
        let mut messages = vec![
            ChatMessage::system(AGENT_SYSTEM_PROMPT),
            ChatMessage::user(step_task(plan, step)),
        ];

        for turn in 0..self.config.max_turns {
            debug!("Step agent turn {}", turn + 1);

            let reply = self.model.complete(&messages, &definitions).await?;
            if reply.tool_calls.is_empty() {
                return Ok(reply.text().to_string());
            }

            let calls = reply.tool_calls.clone();
            messages.push(reply);

            for call in &calls {
                let output = self.call_tool(call).await?;
                messages.push(ChatMessage::tool_result(call.id.clone(), output));
            }
        }

        warn!(
            "Step agent used {} turns without answering, forcing a final answer",
            self.config.max_turns
        );
        messages.push(ChatMessage::user(FINAL_ANSWER_NUDGE));

        let reply = self.model.complete(&messages, &[]).await?;
        Ok(reply.text().to_string())
    }

    /// Run one tool call and render its output for the conversation.
    async fn call_tool(&self, call: &ToolCall) -> Result<String, AgentError> {
        let name = &call.function.name;

        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| AgentError::model(format!("Model requested unknown tool `{}`", name)))?;

        let args: ToolArguments = serde_json::from_str(&call.function.arguments)
            .map_err(|e| AgentError::model(format!("Invalid arguments for `{}`: {}", name, e)))?;

        debug!("Invoking tool {} with query: {}", name, args.query);

        match tool.invoke(&args.query).await {
            Ok(snippets) => {
                info!("Tool {} returned {} results", name, snippets.len());
                Ok(format_snippets(&snippets))
            }
            Err(ToolError::Rejected(reason)) => {
                debug!("Tool {} rejected query: {}", name, reason);
                Ok(format!("Error: {}", reason))
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl StepExecutor for ToolAgent {
    async fn execute_step(&self, plan: &[String], objective: &str) -> Result<PastStep, AgentError> {
        let step = plan.first().ok_or_else(|| {
            AgentError::invalid_state("cannot execute a step: the current plan is empty")
        })?;

        match self.answer_step(plan, step).await {
            Ok(answer) => {
                info!("Executed analysis step: {}", step);
                Ok(PastStep::new(step.clone(), answer))
            }
            Err(e) => {
                error!(objective, step = %step, "Failed to execute analysis step: {}", e);
                Err(e)
            }
        }
    }
}
