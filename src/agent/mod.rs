//! LLM agent modules for code analysis.
//!
//! This module provides the model client, the tools, and the tool-calling
//! agent that executes single plan steps. [`AgentContext`] wires them
//! together once per process.

pub mod agent_loop;
pub mod model;
pub mod prompts;
pub mod tools;

pub use agent_loop::{AgentConfig, ToolAgent};

use crate::config::{Config, Credentials};
use crate::error::AgentError;
use crate::scanner::{FileScanner, ScanConfig};
use crate::workflow::{Cancellation, Controller, LlmPlanner, LlmReplanner};
use model::{ModelClient, ModelSettings, OpenAiClient};
use std::path::PathBuf;
use std::sync::Arc;
use tools::{workspace_tools, SearchSettings, ToolBox, WebSearch};
use tracing::debug;

/// Shared collaborators and limits for analysis sessions.
pub struct AgentContext {
    pub model: Arc<dyn ModelClient>,
    pub tools: ToolBox,
    pub max_steps: usize,
    pub max_step_turns: usize,
}

impl AgentContext {
    /// Build the OpenAI client, web search, and workspace tools rooted at `workspace`.
    pub fn build(
        config: &Config,
        credentials: &Credentials,
        workspace: PathBuf,
    ) -> Result<Self, AgentError> {
        let model = OpenAiClient::new(ModelSettings {
            name: config.model.name.clone(),
            base_url: config.model.base_url.clone(),
            api_key: credentials.openai_api_key.clone(),
            reasoning_effort: Some(config.model.reasoning_effort),
            temperature: config.model.temperature,
            timeout_seconds: config.model.timeout_seconds,
        })?;

        let search = WebSearch::new(SearchSettings {
            api_key: credentials.tavily_api_key.clone(),
            base_url: config.search.base_url.clone(),
            max_results: config.search.max_results,
            search_depth: config.search.search_depth.clone(),
            timeout_seconds: config.model.timeout_seconds,
        })?;

        let scanner = FileScanner::new(workspace, ScanConfig::from(&config.scanner));
        let tools = workspace_tools(ToolBox::new().with(search), scanner);
        debug!("Registered tools: {}", tools.names().join(", "));

        Ok(Self {
            model: Arc::new(model),
            tools,
            max_steps: config.agent.max_steps,
            max_step_turns: config.agent.max_step_turns,
        })
    }

    /// A controller that shares this context's model and tools.
    pub fn controller(&self, cancellation: Cancellation) -> Controller {
        let executor = ToolAgent::new(
            AgentConfig {
                max_turns: self.max_step_turns,
            },
            self.model.clone(),
            self.tools.clone(),
        );

        Controller::new(
            Arc::new(LlmPlanner::new(self.model.clone())),
            Arc::new(executor),
            Arc::new(LlmReplanner::new(self.model.clone())),
        )
        .with_max_steps(self.max_steps)
        .with_cancellation(cancellation)
    }
}
