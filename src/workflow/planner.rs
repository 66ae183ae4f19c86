//! Initial plan generation.

use crate::agent::model::{complete_as, ChatMessage, ModelClient, OutputSchema};
use crate::agent::prompts::PLANNER_SYSTEM_PROMPT;
use crate::error::AgentError;
use crate::models::Plan;
use crate::workflow::Planner;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

/// Structured output of the planner call.
#[derive(Debug, Deserialize)]
struct PlanOutput {
    steps: Vec<String>,
}

/// Schema for a plan: an ordered list of step descriptions.
pub fn plan_schema() -> OutputSchema {
    OutputSchema {
        name: "plan",
        description: "Plan to follow for code analysis.",
        schema: json!({
            "type": "object",
            "properties": {
                "steps": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Analysis steps to follow, in sorted order"
                }
            },
            "required": ["steps"],
            "additionalProperties": false
        }),
    }
}

/// Planner backed by a structured model call.
pub struct LlmPlanner {
    model: Arc<dyn ModelClient>,
}

impl LlmPlanner {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model }
    }

    async fn request_plan(&self, objective: &str) -> Result<Plan, AgentError> {
        let messages = [
            ChatMessage::system(PLANNER_SYSTEM_PROMPT),
            ChatMessage::user(objective),
        ];

        let output: PlanOutput = complete_as(self.model.as_ref(), &messages, &plan_schema()).await?;
        Plan::new(output.steps)
    }
}

#[async_trait]
impl Planner for LlmPlanner {
    async fn plan(&self, objective: &str) -> Result<Plan, AgentError> {
        match self.request_plan(objective).await {
            Ok(plan) => {
                info!("Created analysis plan with {} steps", plan.len());
                Ok(plan)
            }
            Err(e) => {
                error!(objective, "Failed to create analysis plan: {}", e);
                Err(e)
            }
        }
    }
}
