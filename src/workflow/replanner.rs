//! Replan decision after each executed step.
//!
//! The model alone decides between finishing and continuing. A continuation
//! replaces the current plan; nothing from the old plan carries over.

use crate::agent::model::{complete_as, ChatMessage, ModelClient, OutputSchema};
use crate::agent::prompts::replan_prompt;
use crate::error::AgentError;
use crate::models::{Act, Plan, SessionState};
use crate::workflow::Replanner;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Deserialize)]
struct ActOutput {
    action: ActionOutput,
}

/// Wire form of the two variants. The fields tell them apart.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ActionOutput {
    Response { response: String },
    Plan { steps: Vec<String> },
}

impl TryFrom<ActionOutput> for Act {
    type Error = AgentError;

    fn try_from(output: ActionOutput) -> Result<Self, Self::Error> {
        match output {
            ActionOutput::Response { response } if response.trim().is_empty() => {
                Err(AgentError::model("replanner returned an empty response"))
            }
            ActionOutput::Response { response } => Ok(Act::Response(response)),
            ActionOutput::Plan { steps } => Plan::new(steps).map(Act::Plan),
        }
    }
}

/// Schema for the replan decision: `Response` or `Plan`.
pub fn act_schema() -> OutputSchema {
    OutputSchema {
        name: "act",
        description: "Action to perform during analysis.",
        schema: json!({
            "type": "object",
            "properties": {
                "action": {
                    "description": "Next action. Use Response for final answers, Plan for further analysis.",
                    "anyOf": [
                        {
                            "title": "Response",
                            "type": "object",
                            "properties": {
                                "response": { "type": "string" }
                            },
                            "required": ["response"],
                            "additionalProperties": false
                        },
                        {
                            "title": "Plan",
                            "type": "object",
                            "properties": {
                                "steps": {
                                    "type": "array",
                                    "items": { "type": "string" },
                                    "description": "Remaining analysis steps, in sorted order"
                                }
                            },
                            "required": ["steps"],
                            "additionalProperties": false
                        }
                    ]
                }
            },
            "required": ["action"],
            "additionalProperties": false
        }),
    }
}

/// Replanner backed by a structured model call.
pub struct LlmReplanner {
    model: Arc<dyn ModelClient>,
}

impl LlmReplanner {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model }
    }

    async fn decide(&self, state: &SessionState) -> Result<Act, AgentError> {
        let messages = [ChatMessage::user(replan_prompt(
            &state.objective,
            &state.plan,
            &state.past_steps,
        ))];

        let output: ActOutput = complete_as(self.model.as_ref(), &messages, &act_schema()).await?;
        Act::try_from(output.action)
    }
}

#[async_trait]
impl Replanner for LlmReplanner {
    async fn replan(&self, state: &SessionState) -> Result<Act, AgentError> {
        let act = self.decide(state).await.map_err(|e| {
            let step = state.past_steps.last().map(|p| p.step.as_str()).unwrap_or("");
            error!(objective = %state.objective, step, "Failed to replan analysis: {}", e);
            e
        })?;

        match &act {
            Act::Response(_) => info!("Analysis complete, generating recommendations"),
            Act::Plan(plan) => info!("Replanning with {} remaining steps", plan.len()),
        }

        Ok(act)
    }
}
