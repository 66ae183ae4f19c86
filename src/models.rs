//! Data models for the plan-and-execute loop.
//!
//! This module contains the session state owned by the controller, the
//! values exchanged between planner, executor and replanner, and the
//! report written at the end of a session.

use crate::error::AgentError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered, non-empty list of analysis steps.
///
/// `steps()[0]` is always the next step to execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    steps: Vec<String>,
}

impl Plan {
    /// Build a plan, dropping blank entries. Fails if nothing is left.
    pub fn new(steps: Vec<String>) -> Result<Self, AgentError> {
        let steps: Vec<String> = steps
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if steps.is_empty() {
            return Err(AgentError::model("plan contains no steps"));
        }

        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }
}

/// A step that has been executed, with the agent's answer for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PastStep {
    pub step: String,
    pub result: String,
}

impl PastStep {
    pub fn new(step: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            result: result.into(),
        }
    }
}

/// Outcome of a replan decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Act {
    /// Enough information was gathered; this is the final answer.
    Response(String),
    /// More work is needed; this plan replaces the current one.
    Plan(Plan),
}

/// Node of the controller's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Planning,
    Executing,
    Replanning,
    Terminated,
}

impl Phase {
    /// Node name used in progress output.
    pub fn node_name(&self) -> &'static str {
        match self {
            Phase::Planning => "planner",
            Phase::Executing => "agent",
            Phase::Replanning => "replan",
            Phase::Terminated => "end",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.node_name())
    }
}

/// The part of the session state changed by one transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateUpdate {
    Planned(Plan),
    Executed(PastStep),
    Replanned(Plan),
    Responded(String),
}

impl StateUpdate {
    /// The node that runs after the transition that produced this update.
    pub fn next_phase(&self) -> Phase {
        match self {
            StateUpdate::Planned(_) | StateUpdate::Replanned(_) => Phase::Executing,
            StateUpdate::Executed(_) => Phase::Replanning,
            StateUpdate::Responded(_) => Phase::Terminated,
        }
    }
}

/// Emitted once per controller transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// 1-based index of the transition that produced this event.
    pub transition: usize,
    /// The node that ran.
    pub phase: Phase,
    pub update: StateUpdate,
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.update {
            StateUpdate::Planned(plan) | StateUpdate::Replanned(plan) => {
                writeln!(f, "[{}] plan ({} steps):", self.phase, plan.len())?;
                write!(f, "{}", numbered(plan.steps()))
            }
            StateUpdate::Executed(past) => {
                writeln!(f, "[{}] {}", self.phase, past.step)?;
                write!(f, "{}", past.result)
            }
            StateUpdate::Responded(response) => {
                writeln!(f, "[{}] final response:", self.phase)?;
                write!(f, "{}", response)
            }
        }
    }
}

/// Everything one analysis session knows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub objective: String,
    /// Current plan. Empty only before the planner has run.
    pub plan: Vec<String>,
    /// Executed steps, in execution order.
    pub past_steps: Vec<PastStep>,
    pub response: Option<String>,
}

impl SessionState {
    pub fn new(objective: impl Into<String>) -> Self {
        Self {
            objective: objective.into(),
            ..Default::default()
        }
    }

    /// Fold a transition's update into the state.
    ///
    /// Plans are replaced wholesale; past steps are only ever appended.
    pub fn apply(&mut self, update: &StateUpdate) {
        match update {
            StateUpdate::Planned(plan) | StateUpdate::Replanned(plan) => {
                self.plan = plan.steps().to_vec();
            }
            StateUpdate::Executed(past) => self.past_steps.push(past.clone()),
            StateUpdate::Responded(response) => self.response = Some(response.clone()),
        }
    }
}

/// Render steps as a 1-based numbered list.
pub fn numbered(steps: &[String]) -> String {
    steps
        .iter()
        .enumerate()
        .map(|(i, step)| format!("{}. {}", i + 1, step))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Metadata about an analysis session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// The analysis query.
    pub objective: String,
    /// Workspace the session explored.
    pub workspace: String,
    /// When the analysis was performed.
    pub analysis_date: DateTime<Utc>,
    /// Model used for planning and execution.
    pub model_used: String,
    /// Number of executed plan steps.
    pub steps_executed: usize,
    /// Number of controller transitions.
    pub transitions: usize,
    /// Total analysis duration in seconds.
    pub duration_seconds: f64,
}

/// The complete session report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub metadata: ReportMetadata,
    /// Plan in effect when the session ended.
    pub final_plan: Vec<String>,
    pub past_steps: Vec<PastStep>,
    pub response: String,
}

impl SessionReport {
    pub fn new(metadata: ReportMetadata, state: SessionState) -> Self {
        Self {
            metadata,
            final_plan: state.plan,
            past_steps: state.past_steps,
            response: state.response.unwrap_or_default(),
        }
    }
}
