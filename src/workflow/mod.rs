//! Plan-execute-replan workflow.
//!
//! The controller only sees the three traits below; the LLM-backed
//! implementations live in `planner`, `replanner` and `agent::agent_loop`.

pub mod controller;
pub mod planner;
pub mod replanner;

pub use controller::{Cancellation, Controller};
pub use planner::LlmPlanner;
pub use replanner::LlmReplanner;

use crate::error::AgentError;
use crate::models::{Act, PastStep, Plan, SessionState};
use async_trait::async_trait;

/// Produces the initial plan for an objective.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, objective: &str) -> Result<Plan, AgentError>;
}

/// Executes the first step of the current plan.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// Runs `plan[0]`. An empty plan is `AgentError::InvalidState`.
    async fn execute_step(&self, plan: &[String], objective: &str) -> Result<PastStep, AgentError>;
}

/// Decides whether to finish or continue with a replacement plan.
#[async_trait]
pub trait Replanner: Send + Sync {
    async fn replan(&self, state: &SessionState) -> Result<Act, AgentError>;
}
