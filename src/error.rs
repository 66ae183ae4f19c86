//! Error taxonomy for the plan-and-execute core.
//!
//! Nothing in the core recovers from these. Components log the failure with
//! context and hand it back to the caller of the controller.

use thiserror::Error;

/// Errors surfaced by the planner, step executor, replanner and controller.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Required credentials are missing. Raised before any session starts.
    #[error("Missing required environment variables: {}", .missing.join(", "))]
    Config { missing: Vec<String> },

    /// A completion call failed or returned output that does not fit the schema.
    #[error("Model error: {0}")]
    Model(String),

    /// A tool call failed.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// The controller reached a state its invariants should rule out.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The step ceiling was hit before the model produced a final response.
    #[error("Recursion limit of {limit} transitions reached without a final response")]
    RecursionLimitExceeded { limit: usize },

    /// The caller cancelled the session between two transitions.
    #[error("Session cancelled")]
    Cancelled,
}

impl AgentError {
    pub fn model(message: impl Into<String>) -> Self {
        AgentError::Model(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        AgentError::InvalidState(message.into())
    }
}

/// Failures raised by a tool adapter.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The external capability could not be reached or answered with an error.
    /// Aborts the current step.
    #[error("Tool `{tool}` failed: {message}")]
    Transport { tool: String, message: String },

    /// The tool refused the query (unknown path, file outside the workspace).
    /// Reported back to the model instead of aborting.
    #[error("{0}")]
    Rejected(String),
}

impl ToolError {
    pub fn transport(tool: &str, message: impl Into<String>) -> Self {
        ToolError::Transport {
            tool: tool.to_string(),
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        ToolError::Rejected(message.into())
    }
}
