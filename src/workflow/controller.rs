//! Execution controller for the plan-execute-replan loop.
//!
//! ```text
//! Planning -> Executing -> Replanning -> Executing ... -> Terminated
//! ```
//!
//! Planning runs once. Every Executing transition appends exactly one past
//! step. Replanning either terminates with a response or replaces the plan
//! and goes back to Executing. Each node execution counts as one transition;
//! the session fails with `RecursionLimitExceeded` instead of running
//! transition `max_steps + 1`.
//!
//! A [`Session`] is pull-based: every call to [`Session::advance`] runs at
//! most one transition and yields the progress event it produced.
//! Cancellation is checked before each transition and also interrupts the
//! one in flight; an interrupted transition leaves the state untouched.

use crate::error::AgentError;
use crate::models::{Act, Phase, ProgressEvent, SessionState, StateUpdate};
use crate::workflow::{Planner, Replanner, StepExecutor};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// Shared cancellation signal for a session.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            // Register before checking the flag so a concurrent cancel is not missed
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Orchestrates planner, step executor and replanner for one objective at a time.
pub struct Controller {
    planner: Arc<dyn Planner>,
    executor: Arc<dyn StepExecutor>,
    replanner: Arc<dyn Replanner>,
    max_steps: usize,
    cancellation: Cancellation,
}

impl Controller {
    pub const DEFAULT_MAX_STEPS: usize = 40;

    pub fn new(
        planner: Arc<dyn Planner>,
        executor: Arc<dyn StepExecutor>,
        replanner: Arc<dyn Replanner>,
    ) -> Self {
        Self {
            planner,
            executor,
            replanner,
            max_steps: Self::DEFAULT_MAX_STEPS,
            cancellation: Cancellation::default(),
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    #[cfg(test)]
    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Begin a session. Nothing runs until the first [`Session::advance`].
    pub fn start(&self, objective: impl Into<String>) -> Session<'_> {
        Session {
            controller: self,
            state: SessionState::new(objective),
            phase: Phase::Planning,
            transitions: 0,
            failed: false,
        }
    }

    /// Run a session to completion, passing every progress event to `observer`.
    pub async fn run_with<F>(
        &self,
        objective: impl Into<String>,
        mut observer: F,
    ) -> Result<SessionState, AgentError>
    where
        F: FnMut(&ProgressEvent) + Send,
    {
        let mut session = self.start(objective);

        while let Some(event) = session.advance().await {
            observer(&event?);
        }

        Ok(session.into_state())
    }

    /// Run a session to completion.
    #[cfg(test)]
    pub async fn run(&self, objective: impl Into<String>) -> Result<SessionState, AgentError> {
        self.run_with(objective, |_| {}).await
    }
}

/// State of one running analysis.
pub struct Session<'c> {
    controller: &'c Controller,
    state: SessionState,
    /// Node that runs on the next advance.
    phase: Phase,
    transitions: usize,
    failed: bool,
}

impl<'c> Session<'c> {
    #[cfg(test)]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The node the next [`advance`](Self::advance) will run.
    #[cfg(test)]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn into_state(self) -> SessionState {
        self.state
    }

    /// Run the next transition.
    ///
    /// Returns `None` once the session has terminated or failed. A failure is
    /// yielded exactly once.
    pub async fn advance(&mut self) -> Option<Result<ProgressEvent, AgentError>> {
        if self.failed || self.phase == Phase::Terminated {
            return None;
        }

        let cancellation = self.controller.cancellation.clone();
        let result = tokio::select! {
            result = self.transition() => result,
            _ = cancellation.cancelled() => {
                warn!("Session cancelled while a transition was in flight");
                Err(AgentError::Cancelled)
            }
        };
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }

    async fn transition(&mut self) -> Result<ProgressEvent, AgentError> {
        let controller = self.controller;

        if controller.cancellation.is_cancelled() {
            warn!("Session cancelled after {} transitions", self.transitions);
            return Err(AgentError::Cancelled);
        }

        if self.transitions >= controller.max_steps {
            warn!(
                objective = %self.state.objective,
                "Step ceiling of {} transitions reached without a final response",
                controller.max_steps
            );
            return Err(AgentError::RecursionLimitExceeded {
                limit: controller.max_steps,
            });
        }

        self.transitions += 1;
        let phase = self.phase;
        debug!("Transition {}: {}", self.transitions, phase);

        let update = match phase {
            Phase::Planning => {
                StateUpdate::Planned(controller.planner.plan(&self.state.objective).await?)
            }
            Phase::Executing => StateUpdate::Executed(
                controller
                    .executor
                    .execute_step(&self.state.plan, &self.state.objective)
                    .await?,
            ),
            Phase::Replanning => match controller.replanner.replan(&self.state).await? {
                Act::Response(response) => StateUpdate::Responded(response),
                Act::Plan(plan) => StateUpdate::Replanned(plan),
            },
            Phase::Terminated => {
                return Err(AgentError::invalid_state(
                    "no transition out of the terminated state",
                ))
            }
        };

        let next = update.next_phase();
        self.state.apply(&update);
        self.phase = next;

        if next == Phase::Terminated {
            info!(
                "Analysis completed after {} steps ({} transitions)",
                self.state.past_steps.len(),
                self.transitions
            );
        }

        Ok(ProgressEvent {
            transition: self.transitions,
            phase,
            update,
        })
    }
}
