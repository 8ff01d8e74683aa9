//! Wizard session — one user's traversal of the step chain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::registry::StepId;

/// Where a session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    /// Waiting for the user to answer the given step.
    Awaiting(StepId),
    /// Every step answered; the lead is being (or has been) finalized.
    Completed,
    /// Ended without a lead, by the user or by the entry-step bail-out.
    Cancelled,
}

impl FlowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::Completed | FlowState::Cancelled)
    }

    /// The awaited step, if the session is still live.
    pub fn awaiting(&self) -> Option<StepId> {
        match self {
            FlowState::Awaiting(id) => Some(*id),
            _ => None,
        }
    }
}

impl std::fmt::Display for FlowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowState::Awaiting(id) => write!(f, "awaiting {}", id),
            FlowState::Completed => write!(f, "completed"),
            FlowState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// One user's in-flight (or just-finished) conversation.
///
/// Answers are appended in step order and each step can be answered once;
/// both invariants are enforced here rather than trusted to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub state: FlowState,
    answers: Vec<(StepId, String)>,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: impl Into<String>, first_step: StepId) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            state: FlowState::Awaiting(first_step),
            answers: Vec::new(),
            created_at: now,
            last_activity_at: now,
        }
    }

    /// The step currently awaiting an answer, if any.
    pub fn current_step(&self) -> Option<StepId> {
        self.state.awaiting()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Recorded answers in the order the steps were answered.
    pub fn answers(&self) -> &[(StepId, String)] {
        &self.answers
    }

    /// The recorded answer token for one step.
    pub fn answer(&self, step: StepId) -> Option<&str> {
        self.answers
            .iter()
            .find(|(id, _)| *id == step)
            .map(|(_, token)| token.as_str())
    }

    /// Record `token` as the answer to the awaited step and move on.
    ///
    /// Returns the next awaited step, or `None` when the chain is exhausted
    /// and the session is now completed.
    pub fn accept_answer(
        &mut self,
        token: impl Into<String>,
        next: Option<StepId>,
    ) -> Result<Option<StepId>, String> {
        let FlowState::Awaiting(step) = self.state else {
            return Err(format!("session is already {}", self.state));
        };
        if self.answer(step).is_some() {
            return Err(format!("step {} already answered", step));
        }
        self.answers.push((step, token.into()));
        self.state = match next {
            Some(id) => FlowState::Awaiting(id),
            None => FlowState::Completed,
        };
        self.touch();
        Ok(next)
    }

    /// Mark the session cancelled. Terminal; no answer is recorded.
    pub fn cancel(&mut self) {
        self.state = FlowState::Cancelled;
        self.touch();
    }

    /// Refresh the idle clock.
    pub fn touch(&mut self) {
        self.last_activity_at = Utc::now();
    }

    /// Whether the session has been idle for at least `ttl`.
    pub fn idle_longer_than(&self, ttl: std::time::Duration) -> bool {
        let idle = Utc::now().signed_duration_since(self.last_activity_at);
        idle.to_std().map(|d| d >= ttl).unwrap_or(false)
    }
}
