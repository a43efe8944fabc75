// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Didact Contributors

//! Sessions: one end-to-end content-generation lifecycle
//!
//! The session is the unit of resumability. Its state machine is
//! `Draft → Planning → Executing → {Completed | Failed | Cancelled}`,
//! and only the workflow engine mutates it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DidactError, Result};
use crate::workflow::step::{Step, StepStatus};
use crate::workflow::GenerationRequest;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Draft,
    Planning,
    Executing,
    Completed,
    Failed,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Failed | SessionState::Cancelled
        )
    }
}

/// One end-to-end content-generation request lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub request: GenerationRequest,
    pub state: SessionState,

    /// Ordered steps, expanded during Planning
    pub steps: Vec<Step>,

    /// Adapter the session is pinned to for stylistic consistency
    pub pinned_adapter: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create a draft session for a request
    pub fn new(request: GenerationRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            state: SessionState::Draft,
            steps: Vec::new(),
            pinned_adapter: None,
            created_at: Utc::now(),
        }
    }

    /// Advance the state machine, rejecting illegal transitions
    pub fn transition(&mut self, to: SessionState) -> Result<()> {
        use SessionState::*;
        let allowed = matches!(
            (self.state, to),
            (Draft, Planning)
                | (Draft, Cancelled)
                | (Planning, Executing)
                | (Planning, Failed)
                | (Planning, Cancelled)
                | (Executing, Completed)
                | (Executing, Failed)
                | (Executing, Cancelled)
                // Retrying an errored step re-enters Executing
                | (Failed, Executing)
        );
        if !allowed {
            return Err(DidactError::Session(format!(
                "illegal session transition {:?} -> {:?} for session {}",
                self.state, to, self.id
            )));
        }
        tracing::debug!(session = %self.id, from = ?self.state, to = ?to, "session transition");
        self.state = to;
        Ok(())
    }

    /// Find a step by id
    pub fn step(&self, step_id: Uuid) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    /// Find a step mutably by id
    pub fn step_mut(&mut self, step_id: Uuid) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.id == step_id)
    }

    /// The index of the next non-terminal step, if any
    pub fn next_pending_index(&self) -> Option<usize> {
        self.steps.iter().position(|s| !s.status.is_terminal())
    }

    /// Mark all non-terminal steps cancelled (cancellation is terminal)
    pub fn cancel_remaining_steps(&mut self) {
        for step in &mut self.steps {
            if !step.status.is_terminal() {
                // Pending and InProgress both cancel cleanly
                let _ = step.transition(StepStatus::Cancelled);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::step::StepKind;
    use crate::workflow::ContentType;

    fn session() -> Session {
        Session::new(GenerationRequest::new("Topic", vec![ContentType::Quiz]))
    }

    #[test]
    fn test_happy_path() {
        let mut s = session();
        s.transition(SessionState::Planning).unwrap();
        s.transition(SessionState::Executing).unwrap();
        s.transition(SessionState::Completed).unwrap();
        assert!(s.state.is_terminal());
    }

    #[test]
    fn test_cancelled_is_terminal() {
        let mut s = session();
        s.transition(SessionState::Planning).unwrap();
        s.transition(SessionState::Cancelled).unwrap();
        assert!(s.transition(SessionState::Executing).is_err());
        assert!(s.transition(SessionState::Planning).is_err());
    }

    #[test]
    fn test_failed_can_reenter_executing() {
        let mut s = session();
        s.transition(SessionState::Planning).unwrap();
        s.transition(SessionState::Executing).unwrap();
        s.transition(SessionState::Failed).unwrap();
        // Retrying an errored step
        s.transition(SessionState::Executing).unwrap();
    }

    #[test]
    fn test_draft_cannot_jump_to_executing() {
        let mut s = session();
        assert!(s.transition(SessionState::Executing).is_err());
    }

    #[test]
    fn test_cancel_remaining_steps() {
        let mut s = session();
        s.steps.push(Step::new(StepKind::Validation));
        s.steps.push(Step::new(StepKind::Planning));
        s.steps[0].transition(StepStatus::InProgress).unwrap();
        s.steps[0].transition(StepStatus::Completed).unwrap();
        s.steps[1].transition(StepStatus::InProgress).unwrap();

        s.cancel_remaining_steps();
        assert_eq!(s.steps[0].status, StepStatus::Completed);
        assert_eq!(s.steps[1].status, StepStatus::Cancelled);
    }

    #[test]
    fn test_next_pending_index() {
        let mut s = session();
        s.steps.push(Step::new(StepKind::Validation));
        s.steps.push(Step::new(StepKind::Planning));
        assert_eq!(s.next_pending_index(), Some(0));

        s.steps[0].transition(StepStatus::InProgress).unwrap();
        s.steps[0].transition(StepStatus::Completed).unwrap();
        assert_eq!(s.next_pending_index(), Some(1));
    }
}
