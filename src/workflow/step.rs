// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Didact Contributors

//! Steps: atomic units of orchestrated work within a session
//!
//! Status transitions are monotonic: Pending → InProgress → {Completed|Error}.
//! The only way back is `reset_for_retry`, which models an explicit user
//! retry of an errored step.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DidactError, Result};
use crate::workflow::ContentType;

/// What a step does
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepKind {
    /// Structural validation of the request (no provider call)
    Validation,
    /// Analyze learning objectives into teachable units
    ObjectiveAnalysis,
    /// Synthesize a lesson plan scaffold
    Planning,
    /// Generate one artifact of the given type
    ContentGeneration { content_type: ContentType },
    /// Rework an existing artifact in response to validation issues
    Remediation {
        content_type: ContentType,
        source_artifact: Uuid,
    },
    /// Normalize completed artifacts (no provider call)
    Formatting,
    /// Assemble the final result (no provider call)
    Packaging,
}

impl StepKind {
    /// Whether executing this step dispatches a provider call
    pub fn needs_provider(&self) -> bool {
        matches!(
            self,
            StepKind::ObjectiveAnalysis
                | StepKind::Planning
                | StepKind::ContentGeneration { .. }
                | StepKind::Remediation { .. }
        )
    }

    /// Content type this step produces or reworks, if any
    pub fn content_type(&self) -> Option<&ContentType> {
        match self {
            StepKind::ContentGeneration { content_type }
            | StepKind::Remediation { content_type, .. } => Some(content_type),
            _ => None,
        }
    }

    /// Short name for logging and progress events
    pub fn name(&self) -> String {
        match self {
            StepKind::Validation => "validation".to_string(),
            StepKind::ObjectiveAnalysis => "objective analysis".to_string(),
            StepKind::Planning => "planning".to_string(),
            StepKind::ContentGeneration { content_type } => {
                format!("generate {content_type}")
            }
            StepKind::Remediation { content_type, .. } => {
                format!("remediate {content_type}")
            }
            StepKind::Formatting => "formatting".to_string(),
            StepKind::Packaging => "packaging".to_string(),
        }
    }
}

/// Step lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Error,
    /// Precondition content type was not requested; never used to dodge a failure
    Skipped,
    Cancelled,
}

impl StepStatus {
    /// Whether this is a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Completed | StepStatus::Error | StepStatus::Skipped | StepStatus::Cancelled
        )
    }
}

/// One atomic unit of orchestrated work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub id: Uuid,
    pub kind: StepKind,
    pub status: StepStatus,

    /// Attempts beyond the first for the current execution
    pub retry_count: u32,

    /// Adapter that produced the step's output, once completed
    pub provider_id: Option<String>,

    /// Human-readable failure detail, once errored
    pub error: Option<String>,
}

impl Step {
    pub fn new(kind: StepKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            status: StepStatus::Pending,
            retry_count: 0,
            provider_id: None,
            error: None,
        }
    }

    /// Advance the status, enforcing monotonic transitions
    pub fn transition(&mut self, to: StepStatus) -> Result<()> {
        use StepStatus::*;
        let allowed = matches!(
            (self.status, to),
            (Pending, InProgress)
                | (Pending, Skipped)
                | (Pending, Cancelled)
                | (InProgress, Completed)
                | (InProgress, Error)
                | (InProgress, Cancelled)
        );
        if !allowed {
            return Err(DidactError::Step(format!(
                "illegal step transition {:?} -> {:?} for step {}",
                self.status, to, self.id
            )));
        }
        self.status = to;
        Ok(())
    }

    /// Explicit user retry: Error → Pending, clearing the failure detail
    pub fn reset_for_retry(&mut self) -> Result<()> {
        if self.status != StepStatus::Error {
            return Err(DidactError::Step(format!(
                "step {} is {:?}, only errored steps can be retried",
                self.id, self.status
            )));
        }
        self.status = StepStatus::Pending;
        self.retry_count = 0;
        self.error = None;
        Ok(())
    }
}
