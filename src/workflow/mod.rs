// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Didact Contributors

//! Workflow layer: requests, sessions, planning and execution
//!
//! The engine owns the Session state machine and is the single writer of a
//! session's context. Steps execute strictly in order within a session.

pub mod context;
pub mod engine;
pub mod executor;
pub mod plan;
pub mod prompts;
pub mod session;
pub mod step;

pub use context::{ContextEntry, ContextManager, ContextSnapshot};
pub use engine::{CancelToken, WorkflowEngine};
pub use session::{Session, SessionState};
pub use step::{Step, StepKind, StepStatus};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::artifact::GeneratedArtifact;
use crate::error::{DidactError, Result};

/// Kinds of educational artifacts the engine can produce
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Slides,
    Notes,
    Worksheet,
    Quiz,
    Rubric,
    /// Gated by [`AdditionalOptions::include_answer_key`]; requires a Quiz or
    /// Worksheet in the request
    AnswerKey,
    /// Gated by [`AdditionalOptions::include_instructor_guide`]
    InstructorGuide,
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ContentType::Slides => "slides",
            ContentType::Notes => "notes",
            ContentType::Worksheet => "worksheet",
            ContentType::Quiz => "quiz",
            ContentType::Rubric => "rubric",
            ContentType::AnswerKey => "answer key",
            ContentType::InstructorGuide => "instructor guide",
        };
        write!(f, "{name}")
    }
}

/// Target audience complexity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Introductory,
    #[default]
    Intermediate,
    Advanced,
}

/// Named, enumerated extras beyond the requested content types
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdditionalOptions {
    /// Generate an answer key for quizzes/worksheets
    #[serde(default)]
    pub include_answer_key: bool,

    /// Generate an instructor guide
    #[serde(default)]
    pub include_instructor_guide: bool,

    /// Generate a grading rubric even when not listed as a content type
    #[serde(default)]
    pub include_rubric: bool,
}

/// A content-generation request. Immutable once a session starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Lesson topic
    pub topic: String,

    /// Who the material is for
    pub audience: String,

    /// Lesson duration in minutes
    pub duration_minutes: u32,

    /// Difficulty level
    pub complexity: Complexity,

    /// Ordered learning objectives
    pub learning_objectives: Vec<String>,

    /// Requested content types, in order
    pub content_types: Vec<ContentType>,

    /// Named extras
    #[serde(default)]
    pub options: AdditionalOptions,

    /// Session token budget ceiling
    pub budget_tokens: u64,
}

impl GenerationRequest {
    /// Create a request with defaults for the optional knobs
    pub fn new(topic: impl Into<String>, content_types: Vec<ContentType>) -> Self {
        Self {
            topic: topic.into(),
            audience: "general learners".to_string(),
            duration_minutes: 60,
            complexity: Complexity::default(),
            learning_objectives: Vec::new(),
            content_types,
            options: AdditionalOptions::default(),
            budget_tokens: 100_000,
        }
    }

    /// Set the audience
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = audience.into();
        self
    }

    /// Set the duration
    pub fn with_duration_minutes(mut self, minutes: u32) -> Self {
        self.duration_minutes = minutes;
        self
    }

    /// Set the complexity
    pub fn with_complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = complexity;
        self
    }

    /// Set the ordered learning objectives
    pub fn with_objectives(mut self, objectives: Vec<String>) -> Self {
        self.learning_objectives = objectives;
        self
    }

    /// Set the additional options
    pub fn with_options(mut self, options: AdditionalOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the session token budget
    pub fn with_budget_tokens(mut self, budget: u64) -> Self {
        self.budget_tokens = budget;
        self
    }

    /// Structural validation, run by the session's Validation step
    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(DidactError::Config("topic must not be empty".to_string()));
        }
        if self.content_types.is_empty() {
            return Err(DidactError::Config(
                "at least one content type must be requested".to_string(),
            ));
        }
        if self.budget_tokens == 0 {
            return Err(DidactError::Config(
                "budget_tokens must be positive".to_string(),
            ));
        }
        if self.duration_minutes == 0 {
            return Err(DidactError::Config(
                "duration_minutes must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether the answer-key precondition holds (something to key against)
    pub fn has_answer_key_source(&self) -> bool {
        self.content_types
            .iter()
            .any(|t| matches!(t, ContentType::Quiz | ContentType::Worksheet))
    }
}

/// One failed step surfaced in the final result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationFailure {
    pub step_id: Uuid,
    /// Human-readable message
    pub message: String,
    /// Whether a user-initiated retry of this step is offered
    pub retry_offered: bool,
}

/// Final outcome of a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub success: bool,
    pub artifacts: Vec<GeneratedArtifact>,
    pub errors: Vec<GenerationFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = GenerationRequest::new(
            "Intro to Functions",
            vec![ContentType::Slides, ContentType::Quiz],
        )
        .with_audience("9th grade")
        .with_duration_minutes(45)
        .with_complexity(Complexity::Introductory)
        .with_objectives(vec!["Define a function".to_string()])
        .with_budget_tokens(1000);

        assert_eq!(request.topic, "Intro to Functions");
        assert_eq!(request.content_types.len(), 2);
        assert_eq!(request.budget_tokens, 1000);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_request_validation_rejects_empty_topic() {
        let request = GenerationRequest::new("  ", vec![ContentType::Quiz]);
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_request_validation_rejects_no_content_types() {
        let request = GenerationRequest::new("Topic", vec![]);
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_request_validation_rejects_zero_budget() {
        let request = GenerationRequest::new("Topic", vec![ContentType::Quiz]).with_budget_tokens(0);
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_answer_key_source() {
        let with_quiz = GenerationRequest::new("T", vec![ContentType::Quiz]);
        assert!(with_quiz.has_answer_key_source());

        let slides_only = GenerationRequest::new("T", vec![ContentType::Slides]);
        assert!(!slides_only.has_answer_key_source());
    }

    #[test]
    fn test_content_type_display() {
        assert_eq!(ContentType::Slides.to_string(), "slides");
        assert_eq!(ContentType::AnswerKey.to_string(), "answer key");
    }

    #[test]
    fn test_failure_serializes_camel_case() {
        let failure = GenerationFailure {
            step_id: Uuid::new_v4(),
            message: "budget exceeded".to_string(),
            retry_offered: false,
        };
        let json = serde_json::to_string(&failure).unwrap();
        assert!(json.contains("stepId"));
        assert!(json.contains("retryOffered"));
    }
}
