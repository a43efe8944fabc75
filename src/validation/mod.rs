// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Didact Contributors

//! Validation layer: issue taxonomy, reports, pipeline and remediation
//!
//! Every generated artifact is scored 0-100 by an ordered set of validators.
//! A validator that fails internally is excluded from the aggregate and
//! recorded as "not evaluated"; it never blocks the session.

pub mod pipeline;
pub mod remediation;
pub mod validators;

pub use pipeline::{ValidationPipeline, Validator, ValidatorOutcome};
pub use remediation::{Remediator, Remediators};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How bad an issue is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// What dimension an issue belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Readability,
    Structure,
    Alignment,
    Accessibility,
    Custom(String),
}

/// One concrete problem a validator found
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub message: String,

    /// Where in the artifact, when the validator can point at it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// The remediation step synthesized to address this issue, once one is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation_id: Option<Uuid>,
}

/// Aggregate score for an artifact
///
/// `Unevaluated` is distinct from a perfect score: it means no validator
/// produced a result, so nothing is known about the artifact's quality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum OverallScore {
    Unevaluated,
    Scored(f64),
}

impl OverallScore {
    /// Whether the score meets the acceptance threshold
    ///
    /// Unevaluated artifacts pass: with nothing known, nothing triggers
    /// remediation.
    pub fn is_acceptable(&self, threshold: f64) -> bool {
        match self {
            OverallScore::Unevaluated => true,
            OverallScore::Scored(score) => *score >= threshold,
        }
    }
}

/// What validation concluded about one artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub score: OverallScore,
    pub issues: Vec<Issue>,

    /// Validators that failed internally and were excluded from the score
    #[serde(default)]
    pub not_evaluated: Vec<String>,

    pub evaluated_at: DateTime<Utc>,
}

impl ValidationReport {
    /// Issues of at least the given severity
    pub fn issues_at_least(&self, severity: Severity) -> Vec<&Issue> {
        self.issues.iter().filter(|i| i.severity >= severity).collect()
    }
}
