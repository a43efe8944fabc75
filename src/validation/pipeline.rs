// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Didact Contributors

//! Validation pipeline: ordered validators, weighted aggregation
//!
//! Validators run in registration order. Each returns a 0-100 score plus
//! issues; the pipeline aggregates scores weighted per validator. An internal
//! validator error excludes that validator from the aggregate and records it
//! in `not_evaluated`.

use chrono::Utc;

use crate::artifact::GeneratedArtifact;
use crate::error::Result;
use crate::validation::validators::{
    AccessibilityValidator, AlignmentValidator, ReadabilityValidator, StructureValidator,
};
use crate::validation::{Issue, OverallScore, ValidationReport};
use crate::workflow::GenerationRequest;

/// What one validator concluded
#[derive(Debug, Clone)]
pub struct ValidatorOutcome {
    /// 0-100, clamped by the pipeline
    pub score: f64,
    pub issues: Vec<Issue>,
}

/// One quality check over a generated artifact
pub trait Validator: Send + Sync {
    /// Stable name, used in logs and `not_evaluated`
    fn name(&self) -> &str;

    /// Relative weight in the aggregate score
    fn weight(&self) -> f64 {
        1.0
    }

    /// Score the artifact; an `Err` is an internal validator failure, not a
    /// verdict on the content
    fn validate(
        &self,
        artifact: &GeneratedArtifact,
        request: &GenerationRequest,
    ) -> Result<ValidatorOutcome>;
}

/// Ordered, configurable set of validators
pub struct ValidationPipeline {
    validators: Vec<Box<dyn Validator>>,
}

impl Default for ValidationPipeline {
    /// The built-in validator set: readability, structure, alignment,
    /// accessibility
    fn default() -> Self {
        Self {
            validators: vec![
                Box::new(ReadabilityValidator),
                Box::new(StructureValidator),
                Box::new(AlignmentValidator),
                Box::new(AccessibilityValidator),
            ],
        }
    }
}

impl ValidationPipeline {
    /// An empty pipeline; scores everything `Unevaluated`
    pub fn empty() -> Self {
        Self {
            validators: Vec::new(),
        }
    }

    /// Build a pipeline from an explicit validator list
    pub fn with_validators(validators: Vec<Box<dyn Validator>>) -> Self {
        Self { validators }
    }

    /// Append a validator to the end of the order
    pub fn push(&mut self, validator: Box<dyn Validator>) {
        self.validators.push(validator);
    }

    /// Run every validator over the artifact and aggregate
    pub fn run(&self, artifact: &GeneratedArtifact, request: &GenerationRequest) -> ValidationReport {
        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        let mut issues = Vec::new();
        let mut not_evaluated = Vec::new();

        for validator in &self.validators {
            match validator.validate(artifact, request) {
                Ok(outcome) => {
                    let score = outcome.score.clamp(0.0, 100.0);
                    weighted_sum += score * validator.weight();
                    weight_total += validator.weight();
                    issues.extend(outcome.issues);
                    tracing::debug!(
                        validator = validator.name(),
                        artifact = %artifact.id,
                        score,
                        "validator scored artifact"
                    );
                }
                Err(error) => {
                    tracing::warn!(
                        validator = validator.name(),
                        artifact = %artifact.id,
                        error = %error,
                        "validator failed internally, excluded from score"
                    );
                    not_evaluated.push(validator.name().to_string());
                }
            }
        }

        let score = if weight_total > 0.0 {
            OverallScore::Scored(weighted_sum / weight_total)
        } else {
            OverallScore::Unevaluated
        };

        ValidationReport {
            score,
            issues,
            not_evaluated,
            evaluated_at: Utc::now(),
        }
    }
}
