// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Didact Contributors

//! Remediation: turning validation issues into rework steps
//!
//! A remediator declares which issue kinds it can fix. When an artifact
//! scores below the acceptance threshold and a registered remediator claims
//! one of its issues, a Remediation step is synthesized that produces a new
//! artifact version. The original version is always retained. Rounds are
//! bounded per artifact lineage so a stubborn artifact cannot loop forever.

use crate::artifact::GeneratedArtifact;
use crate::config::settings::ValidationConfig;
use crate::validation::{Issue, IssueKind, ValidationReport};
use crate::workflow::step::{Step, StepKind};

/// Declares the issue kinds an implementation can fix
pub trait Remediator: Send + Sync {
    /// Stable id, used in logs
    fn id(&self) -> &str;

    /// Whether this remediator handles issues of the given kind
    fn claims(&self, kind: &IssueKind) -> bool;
}

/// Fixes the built-in lexical issue kinds by prompting a full rewrite
pub struct ContentRemediator;

impl Remediator for ContentRemediator {
    fn id(&self) -> &str {
        "content"
    }

    fn claims(&self, kind: &IssueKind) -> bool {
        matches!(
            kind,
            IssueKind::Readability
                | IssueKind::Structure
                | IssueKind::Alignment
                | IssueKind::Accessibility
        )
    }
}

/// The registered remediator set
pub struct Remediators {
    remediators: Vec<Box<dyn Remediator>>,
}

impl Default for Remediators {
    fn default() -> Self {
        Self {
            remediators: vec![Box::new(ContentRemediator)],
        }
    }
}

impl Remediators {
    /// An empty set; never synthesizes remediation steps
    pub fn empty() -> Self {
        Self {
            remediators: Vec::new(),
        }
    }

    /// Register a remediator
    pub fn push(&mut self, remediator: Box<dyn Remediator>) {
        self.remediators.push(remediator);
    }

    fn claimed<'a>(&self, issues: &'a [Issue]) -> Vec<&'a Issue> {
        issues
            .iter()
            .filter(|issue| self.remediators.iter().any(|r| r.claims(&issue.kind)))
            .collect()
    }

    /// Decide whether a validated artifact gets a remediation step
    ///
    /// Returns the step to insert after the current one, or `None` when the
    /// score is acceptable, nothing claims the issues, auto-remediation is
    /// off, or the artifact has already used its rounds. Claimed issues in
    /// the report are linked to the synthesized step.
    pub fn synthesize(
        &self,
        artifact: &GeneratedArtifact,
        report: &mut ValidationReport,
        config: &ValidationConfig,
    ) -> Option<Step> {
        if !config.auto_remediation {
            return None;
        }
        if report.score.is_acceptable(config.acceptable_score) {
            return None;
        }
        // version 1 has had zero rounds, version 2 one round, and so on
        if artifact.version > config.max_remediation_rounds {
            tracing::debug!(
                artifact = %artifact.id,
                version = artifact.version,
                "remediation rounds exhausted"
            );
            return None;
        }
        if self.claimed(&report.issues).is_empty() {
            return None;
        }

        tracing::info!(
            artifact = %artifact.id,
            content_type = %artifact.content_type,
            "synthesizing remediation step"
        );
        let step = Step::new(StepKind::Remediation {
            content_type: artifact.content_type.clone(),
            source_artifact: artifact.id,
        });
        for issue in report.issues.iter_mut() {
            if self.remediators.iter().any(|r| r.claims(&issue.kind)) {
                issue.remediation_id = Some(step.id);
            }
        }
        Some(step)
    }

    /// The claimed issues from a report, for prompt rendering
    pub fn claimed_issues(&self, report: &ValidationReport) -> Vec<Issue> {
        self.claimed(&report.issues).into_iter().cloned().collect()
    }
}
