// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Didact Contributors

//! Built-in validators
//!
//! All four are cheap lexical heuristics over the artifact text. They judge
//! surface quality only; none of them calls a provider.

use crate::artifact::GeneratedArtifact;
use crate::error::Result;
use crate::validation::pipeline::{Validator, ValidatorOutcome};
use crate::validation::{Issue, IssueKind, Severity};
use crate::workflow::{ContentType, GenerationRequest};

const LONG_SENTENCE_WORDS: usize = 28;
const LONG_WORD_CHARS: usize = 13;

fn strip_markdown_noise(content: &str) -> String {
    content
        .lines()
        .filter(|line| !line.trim_start().starts_with('|') && !line.trim().starts_with("---"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Penalizes run-on sentences and dense vocabulary
pub struct ReadabilityValidator;

impl Validator for ReadabilityValidator {
    fn name(&self) -> &str {
        "readability"
    }

    fn validate(
        &self,
        artifact: &GeneratedArtifact,
        _request: &GenerationRequest,
    ) -> Result<ValidatorOutcome> {
        let prose = strip_markdown_noise(&artifact.content);
        let sentences: Vec<&str> = prose
            .split(['.', '!', '?'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if sentences.is_empty() {
            return Ok(ValidatorOutcome {
                score: 100.0,
                issues: vec![],
            });
        }

        let words: Vec<&str> = prose.split_whitespace().collect();
        let avg_sentence_len = words.len() as f64 / sentences.len() as f64;
        let long_words = words.iter().filter(|w| w.len() > LONG_WORD_CHARS).count();
        let long_word_ratio = long_words as f64 / words.len().max(1) as f64;

        let mut score = 100.0;
        let mut issues = Vec::new();

        if avg_sentence_len > LONG_SENTENCE_WORDS as f64 {
            score -= (avg_sentence_len - LONG_SENTENCE_WORDS as f64) * 2.0;
            issues.push(Issue {
                kind: IssueKind::Readability,
                severity: Severity::Warning,
                message: format!(
                    "average sentence length is {avg_sentence_len:.0} words; aim for under {LONG_SENTENCE_WORDS}"
                ),
                location: None,
                remediation_id: None,
            });
        }
        if long_word_ratio > 0.15 {
            score -= long_word_ratio * 100.0;
            issues.push(Issue {
                kind: IssueKind::Readability,
                severity: Severity::Info,
                message: "vocabulary runs dense; prefer shorter words where possible".to_string(),
                location: None,
                remediation_id: None,
            });
        }

        Ok(ValidatorOutcome {
            score: score.max(0.0),
            issues,
        })
    }
}

/// Checks the structural markers each content type should carry
pub struct StructureValidator;

impl StructureValidator {
    fn expected_markers(content_type: &ContentType) -> Vec<(&'static str, &'static str)> {
        match content_type {
            ContentType::Slides => vec![
                ("#", "slide titles"),
                ("---", "slide separators"),
            ],
            ContentType::Notes => vec![("##", "section headings")],
            ContentType::Worksheet => vec![("1.", "numbered exercises")],
            ContentType::Quiz => vec![("1.", "numbered questions")],
            ContentType::AnswerKey => vec![("1.", "numbered answers")],
            ContentType::Rubric => vec![("|", "rubric table")],
            ContentType::InstructorGuide => vec![("##", "guide sections")],
        }
    }
}

impl Validator for StructureValidator {
    fn name(&self) -> &str {
        "structure"
    }

    fn validate(
        &self,
        artifact: &GeneratedArtifact,
        _request: &GenerationRequest,
    ) -> Result<ValidatorOutcome> {
        let markers = Self::expected_markers(&artifact.content_type);
        let mut missing = Vec::new();
        for (marker, what) in &markers {
            if !artifact.content.contains(marker) {
                missing.push(*what);
            }
        }

        let present = markers.len() - missing.len();
        let score = if markers.is_empty() {
            100.0
        } else {
            present as f64 / markers.len() as f64 * 100.0
        };

        let issues = missing
            .into_iter()
            .map(|what| Issue {
                kind: IssueKind::Structure,
                severity: Severity::Error,
                message: format!("expected {what} but found none"),
                location: None,
                remediation_id: None,
            })
            .collect();

        Ok(ValidatorOutcome { score, issues })
    }
}

/// Checks that each learning objective is reflected in the content
pub struct AlignmentValidator;

impl AlignmentValidator {
    /// Significant words of an objective (length > 3, lowercased)
    fn keywords(objective: &str) -> Vec<String> {
        objective
            .split_whitespace()
            .map(|w| {
                w.trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase()
            })
            .filter(|w| w.len() > 3)
            .collect()
    }
}

impl Validator for AlignmentValidator {
    fn name(&self) -> &str {
        "alignment"
    }

    fn validate(
        &self,
        artifact: &GeneratedArtifact,
        request: &GenerationRequest,
    ) -> Result<ValidatorOutcome> {
        if request.learning_objectives.is_empty() {
            return Ok(ValidatorOutcome {
                score: 100.0,
                issues: vec![],
            });
        }

        let content = artifact.content.to_lowercase();
        let mut covered = 0usize;
        let mut issues = Vec::new();

        for objective in &request.learning_objectives {
            let keywords = Self::keywords(objective);
            let hits = keywords.iter().filter(|k| content.contains(*k)).count();
            // Half the keywords present counts as coverage
            if keywords.is_empty() || hits * 2 >= keywords.len() {
                covered += 1;
            } else {
                issues.push(Issue {
                    kind: IssueKind::Alignment,
                    severity: Severity::Warning,
                    message: format!("objective not reflected in content: {objective}"),
                    location: None,
                    remediation_id: None,
                });
            }
        }

        Ok(ValidatorOutcome {
            score: covered as f64 / request.learning_objectives.len() as f64 * 100.0,
            issues,
        })
    }
}

/// Flags accessibility problems: images without alt text, vague link text,
/// shouting in all caps
pub struct AccessibilityValidator;

impl Validator for AccessibilityValidator {
    fn name(&self) -> &str {
        "accessibility"
    }

    fn validate(
        &self,
        artifact: &GeneratedArtifact,
        _request: &GenerationRequest,
    ) -> Result<ValidatorOutcome> {
        let mut score: f64 = 100.0;
        let mut issues = Vec::new();

        for (line_no, line) in artifact.content.lines().enumerate() {
            if line.contains("![]") {
                score -= 15.0;
                issues.push(Issue {
                    kind: IssueKind::Accessibility,
                    severity: Severity::Error,
                    message: "image without alt text".to_string(),
                    location: Some(format!("line {}", line_no + 1)),
                    remediation_id: None,
                });
            }
            if line.to_lowercase().contains("[click here]") {
                score -= 10.0;
                issues.push(Issue {
                    kind: IssueKind::Accessibility,
                    severity: Severity::Warning,
                    message: "link text should describe the destination".to_string(),
                    location: Some(format!("line {}", line_no + 1)),
                    remediation_id: None,
                });
            }
            let letters: Vec<char> = line.chars().filter(|c| c.is_alphabetic()).collect();
            if letters.len() > 12 && letters.iter().all(|c| c.is_uppercase()) {
                score -= 5.0;
                issues.push(Issue {
                    kind: IssueKind::Accessibility,
                    severity: Severity::Info,
                    message: "all-caps text is hard to read with screen readers".to_string(),
                    location: Some(format!("line {}", line_no + 1)),
                    remediation_id: None,
                });
            }
        }

        Ok(ValidatorOutcome {
            score: score.max(0.0),
            issues,
        })
    }
}
