// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Didact Contributors

//! Generated artifacts
//!
//! An artifact is immutable once created. Remediation never edits in place;
//! it produces a new version that records which artifact it supersedes, so
//! the original stays available for audit and diff.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::ValidationReport;
use crate::workflow::ContentType;

/// Output format of an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactFormat {
    Markdown,
    Json,
}

/// Generation metadata recorded with each artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// Adapter that produced the content
    pub provider_id: String,

    /// Model that served the call
    pub model: String,

    /// Prompt tokens consumed
    pub input_tokens: u64,

    /// Completion tokens produced
    pub output_tokens: u64,

    /// Dollar cost of the call (zero for local backends)
    pub cost_usd: f64,

    /// Wall-clock latency of the producing call, in milliseconds
    pub latency_ms: u64,

    /// Set when the session's pinned adapter failed mid-session and the
    /// router fell back; names the adapter that was abandoned
    pub fallback_from: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// One generated content unit (e.g. one quiz)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub id: Uuid,
    pub content_type: ContentType,
    pub content: String,
    pub format: ArtifactFormat,

    /// 1 for the original; remediation bumps this
    pub version: u32,

    /// The artifact this version replaces, if any
    pub supersedes: Option<Uuid>,

    pub metadata: ArtifactMetadata,

    /// Attached after the validation pipeline runs
    pub validation: Option<ValidationReport>,
}

impl GeneratedArtifact {
    /// Create a first-version artifact
    pub fn new(content_type: ContentType, content: String, metadata: ArtifactMetadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            content_type,
            content,
            format: ArtifactFormat::Markdown,
            version: 1,
            supersedes: None,
            metadata,
            validation: None,
        }
    }

    /// Create the next version of this artifact with remediated content
    ///
    /// The receiver is untouched; the new version records it in `supersedes`.
    pub fn next_version(&self, content: String, metadata: ArtifactMetadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            content_type: self.content_type.clone(),
            content,
            format: self.format,
            version: self.version + 1,
            supersedes: Some(self.id),
            metadata,
            validation: None,
        }
    }

    /// Attach a validation report, consuming the unvalidated value
    pub fn with_validation(mut self, report: ValidationReport) -> Self {
        self.validation = Some(report);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(provider: &str) -> ArtifactMetadata {
        ArtifactMetadata {
            provider_id: provider.to_string(),
            model: "mock-model".to_string(),
            input_tokens: 100,
            output_tokens: 280,
            cost_usd: 0.0,
            latency_ms: 900,
            fallback_from: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_new_artifact_is_version_one() {
        let artifact =
            GeneratedArtifact::new(ContentType::Quiz, "Q1".to_string(), metadata("ollama"));
        assert_eq!(artifact.version, 1);
        assert!(artifact.supersedes.is_none());
        assert!(artifact.validation.is_none());
    }

    #[test]
    fn test_next_version_supersedes_original() {
        let original =
            GeneratedArtifact::new(ContentType::Quiz, "Q1".to_string(), metadata("ollama"));
        let remediated = original.next_version("Q1 (clearer)".to_string(), metadata("ollama"));

        assert_eq!(remediated.version, 2);
        assert_eq!(remediated.supersedes, Some(original.id));
        assert_ne!(remediated.id, original.id);
        // The original is untouched
        assert_eq!(original.content, "Q1");
        assert_eq!(original.version, 1);
    }

    #[test]
    fn test_metadata_records_fallback() {
        let mut meta = metadata("anthropic");
        meta.fallback_from = Some("ollama".to_string());
        let artifact = GeneratedArtifact::new(ContentType::Slides, "S1".to_string(), meta);
        assert_eq!(artifact.metadata.provider_id, "anthropic");
        assert_eq!(artifact.metadata.fallback_from.as_deref(), Some("ollama"));
    }

    #[test]
    fn test_artifact_serializes() {
        let artifact =
            GeneratedArtifact::new(ContentType::Notes, "notes".to_string(), metadata("ollama"));
        let json = serde_json::to_string(&artifact).unwrap();
        assert!(json.contains("notes"));
        let parsed: GeneratedArtifact = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, artifact.id);
    }
}
