// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Didact Contributors

//! Session context: the append-mostly log of step outputs
//!
//! Later steps build on earlier outputs through bounded slices rather than
//! the whole log, so prompts stay small as sessions grow. Every append is
//! persisted through the session store; store failures are retried before
//! they surface.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::provider::retry::{with_retry, RetryConfig};
use crate::store::{SessionDelta, SessionStore};
use crate::workflow::step::StepKind;
use crate::workflow::ContentType;

/// One recorded step output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextEntry {
    /// Step that produced the output
    pub step_id: Uuid,

    /// What kind of step it was
    pub kind: StepKind,

    /// The step's raw text output
    pub output: String,

    pub at: DateTime<Utc>,
}

impl ContextEntry {
    pub fn new(step_id: Uuid, kind: StepKind, output: impl Into<String>) -> Self {
        Self {
            step_id,
            kind,
            output: output.into(),
            at: Utc::now(),
        }
    }
}

/// Serializable point-in-time copy of one session's context, for crash resume
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub session_id: Uuid,
    pub entries: Vec<ContextEntry>,
}

/// Owns the context logs for all live sessions
///
/// The engine is the single writer; reads are cheap clones.
pub struct ContextManager {
    store: Arc<dyn SessionStore>,
    retry: RetryConfig,
    entries: Mutex<HashMap<Uuid, Vec<ContextEntry>>>,
}

impl ContextManager {
    pub fn new(store: Arc<dyn SessionStore>, retry: RetryConfig) -> Self {
        Self {
            store,
            retry,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Vec<ContextEntry>>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Append a step output and persist it
    ///
    /// The in-memory log is updated only after the store accepts the delta,
    /// so a resumed session never replays an output the store lost.
    pub async fn append(&self, session_id: Uuid, entry: ContextEntry) -> Result<()> {
        with_retry(
            || {
                let delta = SessionDelta::Context(entry.clone());
                async move { self.store.save(session_id, delta).await }
            },
            &self.retry,
            "context_append",
        )
        .await?;
        self.lock().entry(session_id).or_default().push(entry);
        Ok(())
    }

    /// The full context log for a session
    pub fn get_context(&self, session_id: Uuid) -> Vec<ContextEntry> {
        self.lock().get(&session_id).cloned().unwrap_or_default()
    }

    /// A point-in-time copy for crash resume
    pub fn snapshot(&self, session_id: Uuid) -> ContextSnapshot {
        ContextSnapshot {
            session_id,
            entries: self.get_context(session_id),
        }
    }

    /// Install a snapshot, replacing any in-memory log for that session
    ///
    /// Snapshots only ever contain completed outputs, so restoring replays
    /// exactly the work that finished before the crash.
    pub fn restore(&self, snapshot: ContextSnapshot) {
        self.lock().insert(snapshot.session_id, snapshot.entries);
    }

    /// The bounded context slice a step of `kind` reads
    ///
    /// Each step kind sees only what it builds on: planning sees the
    /// objective analysis, content generation sees analysis plus plan but not
    /// sibling artifacts, and an answer key additionally sees the quiz or
    /// worksheet it keys against.
    pub fn slice_for(&self, session_id: Uuid, kind: &StepKind) -> String {
        let entries = self.get_context(session_id);
        let mut slice = String::new();
        for entry in &entries {
            if Self::relevant(kind, &entry.kind) {
                if !slice.is_empty() {
                    slice.push_str("\n\n");
                }
                slice.push_str(&format!("## {}\n", entry.kind.name()));
                slice.push_str(&entry.output);
            }
        }
        slice
    }

    fn relevant(reader: &StepKind, entry: &StepKind) -> bool {
        match reader {
            StepKind::ObjectiveAnalysis => false,
            StepKind::Planning => matches!(entry, StepKind::ObjectiveAnalysis),
            StepKind::ContentGeneration { content_type } => match entry {
                StepKind::ObjectiveAnalysis | StepKind::Planning => true,
                StepKind::ContentGeneration {
                    content_type: produced,
                } => {
                    // Answer keys read the assessment they key against;
                    // nothing else reads sibling content
                    *content_type == ContentType::AnswerKey
                        && matches!(produced, ContentType::Quiz | ContentType::Worksheet)
                }
                _ => false,
            },
            StepKind::Remediation { .. } => {
                matches!(entry, StepKind::ObjectiveAnalysis | StepKind::Planning)
            }
            StepKind::Validation | StepKind::Formatting | StepKind::Packaging => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn manager() -> (ContextManager, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let retry = RetryConfig {
            max_retries: 2,
            base_delay_ms: 1,
            max_delay_ms: 5,
            jitter: 0.0,
        };
        (ContextManager::new(store.clone(), retry), store)
    }

    #[tokio::test]
    async fn test_append_and_read() {
        let (manager, _) = manager();
        let session_id = Uuid::new_v4();
        manager
            .append(
                session_id,
                ContextEntry::new(Uuid::new_v4(), StepKind::ObjectiveAnalysis, "objectives"),
            )
            .await
            .unwrap();

        let entries = manager.get_context(session_id);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].output, "objectives");
    }

    #[tokio::test]
    async fn test_append_persists_through_store() {
        let (manager, store) = manager();
        let session_id = Uuid::new_v4();
        manager
            .append(
                session_id,
                ContextEntry::new(Uuid::new_v4(), StepKind::Planning, "the plan"),
            )
            .await
            .unwrap();

        let record = store.load(session_id).await.unwrap().unwrap();
        assert_eq!(record.context.len(), 1);
    }

    #[tokio::test]
    async fn test_append_retries_transient_store_failure() {
        let (manager, store) = manager();
        let session_id = Uuid::new_v4();
        store.fail_next_saves(1);

        manager
            .append(
                session_id,
                ContextEntry::new(Uuid::new_v4(), StepKind::Planning, "plan"),
            )
            .await
            .unwrap();

        // Both the store and the in-memory log saw the entry exactly once
        let record = store.load(session_id).await.unwrap().unwrap();
        assert_eq!(record.context.len(), 1);
        assert_eq!(manager.get_context(session_id).len(), 1);
    }

    #[tokio::test]
    async fn test_slice_for_content_generation_excludes_siblings() {
        let (manager, _) = manager();
        let session_id = Uuid::new_v4();
        for (kind, output) in [
            (StepKind::ObjectiveAnalysis, "analysis"),
            (StepKind::Planning, "plan"),
            (
                StepKind::ContentGeneration {
                    content_type: ContentType::Slides,
                },
                "slide deck",
            ),
        ] {
            manager
                .append(session_id, ContextEntry::new(Uuid::new_v4(), kind, output))
                .await
                .unwrap();
        }

        let slice = manager.slice_for(
            session_id,
            &StepKind::ContentGeneration {
                content_type: ContentType::Quiz,
            },
        );
        assert!(slice.contains("analysis"));
        assert!(slice.contains("plan"));
        assert!(!slice.contains("slide deck"));
    }

    #[tokio::test]
    async fn test_answer_key_reads_quiz_output() {
        let (manager, _) = manager();
        let session_id = Uuid::new_v4();
        manager
            .append(
                session_id,
                ContextEntry::new(
                    Uuid::new_v4(),
                    StepKind::ContentGeneration {
                        content_type: ContentType::Quiz,
                    },
                    "Q1: What is a function?",
                ),
            )
            .await
            .unwrap();

        let slice = manager.slice_for(
            session_id,
            &StepKind::ContentGeneration {
                content_type: ContentType::AnswerKey,
            },
        );
        assert!(slice.contains("What is a function?"));
    }

    #[tokio::test]
    async fn test_snapshot_restore_roundtrip() {
        let (seeded, _) = manager();
        let session_id = Uuid::new_v4();
        seeded
            .append(
                session_id,
                ContextEntry::new(Uuid::new_v4(), StepKind::Planning, "plan"),
            )
            .await
            .unwrap();

        let snapshot = seeded.snapshot(session_id);
        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: ContextSnapshot = serde_json::from_str(&json).unwrap();

        let (fresh, _) = manager();
        fresh.restore(parsed);
        assert_eq!(fresh.get_context(session_id).len(), 1);
    }

    #[test]
    fn test_planning_reads_only_analysis() {
        assert!(ContextManager::relevant(
            &StepKind::Planning,
            &StepKind::ObjectiveAnalysis
        ));
        assert!(!ContextManager::relevant(
            &StepKind::Planning,
            &StepKind::ContentGeneration {
                content_type: ContentType::Quiz
            }
        ));
    }
}
