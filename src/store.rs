// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Didact Contributors

//! Session persistence collaborator
//!
//! The engine persists sessions as small deltas rather than full rewrites so
//! a crashed process can resume from the last completed step. Store failures
//! surface as `DidactError::Store`, which the retry policy treats as
//! transient.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::artifact::GeneratedArtifact;
use crate::error::{DidactError, Result};
use crate::workflow::{ContextEntry, Session};

/// One incremental change to a persisted session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "delta", rename_all = "snake_case")]
pub enum SessionDelta {
    /// Full session snapshot (state, steps); written at transitions
    Session(Session),
    /// One appended context entry
    Context(ContextEntry),
    /// One completed artifact
    Artifact(GeneratedArtifact),
}

/// Everything persisted for one session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session: Option<Session>,
    pub context: Vec<ContextEntry>,
    pub artifacts: Vec<GeneratedArtifact>,
}

impl SessionRecord {
    fn apply(&mut self, delta: SessionDelta) {
        match delta {
            SessionDelta::Session(session) => self.session = Some(session),
            SessionDelta::Context(entry) => self.context.push(entry),
            SessionDelta::Artifact(artifact) => self.artifacts.push(artifact),
        }
    }
}

/// Persists sessions incrementally
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load everything persisted for a session
    async fn load(&self, session_id: Uuid) -> Result<Option<SessionRecord>>;

    /// Apply one delta to a session's record
    async fn save(&self, session_id: Uuid, delta: SessionDelta) -> Result<()>;
}

/// In-memory store, the default for tests and the demo binary
///
/// `fail_next_saves` injects transient failures so retry behavior can be
/// exercised without a real backend.
#[derive(Default)]
pub struct InMemoryStore {
    records: Mutex<HashMap<Uuid, SessionRecord>>,
    fail_next_saves: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` save calls fail with a transient store error
    pub fn fail_next_saves(&self, n: usize) {
        self.fail_next_saves.store(n, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, SessionRecord>> {
        match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn load(&self, session_id: Uuid) -> Result<Option<SessionRecord>> {
        Ok(self.lock().get(&session_id).cloned())
    }

    async fn save(&self, session_id: Uuid, delta: SessionDelta) -> Result<()> {
        let pending = self.fail_next_saves.load(Ordering::SeqCst);
        if pending > 0 {
            self.fail_next_saves.store(pending - 1, Ordering::SeqCst);
            return Err(DidactError::Store(
                "injected transient store failure".to_string(),
            ));
        }
        self.lock().entry(session_id).or_default().apply(delta);
        Ok(())
    }
}
