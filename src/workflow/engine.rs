// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Didact Contributors

//! Workflow engine: the single writer of session state
//!
//! Owns the session map, drives steps strictly in order, and mediates every
//! collaborator: executor, context, validation pipeline, progress reporter
//! and store. Steps within a session never run concurrently; separate
//! sessions are independent and may run in parallel tasks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{mpsc, Notify};
use uuid::Uuid;

use crate::artifact::{ArtifactMetadata, GeneratedArtifact};
use crate::config::settings::Settings;
use crate::error::{DidactError, Result};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::provider::budget::BudgetTracker;
use crate::provider::rate_limit::RateLimiter;
use crate::provider::registry::Router;
use crate::provider::retry::{with_retry, RetryConfig};
use crate::store::{SessionDelta, SessionStore};
use crate::validation::{Remediators, ValidationPipeline};
use crate::workflow::context::{ContextEntry, ContextManager};
use crate::workflow::executor::StepExecutor;
use crate::workflow::step::{StepKind, StepStatus};
use crate::workflow::{
    plan, prompts, ContentType, GenerationFailure, GenerationRequest, GenerationResult, Session,
    SessionState,
};

/// Cooperative cancellation token
///
/// Checked between steps and attempts, and raced against in-flight provider
/// calls: an abandoned call's partial output is discarded.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    flag: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.flag.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel` has been called
    pub async fn cancelled(&self) {
        let mut notified = std::pin::pin!(self.inner.notify.notified());
        // Register before the flag check so a concurrent cancel cannot slip
        // between them unobserved
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

/// Orchestrates sessions end to end
pub struct WorkflowEngine {
    settings: Settings,
    executor: StepExecutor,
    context: ContextManager,
    pipeline: ValidationPipeline,
    remediators: Remediators,
    progress: Arc<ProgressReporter>,
    store: Arc<dyn SessionStore>,
    store_retry: RetryConfig,

    sessions: Mutex<HashMap<Uuid, Session>>,
    cancels: Mutex<HashMap<Uuid, CancelToken>>,
    budgets: Mutex<HashMap<Uuid, Arc<BudgetTracker>>>,
    artifacts: Mutex<HashMap<Uuid, Vec<GeneratedArtifact>>>,
    started: Mutex<HashMap<Uuid, Instant>>,
    failures: Mutex<HashMap<Uuid, Vec<GenerationFailure>>>,
}

const PROGRESS_TICK_MS: u64 = 250;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Trailing whitespace stripped per line, exactly one final newline
///
/// Applied to completion text before an artifact or context entry is
/// created; stored artifacts are never rewritten afterwards.
fn normalize_content(content: &str) -> String {
    let mut normalized: String = content
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    normalized.truncate(normalized.trim_end().len());
    normalized.push('\n');
    normalized
}

impl WorkflowEngine {
    pub fn new(router: Arc<Router>, store: Arc<dyn SessionStore>, settings: Settings) -> Self {
        let limiter = Arc::new(RateLimiter::new(settings.rate_limits.clone()));
        let store_retry = RetryConfig::from(&settings.resilience);
        Self {
            executor: StepExecutor::new(router, limiter, &settings),
            context: ContextManager::new(store.clone(), store_retry.clone()),
            pipeline: ValidationPipeline::default(),
            remediators: Remediators::default(),
            progress: Arc::new(ProgressReporter::new()),
            store,
            store_retry,
            settings,
            sessions: Mutex::new(HashMap::new()),
            cancels: Mutex::new(HashMap::new()),
            budgets: Mutex::new(HashMap::new()),
            artifacts: Mutex::new(HashMap::new()),
            started: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the validator set
    pub fn with_pipeline(mut self, pipeline: ValidationPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Replace the remediator set
    pub fn with_remediators(mut self, remediators: Remediators) -> Self {
        self.remediators = remediators;
        self
    }

    /// Accept a request and create a draft session
    pub async fn submit(&self, request: GenerationRequest) -> Result<Uuid> {
        let budget = Arc::new(BudgetTracker::new(request.budget_tokens));
        let session = Session::new(request);
        let session_id = session.id;

        self.persist(session_id, SessionDelta::Session(session.clone()))
            .await?;
        lock(&self.sessions).insert(session_id, session);
        lock(&self.cancels).insert(session_id, CancelToken::new());
        lock(&self.budgets).insert(session_id, budget);

        tracing::info!(session = %session_id, "session submitted");
        Ok(session_id)
    }

    /// Subscribe to progress events for all sessions
    pub fn subscribe(&self) -> mpsc::Receiver<ProgressEvent> {
        self.progress.subscribe()
    }

    /// A copy of the session, for inspection
    pub fn session(&self, session_id: Uuid) -> Option<Session> {
        lock(&self.sessions).get(&session_id).cloned()
    }

    /// All artifacts produced so far, every version included
    pub fn artifacts(&self, session_id: Uuid) -> Vec<GeneratedArtifact> {
        lock(&self.artifacts)
            .get(&session_id)
            .cloned()
            .unwrap_or_default()
    }

    /// The session's budget tracker
    pub fn budget(&self, session_id: Uuid) -> Option<Arc<BudgetTracker>> {
        lock(&self.budgets).get(&session_id).cloned()
    }

    /// Request cancellation
    ///
    /// Draft sessions cancel immediately; a running session abandons its
    /// in-flight provider call and cancels the remaining steps. Terminal
    /// sessions reject the call.
    pub async fn cancel(&self, session_id: Uuid) -> Result<()> {
        let state = self
            .session(session_id)
            .ok_or_else(|| DidactError::Session(format!("unknown session {session_id}")))?
            .state;
        if state.is_terminal() {
            return Err(DidactError::Session(format!(
                "session {session_id} is already {state:?}"
            )));
        }

        if let Some(token) = lock(&self.cancels).get(&session_id) {
            token.cancel();
        }
        tracing::info!(session = %session_id, "cancellation requested");

        if state == SessionState::Draft {
            self.with_session(session_id, |s| s.transition(SessionState::Cancelled))??;
            self.persist_session(session_id).await?;
        }
        Ok(())
    }

    /// Run a submitted session to a terminal state
    pub async fn run(&self, session_id: Uuid) -> Result<GenerationResult> {
        self.with_session(session_id, |s| s.transition(SessionState::Planning))??;
        let steps = self.with_session(session_id, |s| plan::expand(&s.request))?;
        let total = steps.len();
        self.with_session(session_id, |s| {
            s.steps = steps;
            s.transition(SessionState::Executing)
        })??;
        self.persist_session(session_id).await?;
        tracing::info!(session = %session_id, steps = total, "plan expanded");

        self.execute_loop(session_id).await
    }

    /// Retry one errored step of a failed session
    ///
    /// Completed steps and their artifacts are untouched; only the named step
    /// re-executes.
    pub async fn retry_step(&self, session_id: Uuid, step_id: Uuid) -> Result<GenerationResult> {
        self.with_session(session_id, |s| {
            if s.state != SessionState::Failed {
                return Err(DidactError::Session(format!(
                    "session {session_id} is {:?}, only failed sessions retry steps",
                    s.state
                )));
            }
            let step = s
                .step_mut(step_id)
                .ok_or_else(|| DidactError::Step(format!("unknown step {step_id}")))?;
            step.reset_for_retry()?;
            s.transition(SessionState::Executing)
        })??;
        lock(&self.failures)
            .entry(session_id)
            .or_default()
            .retain(|f| f.step_id != step_id);
        self.persist_session(session_id).await?;
        tracing::info!(session = %session_id, step = %step_id, "retrying step");

        self.execute_loop(session_id).await
    }

    async fn execute_loop(&self, session_id: Uuid) -> Result<GenerationResult> {
        lock(&self.started)
            .entry(session_id)
            .or_insert_with(Instant::now);
        let cancel = self.cancel_token(session_id)?;

        loop {
            if cancel.is_cancelled() {
                return self.finish_cancelled(session_id).await;
            }
            let Some(index) = self.with_session(session_id, |s| s.next_pending_index())? else {
                break;
            };

            if let Err(error) = self.run_step(session_id, index).await {
                if matches!(error, DidactError::Cancelled) {
                    return self.finish_cancelled(session_id).await;
                }
                return self.fail_at_step(session_id, index, error).await;
            }
        }

        self.with_session(session_id, |s| s.transition(SessionState::Completed))??;
        self.persist_session(session_id).await?;
        self.emit(session_id, None, StepStatus::Completed);
        self.progress.forget(session_id);
        tracing::info!(session = %session_id, "session completed");
        Ok(self.build_result(session_id))
    }

    async fn run_step(&self, session_id: Uuid, index: usize) -> Result<()> {
        let (step_id, kind, request, pinned) = self.with_session(session_id, |s| {
            let step = &s.steps[index];
            (
                step.id,
                step.kind.clone(),
                s.request.clone(),
                s.pinned_adapter.clone(),
            )
        })?;

        // Precondition skip: an answer key needs an assessment to key against
        if kind.content_type() == Some(&ContentType::AnswerKey)
            && !request.has_answer_key_source()
        {
            self.with_session(session_id, |s| {
                s.steps[index].transition(StepStatus::Skipped)
            })??;
            self.persist_session(session_id).await?;
            self.emit(session_id, Some(step_id), StepStatus::Skipped);
            tracing::info!(session = %session_id, step = %step_id, "step skipped, precondition unmet");
            return Ok(());
        }

        self.with_session(session_id, |s| {
            s.steps[index].transition(StepStatus::InProgress)
        })??;
        self.emit(session_id, Some(step_id), StepStatus::InProgress);

        match &kind {
            StepKind::Validation => request.validate()?,
            StepKind::Formatting => {
                // Content is normalized before each artifact is created, so
                // stored versions never change afterwards
                tracing::debug!(session = %session_id, "formatting pass");
            }
            StepKind::Packaging => {
                tracing::debug!(session = %session_id, "packaging result");
            }
            _ => {
                self.run_provider_step(session_id, index, step_id, &kind, &request, pinned)
                    .await?
            }
        }

        self.with_session(session_id, |s| {
            s.steps[index].transition(StepStatus::Completed)
        })??;
        self.persist_session(session_id).await?;
        self.emit(session_id, Some(step_id), StepStatus::Completed);
        Ok(())
    }

    async fn run_provider_step(
        &self,
        session_id: Uuid,
        index: usize,
        step_id: Uuid,
        kind: &StepKind,
        request: &GenerationRequest,
        pinned: Option<String>,
    ) -> Result<()> {
        let cancel = self.cancel_token(session_id)?;
        let budget = lock(&self.budgets)
            .get(&session_id)
            .cloned()
            .ok_or_else(|| DidactError::Session(format!("unknown session {session_id}")))?;

        let slice = self.context.slice_for(session_id, kind);
        let prompt = match kind {
            StepKind::Remediation {
                content_type,
                source_artifact,
            } => {
                let source = self.find_artifact(session_id, *source_artifact)?;
                let issues = source
                    .validation
                    .as_ref()
                    .map(|report| self.remediators.claimed_issues(report))
                    .unwrap_or_default();
                prompts::render_remediation(
                    content_type,
                    request,
                    &slice,
                    &source.content,
                    &issues,
                )
            }
            _ => prompts::render(kind, request, &slice),
        };

        let interpolation = self.spawn_step_progress(session_id, step_id);
        let retries = AtomicU32::new(0);
        let result = self
            .executor
            .execute(kind, &prompt, &budget, pinned.as_deref(), &cancel, &retries)
            .await;
        interpolation.abort();
        self.with_session(session_id, |s| {
            s.steps[index].retry_count = retries.load(Ordering::Relaxed);
        })?;
        let outcome = result?;

        self.with_session(session_id, |s| {
            s.pinned_adapter = Some(outcome.provider_id.clone());
            s.steps[index].provider_id = Some(outcome.provider_id.clone());
        })?;

        let text = normalize_content(&outcome.completion.text);
        if matches!(
            kind,
            StepKind::ObjectiveAnalysis | StepKind::Planning | StepKind::ContentGeneration { .. }
        ) {
            self.context
                .append(
                    session_id,
                    ContextEntry::new(step_id, kind.clone(), text.clone()),
                )
                .await?;
        }

        let metadata = ArtifactMetadata {
            provider_id: outcome.provider_id.clone(),
            model: outcome.completion.model.clone(),
            input_tokens: outcome.completion.input_tokens,
            output_tokens: outcome.completion.output_tokens,
            cost_usd: outcome.cost_usd,
            latency_ms: outcome.completion.latency_ms,
            fallback_from: outcome.fallback_from.clone(),
            created_at: Utc::now(),
        };

        match kind {
            StepKind::ContentGeneration { content_type } => {
                let artifact = GeneratedArtifact::new(content_type.clone(), text, metadata);
                let mut report = self.pipeline.run(&artifact, request);
                let remediation =
                    self.remediators
                        .synthesize(&artifact, &mut report, &self.settings.validation);
                self.store_artifact(session_id, artifact.with_validation(report))
                    .await?;
                if let Some(step) = remediation {
                    self.with_session(session_id, |s| s.steps.insert(index + 1, step))?;
                    self.persist_session(session_id).await?;
                }
            }
            StepKind::Remediation {
                source_artifact, ..
            } => {
                let source = self.find_artifact(session_id, *source_artifact)?;
                let next = source.next_version(text, metadata);
                let report = self.pipeline.run(&next, request);
                self.store_artifact(session_id, next.with_validation(report))
                    .await?;
            }
            _ => {}
        }
        Ok(())
    }

    async fn fail_at_step(
        &self,
        session_id: Uuid,
        index: usize,
        error: DidactError,
    ) -> Result<GenerationResult> {
        let retry_offered = error.retry_offered();
        let message = error.to_string();
        tracing::warn!(session = %session_id, error = %message, "step failed, session halting");

        let step_id = self.with_session(session_id, |s| {
            let step = &mut s.steps[index];
            // Budget and validation failures can surface before InProgress
            if step.status == StepStatus::Pending {
                let _ = step.transition(StepStatus::InProgress);
            }
            step.transition(StepStatus::Error)?;
            step.error = Some(message.clone());
            let step_id = step.id;
            s.transition(SessionState::Failed)?;
            Ok::<_, DidactError>(step_id)
        })??;

        lock(&self.failures)
            .entry(session_id)
            .or_default()
            .push(GenerationFailure {
                step_id,
                message,
                retry_offered,
            });
        self.persist_session(session_id).await?;
        self.emit(session_id, Some(step_id), StepStatus::Error);
        Ok(self.build_result(session_id))
    }

    async fn finish_cancelled(&self, session_id: Uuid) -> Result<GenerationResult> {
        self.with_session(session_id, |s| {
            s.cancel_remaining_steps();
            s.transition(SessionState::Cancelled)
        })??;
        self.persist_session(session_id).await?;
        self.emit(session_id, None, StepStatus::Cancelled);
        self.progress.forget(session_id);
        tracing::info!(session = %session_id, "session cancelled");
        Ok(self.build_result(session_id))
    }

    /// Interpolated percent updates while a provider call is in flight
    ///
    /// Non-streaming providers give no partial output, so the bar creeps one
    /// point per tick, staying strictly below the step's completion percent.
    /// The returned task is aborted when the call resolves.
    fn spawn_step_progress(&self, session_id: Uuid, step_id: Uuid) -> tokio::task::JoinHandle<()> {
        let progress = self.progress.clone();
        let (base, ceiling) = self
            .session(session_id)
            .map(|s| {
                let total = s.steps.len().max(1);
                let done = s.steps.iter().filter(|s| s.status.is_terminal()).count();
                let base = (done * 100 / total) as u8;
                let next = ((done + 1) * 100 / total) as u8;
                (base, next.saturating_sub(1))
            })
            .unwrap_or((0, 0));
        tokio::spawn(async move {
            let mut percent = base;
            let mut tick = tokio::time::interval(Duration::from_millis(PROGRESS_TICK_MS));
            tick.tick().await;
            loop {
                tick.tick().await;
                if percent < ceiling {
                    percent += 1;
                }
                progress.emit(ProgressEvent {
                    session_id,
                    step_id: Some(step_id),
                    status: StepStatus::InProgress,
                    progress_percent: percent,
                    eta_seconds: None,
                });
            }
        })
    }

    fn build_result(&self, session_id: Uuid) -> GenerationResult {
        let artifacts = self.current_artifacts(session_id);
        let errors = lock(&self.failures)
            .get(&session_id)
            .cloned()
            .unwrap_or_default();
        let state = self
            .session(session_id)
            .map(|s| s.state)
            .unwrap_or(SessionState::Failed);
        GenerationResult {
            success: state == SessionState::Completed && errors.is_empty(),
            artifacts,
            errors,
        }
    }

    /// Latest version of each artifact lineage
    fn current_artifacts(&self, session_id: Uuid) -> Vec<GeneratedArtifact> {
        let all = self.artifacts(session_id);
        let superseded: Vec<Uuid> = all.iter().filter_map(|a| a.supersedes).collect();
        all.into_iter()
            .filter(|a| !superseded.contains(&a.id))
            .collect()
    }

    fn find_artifact(&self, session_id: Uuid, artifact_id: Uuid) -> Result<GeneratedArtifact> {
        lock(&self.artifacts)
            .get(&session_id)
            .and_then(|list| list.iter().find(|a| a.id == artifact_id).cloned())
            .ok_or_else(|| DidactError::Step(format!("artifact {artifact_id} not found")))
    }

    async fn store_artifact(&self, session_id: Uuid, artifact: GeneratedArtifact) -> Result<()> {
        self.persist(session_id, SessionDelta::Artifact(artifact.clone()))
            .await?;
        lock(&self.artifacts)
            .entry(session_id)
            .or_default()
            .push(artifact);
        Ok(())
    }

    fn cancel_token(&self, session_id: Uuid) -> Result<CancelToken> {
        lock(&self.cancels)
            .get(&session_id)
            .cloned()
            .ok_or_else(|| DidactError::Session(format!("unknown session {session_id}")))
    }

    fn with_session<T>(&self, session_id: Uuid, f: impl FnOnce(&mut Session) -> T) -> Result<T> {
        let mut sessions = lock(&self.sessions);
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| DidactError::Session(format!("unknown session {session_id}")))?;
        Ok(f(session))
    }

    async fn persist_session(&self, session_id: Uuid) -> Result<()> {
        let session = self
            .session(session_id)
            .ok_or_else(|| DidactError::Session(format!("unknown session {session_id}")))?;
        self.persist(session_id, SessionDelta::Session(session)).await
    }

    async fn persist(&self, session_id: Uuid, delta: SessionDelta) -> Result<()> {
        with_retry(
            || {
                let delta = delta.clone();
                async move { self.store.save(session_id, delta).await }
            },
            &self.store_retry,
            "session_save",
        )
        .await
    }

    fn emit(&self, session_id: Uuid, step_id: Option<Uuid>, status: StepStatus) {
        let (percent, eta_seconds) = self.progress_of(session_id);
        self.progress.emit(ProgressEvent {
            session_id,
            step_id,
            status,
            progress_percent: percent,
            eta_seconds,
        });
    }

    fn progress_of(&self, session_id: Uuid) -> (u8, Option<u64>) {
        let Some(session) = self.session(session_id) else {
            return (0, None);
        };
        let total = session.steps.len();
        if total == 0 {
            return (0, None);
        }
        let done = session
            .steps
            .iter()
            .filter(|s| s.status.is_terminal())
            .count();
        let percent = (done * 100 / total) as u8;

        let eta = lock(&self.started).get(&session_id).and_then(|start| {
            if done == 0 {
                return None;
            }
            let per_step = start.elapsed().as_secs_f64() / done as f64;
            Some((per_step * (total - done) as f64).round() as u64)
        });
        (percent, eta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockAdapter;
    use crate::provider::registry::ProviderRegistry;
    use crate::store::InMemoryStore;

    fn engine_with(adapters: Vec<MockAdapter>) -> WorkflowEngine {
        let registry = Arc::new(ProviderRegistry::new());
        for adapter in adapters {
            registry.register(Arc::new(adapter));
        }
        let router = Arc::new(Router::new(registry, vec![]));
        WorkflowEngine::new(router, Arc::new(InMemoryStore::new()), Settings::default())
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        let shared = token.clone();
        shared.cancel();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_submit_creates_draft() {
        let engine = engine_with(vec![MockAdapter::named("mock")]);
        let request = GenerationRequest::new("Topic", vec![ContentType::Quiz]);
        let session_id = engine.submit(request).await.unwrap();

        let session = engine.session(session_id).unwrap();
        assert_eq!(session.state, SessionState::Draft);
        assert!(session.steps.is_empty());
        assert!(engine.budget(session_id).is_some());
    }

    #[tokio::test]
    async fn test_cancel_draft_session() {
        let engine = engine_with(vec![MockAdapter::named("mock")]);
        let session_id = engine
            .submit(GenerationRequest::new("Topic", vec![ContentType::Quiz]))
            .await
            .unwrap();

        engine.cancel(session_id).await.unwrap();
        assert_eq!(
            engine.session(session_id).unwrap().state,
            SessionState::Cancelled
        );
        // Cancelling a terminal session is rejected
        assert!(engine.cancel(session_id).await.is_err());
    }

    #[tokio::test]
    async fn test_cancel_unknown_session() {
        let engine = engine_with(vec![MockAdapter::named("mock")]);
        assert!(engine.cancel(Uuid::new_v4()).await.is_err());
    }

    #[tokio::test]
    async fn test_run_simple_session_to_completion() {
        let engine = engine_with(vec![MockAdapter::named("mock")]);
        let session_id = engine
            .submit(GenerationRequest::new("Topic", vec![ContentType::Notes]))
            .await
            .unwrap();

        let result = engine.run(session_id).await.unwrap();
        assert!(result.success);
        assert_eq!(result.artifacts.len(), 1);
        assert!(result.errors.is_empty());
        assert_eq!(
            engine.session(session_id).unwrap().state,
            SessionState::Completed
        );
    }

    #[tokio::test]
    async fn test_run_requires_draft() {
        let engine = engine_with(vec![MockAdapter::named("mock")]);
        let session_id = engine
            .submit(GenerationRequest::new("Topic", vec![ContentType::Notes]))
            .await
            .unwrap();
        engine.run(session_id).await.unwrap();

        // A completed session cannot be run again
        assert!(engine.run(session_id).await.is_err());
    }

    #[tokio::test]
    async fn test_artifact_content_normalized() {
        let engine = engine_with(vec![MockAdapter::named("mock")]);
        let session_id = engine
            .submit(GenerationRequest::new("Topic", vec![ContentType::Notes]))
            .await
            .unwrap();

        let result = engine.run(session_id).await.unwrap();
        let content = &result.artifacts[0].content;
        assert!(content.ends_with('\n'));
        assert!(!content.ends_with("\n\n"));
    }

    #[test]
    fn test_normalize_content() {
        assert_eq!(
            normalize_content("## Notes\ntrailing spaces   \n\n\n"),
            "## Notes\ntrailing spaces\n"
        );
        assert_eq!(normalize_content("no final newline"), "no final newline\n");
        assert_eq!(normalize_content("kept\n"), "kept\n");
    }

    #[tokio::test]
    async fn test_cancelled_token_resolves_waiters() {
        let token = CancelToken::new();
        let waiter = token.clone();
        let ((), ()) = tokio::join!(waiter.cancelled(), async {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            token.cancel();
        });
        assert!(token.is_cancelled());
    }
}
