// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Didact Contributors

//! Step executor: one provider-backed step to completion or terminal failure
//!
//! The attempt pipeline is: check cancellation, select an adapter, reserve
//! budget, acquire rate capacity, call with a per-attempt deadline, reconcile
//! the budget. Retryable failures back off exponentially with jitter and
//! switch adapters between attempts; non-retryable failures escalate at once.
//! A reservation is released whenever the attempt never got a response out of
//! the provider, so failed attempts never count as spend. An in-flight call
//! is raced against the cancellation token; an abandoned call's partial
//! output is discarded.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::settings::{GenerationConfig, Settings, TimeoutConfig};
use crate::error::{DidactError, ProviderError, Result};
use crate::provider::adapter::{GenerateOptions, Prompt, RawCompletion};
use crate::provider::budget::BudgetTracker;
use crate::provider::rate_limit::RateLimiter;
use crate::provider::registry::Router;
use crate::provider::retry::RetryConfig;
use crate::workflow::engine::CancelToken;
use crate::workflow::step::StepKind;

/// What a successful step execution produced
#[derive(Debug)]
pub struct StepOutcome {
    pub completion: RawCompletion,

    /// Adapter that served the successful attempt
    pub provider_id: String,

    /// Set when the session pin was abandoned for this adapter
    pub fallback_from: Option<String>,

    /// Dollar cost of the successful call
    pub cost_usd: f64,
}

/// Executes provider-backed steps with retry, timeout and adapter switching
pub struct StepExecutor {
    router: Arc<Router>,
    limiter: Arc<RateLimiter>,
    retry: RetryConfig,
    timeouts: TimeoutConfig,
    generation: GenerationConfig,
}

impl StepExecutor {
    pub fn new(router: Arc<Router>, limiter: Arc<RateLimiter>, settings: &Settings) -> Self {
        Self {
            router,
            limiter,
            retry: RetryConfig::from(&settings.resilience),
            timeouts: settings.timeouts.clone(),
            generation: settings.generation.clone(),
        }
    }

    /// Output token ceiling for a step kind
    fn max_tokens_for(&self, kind: &StepKind) -> u32 {
        match kind {
            StepKind::ObjectiveAnalysis => self.generation.analysis_max_tokens,
            StepKind::Planning => self.generation.planning_max_tokens,
            StepKind::Remediation { .. } => self.generation.remediation_max_tokens,
            _ => self.generation.content_max_tokens,
        }
    }

    /// Token estimate for a step: prompt size plus the output ceiling
    ///
    /// This is what the step reserves against the session budget before any
    /// provider is contacted.
    pub fn estimate(&self, prompt: &Prompt, kind: &StepKind) -> u64 {
        prompt.estimate_tokens() + u64::from(self.max_tokens_for(kind))
    }

    /// Run one provider-backed step
    ///
    /// `retries` is updated as attempts are consumed, so the caller can
    /// record them on the step whether the outcome is success or failure.
    pub async fn execute(
        &self,
        kind: &StepKind,
        prompt: &Prompt,
        budget: &BudgetTracker,
        pinned: Option<&str>,
        cancel: &CancelToken,
        retries: &AtomicU32,
    ) -> Result<StepOutcome> {
        let options = GenerateOptions::new(self.max_tokens_for(kind))
            .with_temperature(self.generation.temperature);
        let estimate = self.estimate(prompt, kind);
        let deadline = Duration::from_secs(
            self.timeouts.attempt_timeout_secs(kind.content_type()),
        );

        let mut excluded: Vec<String> = Vec::new();
        let mut attempt = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(DidactError::Cancelled);
            }

            let adapter = match self.router.select(pinned, &excluded) {
                Ok(adapter) => adapter,
                // Every candidate already failed this step; widen the search
                Err(_) if !excluded.is_empty() => {
                    excluded.clear();
                    self.router.select(pinned, &excluded)?
                }
                Err(error) => return Err(error),
            };
            let adapter_id = adapter.id().to_string();

            // Fail fast before any dispatch when the budget cannot cover it
            budget.reserve(estimate)?;

            let error: ProviderError = match self.limiter.acquire(&adapter_id, estimate).await {
                Err(rate_error) => {
                    // Our own gate, not the backend's; release and try
                    // another adapter without degrading this one
                    budget.release(estimate);
                    rate_error
                }
                Ok(waited) => {
                    if !waited.is_zero() {
                        tracing::debug!(
                            adapter = %adapter_id,
                            waited_ms = waited.as_millis() as u64,
                            "queued for rate capacity"
                        );
                    }
                    // A completed call wins the race; otherwise cancellation
                    // abandons it and its partial output
                    tokio::select! {
                        biased;
                        result = tokio::time::timeout(deadline, adapter.generate(prompt, &options)) => match result {
                            Ok(Ok(completion)) => {
                                budget.commit(estimate, completion.total_tokens());
                                self.router.report_success(
                                    &adapter_id,
                                    completion.latency_ms,
                                    completion.total_tokens(),
                                );
                                let cost_usd = adapter
                                    .describe()
                                    .cost_usd(completion.input_tokens, completion.output_tokens);
                                let fallback_from = pinned
                                    .filter(|pin| *pin != adapter_id)
                                    .map(str::to_string);
                                if let Some(from) = &fallback_from {
                                    tracing::info!(
                                        from = %from,
                                        to = %adapter_id,
                                        step = %kind.name(),
                                        "fell back to another adapter"
                                    );
                                }
                                return Ok(StepOutcome {
                                    completion,
                                    provider_id: adapter_id,
                                    fallback_from,
                                    cost_usd,
                                });
                            }
                            Ok(Err(provider_error)) => {
                                budget.release(estimate);
                                if provider_error.is_retryable() {
                                    self.router.report_failure(&adapter_id);
                                }
                                provider_error
                            }
                            Err(_elapsed) => {
                                budget.release(estimate);
                                self.router.report_failure(&adapter_id);
                                ProviderError::Timeout
                            }
                        },
                        _ = cancel.cancelled() => {
                            budget.release(estimate);
                            tracing::info!(
                                adapter = %adapter_id,
                                step = %kind.name(),
                                "in-flight call abandoned on cancellation"
                            );
                            return Err(DidactError::Cancelled);
                        }
                    }
                }
            };

            if !error.is_retryable() {
                tracing::warn!(
                    adapter = %adapter_id,
                    step = %kind.name(),
                    error = %error,
                    "non-retryable provider error"
                );
                return Err(error.into());
            }
            if attempt >= self.retry.max_retries {
                tracing::warn!(
                    step = %kind.name(),
                    attempts = attempt + 1,
                    "retries exhausted"
                );
                return Err(error.into());
            }

            tracing::debug!(
                adapter = %adapter_id,
                step = %kind.name(),
                attempt = attempt + 1,
                error = %error,
                "retrying on another adapter after backoff"
            );
            excluded.push(adapter_id);
            self.retry.backoff(attempt).await;
            attempt += 1;
            retries.store(attempt, Ordering::Relaxed);
        }
    }
}
