// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Didact Contributors

//! Mock provider adapter for testing
//!
//! A configurable implementation of the ProviderAdapter trait that serves
//! scripted outcomes in order and records every request, so orchestration
//! tests never make real network calls.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::ProviderError;
use crate::provider::adapter::{
    Capability, GenerateOptions, HealthStatus, Prompt, ProviderAdapter, RawCompletion,
};

/// One scripted outcome for the mock adapter
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Succeed with the given text and token usage
    Success {
        text: String,
        input_tokens: u64,
        output_tokens: u64,
    },
    /// Fail as unavailable (retryable)
    Unavailable,
    /// Fail rate-limited with a retry hint (retryable)
    RateLimited { retry_after_secs: u64 },
    /// Fail with a content policy rejection (non-retryable)
    PolicyRejected { message: String },
    /// Fail with an invalid request (non-retryable)
    InvalidRequest { message: String },
    /// Time out (retryable)
    Timeout,
}

impl MockOutcome {
    /// Shorthand for a success outcome
    pub fn ok(text: impl Into<String>, output_tokens: u64) -> Self {
        MockOutcome::Success {
            text: text.into(),
            input_tokens: 0,
            output_tokens,
        }
    }
}

/// A mock provider adapter for tests
#[derive(Clone)]
pub struct MockAdapter {
    id: String,
    is_local: bool,
    healthy: bool,
    /// Scripted outcomes, served in order; when drained, calls echo the prompt
    outcomes: Arc<Mutex<VecDeque<MockOutcome>>>,
    call_count: Arc<AtomicUsize>,
    recorded_prompts: Arc<Mutex<Vec<Prompt>>>,
}

impl MockAdapter {
    /// Create a local, healthy mock adapter
    pub fn named(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_local: true,
            healthy: true,
            outcomes: Arc::new(Mutex::new(VecDeque::new())),
            call_count: Arc::new(AtomicUsize::new(0)),
            recorded_prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Mark the adapter as remote (not local/free)
    pub fn remote(mut self) -> Self {
        self.is_local = false;
        self
    }

    /// Make health checks report the backend unreachable
    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    /// Queue scripted outcomes, served in order
    pub fn with_outcomes(self, outcomes: Vec<MockOutcome>) -> Self {
        {
            let mut queue = self.outcomes.lock().unwrap();
            queue.clear();
            queue.extend(outcomes);
        }
        self
    }

    /// Queue one more outcome at the back
    pub fn push_outcome(&self, outcome: MockOutcome) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    /// Number of generate() calls made
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// All prompts this adapter received
    pub fn recorded_prompts(&self) -> Vec<Prompt> {
        self.recorded_prompts.lock().unwrap().clone()
    }

    /// The most recent prompt, if any
    pub fn last_prompt(&self) -> Option<Prompt> {
        self.recorded_prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ProviderAdapter for MockAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn describe(&self) -> Capability {
        Capability {
            id: self.id.clone(),
            streaming: false,
            max_tokens: 8192,
            is_local: self.is_local,
            requires_credential: !self.is_local,
            input_cost_per_1k: 0.0,
            output_cost_per_1k: 0.0,
        }
    }

    async fn health_check(&self) -> HealthStatus {
        if self.healthy {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unreachable("mock adapter configured unhealthy".to_string())
        }
    }

    async fn generate(
        &self,
        prompt: &Prompt,
        _options: &GenerateOptions,
    ) -> std::result::Result<RawCompletion, ProviderError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.recorded_prompts.lock().unwrap().push(prompt.clone());

        let outcome = self.outcomes.lock().unwrap().pop_front();
        match outcome {
            None => Ok(RawCompletion {
                text: format!("mock completion for: {}", prompt.user),
                input_tokens: prompt.estimate_tokens(),
                output_tokens: 32,
                model: "mock-model".to_string(),
                latency_ms: 1,
            }),
            Some(MockOutcome::Success {
                text,
                input_tokens,
                output_tokens,
            }) => Ok(RawCompletion {
                text,
                input_tokens,
                output_tokens,
                model: "mock-model".to_string(),
                latency_ms: 1,
            }),
            Some(MockOutcome::Unavailable) => {
                Err(ProviderError::Unavailable("mock outage".to_string()))
            }
            Some(MockOutcome::RateLimited { retry_after_secs }) => {
                Err(ProviderError::RateLimited { retry_after_secs })
            }
            Some(MockOutcome::PolicyRejected { message }) => {
                Err(ProviderError::ContentPolicyRejected(message))
            }
            Some(MockOutcome::InvalidRequest { message }) => {
                Err(ProviderError::InvalidRequest(message))
            }
            Some(MockOutcome::Timeout) => Err(ProviderError::Timeout),
        }
    }
}
