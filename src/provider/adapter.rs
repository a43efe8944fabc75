// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Didact Contributors

//! Provider adapter trait and related types
//!
//! Defines the uniform capability contract over one LLM backend, local or
//! remote. The router and executor only ever see this surface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Uniform capability contract over one LLM backend
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Stable adapter id (e.g. "ollama", "anthropic")
    fn id(&self) -> &str;

    /// Static capability descriptor
    fn describe(&self) -> Capability;

    /// Probe the backend for liveness
    async fn health_check(&self) -> HealthStatus;

    /// Run one completion
    async fn generate(
        &self,
        prompt: &Prompt,
        options: &GenerateOptions,
    ) -> std::result::Result<RawCompletion, ProviderError>;
}

/// A rendered prompt, ready for dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    /// System framing, if any
    pub system: Option<String>,

    /// The user-facing instruction body
    pub user: String,
}

impl Prompt {
    /// Create a prompt with only a user body
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            system: None,
            user: user.into(),
        }
    }

    /// Set the system framing
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Rough token estimate for budget reservation (4 chars per token)
    pub fn estimate_tokens(&self) -> u64 {
        let chars = self.user.len() + self.system.as_deref().map(str::len).unwrap_or(0);
        (chars as u64).div_ceil(4)
    }
}

/// Per-call generation options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Maximum tokens in the completion
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.7,
        }
    }
}

impl GenerateOptions {
    /// Create options with a token ceiling
    pub fn new(max_tokens: u32) -> Self {
        Self {
            max_tokens,
            ..Default::default()
        }
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Static capability descriptor for an adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capability {
    /// Adapter id
    pub id: String,

    /// Whether the backend can stream partial output
    pub streaming: bool,

    /// Maximum completion tokens the backend accepts
    pub max_tokens: u32,

    /// Whether the backend runs on the local machine (free, preferred by default)
    pub is_local: bool,

    /// Whether calls need an API key from the credential store
    pub requires_credential: bool,

    /// Input cost per 1K tokens (USD; zero for local backends)
    pub input_cost_per_1k: f64,

    /// Output cost per 1K tokens (USD; zero for local backends)
    pub output_cost_per_1k: f64,
}

impl Capability {
    /// Dollar cost of a call given token counts
    pub fn cost_usd(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 / 1000.0) * self.input_cost_per_1k
            + (output_tokens as f64 / 1000.0) * self.output_cost_per_1k
    }
}

/// Result of a health probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Backend is reachable and serving
    Healthy,
    /// Backend responds but reports trouble
    Degraded(String),
    /// Backend cannot be reached
    Unreachable(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

/// Raw completion returned by an adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCompletion {
    /// Completion text
    pub text: String,

    /// Prompt tokens consumed
    pub input_tokens: u64,

    /// Completion tokens produced
    pub output_tokens: u64,

    /// Model that served the call
    pub model: String,

    /// Wall-clock latency of the call in milliseconds
    pub latency_ms: u64,
}

impl RawCompletion {
    /// Total tokens consumed by the call
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_builder() {
        let prompt = Prompt::new("Write a quiz").with_system("You are an instructional designer");
        assert_eq!(prompt.user, "Write a quiz");
        assert_eq!(prompt.system.as_deref(), Some("You are an instructional designer"));
    }

    #[test]
    fn test_prompt_token_estimate() {
        // 16 chars of user + 4 of system = 20 chars -> 5 tokens
        let prompt = Prompt::new("sixteen chars ab").with_system("four");
        assert_eq!(prompt.estimate_tokens(), 5);
    }

    #[test]
    fn test_prompt_token_estimate_rounds_up() {
        let prompt = Prompt::new("abcde");
        assert_eq!(prompt.estimate_tokens(), 2);
    }

    #[test]
    fn test_generate_options_defaults() {
        let options = GenerateOptions::default();
        assert_eq!(options.max_tokens, 4096);
        assert!((options.temperature - 0.7).abs() < 0.001);
    }

    #[test]
    fn test_capability_cost() {
        let cap = Capability {
            id: "test".to_string(),
            streaming: false,
            max_tokens: 8192,
            is_local: false,
            requires_credential: true,
            input_cost_per_1k: 3.0,
            output_cost_per_1k: 15.0,
        };
        let cost = cap.cost_usd(1000, 1000);
        assert!((cost - 18.0).abs() < 0.001);
    }

    #[test]
    fn test_capability_cost_local_is_free() {
        let cap = Capability {
            id: "ollama".to_string(),
            streaming: true,
            max_tokens: 8192,
            is_local: true,
            requires_credential: false,
            input_cost_per_1k: 0.0,
            output_cost_per_1k: 0.0,
        };
        assert_eq!(cap.cost_usd(100_000, 100_000), 0.0);
    }

    #[test]
    fn test_health_status() {
        assert!(HealthStatus::Healthy.is_healthy());
        assert!(!HealthStatus::Degraded("slow".to_string()).is_healthy());
        assert!(!HealthStatus::Unreachable("refused".to_string()).is_healthy());
    }

    #[test]
    fn test_raw_completion_totals() {
        let completion = RawCompletion {
            text: "hello".to_string(),
            input_tokens: 120,
            output_tokens: 260,
            model: "llama3.2".to_string(),
            latency_ms: 900,
        };
        assert_eq!(completion.total_tokens(), 380);
    }
}
