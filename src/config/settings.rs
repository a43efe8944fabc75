// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Didact Contributors

//! Settings management for didact
//!
//! Handles loading and saving settings from ~/.didact/settings.json

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{DidactError, Result};
use crate::workflow::ContentType;

/// Main settings structure, stored in ~/.didact/settings.json
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Provider adapter configurations
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Retry and resilience settings for provider calls
    #[serde(default)]
    pub resilience: ResilienceConfig,

    /// Per-adapter rate limiting settings
    #[serde(default)]
    pub rate_limits: RateLimitsConfig,

    /// Per-attempt timeout settings
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Token ceilings per generated content kind
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Validation and remediation settings
    #[serde(default)]
    pub validation: ValidationConfig,
}

/// Configuration for provider adapters
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    /// User-configured preference order of adapter ids. When empty the router
    /// prefers local/free adapters.
    #[serde(default)]
    pub preference: Vec<String>,

    /// Ollama local model configuration
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// Anthropic configuration
    #[serde(default)]
    pub anthropic: AnthropicConfig,
}

/// Ollama local adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL for the Ollama server
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    /// Model to use
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
        }
    }
}

/// Anthropic adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// Environment variable name for the API key
    #[serde(default = "default_anthropic_api_key_env")]
    pub api_key_env: String,

    /// Model to use
    #[serde(default = "default_anthropic_model")]
    pub model: String,

    /// Base URL for API (for custom endpoints)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_anthropic_api_key_env(),
            model: default_anthropic_model(),
            base_url: None,
        }
    }
}

/// Retry and resilience settings for provider calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResilienceConfig {
    /// Maximum number of retry attempts per step
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay in milliseconds (exponentially increased)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Jitter percentage (0.0 to 1.0)
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
        }
    }
}

/// Per-adapter rate limiting settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitsConfig {
    /// Tokens per minute allowed per adapter
    #[serde(default = "default_tokens_per_minute")]
    pub tokens_per_minute: u64,

    /// Maximum number of callers allowed to queue for capacity before
    /// requests are rejected with a rate-limit error
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,

    /// Longest a queued caller waits for capacity, in milliseconds
    #[serde(default = "default_max_queue_wait_ms")]
    pub max_queue_wait_ms: u64,
}

impl Default for RateLimitsConfig {
    fn default() -> Self {
        Self {
            tokens_per_minute: default_tokens_per_minute(),
            queue_depth: default_queue_depth(),
            max_queue_wait_ms: default_max_queue_wait_ms(),
        }
    }
}

/// Per-attempt timeout settings, configurable per content type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Default per-attempt timeout in seconds
    #[serde(default = "default_attempt_timeout_secs")]
    pub default_secs: u64,

    /// Override for slide generation (decks run long)
    #[serde(default = "default_slides_timeout_secs")]
    pub slides_secs: u64,

    /// Override for quiz generation
    #[serde(default = "default_quiz_timeout_secs")]
    pub quiz_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default_secs: default_attempt_timeout_secs(),
            slides_secs: default_slides_timeout_secs(),
            quiz_secs: default_quiz_timeout_secs(),
        }
    }
}

impl TimeoutConfig {
    /// Per-attempt timeout for a content type
    pub fn attempt_timeout_secs(&self, content_type: Option<&ContentType>) -> u64 {
        match content_type {
            Some(ContentType::Slides) => self.slides_secs,
            Some(ContentType::Quiz) => self.quiz_secs,
            _ => self.default_secs,
        }
    }
}

/// Token ceilings per generated content kind
///
/// These feed both the request's `max_tokens` and the pre-dispatch budget
/// estimate, so lowering a ceiling also lowers the reservation a step makes
/// against the session budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Ceiling for objective analysis output
    #[serde(default = "default_analysis_max_tokens")]
    pub analysis_max_tokens: u32,

    /// Ceiling for plan synthesis output
    #[serde(default = "default_planning_max_tokens")]
    pub planning_max_tokens: u32,

    /// Ceiling for content generation output (per artifact)
    #[serde(default = "default_content_max_tokens")]
    pub content_max_tokens: u32,

    /// Ceiling for remediation output
    #[serde(default = "default_remediation_max_tokens")]
    pub remediation_max_tokens: u32,

    /// Sampling temperature for generation steps
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            analysis_max_tokens: default_analysis_max_tokens(),
            planning_max_tokens: default_planning_max_tokens(),
            content_max_tokens: default_content_max_tokens(),
            remediation_max_tokens: default_remediation_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Validation and remediation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Whether remediation steps are synthesized automatically for claimed issues
    #[serde(default = "default_auto_remediation")]
    pub auto_remediation: bool,

    /// Maximum remediation rounds per artifact
    #[serde(default = "default_max_remediation_rounds")]
    pub max_remediation_rounds: u32,

    /// Artifacts scoring at or above this need no remediation
    #[serde(default = "default_acceptable_score")]
    pub acceptable_score: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            auto_remediation: default_auto_remediation(),
            max_remediation_rounds: default_max_remediation_rounds(),
            acceptable_score: default_acceptable_score(),
        }
    }
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2".to_string()
}

fn default_anthropic_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_anthropic_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    8000
}

fn default_jitter() -> f64 {
    0.25
}

fn default_tokens_per_minute() -> u64 {
    60_000
}

fn default_queue_depth() -> usize {
    8
}

fn default_max_queue_wait_ms() -> u64 {
    5_000
}

fn default_attempt_timeout_secs() -> u64 {
    60
}

fn default_slides_timeout_secs() -> u64 {
    120
}

fn default_quiz_timeout_secs() -> u64 {
    90
}

fn default_analysis_max_tokens() -> u32 {
    512
}

fn default_planning_max_tokens() -> u32 {
    1024
}

fn default_content_max_tokens() -> u32 {
    4096
}

fn default_remediation_max_tokens() -> u32 {
    2048
}

fn default_temperature() -> f32 {
    0.7
}

fn default_auto_remediation() -> bool {
    true
}

fn default_max_remediation_rounds() -> u32 {
    1
}

fn default_acceptable_score() -> f64 {
    70.0
}

impl Settings {
    /// Path to the settings file (~/.didact/settings.json)
    pub fn settings_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| DidactError::Config("Could not determine home directory".to_string()))?;
        Ok(home.join(".didact").join("settings.json"))
    }

    /// Load settings from disk, falling back to defaults when absent
    ///
    /// A `settings.toml` next to the JSON file is honored when the JSON file
    /// does not exist.
    pub fn load() -> Result<Self> {
        let path = Self::settings_path()?;
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let settings: Settings = serde_json::from_str(&content)?;
            return Ok(settings);
        }

        let toml_path = path.with_extension("toml");
        if toml_path.exists() {
            let content = std::fs::read_to_string(&toml_path)?;
            let settings: Settings = toml::from_str(&content)?;
            return Ok(settings);
        }

        Ok(Self::default())
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<()> {
        let path = Self::settings_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }
}
