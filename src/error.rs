// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Didact Contributors

//! Error types for didact
//!
//! This module defines all error types used throughout the engine.

use thiserror::Error;

/// Main error type for didact operations
#[derive(Error, Debug)]
pub enum DidactError {
    /// Provider-related errors
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Projected spend would exceed the session budget
    #[error("Budget exceeded: estimated {estimated} tokens, {remaining} remaining")]
    BudgetExceeded { estimated: u64, remaining: u64 },

    /// Session was cancelled by the caller
    #[error("Cancelled by user")]
    Cancelled,

    /// Session state machine errors
    #[error("Session error: {0}")]
    Session(String),

    /// Step lifecycle errors
    #[error("Step error: {0}")]
    Step(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persistence collaborator errors (retryable, treated as unavailable)
    #[error("Store error: {0}")]
    Store(String),

    /// A validator failed internally (a bug, not a content problem)
    #[error("Validator '{validator}' failed internally: {message}")]
    ValidationInternal { validator: String, message: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Provider-specific error taxonomy
///
/// `Unavailable`, `RateLimited` and `Timeout` are retryable; the router falls
/// back to the next-ranked adapter. The rest escalate immediately.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Backend unreachable or returning server errors
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// Rate limited by the backend, with a retry-after hint in seconds
    #[error("Rate limited: retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    /// Malformed request, a caller or configuration defect
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The backend refused the content; surfaced verbatim for user rewrite
    #[error("Content policy rejected: {0}")]
    ContentPolicyRejected(String),

    /// Response could not be parsed
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    /// Per-attempt deadline elapsed
    #[error("Provider request timed out")]
    Timeout,
}

impl ProviderError {
    /// Whether the executor may retry this error (possibly on another adapter)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::Unavailable(_)
                | ProviderError::RateLimited { .. }
                | ProviderError::Timeout
        )
    }
}

impl DidactError {
    /// Whether the error is transient enough to retry
    pub fn is_retryable(&self) -> bool {
        match self {
            DidactError::Provider(e) => e.is_retryable(),
            // Persistence failures are treated as Unavailable and retried
            DidactError::Store(_) => true,
            _ => false,
        }
    }

    /// Whether a user-initiated retry of the failed step is offered
    ///
    /// Deterministic failures are excluded: retrying an unchanged request or
    /// configuration would fail the same way.
    pub fn retry_offered(&self) -> bool {
        !matches!(
            self,
            DidactError::Cancelled
                | DidactError::BudgetExceeded { .. }
                | DidactError::Config(_)
                | DidactError::Provider(ProviderError::ContentPolicyRejected(_))
                | DidactError::Provider(ProviderError::InvalidRequest(_))
        )
    }
}

/// Result type alias for didact operations
pub type Result<T> = std::result::Result<T, DidactError>;

impl From<toml::de::Error> for DidactError {
    fn from(err: toml::de::Error) -> Self {
        DidactError::Config(err.to_string())
    }
}
