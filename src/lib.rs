// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Didact Contributors

//! didact: provider-agnostic orchestration engine for AI-generated course
//! materials
//!
//! A caller submits a [`workflow::GenerationRequest`] describing a lesson
//! (topic, audience, objectives, requested content types, token budget). The
//! [`workflow::WorkflowEngine`] expands it into an ordered step plan, routes
//! each provider-backed step through the [`provider`] layer (registry,
//! rate limiting, budget tracking, retry with adapter fallback), validates
//! every generated artifact through the [`validation`] pipeline, and reports
//! progress over a channel.
//!
//! ```no_run
//! use std::sync::Arc;
//! use didact::config::Settings;
//! use didact::provider::{ProviderRegistry, Router};
//! use didact::store::InMemoryStore;
//! use didact::workflow::{ContentType, GenerationRequest, WorkflowEngine};
//!
//! # async fn demo() -> didact::error::Result<()> {
//! let registry = Arc::new(ProviderRegistry::new());
//! // registry.register(...) adapters here
//! let router = Arc::new(Router::new(registry, vec![]));
//! let engine = WorkflowEngine::new(router, Arc::new(InMemoryStore::new()), Settings::default());
//!
//! let request = GenerationRequest::new("Photosynthesis", vec![ContentType::Slides])
//!     .with_budget_tokens(50_000);
//! let session_id = engine.submit(request).await?;
//! let result = engine.run(session_id).await?;
//! # let _ = result;
//! # Ok(())
//! # }
//! ```

pub mod artifact;
pub mod config;
pub mod credentials;
pub mod error;
pub mod progress;
pub mod provider;
pub mod store;
pub mod validation;
pub mod workflow;

pub use artifact::GeneratedArtifact;
pub use error::{DidactError, Result};
pub use progress::{ProgressEvent, ProgressReporter};
pub use workflow::{GenerationRequest, GenerationResult, WorkflowEngine};
