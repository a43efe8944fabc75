// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Didact Contributors

//! Provider layer: adapter contract, registry/router, rate limiting, budgets
//!
//! Everything above this layer is provider-agnostic; the router decides which
//! backend serves a given step.

pub mod adapter;
pub mod adapters;
pub mod budget;
pub mod mock;
pub mod rate_limit;
pub mod registry;
pub mod retry;

pub use adapter::{
    Capability, GenerateOptions, HealthStatus, Prompt, ProviderAdapter, RawCompletion,
};
pub use budget::BudgetTracker;
pub use rate_limit::RateLimiter;
pub use registry::{ProviderRegistry, Router};
pub use retry::RetryConfig;
