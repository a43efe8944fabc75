// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Didact Contributors

//! Cross-component provider-layer scenarios: routing, rate limiting, budgets

use std::sync::atomic::AtomicU32;
use std::sync::Arc;
use std::time::Duration;

use didact::config::settings::{RateLimitsConfig, ResilienceConfig, Settings};
use didact::error::{DidactError, ProviderError};
use didact::provider::adapter::{HealthStatus, Prompt, ProviderAdapter};
use didact::provider::mock::{MockAdapter, MockOutcome};
use didact::provider::{BudgetTracker, ProviderRegistry, RateLimiter, Router};
use didact::workflow::engine::CancelToken;
use didact::workflow::executor::StepExecutor;
use didact::workflow::StepKind;

fn registry_of(adapters: Vec<MockAdapter>) -> Arc<ProviderRegistry> {
    let registry = Arc::new(ProviderRegistry::new());
    for adapter in adapters {
        registry.register(Arc::new(adapter));
    }
    registry
}

#[tokio::test]
async fn test_router_prefers_local_then_falls_back() {
    let local = MockAdapter::named("local").with_outcomes(vec![MockOutcome::Unavailable]);
    let remote = MockAdapter::named("remote").remote();
    let registry = registry_of(vec![local.clone(), remote.clone()]);
    let router = Router::new(registry, vec![]);

    // Local ranks first
    let selected = router.select(None, &[]).unwrap();
    assert_eq!(selected.id(), "local");

    // After a failure the local adapter is degraded and skipped
    let _ = selected
        .generate(&Prompt::new("x"), &Default::default())
        .await;
    router.report_failure("local");
    let selected = router.select(None, &[]).unwrap();
    assert_eq!(selected.id(), "remote");
}

#[tokio::test]
async fn test_router_health_reports_every_adapter() {
    let registry = registry_of(vec![
        MockAdapter::named("up"),
        MockAdapter::named("down").unhealthy(),
    ]);
    let router = Router::new(registry, vec![]);
    router.report_success("up", 500, 1000);

    let report = router.health().await;
    assert_eq!(report.len(), 2);

    let up = report.iter().find(|h| h.id == "up").unwrap();
    assert_eq!(up.status, HealthStatus::Healthy);
    assert_eq!(up.stats.calls, 1);
    assert_eq!(up.stats.total_tokens, 1000);

    let down = report.iter().find(|h| h.id == "down").unwrap();
    assert!(matches!(down.status, HealthStatus::Unreachable(_)));
}

/// The worked budget scenario: ceiling 1000, slides estimated at 400 but
/// actually costing 380, then a quiz estimated at 700 against the remaining
/// 620.
#[test]
fn test_budget_worked_scenario() {
    let budget = BudgetTracker::new(1000);

    budget.reserve(400).unwrap();
    budget.commit(400, 380);
    assert_eq!(budget.spent(), 380);
    assert_eq!(budget.remaining(), 620);

    let err = budget.reserve(700).unwrap_err();
    match err {
        DidactError::BudgetExceeded {
            estimated,
            remaining,
        } => {
            assert_eq!(estimated, 700);
            assert_eq!(remaining, 620);
        }
        other => panic!("expected BudgetExceeded, got {other:?}"),
    }
    // The rejected reservation left nothing behind
    assert_eq!(budget.remaining(), 620);
}

#[tokio::test]
async fn test_rate_limiter_rejects_rather_than_blocks() {
    let limiter = RateLimiter::new(RateLimitsConfig {
        tokens_per_minute: 1_000,
        queue_depth: 1,
        max_queue_wait_ms: 50,
    });

    // Drain the bucket, then confirm the next caller is rejected with a
    // retry hint instead of waiting forever
    limiter.acquire("mock", 1_000).await.unwrap();
    let start = std::time::Instant::now();
    let err = limiter.acquire("mock", 900).await.unwrap_err();
    match err {
        ProviderError::RateLimited { retry_after_secs } => assert!(retry_after_secs >= 1),
        other => panic!("expected RateLimited, got {other:?}"),
    }
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_executor_rate_rejection_releases_budget() {
    // Every bucket is too small for any request, so all attempts are locally
    // rate limited and the step fails without touching a provider
    let settings = Settings {
        resilience: ResilienceConfig {
            max_retries: 1,
            base_delay_ms: 1,
            max_delay_ms: 5,
            jitter: 0.0,
        },
        rate_limits: RateLimitsConfig {
            tokens_per_minute: 10,
            queue_depth: 1,
            max_queue_wait_ms: 10,
        },
        ..Default::default()
    };
    let adapter = MockAdapter::named("mock");
    let registry = registry_of(vec![adapter.clone()]);
    let router = Arc::new(Router::new(registry, vec![]));
    let limiter = Arc::new(RateLimiter::new(settings.rate_limits.clone()));
    let executor = StepExecutor::new(router, limiter, &settings);
    let budget = BudgetTracker::new(100_000);

    let err = executor
        .execute(
            &StepKind::ObjectiveAnalysis,
            &Prompt::new("objectives"),
            &budget,
            None,
            &CancelToken::new(),
            &AtomicU32::new(0),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DidactError::Provider(ProviderError::RateLimited { .. })
    ));
    assert_eq!(adapter.call_count(), 0);
    // Reservations from the rejected attempts were all released
    assert_eq!(budget.remaining(), 100_000);
    assert_eq!(budget.spent(), 0);
}

#[tokio::test]
async fn test_degraded_adapter_recovers_after_success() {
    let registry = registry_of(vec![MockAdapter::named("a"), MockAdapter::named("b")]);
    let router = Router::new(registry, vec![]);

    router.report_failure("a");
    assert!(router.is_degraded("a"));
    assert_eq!(router.select(None, &[]).unwrap().id(), "b");

    router.report_success("a", 100, 50);
    assert!(!router.is_degraded("a"));
    assert_eq!(router.select(None, &[]).unwrap().id(), "a");
}

#[tokio::test]
async fn test_pinned_session_survives_pin_exclusion() {
    let registry = registry_of(vec![MockAdapter::named("a"), MockAdapter::named("b")]);
    let router = Router::new(registry, vec![]);

    // Pin honored while healthy
    assert_eq!(router.select(Some("b"), &[]).unwrap().id(), "b");
    // Excluding the pin falls through to ranking
    assert_eq!(
        router.select(Some("b"), &["b".to_string()]).unwrap().id(),
        "a"
    );
}
