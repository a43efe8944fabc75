// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Didact Contributors

//! Provider registry and router
//!
//! The registry owns the closed set of known adapters, extensible by
//! registration. The router ranks them (user preference order when configured,
//! local/free first otherwise), skips degraded adapters, and hands the
//! executor a fallback when the selected one fails. Degradation backs off
//! exponentially before a failed adapter is retried.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::error::{DidactError, Result};
use crate::provider::adapter::{Capability, HealthStatus, ProviderAdapter};

const DEGRADE_BASE_COOLDOWN_SECS: u64 = 5;
const DEGRADE_MAX_COOLDOWN_SECS: u64 = 300;
const EWMA_WEIGHT: f64 = 0.2;

fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Rolling call statistics for one adapter
#[derive(Debug, Default)]
pub struct AdapterStats {
    calls: AtomicU64,
    failures: AtomicU64,
    /// Exponentially weighted moving average latency, in milliseconds
    ewma_latency_ms: AtomicU64,
    total_tokens: AtomicU64,
}

impl AdapterStats {
    fn record_success(&self, latency_ms: u64, tokens: u64) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.total_tokens.fetch_add(tokens, Ordering::Relaxed);

        let old = self.ewma_latency_ms.load(Ordering::Relaxed);
        let new = if old == 0 {
            latency_ms
        } else {
            (old as f64 * (1.0 - EWMA_WEIGHT) + latency_ms as f64 * EWMA_WEIGHT) as u64
        };
        self.ewma_latency_ms.store(new, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot for health reporting
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            calls: self.calls.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            ewma_latency_ms: self.ewma_latency_ms.load(Ordering::Relaxed),
            total_tokens: self.total_tokens.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of adapter statistics
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub calls: u64,
    pub failures: u64,
    pub ewma_latency_ms: u64,
    pub total_tokens: u64,
}

/// Exponential-backoff degradation state for one adapter
#[derive(Debug, Default)]
struct Degradation {
    degraded_until: AtomicU64,
    /// How many times the adapter has been degraded without an intervening success
    strikes: AtomicU32,
}

impl Degradation {
    fn is_degraded(&self) -> bool {
        now_epoch_secs() < self.degraded_until.load(Ordering::Relaxed)
    }

    fn degrade(&self) -> u64 {
        let strikes = self.strikes.fetch_add(1, Ordering::Relaxed);
        let cooldown = DEGRADE_BASE_COOLDOWN_SECS
            .saturating_mul(2u64.saturating_pow(strikes))
            .min(DEGRADE_MAX_COOLDOWN_SECS);
        self.degraded_until
            .store(now_epoch_secs() + cooldown, Ordering::Relaxed);
        cooldown
    }

    fn recover(&self) {
        self.strikes.store(0, Ordering::Relaxed);
        self.degraded_until.store(0, Ordering::Relaxed);
    }
}

struct AdapterEntry {
    adapter: Arc<dyn ProviderAdapter>,
    capability: Capability,
    stats: Arc<AdapterStats>,
    degradation: Degradation,
}

/// Registry of known provider adapters, in registration order
#[derive(Default)]
pub struct ProviderRegistry {
    entries: RwLock<Vec<AdapterEntry>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter. Replaces any previous registration with the same id.
    pub fn register(&self, adapter: Arc<dyn ProviderAdapter>) {
        let capability = adapter.describe();
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.retain(|e| e.capability.id != capability.id);
        entries.push(AdapterEntry {
            adapter,
            capability,
            stats: Arc::new(AdapterStats::default()),
            degradation: Degradation::default(),
        });
    }

    /// Look up an adapter by id
    pub fn get(&self, id: &str) -> Option<Arc<dyn ProviderAdapter>> {
        let entries = match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries
            .iter()
            .find(|e| e.capability.id == id)
            .map(|e| e.adapter.clone())
    }

    /// Registered adapter ids, in registration order
    pub fn ids(&self) -> Vec<String> {
        let entries = match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.iter().map(|e| e.capability.id.clone()).collect()
    }

    fn with_entry<T>(&self, id: &str, f: impl FnOnce(&AdapterEntry) -> T) -> Option<T> {
        let entries = match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.iter().find(|e| e.capability.id == id).map(f)
    }
}

/// Health line for one adapter, as reported by [`Router::health`]
#[derive(Debug, Clone, Serialize)]
pub struct AdapterHealth {
    pub id: String,
    pub is_local: bool,
    pub degraded: bool,
    pub status: HealthStatus,
    pub stats: StatsSnapshot,
}

/// Ranks and selects adapters, with fallback on failure
pub struct Router {
    registry: Arc<ProviderRegistry>,
    /// User-configured preference order; empty means local/free first
    preference: Vec<String>,
}

impl Router {
    pub fn new(registry: Arc<ProviderRegistry>, preference: Vec<String>) -> Self {
        Self {
            registry,
            preference,
        }
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Ranked candidate ids: preference order when configured, local-first
    /// otherwise, with unranked adapters appended in registration order.
    fn ranked_ids(&self) -> Vec<String> {
        let all = self.registry.ids();
        if self.preference.is_empty() {
            let mut ranked: Vec<String> = all
                .iter()
                .filter(|id| {
                    self.registry
                        .with_entry(id, |e| e.capability.is_local)
                        .unwrap_or(false)
                })
                .cloned()
                .collect();
            let rest: Vec<String> = all
                .into_iter()
                .filter(|id| !ranked.contains(id))
                .collect();
            ranked.extend(rest);
            ranked
        } else {
            let mut ranked: Vec<String> = self
                .preference
                .iter()
                .filter(|id| all.contains(id))
                .cloned()
                .collect();
            let rest: Vec<String> = all
                .into_iter()
                .filter(|id| !ranked.contains(id))
                .collect();
            ranked.extend(rest);
            ranked
        }
    }

    /// Select an adapter, honoring a session pin when it is still usable
    ///
    /// Degraded adapters are skipped; when every candidate is degraded the
    /// best-ranked one is returned anyway rather than refusing outright.
    pub fn select(
        &self,
        pinned: Option<&str>,
        exclude: &[String],
    ) -> Result<Arc<dyn ProviderAdapter>> {
        if let Some(pin) = pinned {
            if !exclude.iter().any(|e| e == pin) {
                let usable = self
                    .registry
                    .with_entry(pin, |e| !e.degradation.is_degraded())
                    .unwrap_or(false);
                if usable {
                    if let Some(adapter) = self.registry.get(pin) {
                        return Ok(adapter);
                    }
                }
            }
        }

        let ranked = self.ranked_ids();
        let candidates: Vec<&String> = ranked
            .iter()
            .filter(|id| !exclude.iter().any(|e| e == *id))
            .collect();

        for id in &candidates {
            let degraded = self
                .registry
                .with_entry(id, |e| e.degradation.is_degraded())
                .unwrap_or(true);
            if !degraded {
                if let Some(adapter) = self.registry.get(id) {
                    return Ok(adapter);
                }
            }
        }

        // Everything usable is degraded; take the best-ranked candidate anyway
        for id in &candidates {
            if let Some(adapter) = self.registry.get(id) {
                tracing::warn!(adapter = %id, "all candidates degraded, selecting anyway");
                return Ok(adapter);
            }
        }

        Err(DidactError::Config(
            "no provider adapter available".to_string(),
        ))
    }

    /// Record a successful call
    pub fn report_success(&self, id: &str, latency_ms: u64, tokens: u64) {
        self.registry.with_entry(id, |e| {
            e.stats.record_success(latency_ms, tokens);
            e.degradation.recover();
        });
    }

    /// Record a failed call and degrade the adapter with exponential backoff
    pub fn report_failure(&self, id: &str) {
        self.registry.with_entry(id, |e| {
            e.stats.record_failure();
            let cooldown = e.degradation.degrade();
            tracing::warn!(adapter = %id, cooldown_secs = cooldown, "adapter degraded");
        });
    }

    /// Whether an adapter is currently degraded
    pub fn is_degraded(&self, id: &str) -> bool {
        self.registry
            .with_entry(id, |e| e.degradation.is_degraded())
            .unwrap_or(false)
    }

    /// Probe every adapter and return a health report
    pub async fn health(&self) -> Vec<AdapterHealth> {
        let ids = self.registry.ids();
        let mut report = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(adapter) = self.registry.get(&id) else {
                continue;
            };
            let status = adapter.health_check().await;
            let (is_local, degraded, stats) = self
                .registry
                .with_entry(&id, |e| {
                    (
                        e.capability.is_local,
                        e.degradation.is_degraded(),
                        e.stats.snapshot(),
                    )
                })
                .unwrap_or((false, false, StatsSnapshot {
                    calls: 0,
                    failures: 0,
                    ewma_latency_ms: 0,
                    total_tokens: 0,
                }));
            report.push(AdapterHealth {
                id,
                is_local,
                degraded,
                status,
                stats,
            });
        }
        report
    }
}
