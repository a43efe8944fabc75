// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Didact Contributors

//! Per-adapter token-bucket rate limiting
//!
//! Each adapter gets its own bucket. A caller acquires capacity for its token
//! estimate before dispatch; callers beyond capacity wait in a bounded queue
//! and are rejected with `RateLimited` once the queue is full or the wait
//! ceiling elapses. Nothing is held across the network call.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::config::settings::RateLimitsConfig;
use crate::error::ProviderError;

/// Token bucket for one adapter
///
/// Atomic CAS accounting; refill is time-based against the bucket capacity.
pub struct TokenBucket {
    /// Current tokens available in the bucket
    tokens_available: AtomicU64,
    /// Tokens added per second
    tokens_per_second: f64,
    /// Maximum bucket capacity
    max_tokens: u64,
    /// Last refill timestamp
    last_refill: RwLock<Instant>,
    /// Callers currently waiting for capacity
    waiters: AtomicUsize,
    /// Maximum number of queued callers
    queue_depth: usize,
    /// Longest a queued caller waits before rejection
    max_queue_wait: Duration,
}

impl TokenBucket {
    /// Create a bucket with the given tokens-per-minute limit
    pub fn new(config: &RateLimitsConfig) -> Self {
        Self {
            tokens_available: AtomicU64::new(config.tokens_per_minute),
            tokens_per_second: config.tokens_per_minute as f64 / 60.0,
            max_tokens: config.tokens_per_minute,
            last_refill: RwLock::new(Instant::now()),
            waiters: AtomicUsize::new(0),
            queue_depth: config.queue_depth,
            max_queue_wait: Duration::from_millis(config.max_queue_wait_ms),
        }
    }

    /// Refill tokens based on elapsed time
    fn refill(&self) {
        let mut last_refill = match self.last_refill.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let now = Instant::now();
        let elapsed = now.duration_since(*last_refill);

        let tokens_to_add = (elapsed.as_secs_f64() * self.tokens_per_second) as u64;
        if tokens_to_add > 0 {
            let current = self.tokens_available.load(Ordering::Relaxed);
            let new_value = (current + tokens_to_add).min(self.max_tokens);
            self.tokens_available.store(new_value, Ordering::Relaxed);
            *last_refill = now;
        }
    }

    /// Try to consume tokens without waiting
    pub fn try_consume(&self, tokens: u64) -> bool {
        self.refill();

        loop {
            let current = self.tokens_available.load(Ordering::Relaxed);
            if current < tokens {
                return false;
            }

            match self.tokens_available.compare_exchange_weak(
                current,
                current - tokens,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(_) => continue,
            }
        }
    }

    /// Seconds until `tokens` would refill from empty
    fn retry_after_secs(&self, tokens: u64) -> u64 {
        if self.tokens_per_second <= 0.0 {
            return 60;
        }
        (tokens as f64 / self.tokens_per_second).ceil().max(1.0) as u64
    }

    /// Acquire capacity, waiting in the bounded queue when necessary
    ///
    /// Returns the wait duration on success. Rejects with `RateLimited` when
    /// the queue is full, when the request can never fit the bucket, or when
    /// the wait ceiling elapses. Never blocks unboundedly.
    pub async fn acquire(&self, tokens: u64) -> Result<Duration, ProviderError> {
        if tokens > self.max_tokens {
            return Err(ProviderError::RateLimited {
                retry_after_secs: self.retry_after_secs(tokens),
            });
        }

        if self.try_consume(tokens) {
            return Ok(Duration::ZERO);
        }

        // Bounded queue: reject rather than pile up
        let queued = self.waiters.fetch_add(1, Ordering::SeqCst);
        if queued >= self.queue_depth {
            self.waiters.fetch_sub(1, Ordering::SeqCst);
            return Err(ProviderError::RateLimited {
                retry_after_secs: self.retry_after_secs(tokens),
            });
        }

        let start = Instant::now();
        let result = loop {
            if self.try_consume(tokens) {
                break Ok(start.elapsed());
            }
            if start.elapsed() >= self.max_queue_wait {
                break Err(ProviderError::RateLimited {
                    retry_after_secs: self.retry_after_secs(tokens),
                });
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        };

        self.waiters.fetch_sub(1, Ordering::SeqCst);
        result
    }

    /// Current available tokens
    pub fn tokens_available(&self) -> u64 {
        self.refill();
        self.tokens_available.load(Ordering::Relaxed)
    }
}

/// Rate limiter over all registered adapters
pub struct RateLimiter {
    config: RateLimitsConfig,
    buckets: RwLock<HashMap<String, std::sync::Arc<TokenBucket>>>,
}

impl RateLimiter {
    /// Create a limiter; buckets are created lazily per adapter id
    pub fn new(config: RateLimitsConfig) -> Self {
        Self {
            config,
            buckets: RwLock::new(HashMap::new()),
        }
    }

    fn bucket(&self, adapter_id: &str) -> std::sync::Arc<TokenBucket> {
        {
            let buckets = match self.buckets.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Some(bucket) = buckets.get(adapter_id) {
                return bucket.clone();
            }
        }
        let mut buckets = match self.buckets.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        buckets
            .entry(adapter_id.to_string())
            .or_insert_with(|| std::sync::Arc::new(TokenBucket::new(&self.config)))
            .clone()
    }

    /// Acquire capacity on the adapter's bucket
    pub async fn acquire(&self, adapter_id: &str, tokens: u64) -> Result<Duration, ProviderError> {
        self.bucket(adapter_id).acquire(tokens).await
    }

    /// Non-waiting capacity check, for tests and health reporting
    pub fn try_consume(&self, adapter_id: &str, tokens: u64) -> bool {
        self.bucket(adapter_id).try_consume(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(tokens_per_minute: u64) -> RateLimitsConfig {
        RateLimitsConfig {
            tokens_per_minute,
            queue_depth: 2,
            max_queue_wait_ms: 100,
        }
    }

    #[test]
    fn test_try_consume_within_capacity() {
        let bucket = TokenBucket::new(&small_config(10_000));
        assert!(bucket.try_consume(1_000));
        assert!(bucket.try_consume(1_000));
        assert!(bucket.tokens_available() > 0);
    }

    #[test]
    fn test_try_consume_exhaustion() {
        let bucket = TokenBucket::new(&small_config(1_000));
        assert!(bucket.try_consume(1_000));
        assert!(!bucket.try_consume(100));
    }

    #[tokio::test]
    async fn test_acquire_immediate() {
        let bucket = TokenBucket::new(&small_config(10_000));
        let wait = bucket.acquire(500).await.unwrap();
        assert_eq!(wait, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_acquire_oversized_request_rejected() {
        let bucket = TokenBucket::new(&small_config(1_000));
        let err = bucket.acquire(5_000).await.unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn test_acquire_rejects_after_wait_ceiling() {
        let bucket = TokenBucket::new(&small_config(1_000));
        assert!(bucket.try_consume(1_000));

        // Refill rate is ~16 tokens/sec; 900 tokens cannot arrive within the
        // 100ms queue wait, so the caller is rejected, not blocked.
        let err = bucket.acquire(900).await.unwrap_err();
        match err {
            ProviderError::RateLimited { retry_after_secs } => {
                assert!(retry_after_secs >= 1);
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_limiter_buckets_are_per_adapter() {
        let limiter = RateLimiter::new(small_config(1_000));
        assert!(limiter.try_consume("a", 1_000));
        // Adapter "a" is drained, "b" is untouched
        assert!(!limiter.try_consume("a", 100));
        assert!(limiter.try_consume("b", 1_000));
    }
}
