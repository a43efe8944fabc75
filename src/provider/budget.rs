// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Didact Contributors

//! Per-session token budget tracking
//!
//! A step reserves its estimate before dispatch; the reservation fails fast
//! with `BudgetExceeded` when the projected total would exceed the ceiling,
//! without ever calling the provider. The actual usage returned by the
//! provider reconciles the estimate after the call. Attempts that never
//! reached the provider release their reservation and never count as spend.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{DidactError, Result};

/// Token budget for one session
///
/// Spend only grows until an explicit [`BudgetTracker::reset`].
#[derive(Debug)]
pub struct BudgetTracker {
    /// Token ceiling for the session
    ceiling: u64,
    /// Tokens spent by calls that reached the provider
    spent: AtomicU64,
    /// Tokens reserved by in-flight calls
    reserved: AtomicU64,
}

impl BudgetTracker {
    /// Create a tracker with a token ceiling
    pub fn new(ceiling: u64) -> Self {
        Self {
            ceiling,
            spent: AtomicU64::new(0),
            reserved: AtomicU64::new(0),
        }
    }

    /// Tokens remaining below the ceiling (spend plus reservations)
    pub fn remaining(&self) -> u64 {
        let committed = self.spent.load(Ordering::SeqCst) + self.reserved.load(Ordering::SeqCst);
        self.ceiling.saturating_sub(committed)
    }

    /// Tokens actually spent so far
    pub fn spent(&self) -> u64 {
        self.spent.load(Ordering::SeqCst)
    }

    /// The configured ceiling
    pub fn ceiling(&self) -> u64 {
        self.ceiling
    }

    /// Reserve the estimate for one call
    ///
    /// Fails fast with `BudgetExceeded` when the projected total would exceed
    /// the ceiling. The caller must pair this with [`commit`](Self::commit) or
    /// [`release`](Self::release).
    pub fn reserve(&self, estimate: u64) -> Result<()> {
        loop {
            let reserved = self.reserved.load(Ordering::SeqCst);
            let spent = self.spent.load(Ordering::SeqCst);
            let remaining = self.ceiling.saturating_sub(spent + reserved);

            if estimate > remaining {
                return Err(DidactError::BudgetExceeded {
                    estimated: estimate,
                    remaining,
                });
            }

            match self.reserved.compare_exchange(
                reserved,
                reserved + estimate,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return Ok(()),
                Err(_) => continue,
            }
        }
    }

    /// Reconcile a reservation with the actual usage the provider reported
    pub fn commit(&self, estimate: u64, actual: u64) {
        self.reserved.fetch_sub(estimate, Ordering::SeqCst);
        self.spent.fetch_add(actual, Ordering::SeqCst);
    }

    /// Release a reservation for a call that never reached the provider
    pub fn release(&self, estimate: u64) {
        self.reserved.fetch_sub(estimate, Ordering::SeqCst);
    }

    /// Explicitly reset spend, e.g. after the caller raises the budget
    pub fn reset(&self) {
        self.spent.store(0, Ordering::SeqCst);
        self.reserved.store(0, Ordering::SeqCst);
    }
}
