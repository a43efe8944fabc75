// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Didact Contributors

//! Progress reporting
//!
//! The engine emits progress events over tokio mpsc channels. Percent is
//! clamped monotonically non-decreasing per session, so inserted remediation
//! steps (which grow the denominator) never make the bar move backwards.
//! Subscribers that fall behind or hang up are dropped, never waited on.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::workflow::StepStatus;

const CHANNEL_CAPACITY: usize = 256;

/// One progress update, additive-only JSON shape
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub session_id: Uuid,

    /// Absent for session-level events (e.g. completion)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<Uuid>,

    pub status: StepStatus,

    /// 0-100, monotone per session
    pub progress_percent: u8,

    /// Estimated seconds remaining, when enough steps have finished to guess
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta_seconds: Option<u64>,
}

/// Fans progress events out to subscribers, clamping percent monotone
#[derive(Default)]
pub struct ProgressReporter {
    subscribers: Mutex<Vec<mpsc::Sender<ProgressEvent>>>,
    /// Highest percent emitted per session
    high_water: Mutex<HashMap<Uuid, u8>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new subscription; events from now on are delivered to it
    pub fn subscribe(&self) -> mpsc::Receiver<ProgressEvent> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        match self.subscribers.lock() {
            Ok(mut guard) => guard.push(tx),
            Err(poisoned) => poisoned.into_inner().push(tx),
        }
        rx
    }

    /// Emit an event to every live subscriber
    ///
    /// The percent is raised to the session's high-water mark when the raw
    /// value would regress.
    pub fn emit(&self, mut event: ProgressEvent) {
        {
            let mut high_water = match self.high_water.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let mark = high_water.entry(event.session_id).or_insert(0);
            if event.progress_percent < *mark {
                event.progress_percent = *mark;
            } else {
                *mark = event.progress_percent;
            }
        }

        tracing::debug!(
            session = %event.session_id,
            step = ?event.step_id,
            status = ?event.status,
            percent = event.progress_percent,
            "progress"
        );

        let mut subscribers = match self.subscribers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }

    /// Drop the high-water mark for a finished session
    pub fn forget(&self, session_id: Uuid) {
        match self.high_water.lock() {
            Ok(mut guard) => {
                guard.remove(&session_id);
            }
            Err(poisoned) => {
                poisoned.into_inner().remove(&session_id);
            }
        }
    }
}
