// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Didact Contributors

//! Credential store collaborator
//!
//! Adapters request API keys lazily, per call, and never persist secrets
//! beyond the call's lifetime.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::Result;

/// Supplies provider API keys on demand
pub trait CredentialStore: Send + Sync {
    /// Look up the key for a provider id; `Ok(None)` means not configured
    fn api_key(&self, provider_id: &str) -> Result<Option<String>>;
}

/// Credential store backed by environment variables
///
/// The variable name for each provider id is configured up front, matching
/// the `api_key_env` settings fields.
#[derive(Default)]
pub struct EnvCredentials {
    env_vars: HashMap<String, String>,
}

impl EnvCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a provider id to the environment variable holding its key
    pub fn with_env_var(mut self, provider_id: impl Into<String>, var: impl Into<String>) -> Self {
        self.env_vars.insert(provider_id.into(), var.into());
        self
    }
}

impl CredentialStore for EnvCredentials {
    fn api_key(&self, provider_id: &str) -> Result<Option<String>> {
        let Some(var) = self.env_vars.get(provider_id) else {
            return Ok(None);
        };
        Ok(std::env::var(var).ok().filter(|v| !v.is_empty()))
    }
}

/// In-memory credential store, for tests and embedding callers
#[derive(Default)]
pub struct StaticCredentials {
    keys: RwLock<HashMap<String, String>>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(self, provider_id: impl Into<String>, key: impl Into<String>) -> Self {
        {
            let mut keys = match self.keys.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            keys.insert(provider_id.into(), key.into());
        }
        self
    }
}

impl CredentialStore for StaticCredentials {
    fn api_key(&self, provider_id: &str) -> Result<Option<String>> {
        let keys = match self.keys.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(keys.get(provider_id).cloned())
    }
}
