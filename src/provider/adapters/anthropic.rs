// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Didact Contributors

//! Anthropic remote adapter
//!
//! Implements the ProviderAdapter trait over the Messages API. The API key is
//! fetched from the credential store per call and dropped with the request.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::config::settings::AnthropicConfig;
use crate::credentials::CredentialStore;
use crate::error::ProviderError;
use crate::provider::adapter::{
    Capability, GenerateOptions, HealthStatus, Prompt, ProviderAdapter, RawCompletion,
};

const ADAPTER_ID: &str = "anthropic";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// Anthropic Messages API adapter
pub struct AnthropicAdapter {
    client: Client,
    base_url: String,
    model: String,
    credentials: Arc<dyn CredentialStore>,
}

impl AnthropicAdapter {
    pub fn new(config: &AnthropicConfig, credentials: Arc<dyn CredentialStore>) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            credentials,
        }
    }

    fn key(&self) -> std::result::Result<String, ProviderError> {
        match self.credentials.api_key(ADAPTER_ID) {
            Ok(Some(key)) => Ok(key),
            Ok(None) => Err(ProviderError::InvalidRequest(
                "No Anthropic API key configured. Set ANTHROPIC_API_KEY.".to_string(),
            )),
            Err(e) => Err(ProviderError::InvalidRequest(e.to_string())),
        }
    }

    fn map_transport_error(e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout
        } else {
            ProviderError::Unavailable(e.to_string())
        }
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<MessageBody<'a>>,
}

#[derive(Serialize)]
struct MessageBody<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    model: String,
    #[serde(default)]
    stop_reason: Option<String>,
    usage: UsageBody,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct UsageBody {
    input_tokens: u64,
    output_tokens: u64,
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn id(&self) -> &str {
        ADAPTER_ID
    }

    fn describe(&self) -> Capability {
        Capability {
            id: ADAPTER_ID.to_string(),
            streaming: true,
            max_tokens: 8192,
            is_local: false,
            requires_credential: true,
            input_cost_per_1k: 0.003,
            output_cost_per_1k: 0.015,
        }
    }

    async fn health_check(&self) -> HealthStatus {
        // No unauthenticated liveness endpoint; key presence is the useful signal
        match self.credentials.api_key(ADAPTER_ID) {
            Ok(Some(_)) => HealthStatus::Healthy,
            Ok(None) => HealthStatus::Degraded("no API key configured".to_string()),
            Err(e) => HealthStatus::Unreachable(e.to_string()),
        }
    }

    async fn generate(
        &self,
        prompt: &Prompt,
        options: &GenerateOptions,
    ) -> std::result::Result<RawCompletion, ProviderError> {
        let key = self.key()?;
        let url = format!("{}/v1/messages", self.base_url);
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            system: prompt.system.as_deref(),
            messages: vec![MessageBody {
                role: "user",
                content: &prompt.user,
            }],
        };

        let start = Instant::now();
        let response = self
            .client
            .post(&url)
            .header("x-api-key", key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(Self::map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            let text = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                401 | 403 => {
                    ProviderError::InvalidRequest("authentication failed: invalid API key".to_string())
                }
                429 => ProviderError::RateLimited {
                    retry_after_secs: retry_after.unwrap_or(30),
                },
                400 => ProviderError::InvalidRequest(text),
                529 => ProviderError::Unavailable("API overloaded".to_string()),
                _ => ProviderError::Unavailable(format!("server error ({status}): {text}")),
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        if parsed.stop_reason.as_deref() == Some("refusal") {
            let refusal = parsed
                .content
                .iter()
                .find(|b| b.block_type == "text")
                .map(|b| b.text.clone())
                .unwrap_or_else(|| "the model declined to generate this content".to_string());
            return Err(ProviderError::ContentPolicyRejected(refusal));
        }

        let text = parsed
            .content
            .iter()
            .filter(|b| b.block_type == "text")
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        if text.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "response contained no text blocks".to_string(),
            ));
        }

        Ok(RawCompletion {
            text,
            input_tokens: parsed.usage.input_tokens,
            output_tokens: parsed.usage.output_tokens,
            model: parsed.model,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}
