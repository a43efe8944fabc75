// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Didact Contributors

//! Ollama local model adapter
//!
//! Implements the ProviderAdapter trait over Ollama's /api/generate endpoint.
//! Local and free, so the router prefers it unless configured otherwise.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::settings::OllamaConfig;
use crate::error::ProviderError;
use crate::provider::adapter::{
    Capability, GenerateOptions, HealthStatus, Prompt, ProviderAdapter, RawCompletion,
};

const ADAPTER_ID: &str = "ollama";

/// Ollama local model adapter
pub struct OllamaAdapter {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaAdapter {
    pub fn new(config: &OllamaConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }
    }

    fn map_transport_error(e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout
        } else if e.is_connect() {
            ProviderError::Unavailable(
                "Ollama is not running. Start the Ollama app or run 'ollama serve'".to_string(),
            )
        } else {
            ProviderError::Unavailable(e.to_string())
        }
    }

    fn map_status_error(status: reqwest::StatusCode, body: String) -> ProviderError {
        match status.as_u16() {
            404 => ProviderError::InvalidRequest(format!("model not found: {body}")),
            429 => ProviderError::RateLimited {
                retry_after_secs: 10,
            },
            400..=499 => ProviderError::InvalidRequest(body),
            _ => ProviderError::Unavailable(format!("server error ({status}): {body}")),
        }
    }
}

#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    num_predict: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
    #[serde(default)]
    model: String,
    #[serde(default)]
    prompt_eval_count: u64,
    #[serde(default)]
    eval_count: u64,
}

#[async_trait]
impl ProviderAdapter for OllamaAdapter {
    fn id(&self) -> &str {
        ADAPTER_ID
    }

    fn describe(&self) -> Capability {
        Capability {
            id: ADAPTER_ID.to_string(),
            streaming: true,
            max_tokens: 8192,
            is_local: true,
            requires_credential: false,
            input_cost_per_1k: 0.0,
            output_cost_per_1k: 0.0,
        }
    }

    async fn health_check(&self) -> HealthStatus {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => HealthStatus::Healthy,
            Ok(response) => HealthStatus::Degraded(format!("status {}", response.status())),
            Err(e) => HealthStatus::Unreachable(e.to_string()),
        }
    }

    async fn generate(
        &self,
        prompt: &Prompt,
        options: &GenerateOptions,
    ) -> std::result::Result<RawCompletion, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerateRequest {
            model: &self.model,
            prompt: &prompt.user,
            system: prompt.system.as_deref(),
            stream: false,
            options: OllamaOptions {
                num_predict: options.max_tokens,
                temperature: options.temperature,
            },
        };

        let start = Instant::now();
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(Self::map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::map_status_error(status, body));
        }

        let parsed: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(RawCompletion {
            text: parsed.response,
            input_tokens: parsed.prompt_eval_count,
            output_tokens: parsed.eval_count,
            model: if parsed.model.is_empty() {
                self.model.clone()
            } else {
                parsed.model
            },
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter_for(server: &MockServer) -> OllamaAdapter {
        OllamaAdapter::new(&OllamaConfig {
            base_url: server.uri(),
            model: "llama3.2".to_string(),
        })
    }

    #[tokio::test]
    async fn test_generate_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": "Slide 1: Functions",
                "model": "llama3.2",
                "prompt_eval_count": 120,
                "eval_count": 260
            })))
            .mount(&server)
            .await;

        let completion = adapter_for(&server)
            .generate(&Prompt::new("make slides"), &GenerateOptions::new(512))
            .await
            .unwrap();

        assert_eq!(completion.text, "Slide 1: Functions");
        assert_eq!(completion.total_tokens(), 380);
        assert_eq!(completion.model, "llama3.2");
    }

    #[tokio::test]
    async fn test_generate_server_error_maps_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = adapter_for(&server)
            .generate(&Prompt::new("x"), &GenerateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_generate_missing_model_maps_invalid_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model 'nope' not found"))
            .mount(&server)
            .await;

        let err = adapter_for(&server)
            .generate(&Prompt::new("x"), &GenerateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_health_check() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": []
            })))
            .mount(&server)
            .await;

        assert!(adapter_for(&server).health_check().await.is_healthy());
    }

    #[tokio::test]
    async fn test_health_check_unreachable() {
        let adapter = OllamaAdapter::new(&OllamaConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            model: "llama3.2".to_string(),
        });
        assert!(matches!(
            adapter.health_check().await,
            HealthStatus::Unreachable(_)
        ));
    }
}
