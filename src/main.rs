// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Didact Contributors

//! didact - demo CLI for the content-generation engine
//!
//! Wires configured adapters into the workflow engine and prints progress
//! and results to stdout. The library is the product; this binary exists to
//! exercise it end to end.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use didact::config::Settings;
use didact::credentials::EnvCredentials;
use didact::provider::adapters::{AnthropicAdapter, OllamaAdapter};
use didact::provider::{ProviderRegistry, Router};
use didact::store::InMemoryStore;
use didact::workflow::{ContentType, GenerationRequest, WorkflowEngine};

#[derive(Parser)]
#[command(name = "didact", version, about = "Generate course materials with LLM providers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate course materials for a topic
    Generate {
        /// Lesson topic
        #[arg(long)]
        topic: String,

        /// Comma-separated content types: slides,notes,worksheet,quiz,rubric
        #[arg(long, value_delimiter = ',', default_value = "slides")]
        types: Vec<String>,

        /// Target audience
        #[arg(long, default_value = "general learners")]
        audience: String,

        /// Lesson duration in minutes
        #[arg(long, default_value_t = 60)]
        duration: u32,

        /// Learning objectives (repeatable)
        #[arg(long = "objective")]
        objectives: Vec<String>,

        /// Session token budget
        #[arg(long, default_value_t = 100_000)]
        budget: u64,
    },
    /// Probe every configured provider and print its health
    Health,
}

fn parse_content_type(name: &str) -> anyhow::Result<ContentType> {
    match name.trim().to_lowercase().as_str() {
        "slides" => Ok(ContentType::Slides),
        "notes" => Ok(ContentType::Notes),
        "worksheet" => Ok(ContentType::Worksheet),
        "quiz" => Ok(ContentType::Quiz),
        "rubric" => Ok(ContentType::Rubric),
        other => anyhow::bail!("unknown content type: {other}"),
    }
}

fn build_router(settings: &Settings) -> Arc<Router> {
    let registry = Arc::new(ProviderRegistry::new());
    registry.register(Arc::new(OllamaAdapter::new(&settings.providers.ollama)));

    let credentials = EnvCredentials::new().with_env_var(
        "anthropic",
        settings.providers.anthropic.api_key_env.clone(),
    );
    registry.register(Arc::new(AnthropicAdapter::new(
        &settings.providers.anthropic,
        Arc::new(credentials),
    )));

    Arc::new(Router::new(
        registry,
        settings.providers.preference.clone(),
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let settings = Settings::load().context("failed to load settings")?;
    let router = build_router(&settings);

    match cli.command {
        Commands::Health => {
            for line in router.health().await {
                println!("{}", serde_json::to_string_pretty(&line)?);
            }
        }
        Commands::Generate {
            topic,
            types,
            audience,
            duration,
            objectives,
            budget,
        } => {
            let content_types = types
                .iter()
                .map(|t| parse_content_type(t))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let request = GenerationRequest::new(topic, content_types)
                .with_audience(audience)
                .with_duration_minutes(duration)
                .with_objectives(objectives)
                .with_budget_tokens(budget);

            let engine = Arc::new(WorkflowEngine::new(
                router,
                Arc::new(InMemoryStore::new()),
                settings,
            ));
            let mut progress = engine.subscribe();
            let printer = tokio::spawn(async move {
                while let Some(event) = progress.recv().await {
                    eprintln!(
                        "[{:>3}%] {:?}{}",
                        event.progress_percent,
                        event.status,
                        event
                            .eta_seconds
                            .map(|eta| format!(" (~{eta}s left)"))
                            .unwrap_or_default()
                    );
                }
            });

            let session_id = engine.submit(request).await?;
            let result = engine.run(session_id).await?;
            drop(engine);
            let _ = printer.await;

            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.success {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
