// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Didact Contributors

//! Built-in provider adapter implementations

mod anthropic;
mod ollama;

pub use anthropic::AnthropicAdapter;
pub use ollama::OllamaAdapter;
