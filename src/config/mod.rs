// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Didact Contributors

//! Configuration management

pub mod settings;

pub use settings::Settings;
