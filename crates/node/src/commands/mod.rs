// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod cycle;
pub mod drain;
pub mod status;
pub mod token;

use std::path::Path;

use crate::config::Config;
use crate::Result;

/// Loads and validates the config at `path`.
pub fn load_config(path: &Path) -> Result<Config> {
    tracing::debug!(path = %path.display(), "loading config");
    Config::load(path)
}
