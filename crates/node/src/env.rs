// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! The variable name constants are generated by `build.rs` and live in the
//! [`vars`] submodule.

use std::path::PathBuf;

/// Generated environment variable name constants.
pub mod vars {
    include!(concat!(env!("OUT_DIR"), "/env_vars.rs"));
}

/// Returns the value of `MOTIONCAM_CONFIG` if set.
pub fn config_path() -> Option<PathBuf> {
    std::env::var(vars::MOTIONCAM_CONFIG).ok().map(PathBuf::from)
}

/// Returns the value of `MOTIONCAM_PASSWORD` if set and non-empty.
pub fn password() -> Option<String> {
    std::env::var(vars::MOTIONCAM_PASSWORD)
        .ok()
        .filter(|p| !p.is_empty())
}

/// Returns the value of `MOTIONCAM_RETAINED_DIR` if set.
pub fn retained_dir() -> Option<PathBuf> {
    std::env::var(vars::MOTIONCAM_RETAINED_DIR)
        .ok()
        .map(PathBuf::from)
}

/// Returns the value of `XDG_RUNTIME_DIR` if set.
pub fn xdg_runtime_dir() -> Option<PathBuf> {
    std::env::var(vars::XDG_RUNTIME_DIR).ok().map(PathBuf::from)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
