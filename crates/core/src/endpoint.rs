// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Resolved backend location.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the backend API lives for the current wake cycle.
///
/// Format of the base URL: `{scheme}://{host}:{port}{api_path}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    /// Path prefix of the API, always starting with `/` (or empty).
    pub api_path: String,
    /// True when `host` came from a fresh name lookup in this cycle.
    pub resolved_via_live_discovery: bool,
}

impl Endpoint {
    /// Creates an endpoint, normalizing the API path.
    pub fn new(scheme: &str, host: &str, port: u16, api_path: &str) -> Self {
        Endpoint {
            scheme: scheme.to_string(),
            host: host.to_string(),
            port,
            api_path: normalize_api_path(api_path),
            resolved_via_live_discovery: false,
        }
    }

    /// Marks the endpoint as coming from live discovery.
    pub fn discovered(mut self) -> Self {
        self.resolved_via_live_discovery = true;
        self
    }

    /// Base URL of the API, e.g. `http://192.168.2.22:3000/api`.
    pub fn base_url(&self) -> String {
        // IPv6 literals need brackets inside a URL authority.
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!(
                "{}://[{}]:{}{}",
                self.scheme, self.host, self.port, self.api_path
            )
        } else {
            format!(
                "{}://{}:{}{}",
                self.scheme, self.host, self.port, self.api_path
            )
        }
    }

    /// Joins `path` onto the base URL with exactly one separating slash.
    pub fn api_url(&self, path: &str) -> String {
        let base = self.base_url();
        let path = path.trim_start_matches('/');
        format!("{}/{}", base.trim_end_matches('/'), path)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url())
    }
}

fn normalize_api_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
#[path = "endpoint_tests.rs"]
mod tests;
