// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Backend endpoint resolution with a fallback chain.
//!
//! ```text
//! live discovery ──ok──► endpoint (discovered) ──► remember host on storage
//!       │
//!     fail
//!       ▼
//! last-known host ──some──► endpoint
//!       │
//!     none
//!       ▼
//! static host ──some──► endpoint
//!       │
//!     none ──► not ready
//! ```
//!
//! Storage is written only after a successful discovery, so one success is
//! remembered until the next one replaces it.

use std::net::{IpAddr, ToSocketAddrs};
use std::sync::mpsc;
use std::time::Duration;

use mc_core::Endpoint;

use crate::config::ServerConfig;
use crate::settings::HostCache;

/// Live name discovery.
pub trait NameResolver {
    /// Looks `hostname` up, giving up after `timeout`.
    fn lookup(&self, hostname: &str, timeout: Duration) -> Option<IpAddr>;
}

/// System resolver (DNS, mDNS through nss, /etc/hosts).
///
/// `getaddrinfo` has no timeout of its own, so the lookup runs on a helper
/// thread and is abandoned once the deadline passes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemNameResolver;

impl NameResolver for SystemNameResolver {
    fn lookup(&self, hostname: &str, timeout: Duration) -> Option<IpAddr> {
        let (tx, rx) = mpsc::channel();
        let query = format!("{}:0", hostname);
        let spawned = std::thread::Builder::new()
            .name("name-lookup".to_string())
            .spawn(move || {
                let addrs: Vec<IpAddr> = query
                    .to_socket_addrs()
                    .map(|it| it.map(|a| a.ip()).collect())
                    .unwrap_or_default();
                let _ = tx.send(addrs);
            });
        if let Err(e) = spawned {
            tracing::warn!("failed to spawn lookup thread: {}", e);
            return None;
        }
        let addrs = rx.recv_timeout(timeout).ok()?;
        // Prefer IPv4, the backend is usually reached on a LAN address.
        addrs
            .iter()
            .find(|ip| ip.is_ipv4())
            .or_else(|| addrs.first())
            .copied()
    }
}

/// Resolves the backend location once per wake cycle.
pub struct EndpointResolver<N: NameResolver, C: HostCache> {
    server: ServerConfig,
    timeout: Duration,
    names: N,
    cache: C,
    endpoint: Option<Endpoint>,
}

impl<N: NameResolver, C: HostCache> EndpointResolver<N, C> {
    pub fn new(server: ServerConfig, timeout: Duration, names: N, cache: C) -> Self {
        EndpointResolver {
            server,
            timeout,
            names,
            cache,
            endpoint: None,
        }
    }

    /// Runs the fallback chain. Returns true when any usable base URL exists.
    pub fn resolve(&mut self) -> bool {
        self.endpoint = None;

        if let Some(hostname) = self.server.hostname.clone().filter(|h| !h.trim().is_empty()) {
            tracing::debug!(hostname = %hostname, "resolving backend host");
            if let Some(ip) = self.names.lookup(&hostname, self.timeout) {
                let host = ip.to_string();
                tracing::info!(hostname = %hostname, address = %host, "host resolved");
                if let Err(e) = self.cache.remember_host(&host) {
                    tracing::warn!("failed to remember resolved host: {}", e);
                }
                self.endpoint = Some(self.endpoint_for(&host).discovered());
                return true;
            }
            tracing::warn!(hostname = %hostname, "hostname lookup failed, using fallback");
        }

        let fallback = self
            .cache
            .last_known_host()
            .map(|h| (h, "last known"))
            .or_else(|| {
                self.server
                    .static_host
                    .clone()
                    .filter(|h| !h.trim().is_empty())
                    .map(|h| (h, "static"))
            });

        match fallback {
            Some((host, source)) => {
                let endpoint = self.endpoint_for(&host);
                tracing::info!(source, base_url = %endpoint, "using fallback host");
                self.endpoint = Some(endpoint);
                true
            }
            None => {
                tracing::warn!("no usable backend host");
                false
            }
        }
    }

    /// Endpoint from the last `resolve`, if it was ready.
    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.endpoint.as_ref()
    }

    /// Full URL of an API route on the resolved endpoint.
    pub fn build_api_url(&self, path: &str) -> Option<String> {
        self.endpoint.as_ref().map(|e| e.api_url(path))
    }

    fn endpoint_for(&self, host: &str) -> Endpoint {
        Endpoint::new(
            &self.server.scheme,
            host,
            self.server.port,
            &self.server.api_path,
        )
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
