// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Bearer token lifecycle.
//!
//! The token is restored from retained memory on wake so a warm wake never
//! pays for a login. It is dropped the moment the server reports it invalid,
//! both in memory and in retained memory, and a fresh one is requested only
//! when a caller asks for it.

use std::time::Duration;

use reqwest::blocking::Client;
use sha2::{Digest, Sha256};

use mc_core::protocol::LOGIN_PATH;
use mc_core::{
    Endpoint, Error, LoginRequest, LoginResponse, Result, RetainedMemory, MAX_RETAINED_TOKEN_LEN,
};

use crate::config::CredentialsConfig;

/// Sends one login request and returns the raw HTTP answer.
pub trait LoginTransport {
    fn post_login(&mut self, url: &str, request: &LoginRequest<'_>) -> Result<(u16, String)>;
}

/// Login over HTTP with a per-request timeout.
pub struct HttpLoginTransport {
    client: Client,
}

impl HttpLoginTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {}", e)))?;
        Ok(HttpLoginTransport { client })
    }
}

impl LoginTransport for HttpLoginTransport {
    fn post_login(&mut self, url: &str, request: &LoginRequest<'_>) -> Result<(u16, String)> {
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .map_err(|e| Error::Http(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response.text().map_err(|e| Error::Http(e.to_string()))?;
        Ok((status, body))
    }
}

/// Supplies a valid bearer token to the pipeline.
pub trait CredentialProvider {
    /// Makes sure a token is held, logging in if needed. Returns true when
    /// one is available afterwards.
    fn ensure_logged_in(&mut self, endpoint: &Endpoint) -> bool;

    /// Unconditionally requests a fresh token.
    fn login(&mut self, endpoint: &Endpoint) -> Result<()>;

    /// Drops the current token everywhere it is stored.
    fn invalidate(&mut self);

    /// Current token, if any.
    fn token(&self) -> Option<&str>;
}

/// Short, non-reversible identifier for a token, safe to log.
pub fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..4])
}

/// Token held in memory and mirrored into the retained tier.
pub struct CredentialStore<T: LoginTransport, R: RetainedMemory> {
    username: String,
    password: String,
    transport: T,
    retained: R,
    token: Option<String>,
}

impl<T: LoginTransport, R: RetainedMemory> CredentialStore<T, R> {
    pub fn new(credentials: &CredentialsConfig, transport: T, retained: R) -> Self {
        CredentialStore {
            username: credentials.username.clone(),
            password: credentials.password.clone(),
            transport,
            retained,
            token: None,
        }
    }

    /// Loads a retained token into memory without any network call.
    /// Returns true when one was found.
    pub fn restore(&mut self) -> bool {
        match self.retained.load().token.filter(|t| !t.is_empty()) {
            Some(token) => {
                tracing::info!(token = %fingerprint(&token), "restored token from retained memory");
                self.token = Some(token);
                true
            }
            None => false,
        }
    }

    fn persist(&self, token: Option<&str>) {
        let retained_token = match token {
            Some(t) if t.len() > MAX_RETAINED_TOKEN_LEN => {
                tracing::warn!(
                    len = t.len(),
                    max = MAX_RETAINED_TOKEN_LEN,
                    "token too long to retain, keeping it in memory only"
                );
                None
            }
            other => other.map(String::from),
        };
        let result = self
            .retained
            .update(&mut |state| state.token = retained_token.clone());
        if let Err(e) = result {
            tracing::warn!("failed to update retained token: {}", e);
        }
    }
}

impl<T: LoginTransport, R: RetainedMemory> CredentialProvider for CredentialStore<T, R> {
    fn ensure_logged_in(&mut self, endpoint: &Endpoint) -> bool {
        if self.token.is_some() || self.restore() {
            return true;
        }
        match self.login(endpoint) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("login failed: {}", e);
                false
            }
        }
    }

    fn login(&mut self, endpoint: &Endpoint) -> Result<()> {
        let url = endpoint.api_url(LOGIN_PATH);
        tracing::info!(url = %url, username = %self.username, "logging in");

        let request = LoginRequest {
            username: &self.username,
            password: &self.password,
        };
        let (status, body) = self.transport.post_login(&url, &request)?;
        if !(200..300).contains(&status) {
            return Err(Error::AuthFailed(format!("login returned HTTP {}", status)));
        }
        let token = LoginResponse::parse(&body)
            .map_err(|e| Error::AuthFailed(e.to_string()))?
            .into_token()?;

        tracing::info!(token = %fingerprint(&token), "login successful");
        self.persist(Some(&token));
        self.token = Some(token);
        Ok(())
    }

    fn invalidate(&mut self) {
        if let Some(old) = self.token.take() {
            tracing::info!(token = %fingerprint(&old), "token invalidated");
        }
        self.persist(None);
    }

    fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

#[cfg(test)]
#[path = "credentials_tests.rs"]
mod tests;
