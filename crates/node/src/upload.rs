// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Single upload attempts against the backend.
//!
//! An attempt succeeds only when the server answers 200 or 201 *and* the body
//! carries a truthy `success` field. A 2xx with a malformed or negative body
//! is a failure. A 401 comes back as `UploadRejected { status: 401 }` so the
//! caller can drop its token.

use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;

use mc_core::protocol::{UploadResponse, UPLOAD_PATH};
use mc_core::{Endpoint, Error, Result};

use crate::config::{BodyMode, UploadConfig};

/// Longest response body kept for diagnostics.
const MAX_DIAGNOSTIC_BODY: usize = 512;

/// Image bytes plus the optional encryption IV that travels with them.
#[derive(Debug, Clone, Copy)]
pub struct Payload<'a> {
    pub bytes: &'a [u8],
    pub iv: Option<&'a str>,
}

impl<'a> Payload<'a> {
    pub fn new(bytes: &'a [u8], iv: Option<&'a str>) -> Self {
        Payload { bytes, iv }
    }
}

/// What the server said about an accepted upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub status: u16,
    pub message: Option<String>,
}

/// Performs one upload attempt.
pub trait Uploader {
    fn upload(&mut self, endpoint: &Endpoint, payload: Payload<'_>, token: &str)
        -> Result<UploadReceipt>;
}

impl<U: Uploader + ?Sized> Uploader for &mut U {
    fn upload(
        &mut self,
        endpoint: &Endpoint,
        payload: Payload<'_>,
        token: &str,
    ) -> Result<UploadReceipt> {
        (**self).upload(endpoint, payload, token)
    }
}

/// Decides the outcome of an upload from the HTTP status and body.
pub fn classify(status: u16, body: &str) -> Result<UploadReceipt> {
    match status {
        200 | 201 => {
            let response = UploadResponse::parse(body)
                .map_err(|e| Error::InvalidResponse(format!("HTTP {}: {}", status, e)))?;
            if response.is_success() {
                Ok(UploadReceipt {
                    status,
                    message: response.message,
                })
            } else {
                Err(Error::InvalidResponse(format!(
                    "HTTP {} without success: {}",
                    status,
                    response.message.as_deref().unwrap_or("no message")
                )))
            }
        }
        _ => Err(Error::UploadRejected { status }),
    }
}

/// HTTP upload client.
pub struct UploadClient {
    client: Client,
    body: BodyMode,
    last_http_status: Option<u16>,
    last_response: Option<String>,
}

impl UploadClient {
    /// Builds a client with the configured timeouts and body mode.
    pub fn new(config: &UploadConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {}", e)))?;
        Ok(UploadClient {
            client,
            body: config.body,
            last_http_status: None,
            last_response: None,
        })
    }

    /// Status of the last attempt, `None` if it never got an answer.
    pub fn last_http_status(&self) -> Option<u16> {
        self.last_http_status
    }

    /// Body of the last answer (truncated), for diagnostics.
    pub fn last_response(&self) -> Option<&str> {
        self.last_response.as_deref()
    }

    fn send(&self, url: &str, payload: Payload<'_>, token: &str) -> Result<(u16, String)> {
        let mut request = self
            .client
            .post(url)
            .bearer_auth(token)
            .header("X-Image-Encrypted", if payload.iv.is_some() { "1" } else { "0" });
        if let Some(iv) = payload.iv {
            request = request.header("X-Image-IV", iv);
        }

        request = match self.body {
            BodyMode::Raw => request
                .header(CONTENT_TYPE, "image/jpeg")
                .body(payload.bytes.to_vec()),
            BodyMode::Multipart => {
                let part = Part::bytes(payload.bytes.to_vec())
                    .file_name("capture.jpg")
                    .mime_str("image/jpeg")
                    .map_err(|e| Error::Http(e.to_string()))?;
                request.multipart(Form::new().part("image", part))
            }
        };

        let response = request.send().map_err(|e| Error::Http(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response.text().unwrap_or_default();
        Ok((status, body))
    }
}

impl Uploader for UploadClient {
    fn upload(
        &mut self,
        endpoint: &Endpoint,
        payload: Payload<'_>,
        token: &str,
    ) -> Result<UploadReceipt> {
        if payload.bytes.is_empty() {
            return Err(Error::CaptureFailed("refusing to upload an empty image".to_string()));
        }

        let url = endpoint.api_url(UPLOAD_PATH);
        tracing::info!(url = %url, bytes = payload.bytes.len(), "uploading image");

        let (status, body) = match self.send(&url, payload, token) {
            Ok(answer) => answer,
            Err(e) => {
                self.last_http_status = None;
                self.last_response = None;
                tracing::warn!("upload transport error: {}", e);
                return Err(e);
            }
        };

        self.last_http_status = Some(status);
        self.last_response = Some(truncate(&body, MAX_DIAGNOSTIC_BODY));

        let outcome = classify(status, &body);
        match &outcome {
            Ok(receipt) => tracing::info!(
                status,
                message = receipt.message.as_deref().unwrap_or("Success"),
                "upload accepted"
            ),
            Err(e) if e.is_unauthorized() => tracing::warn!("token expired (401)"),
            Err(e) => tracing::warn!(
                status,
                response = %truncate(&body, 200),
                "upload failed: {}", e
            ),
        }
        outcome
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

#[cfg(test)]
#[path = "upload_tests.rs"]
mod tests;
