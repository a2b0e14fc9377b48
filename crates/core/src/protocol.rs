// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Wire types exchanged with the backend over HTTP.
//!
//! ```text
//! POST {base}/auth/login    {"username": ..., "password": ...}
//!                        -> {"success": true, "data": {"token": "..."}}
//! POST {base}/upload-image  (JPEG body or multipart field "image")
//!                        -> {"success": true, "message": "..."}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Path of the login route, relative to the API base.
pub const LOGIN_PATH: &str = "/auth/login";

/// Path of the upload route, relative to the API base.
pub const UPLOAD_PATH: &str = "/upload-image";

/// Body of a login request.
#[derive(Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

impl std::fmt::Debug for LoginRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body of a login response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub success: Value,
    #[serde(default)]
    pub data: Option<LoginData>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginData {
    #[serde(default)]
    pub token: Option<String>,
}

impl LoginResponse {
    /// Parses a login response body.
    pub fn parse(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }

    /// Extracts the session token, requiring `success` and a non-empty token.
    pub fn into_token(self) -> Result<String> {
        if !is_truthy(&self.success) {
            let reason = self
                .message
                .unwrap_or_else(|| "server reported failure".to_string());
            return Err(Error::AuthFailed(reason));
        }
        match self.data.and_then(|d| d.token) {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(Error::AuthFailed("no token in response".to_string())),
        }
    }
}

/// Body of an upload response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub success: Value,
    #[serde(default)]
    pub message: Option<String>,
}

impl UploadResponse {
    /// Parses an upload response body.
    pub fn parse(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }

    /// True when the server acknowledged the image.
    pub fn is_success(&self) -> bool {
        is_truthy(&self.success)
    }
}

/// Lenient JSON truthiness for the `success` field.
///
/// `true`, non-zero numbers and non-empty strings count; everything else,
/// including a missing field, does not.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
        Value::Null => false,
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
