// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the capture-upload pipeline.
//!
//! Every variant is recoverable at the pipeline level: a failing cycle either
//! persists its capture for later or skips the cycle. Nothing here is meant to
//! bring the process down.

use thiserror::Error;

/// All possible errors that can occur while capturing and delivering images.
#[derive(Debug, Error)]
pub enum Error {
    #[error("wireless link unavailable")]
    LinkUnavailable,

    #[error("no usable server endpoint\n  hint: configure server.hostname or server.static_host")]
    EndpointUnresolved,

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("capture failed: {0}")]
    CaptureFailed(String),

    #[error("upload rejected with HTTP {status}")]
    UploadRejected { status: u16 },

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("incomplete write: {written} of {expected} bytes")]
    StorageWriteIncomplete { expected: usize, written: usize },

    #[error("out of memory allocating {requested} bytes")]
    OutOfMemory { requested: usize },

    #[error("invalid server response: {0}")]
    InvalidResponse(String),

    #[error("http error: {0}")]
    Http(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns true when the server reported the session token as invalid.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::UploadRejected { status: 401 })
    }

    /// HTTP status carried by the error, if the server answered at all.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Error::UploadRejected { status } => Some(*status),
            _ => None,
        }
    }
}

/// A specialized Result type for motioncam operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
