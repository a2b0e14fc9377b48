// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Capture artifacts: one encoded still image plus its metadata.

use chrono::{DateTime, Utc};

/// A captured image owned by the pipeline for the duration of one cycle.
///
/// The camera produces it, the pipeline lends it to the uploader or the
/// offline queue, and it is handed back to the camera with `release`.
#[derive(Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Encoded image bytes (JPEG, optionally encrypted).
    pub bytes: Vec<u8>,
    /// When the frame was captured, if the wall clock was set.
    pub captured_at: Option<DateTime<Utc>>,
    /// Base64 IV when `bytes` is an encrypted payload.
    pub encryption_iv: Option<String>,
}

impl Artifact {
    /// Creates a plain (unencrypted) artifact.
    pub fn new(bytes: Vec<u8>, captured_at: Option<DateTime<Utc>>) -> Self {
        Artifact {
            bytes,
            captured_at,
            encryption_iv: None,
        }
    }

    /// Marks the payload as encrypted with the given base64 IV.
    pub fn with_iv(mut self, iv: impl Into<String>) -> Self {
        self.encryption_iv = Some(iv.into());
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_encrypted(&self) -> bool {
        self.encryption_iv.is_some()
    }
}

impl std::fmt::Debug for Artifact {
    // Image bytes are never dumped into logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Artifact")
            .field("len", &self.bytes.len())
            .field("captured_at", &self.captured_at)
            .field("encrypted", &self.is_encrypted())
            .finish()
    }
}

#[cfg(test)]
#[path = "artifact_tests.rs"]
mod tests;
