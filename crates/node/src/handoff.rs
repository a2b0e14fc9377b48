// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Frame handoff between a live stream and the capture pipeline.
//!
//! When a camera is also streaming, its loop owns the sensor. A capture is
//! requested through a single slot; the stream loop notices the request
//! between frames and fulfils it with a copy of the next frame.
//!
//! ```text
//! pipeline                      stream loop
//!    │ request() ──► [slot] ◄── offer_with(frame)   (every frame)
//!    │ wait(timeout) ◄───────── frame copy
//! ```
//!
//! At most one request is outstanding. A request abandoned by its waiter
//! frees the slot when dropped.
//!
//! The `motioncam` binary has no stream loop of its own. An embedder that
//! serves a live stream owns the [`FrameHandoff`] and hands a
//! [`StreamCamera`] to [`crate::pipeline::CapturePipeline`] in place of a
//! command or file camera.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use mc_core::{Artifact, Error, Result};

use crate::devices::Camera;

struct Pending {
    id: u64,
    reply: SyncSender<Artifact>,
}

#[derive(Default)]
pub struct FrameHandoff {
    slot: Mutex<Option<Pending>>,
    next_id: AtomicU64,
}

impl FrameHandoff {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn slot(&self) -> MutexGuard<'_, Option<Pending>> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers a capture request. Fails while another one is outstanding.
    pub fn request(self: &Arc<Self>) -> Result<FrameRequest> {
        let mut slot = self.slot();
        if slot.is_some() {
            return Err(Error::CaptureFailed(
                "a capture is already pending".to_string(),
            ));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply, frames) = mpsc::sync_channel(1);
        *slot = Some(Pending { id, reply });
        Ok(FrameRequest {
            id,
            frames,
            handoff: Arc::clone(self),
        })
    }

    /// True while a request is waiting for a frame.
    pub fn is_requested(&self) -> bool {
        self.slot().is_some()
    }

    /// Called by the stream loop for each frame. `make` runs only when a
    /// request is pending. Returns true if a frame was handed over.
    pub fn offer_with(&self, make: impl FnOnce() -> Artifact) -> bool {
        let Some(pending) = self.slot().take() else {
            return false;
        };
        pending.reply.send(make()).is_ok()
    }

    fn release(&self, id: u64) {
        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|p| p.id == id) {
            *slot = None;
        }
    }
}

/// An outstanding capture request.
pub struct FrameRequest {
    id: u64,
    frames: Receiver<Artifact>,
    handoff: Arc<FrameHandoff>,
}

impl FrameRequest {
    /// Waits for the stream loop to deliver a frame.
    pub fn wait(self, timeout: Duration) -> Option<Artifact> {
        self.frames.recv_timeout(timeout).ok()
    }
}

impl Drop for FrameRequest {
    fn drop(&mut self) {
        self.handoff.release(self.id);
    }
}

/// Camera whose frames come from a running stream.
pub struct StreamCamera {
    handoff: Arc<FrameHandoff>,
    timeout: Duration,
}

impl StreamCamera {
    pub fn new(handoff: Arc<FrameHandoff>, timeout: Duration) -> Self {
        StreamCamera { handoff, timeout }
    }
}

impl Camera for StreamCamera {
    fn capture(&mut self) -> Result<Artifact> {
        let request = self.handoff.request()?;
        request.wait(self.timeout).ok_or_else(|| {
            Error::CaptureFailed(format!(
                "no frame from stream within {}ms",
                self.timeout.as_millis()
            ))
        })
    }

    fn release(&mut self, _artifact: Artifact) {}
}

#[cfg(test)]
#[path = "handoff_tests.rs"]
mod tests;
