// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! One wake cycle: trigger to sleep.
//!
//! ```text
//! Idle ─► TriggerReceived ─► ResolvingEndpoint ─► Authenticating ─► Capturing
//!              │ cooldown           │ not ready         │ no token      │ fail
//!              ▼                    ▼                   ▼               ▼
//!           Sleeping ◄──────────────┴───────────────────┴───────────────┘
//!              ▲
//!              │        ┌──► Draining ───┐
//!              └────────┤                ├◄── Uploading
//!                       └──► Persisting ◄┘
//! ```
//!
//! Every failure degrades to "persist for later" or "skip this cycle"; a
//! cycle never returns an error.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use mc_core::{Artifact, Endpoint, Error, Result, RetainedMemory, WallClock};

use crate::config::Config;
use crate::credentials::CredentialProvider;
use crate::devices::{Camera, Link};
use crate::queue::{ArtifactStore, DrainPolicy, DrainReport};
use crate::resolver::{EndpointResolver, NameResolver};
use crate::settings::HostCache;
use crate::upload::{Payload, Uploader};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    TriggerReceived,
    ResolvingEndpoint,
    Authenticating,
    Capturing,
    Uploading,
    Persisting,
    Draining,
    Sleeping,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::TriggerReceived => "trigger_received",
            Stage::ResolvingEndpoint => "resolving_endpoint",
            Stage::Authenticating => "authenticating",
            Stage::Capturing => "capturing",
            Stage::Uploading => "uploading",
            Stage::Persisting => "persisting",
            Stage::Draining => "draining",
            Stage::Sleeping => "sleeping",
        };
        write!(f, "{}", name)
    }
}

/// How a wake cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Trigger fell inside the cooldown window.
    CoolingDown,
    NoEndpoint,
    NotAuthenticated,
    CaptureFailed,
    Uploaded,
    /// Upload failed, the capture is queued.
    Persisted,
    /// Upload failed and the capture could not be queued either.
    Lost,
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CycleOutcome::CoolingDown => "ignored (cooldown)",
            CycleOutcome::NoEndpoint => "no backend endpoint",
            CycleOutcome::NotAuthenticated => "not authenticated",
            CycleOutcome::CaptureFailed => "capture failed",
            CycleOutcome::Uploaded => "uploaded",
            CycleOutcome::Persisted => "queued for later",
            CycleOutcome::Lost => "lost",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub stages: Vec<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drained: Option<DrainReport>,
}

/// Stage bookkeeping while a cycle runs.
struct Trace {
    stages: Vec<Stage>,
}

impl Trace {
    fn start() -> Self {
        Trace {
            stages: vec![Stage::Idle],
        }
    }

    fn enter(&mut self, stage: Stage) {
        tracing::debug!(%stage, "entering stage");
        self.stages.push(stage);
    }
}

/// Tunables for the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub cooldown: Duration,
    pub link_timeout: Duration,
    pub drain: DrainPolicy,
    pub keep_sent: usize,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        PipelineSettings {
            cooldown: config.cooldown(),
            link_timeout: config.link_timeout(),
            drain: DrainPolicy {
                max_entries: config.pipeline.drain_max_entries,
                stop_on_first_failure: config.queue.stop_on_first_failure,
            },
            keep_sent: config.queue.keep_sent,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        PipelineSettings {
            cooldown: Duration::from_secs(15),
            link_timeout: Duration::from_secs(15),
            drain: DrainPolicy::default(),
            keep_sent: 200,
        }
    }
}

/// Collaborators of a pipeline.
pub struct PipelineParts<N: NameResolver, C: HostCache, P, U, S, Cam, L> {
    pub resolver: EndpointResolver<N, C>,
    pub credentials: P,
    pub uploader: U,
    pub store: S,
    pub camera: Cam,
    pub link: L,
    pub retained: Box<dyn RetainedMemory>,
    pub clock: Box<dyn WallClock>,
}

pub struct CapturePipeline<N: NameResolver, C: HostCache, P, U, S, Cam, L> {
    settings: PipelineSettings,
    resolver: EndpointResolver<N, C>,
    credentials: P,
    uploader: U,
    store: S,
    camera: Cam,
    link: L,
    retained: Box<dyn RetainedMemory>,
    clock: Box<dyn WallClock>,
}

impl<N, C, P, U, S, Cam, L> CapturePipeline<N, C, P, U, S, Cam, L>
where
    N: NameResolver,
    C: HostCache,
    P: CredentialProvider,
    U: Uploader,
    S: ArtifactStore,
    Cam: Camera,
    L: Link,
{
    pub fn new(settings: PipelineSettings, parts: PipelineParts<N, C, P, U, S, Cam, L>) -> Self {
        CapturePipeline {
            settings,
            resolver: parts.resolver,
            credentials: parts.credentials,
            uploader: parts.uploader,
            store: parts.store,
            camera: parts.camera,
            link: parts.link,
            retained: parts.retained,
            clock: parts.clock,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn credentials(&self) -> &P {
        &self.credentials
    }

    /// Counts a process start in retained memory. Returns the new count.
    pub fn record_boot(&self) -> u32 {
        match self
            .retained
            .update(&mut |state| state.boot_count = state.boot_count.saturating_add(1))
        {
            Ok(state) => {
                tracing::info!(boot_count = state.boot_count, "woke up");
                state.boot_count
            }
            Err(e) => {
                tracing::warn!("failed to update boot counter: {}", e);
                0
            }
        }
    }

    /// Runs one wake cycle for one trigger.
    pub fn run_cycle(&mut self) -> CycleReport {
        let mut trace = Trace::start();

        trace.enter(Stage::TriggerReceived);
        if !self.accept_trigger() {
            return self.finish(trace, CycleOutcome::CoolingDown, None, None);
        }
        if !self.link.connect(self.settings.link_timeout) {
            tracing::warn!("link did not come up, continuing offline");
        }

        trace.enter(Stage::ResolvingEndpoint);
        let endpoint = match self.resolve() {
            Ok(endpoint) => endpoint,
            Err(_) => return self.finish(trace, CycleOutcome::NoEndpoint, None, None),
        };

        trace.enter(Stage::Authenticating);
        if !self.credentials.ensure_logged_in(&endpoint) {
            tracing::warn!("no token available, skipping capture");
            return self.finish(trace, CycleOutcome::NotAuthenticated, None, None);
        }

        trace.enter(Stage::Capturing);
        let mut artifact = match self.camera.capture() {
            Ok(artifact) => artifact,
            Err(e) => {
                tracing::warn!("capture failed: {}", e);
                return self.finish(trace, CycleOutcome::CaptureFailed, None, None);
            }
        };
        if artifact.captured_at.is_none() {
            artifact.captured_at = self.clock.now();
        }
        tracing::info!(bytes = artifact.len(), "image captured");

        trace.enter(Stage::Uploading);
        match self.upload_with_reauth(&endpoint, &artifact) {
            Ok(()) => {
                trace.enter(Stage::Draining);
                let drained = match self.drain_pending(&endpoint, self.settings.drain) {
                    Ok(report) => Some(report),
                    Err(e) => {
                        tracing::info!("skipping drain: {}", e);
                        None
                    }
                };
                self.finish(trace, CycleOutcome::Uploaded, drained, Some(artifact))
            }
            Err(e) => {
                tracing::warn!("upload failed, persisting: {}", e);
                trace.enter(Stage::Persisting);
                let outcome = match self.store.enqueue(&artifact) {
                    Ok(_) => CycleOutcome::Persisted,
                    Err(e) => {
                        tracing::error!("capture lost, could not queue it: {}", e);
                        CycleOutcome::Lost
                    }
                };
                self.finish(trace, outcome, None, Some(artifact))
            }
        }
    }

    /// Flushes the queue without capturing. `max_entries` overrides the
    /// configured bound.
    pub fn drain_now(&mut self, max_entries: Option<usize>) -> Result<DrainReport> {
        let result = self.drain_session(max_entries);
        self.link.disconnect();
        result
    }

    fn drain_session(&mut self, max_entries: Option<usize>) -> Result<DrainReport> {
        if !self.link.connect(self.settings.link_timeout) {
            return Err(Error::LinkUnavailable);
        }
        let endpoint = self.resolve()?;
        if !self.credentials.ensure_logged_in(&endpoint) {
            return Err(Error::AuthFailed("no token available".to_string()));
        }
        let mut policy = self.settings.drain;
        if let Some(max) = max_entries {
            policy.max_entries = max;
        }
        self.drain_pending(&endpoint, policy)
    }

    fn accept_trigger(&mut self) -> bool {
        let now = self.clock.now_ms();
        let last = self.retained.load().last_trigger_ms;
        let cooldown_ms = u64::try_from(self.settings.cooldown.as_millis()).unwrap_or(u64::MAX);

        if let (Some(now), Some(last)) = (now, last) {
            if now >= last && now - last < cooldown_ms {
                tracing::info!(since_last_ms = now - last, "trigger ignored, cooling down");
                return false;
            }
        }

        if let Some(now) = now {
            if let Err(e) = self
                .retained
                .update(&mut |state| state.last_trigger_ms = Some(now))
            {
                tracing::warn!("failed to record trigger time: {}", e);
            }
        }
        tracing::info!("motion trigger accepted");
        true
    }

    fn resolve(&mut self) -> Result<Endpoint> {
        if !self.resolver.resolve() {
            return Err(Error::EndpointUnresolved);
        }
        self.resolver
            .endpoint()
            .cloned()
            .ok_or(Error::EndpointUnresolved)
    }

    fn current_token(&self) -> Result<String> {
        self.credentials
            .token()
            .map(String::from)
            .ok_or_else(|| Error::AuthFailed("no token available".to_string()))
    }

    /// Uploads once; on 401 logs in again and retries exactly once.
    fn upload_with_reauth(&mut self, endpoint: &Endpoint, artifact: &Artifact) -> Result<()> {
        let payload = Payload::new(&artifact.bytes, artifact.encryption_iv.as_deref());

        let token = self.current_token()?;
        let err = match self.uploader.upload(endpoint, payload, &token) {
            Ok(_) => return Ok(()),
            Err(e) => e,
        };
        if !err.is_unauthorized() {
            return Err(err);
        }

        tracing::warn!("token rejected, logging in again");
        self.credentials.invalidate();
        self.credentials.login(endpoint)?;

        let token = self.current_token()?;
        match self.uploader.upload(endpoint, payload, &token) {
            Ok(_) => Ok(()),
            Err(e) => {
                if e.is_unauthorized() {
                    self.credentials.invalidate();
                }
                Err(e)
            }
        }
    }

    fn drain_pending(&mut self, endpoint: &Endpoint, policy: DrainPolicy) -> Result<DrainReport> {
        if !self.link.is_connected() {
            return Err(Error::LinkUnavailable);
        }
        if !self.store.has_pending() {
            return Ok(DrainReport::default());
        }
        let token = self.current_token()?;

        let report = self.store.drain(
            endpoint,
            &token,
            &mut self.uploader,
            &policy,
            &mut |entry| tracing::debug!(entry = %entry.name, "draining queued image"),
        )?;
        if report.unauthorized {
            self.credentials.invalidate();
        }
        if let Err(e) = self.store.prune_sent(self.settings.keep_sent) {
            tracing::warn!("failed to prune sent entries: {}", e);
        }
        Ok(report)
    }

    fn finish(
        &mut self,
        mut trace: Trace,
        outcome: CycleOutcome,
        drained: Option<DrainReport>,
        artifact: Option<Artifact>,
    ) -> CycleReport {
        trace.enter(Stage::Sleeping);
        if let Some(artifact) = artifact {
            self.camera.release(artifact);
        }
        self.link.disconnect();
        tracing::info!(%outcome, "cycle finished");
        CycleReport {
            outcome,
            stages: trace.stages,
            drained,
        }
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
