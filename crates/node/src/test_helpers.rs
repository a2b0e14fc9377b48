// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted collaborators shared by the unit tests.
//!
//! Every fake is cheap to clone and clones share state, so a test keeps one
//! handle for assertions and hands the other to the code under test.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mc_core::{Artifact, Endpoint, Error, LoginRequest, Result};

use crate::credentials::LoginTransport;
use crate::devices::{Camera, Link};
use crate::resolver::NameResolver;
use crate::settings::HostCache;
use crate::upload::{classify, Payload, UploadReceipt, Uploader};

/// Body of a successful login answer carrying `token`.
pub fn login_body(token: &str) -> String {
    serde_json::json!({ "success": true, "data": { "token": token } }).to_string()
}

/// Small JPEG-looking payload.
pub fn jpeg(tag: u8, len: usize) -> Vec<u8> {
    let mut bytes = vec![tag; len.max(4)];
    bytes[0] = 0xFF;
    bytes[1] = 0xD8;
    bytes
}

pub fn endpoint() -> Endpoint {
    Endpoint::new("http", "192.168.2.40", 3000, "/api")
}

#[derive(Clone, Default)]
pub struct ScriptedNames {
    answer: Arc<Mutex<Option<IpAddr>>>,
    lookups: Arc<Mutex<Vec<String>>>,
}

impl ScriptedNames {
    pub fn answering(ip: &str) -> Self {
        let names = Self::default();
        names.set_answer(Some(ip));
        names
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn set_answer(&self, ip: Option<&str>) {
        *self.answer.lock().unwrap() = ip.map(|s| s.parse().unwrap());
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

impl NameResolver for ScriptedNames {
    fn lookup(&self, hostname: &str, _timeout: Duration) -> Option<IpAddr> {
        self.lookups.lock().unwrap().push(hostname.to_string());
        *self.answer.lock().unwrap()
    }
}

#[derive(Clone, Default)]
pub struct MemoryHostCache {
    host: Arc<Mutex<Option<String>>>,
    writes: Arc<Mutex<usize>>,
    fail_writes: bool,
}

impl MemoryHostCache {
    pub fn with_host(host: &str) -> Self {
        let cache = Self::default();
        *cache.host.lock().unwrap() = Some(host.to_string());
        cache
    }

    pub fn failing_writes() -> Self {
        MemoryHostCache {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn host(&self) -> Option<String> {
        self.host.lock().unwrap().clone()
    }

    pub fn writes(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

impl HostCache for MemoryHostCache {
    fn last_known_host(&self) -> Option<String> {
        self.host()
    }

    fn remember_host(&self, host: &str) -> Result<()> {
        if self.fail_writes {
            return Err(Error::StorageUnavailable("card removed".to_string()));
        }
        *self.host.lock().unwrap() = Some(host.to_string());
        *self.writes.lock().unwrap() += 1;
        Ok(())
    }
}

enum LoginStep {
    Answer(u16, String),
    Unreachable,
}

/// Login transport answering from a script. An exhausted script behaves
/// like an unreachable server.
#[derive(Clone, Default)]
pub struct ScriptedLogin {
    steps: Arc<Mutex<VecDeque<LoginStep>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedLogin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_token(&self, token: &str) -> &Self {
        self.push(200, &login_body(token))
    }

    pub fn push(&self, status: u16, body: &str) -> &Self {
        self.steps
            .lock()
            .unwrap()
            .push_back(LoginStep::Answer(status, body.to_string()));
        self
    }

    pub fn push_unreachable(&self) -> &Self {
        self.steps.lock().unwrap().push_back(LoginStep::Unreachable);
        self
    }

    /// URLs of every login attempt, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl LoginTransport for ScriptedLogin {
    fn post_login(&mut self, url: &str, _request: &LoginRequest<'_>) -> Result<(u16, String)> {
        self.calls.lock().unwrap().push(url.to_string());
        match self.steps.lock().unwrap().pop_front() {
            Some(LoginStep::Answer(status, body)) => Ok((status, body)),
            Some(LoginStep::Unreachable) | None => {
                Err(Error::Http("connection refused".to_string()))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCall {
    pub token: String,
    pub bytes: Vec<u8>,
    pub iv: Option<String>,
}

enum UploadStep {
    Status(u16),
    Unreachable,
}

/// Uploader answering from a script of statuses. An exhausted script
/// accepts everything with a 200.
#[derive(Clone, Default)]
pub struct ScriptedUploader {
    steps: Arc<Mutex<VecDeque<UploadStep>>>,
    calls: Arc<Mutex<Vec<UploadCall>>>,
}

impl ScriptedUploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_status(&self, status: u16) -> &Self {
        self.steps
            .lock()
            .unwrap()
            .push_back(UploadStep::Status(status));
        self
    }

    pub fn push_unreachable(&self) -> &Self {
        self.steps.lock().unwrap().push_back(UploadStep::Unreachable);
        self
    }

    pub fn calls(&self) -> Vec<UploadCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.token).collect()
    }
}

impl Uploader for ScriptedUploader {
    fn upload(
        &mut self,
        _endpoint: &Endpoint,
        payload: Payload<'_>,
        token: &str,
    ) -> Result<UploadReceipt> {
        self.calls.lock().unwrap().push(UploadCall {
            token: token.to_string(),
            bytes: payload.bytes.to_vec(),
            iv: payload.iv.map(String::from),
        });
        match self.steps.lock().unwrap().pop_front() {
            Some(UploadStep::Status(status)) => classify(status, r#"{"success":true}"#),
            Some(UploadStep::Unreachable) => Err(Error::Http("connection reset".to_string())),
            None => classify(200, r#"{"success":true}"#),
        }
    }
}

/// Camera handing out queued frames. An empty queue is a sensor failure.
#[derive(Clone, Default)]
pub struct FakeCamera {
    frames: Arc<Mutex<VecDeque<Artifact>>>,
    released: Arc<Mutex<usize>>,
}

impl FakeCamera {
    pub fn with_frame(artifact: Artifact) -> Self {
        let camera = Self::default();
        camera.push(artifact);
        camera
    }

    pub fn push(&self, artifact: Artifact) {
        self.frames.lock().unwrap().push_back(artifact);
    }

    pub fn released(&self) -> usize {
        *self.released.lock().unwrap()
    }
}

impl Camera for FakeCamera {
    fn capture(&mut self) -> Result<Artifact> {
        self.frames
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::CaptureFailed("sensor did not respond".to_string()))
    }

    fn release(&mut self, _artifact: Artifact) {
        *self.released.lock().unwrap() += 1;
    }
}

#[derive(Default)]
struct LinkState {
    reachable: bool,
    connected: bool,
    connects: usize,
    disconnects: usize,
}

#[derive(Clone, Default)]
pub struct FakeLink {
    state: Arc<Mutex<LinkState>>,
}

impl FakeLink {
    pub fn up() -> Self {
        let link = Self::default();
        link.state.lock().unwrap().reachable = true;
        link
    }

    pub fn down() -> Self {
        Self::default()
    }

    pub fn connects(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    pub fn disconnects(&self) -> usize {
        self.state.lock().unwrap().disconnects
    }
}

impl Link for FakeLink {
    fn connect(&mut self, _timeout: Duration) -> bool {
        let mut state = self.state.lock().unwrap();
        state.connects += 1;
        state.connected = state.reachable;
        state.connected
    }

    fn is_connected(&self) -> bool {
        self.state.lock().unwrap().connected
    }

    fn disconnect(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.disconnects += 1;
        state.connected = false;
    }
}
