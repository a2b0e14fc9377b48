// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Camera and wireless link adapters.
//!
//! On the host both are driven through shell commands: a still-capture tool
//! writing JPEG to stdout, and whatever brings the network up and down.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use mc_core::{Artifact, Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const LINK_RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// Image source.
pub trait Camera {
    /// Grabs one frame. The returned artifact has no capture time; the
    /// caller stamps it.
    fn capture(&mut self) -> Result<Artifact>;

    /// Hands the frame back once the cycle is done with it.
    fn release(&mut self, artifact: Artifact);
}

impl<C: Camera + ?Sized> Camera for Box<C> {
    fn capture(&mut self) -> Result<Artifact> {
        (**self).capture()
    }

    fn release(&mut self, artifact: Artifact) {
        (**self).release(artifact)
    }
}

/// Network link to the backend.
pub trait Link {
    /// Brings the link up, waiting at most `timeout`.
    fn connect(&mut self, timeout: Duration) -> bool;

    fn is_connected(&self) -> bool;

    fn disconnect(&mut self);
}

impl<L: Link + ?Sized> Link for Box<L> {
    fn connect(&mut self, timeout: Duration) -> bool {
        (**self).connect(timeout)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn disconnect(&mut self) {
        (**self).disconnect()
    }
}

#[derive(Debug)]
pub(crate) enum CommandOutcome {
    Success(Vec<u8>),
    Failed(ExitStatus),
    TimedOut,
}

/// Runs `command` through `sh -c`, collecting stdout, killing it after
/// `timeout`.
pub(crate) fn run_shell(command: &str, timeout: Duration) -> std::io::Result<CommandOutcome> {
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()?;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::other("child stdout unavailable"))?;
    let reader = thread::spawn(move || {
        let mut buf = Vec::new();
        stdout.read_to_end(&mut buf).map(|_| buf)
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(CommandOutcome::TimedOut);
        }
        thread::sleep(POLL_INTERVAL);
    };

    let output = reader
        .join()
        .map_err(|_| std::io::Error::other("stdout reader panicked"))??;
    if status.success() {
        Ok(CommandOutcome::Success(output))
    } else {
        Ok(CommandOutcome::Failed(status))
    }
}

/// Captures by running a command that writes one JPEG to stdout.
pub struct CommandCamera {
    command: String,
    timeout: Duration,
}

impl CommandCamera {
    pub fn new(command: &str, timeout: Duration) -> Self {
        CommandCamera {
            command: command.to_string(),
            timeout,
        }
    }
}

impl Camera for CommandCamera {
    fn capture(&mut self) -> Result<Artifact> {
        tracing::debug!(command = %self.command, "capturing");
        match run_shell(&self.command, self.timeout)? {
            CommandOutcome::Success(bytes) if bytes.is_empty() => Err(Error::CaptureFailed(
                "capture command produced no output".to_string(),
            )),
            CommandOutcome::Success(bytes) => Ok(Artifact::new(bytes, None)),
            CommandOutcome::Failed(status) => Err(Error::CaptureFailed(format!(
                "capture command failed: {}",
                status
            ))),
            CommandOutcome::TimedOut => Err(Error::CaptureFailed(format!(
                "capture command timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }

    fn release(&mut self, _artifact: Artifact) {}
}

/// Captures by reading a file, e.g. one kept current by another process.
pub struct FileCamera {
    path: PathBuf,
}

impl FileCamera {
    pub fn new(path: &Path) -> Self {
        FileCamera {
            path: path.to_path_buf(),
        }
    }
}

impl Camera for FileCamera {
    fn capture(&mut self) -> Result<Artifact> {
        let bytes = std::fs::read(&self.path).map_err(|e| {
            Error::CaptureFailed(format!("failed to read {}: {}", self.path.display(), e))
        })?;
        if bytes.is_empty() {
            return Err(Error::CaptureFailed(format!(
                "{} is empty",
                self.path.display()
            )));
        }
        Ok(Artifact::new(bytes, None))
    }

    fn release(&mut self, _artifact: Artifact) {}
}

/// Link driven by shell commands. Each command's exit status is its answer.
pub struct CommandLink {
    up: Option<String>,
    status: Option<String>,
    down: Option<String>,
    connected: bool,
}

impl CommandLink {
    pub fn new(up: Option<String>, status: Option<String>, down: Option<String>) -> Self {
        CommandLink {
            up,
            status,
            down,
            connected: false,
        }
    }

    fn status_ok(&self, timeout: Duration) -> bool {
        match &self.status {
            Some(cmd) => matches!(run_shell(cmd, timeout), Ok(CommandOutcome::Success(_))),
            None => self.connected,
        }
    }
}

impl Link for CommandLink {
    fn connect(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;

        let up_ok = match &self.up {
            Some(up) => match run_shell(up, timeout) {
                Ok(CommandOutcome::Success(_)) => true,
                Ok(outcome) => {
                    tracing::warn!(?outcome, "link up command did not succeed");
                    false
                }
                Err(e) => {
                    tracing::warn!("failed to run link up command: {}", e);
                    false
                }
            },
            None => true,
        };

        self.connected = match &self.status {
            Some(_) => loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if self.status_ok(remaining.max(POLL_INTERVAL)) {
                    break true;
                }
                if Instant::now() + LINK_RETRY_INTERVAL >= deadline {
                    break false;
                }
                thread::sleep(LINK_RETRY_INTERVAL);
            },
            None => up_ok,
        };
        self.connected
    }

    fn is_connected(&self) -> bool {
        self.status_ok(Duration::from_secs(2))
    }

    fn disconnect(&mut self) {
        if let Some(down) = &self.down {
            if let Err(e) = run_shell(down, Duration::from_secs(10)) {
                tracing::warn!("failed to run link down command: {}", e);
            }
        }
        self.connected = false;
    }
}

/// Link managed by the operating system: always considered up.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticLink;

impl Link for StaticLink {
    fn connect(&mut self, _timeout: Duration) -> bool {
        true
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn disconnect(&mut self) {}
}

#[cfg(test)]
#[path = "devices_tests.rs"]
mod tests;
