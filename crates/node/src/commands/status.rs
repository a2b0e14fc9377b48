// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::DateTime;
use serde::Serialize;

use mc_core::{RetainedMemory, RetainedState};

use super::load_config;
use crate::cli::OutputFormat;
use crate::credentials::fingerprint;
use crate::node::{open_queue, retained};
use crate::queue::{ArtifactStore, QueueSummary};
use crate::settings::{HostCache, SettingsFile};
use crate::Result;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub storage_root: PathBuf,
    pub retained_dir: PathBuf,
    pub queue: QueueSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_known_host: Option<String>,
    /// Fingerprint of the retained token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub boot_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_trigger: Option<String>,
}

impl StatusReport {
    pub fn new(
        storage_root: &Path,
        retained_dir: &Path,
        queue: QueueSummary,
        last_known_host: Option<String>,
        state: &RetainedState,
    ) -> Self {
        StatusReport {
            storage_root: storage_root.to_path_buf(),
            retained_dir: retained_dir.to_path_buf(),
            queue,
            last_known_host,
            token: state.token.as_deref().map(fingerprint),
            boot_count: state.boot_count,
            last_trigger: state
                .last_trigger_ms
                .and_then(|ms| i64::try_from(ms).ok())
                .and_then(DateTime::from_timestamp_millis)
                .map(|t| t.to_rfc3339()),
        }
    }
}

pub fn run(config_path: &Path, output: OutputFormat) -> Result<()> {
    let config = load_config(config_path)?;
    let queue = open_queue(&config)?;
    let retained_dir = config.retained.resolve_dir();
    let report = StatusReport::new(
        &config.storage.root,
        &retained_dir,
        queue.summarize()?,
        SettingsFile::new(&config.storage.root).last_known_host(),
        &retained(&config).load(),
    );

    match output {
        OutputFormat::Text => print!("{}", format_text(&report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

pub fn format_text(report: &StatusReport) -> String {
    let mut out = String::new();
    let q = &report.queue;
    let _ = writeln!(out, "storage:    {}", report.storage_root.display());
    let _ = writeln!(out, "pending:    {} ({} bytes)", q.pending, q.pending_bytes);
    if let (Some(oldest), Some(newest)) = (&q.oldest_pending, &q.newest_pending) {
        let _ = writeln!(out, "            oldest {}, newest {}", oldest, newest);
    }
    if let (Some(oldest), Some(newest)) = (q.oldest_at, q.newest_at) {
        let _ = writeln!(
            out,
            "            captured {} to {}",
            oldest.format(TIME_FORMAT),
            newest.format(TIME_FORMAT)
        );
    }
    let _ = writeln!(out, "sent:       {}", q.sent);
    let _ = writeln!(
        out,
        "host:       {}",
        report.last_known_host.as_deref().unwrap_or("(none remembered)")
    );
    let _ = writeln!(
        out,
        "token:      {}",
        report
            .token
            .as_deref()
            .map(|fp| format!("retained ({})", fp))
            .unwrap_or_else(|| "none".to_string())
    );
    let _ = writeln!(out, "boots:      {}", report.boot_count);
    if let Some(last) = &report.last_trigger {
        let _ = writeln!(out, "last motion: {}", last);
    }
    out
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
