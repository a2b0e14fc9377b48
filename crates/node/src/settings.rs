// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable settings kept on the storage volume.
//!
//! Unlike the retained tier these survive a full power-off. The only entry
//! today is the last host that live discovery resolved successfully.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use mc_core::Result;

/// File name of the settings within the storage root.
pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_known_host: Option<String>,
}

/// Cache of the last-known-good backend host.
pub trait HostCache {
    /// Returns the cached host, if any. Unreadable storage reads as empty.
    fn last_known_host(&self) -> Option<String>;

    /// Remembers `host` as last known good.
    fn remember_host(&self, host: &str) -> Result<()>;
}

/// Settings persisted as JSON next to the offline queue.
pub struct SettingsFile {
    path: PathBuf,
}

impl SettingsFile {
    pub fn new(storage_root: &Path) -> Self {
        SettingsFile {
            path: storage_root.join(SETTINGS_FILE),
        }
    }

    /// Read settings from disk, returns None if the file doesn't exist or is invalid.
    pub fn read(&self) -> Option<Settings> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Write settings to disk with fsync for durability.
    pub fn write(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = std::fs::File::create(&tmp)?;
            file.write_all(serde_json::to_string_pretty(settings)?.as_bytes())?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl HostCache for SettingsFile {
    fn last_known_host(&self) -> Option<String> {
        self.read()
            .and_then(|s| s.last_known_host)
            .filter(|h| !h.trim().is_empty())
    }

    fn remember_host(&self, host: &str) -> Result<()> {
        let mut settings = self.read().unwrap_or_default();
        if settings.last_known_host.as_deref() == Some(host) {
            return Ok(());
        }
        settings.last_known_host = Some(host.to_string());
        self.write(&settings)
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
