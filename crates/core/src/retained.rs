// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Retained-memory state: the small struct that survives a sleep/wake cycle.
//!
//! Durability tiers on the node:
//!
//! | tier     | survives sleep | survives power-off | holds                      |
//! |----------|----------------|--------------------|----------------------------|
//! | retained | yes            | no                 | token, boot count, cooldown |
//! | storage  | yes            | yes                | offline queue, settings    |
//!
//! On the host the retained tier is a file on a tmpfs (`$XDG_RUNTIME_DIR`),
//! which likewise outlives the process but not a reboot.
//!
//! The state is read once at process start and written back at well-defined
//! mutation points. Each field has a single writer: the credential store owns
//! `token`, the pipeline owns `boot_count` and `last_trigger_ms`.

use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::Result;

/// Layout version of [`RetainedState`].
pub const RETAINED_VERSION: u32 = 1;

/// Capacity of the retained token slot in bytes.
pub const MAX_RETAINED_TOKEN_LEN: usize = 511;

/// File name of the retained state within its directory.
pub const RETAINED_FILE: &str = "retained.json";

const LOCK_FILE: &str = "retained.lock";

/// Process-wide state persisted across sleep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetainedState {
    pub version: u32,
    /// Current session token, if one was acquired and not invalidated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Number of process starts (wakes) since power-on.
    #[serde(default)]
    pub boot_count: u32,
    /// Wall time of the last accepted trigger, for the cooldown window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_trigger_ms: Option<u64>,
}

impl Default for RetainedState {
    fn default() -> Self {
        RetainedState {
            version: RETAINED_VERSION,
            token: None,
            boot_count: 0,
            last_trigger_ms: None,
        }
    }
}

/// Backend for the retained tier.
pub trait RetainedMemory {
    /// Reads the state. Missing, corrupt or foreign-version data reads as
    /// a fresh state, the same as after a power-off.
    fn load(&self) -> RetainedState;

    /// Writes the state.
    fn save(&self, state: &RetainedState) -> Result<()>;

    /// Read-modify-write helper.
    fn update(&self, f: &mut dyn FnMut(&mut RetainedState)) -> Result<RetainedState> {
        let mut state = self.load();
        f(&mut state);
        self.save(&state)?;
        Ok(state)
    }
}

impl<R: RetainedMemory + ?Sized> RetainedMemory for Box<R> {
    fn load(&self) -> RetainedState {
        (**self).load()
    }

    fn save(&self, state: &RetainedState) -> Result<()> {
        (**self).save(state)
    }

    fn update(&self, f: &mut dyn FnMut(&mut RetainedState)) -> Result<RetainedState> {
        (**self).update(f)
    }
}

/// File-backed retained state.
///
/// Writes go to a temp file that is fsynced and renamed over the old one
/// under an exclusive lock, so a reader never sees a torn struct.
#[derive(Debug, Clone)]
pub struct FileRetained {
    dir: PathBuf,
}

impl FileRetained {
    pub fn new(dir: &Path) -> Self {
        FileRetained {
            dir: dir.to_path_buf(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(RETAINED_FILE)
    }

    fn lock(&self) -> Result<File> {
        use fs2::FileExt;

        fs::create_dir_all(&self.dir)?;
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.dir.join(LOCK_FILE))?;
        file.lock_exclusive()?;
        Ok(file)
    }
}

impl RetainedMemory for FileRetained {
    fn load(&self) -> RetainedState {
        let Ok(content) = fs::read_to_string(self.path()) else {
            return RetainedState::default();
        };
        match serde_json::from_str::<RetainedState>(&content) {
            Ok(state) if state.version == RETAINED_VERSION => state,
            _ => RetainedState::default(),
        }
    }

    fn save(&self, state: &RetainedState) -> Result<()> {
        let _lock = self.lock()?;
        self.write_locked(state)
    }

    fn update(&self, f: &mut dyn FnMut(&mut RetainedState)) -> Result<RetainedState> {
        let _lock = self.lock()?;
        let mut state = self.load();
        f(&mut state);
        self.write_locked(&state)?;
        Ok(state)
    }
}

impl FileRetained {
    /// Atomically replaces the state file. Caller holds the lock.
    fn write_locked(&self, state: &RetainedState) -> Result<()> {
        let tmp = self.dir.join(format!("{}.tmp", RETAINED_FILE));
        let json = serde_json::to_string(state)?;
        {
            let mut file = File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, self.path())?;
        Ok(())
    }
}

/// In-process retained state. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryRetained {
    state: Arc<Mutex<RetainedState>>,
}

impl MemoryRetained {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing state, as if woken from sleep.
    pub fn with_state(state: RetainedState) -> Self {
        MemoryRetained {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Simulates a full power-off: everything retained is lost.
    pub fn power_off(&self) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = RetainedState::default();
    }
}

impl RetainedMemory for MemoryRetained {
    fn load(&self) -> RetainedState {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn save(&self, state: &RetainedState) -> Result<()> {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state.clone();
        Ok(())
    }
}

#[cfg(test)]
#[path = "retained_tests.rs"]
mod tests;
