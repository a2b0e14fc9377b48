// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Node configuration management.
//!
//! Configuration is stored in `motioncam.toml`. Only `[server]` and
//! `[credentials]` are needed in practice; every other section has defaults
//! sized for a battery node on a slow link.
//!
//! ```toml
//! [server]
//! hostname = "backend.local"
//! static_host = "192.168.2.22"
//!
//! [credentials]
//! username = "camera-01"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mc_core::{Error, Result};

use crate::env;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "motioncam.toml";

/// Top-level node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub retained: RetainedConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub camera: CameraConfig,
}

/// Backend location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Name looked up live each cycle (e.g. an mDNS `.local` name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// Address used when discovery fails and nothing is cached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_host: Option<String>,
    #[serde(default = "default_scheme")]
    pub scheme: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_api_path")]
    pub api_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            hostname: None,
            static_host: None,
            scheme: default_scheme(),
            port: default_port(),
            api_path: default_api_path(),
        }
    }
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_api_path() -> String {
    "/api".to_string()
}

/// Login credentials. The password may come from `MOTIONCAM_PASSWORD`.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Bound on a live name lookup (default: 3000).
    #[serde(default = "default_resolver_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            timeout_ms: default_resolver_timeout_ms(),
        }
    }
}

fn default_resolver_timeout_ms() -> u64 {
    3_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Login request timeout in seconds (default: 10).
    #[serde(default = "default_auth_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            timeout_secs: default_auth_timeout_secs(),
        }
    }
}

fn default_auth_timeout_secs() -> u64 {
    10
}

/// How the image travels in the upload request body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyMode {
    /// `multipart/form-data` with the image in field `image`.
    #[default]
    Multipart,
    /// The JPEG bytes as the whole body.
    Raw,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default)]
    pub body: BodyMode,
    /// Whole-request timeout in seconds (default: 30).
    #[serde(default = "default_upload_timeout_secs")]
    pub timeout_secs: u64,
    /// TCP connect timeout in seconds (default: 10).
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        UploadConfig {
            body: BodyMode::default(),
            timeout_secs: default_upload_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_upload_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root of the removable storage volume holding `pending/` and `sent/`.
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            root: default_storage_root(),
        }
    }
}

fn default_storage_root() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("motioncam"))
        .unwrap_or_else(|| PathBuf::from("motioncam-data"))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetainedConfig {
    /// Directory of the retained tier. Must not survive a reboot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl RetainedConfig {
    /// Resolves the retained directory: config, then `MOTIONCAM_RETAINED_DIR`,
    /// then `$XDG_RUNTIME_DIR/motioncam`, then the system temp dir.
    pub fn resolve_dir(&self) -> PathBuf {
        if let Some(dir) = &self.dir {
            return dir.clone();
        }
        if let Some(dir) = env::retained_dir() {
            return dir;
        }
        if let Some(dir) = env::xdg_runtime_dir() {
            return dir.join("motioncam");
        }
        std::env::temp_dir().join("motioncam-retained")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Delivered entries kept in `sent/` (default: 200). 0 keeps none.
    #[serde(default = "default_keep_sent")]
    pub keep_sent: usize,
    /// Stop a drain pass at the first failed upload (default: true).
    #[serde(default = "default_true")]
    pub stop_on_first_failure: bool,
    /// Ceiling of the preferred (large) buffer pool used when reading queue
    /// entries back, in bytes. Requests above it fall back to the regular heap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_buffer_bytes: Option<usize>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            keep_sent: default_keep_sent(),
            stop_on_first_failure: true,
            max_buffer_bytes: None,
        }
    }
}

fn default_keep_sent() -> usize {
    200
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Triggers within this many seconds of the last accepted one are ignored.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    /// Most queue entries flushed per wake cycle (default: 5).
    #[serde(default = "default_drain_max_entries")]
    pub drain_max_entries: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            cooldown_secs: default_cooldown_secs(),
            drain_max_entries: default_drain_max_entries(),
        }
    }
}

fn default_cooldown_secs() -> u64 {
    15
}

fn default_drain_max_entries() -> usize {
    5
}

/// Wireless link control. Without commands the OS is assumed to manage it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    #[serde(default = "default_link_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Command bringing the link up; exit status 0 means connected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up_command: Option<String>,
    /// Command probing the link; exit status 0 means connected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down_command: Option<String>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            connect_timeout_secs: default_link_timeout_secs(),
            up_command: None,
            status_command: None,
            down_command: None,
        }
    }
}

fn default_link_timeout_secs() -> u64 {
    15
}

/// Camera source: a still-capture command writing JPEG to stdout, or a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(default = "default_camera_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        CameraConfig {
            command: None,
            file: None,
            timeout_secs: default_camera_timeout_secs(),
        }
    }
}

fn default_camera_timeout_secs() -> u64 {
    10
}

impl Config {
    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("failed to parse config: {}", e)))
    }

    /// Loads, applies environment overrides and validates a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read config {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_toml(&content)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Applies environment overrides (currently the password).
    pub fn apply_env(&mut self) {
        if let Some(password) = env::password() {
            self.credentials.password = password;
        }
    }

    /// Rejects configurations no wake cycle could succeed with.
    pub fn validate(&self) -> Result<()> {
        if self.credentials.username.trim().is_empty() {
            return Err(Error::Config("credentials.username is required".to_string()));
        }
        if self.server.port == 0 {
            return Err(Error::Config("server.port cannot be 0".to_string()));
        }
        if !self.server.api_path.is_empty() && !self.server.api_path.starts_with('/') {
            return Err(Error::Config(format!(
                "server.api_path must start with '/': '{}'",
                self.server.api_path
            )));
        }
        if self.pipeline.drain_max_entries == 0 {
            return Err(Error::Config(
                "pipeline.drain_max_entries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn resolver_timeout(&self) -> Duration {
        Duration::from_millis(self.resolver.timeout_ms)
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth.timeout_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.pipeline.cooldown_secs)
    }

    pub fn link_timeout(&self) -> Duration {
        Duration::from_secs(self.link.connect_timeout_secs)
    }
}

/// Default config path: `$XDG_CONFIG_HOME/motioncam/motioncam.toml`.
pub fn default_config_path() -> PathBuf {
    if let Some(path) = env::config_path() {
        return path;
    }
    dirs::config_dir()
        .map(|d| d.join("motioncam").join(CONFIG_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
