// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Wires host implementations of every capability into a pipeline.

use mc_core::{Error, FileRetained, Result, SystemWallClock};

use crate::config::{CameraConfig, Config, LinkConfig};
use crate::credentials::{CredentialStore, HttpLoginTransport};
use crate::devices::{Camera, CommandCamera, CommandLink, FileCamera, Link, StaticLink};
use crate::pipeline::{CapturePipeline, PipelineParts, PipelineSettings};
use crate::queue::{default_allocator, OfflineQueue};
use crate::resolver::{EndpointResolver, SystemNameResolver};
use crate::settings::SettingsFile;
use crate::upload::UploadClient;

pub type HostPipeline = CapturePipeline<
    SystemNameResolver,
    SettingsFile,
    CredentialStore<HttpLoginTransport, FileRetained>,
    UploadClient,
    OfflineQueue,
    Box<dyn Camera>,
    Box<dyn Link>,
>;

/// Retained tier for this configuration.
pub fn retained(config: &Config) -> FileRetained {
    FileRetained::new(&config.retained.resolve_dir())
}

/// Opens the offline queue on the configured storage root.
pub fn open_queue(config: &Config) -> Result<OfflineQueue> {
    Ok(OfflineQueue::open(&config.storage.root)?
        .with_allocator(default_allocator(config.queue.max_buffer_bytes)))
}

pub fn build_camera(config: &CameraConfig) -> Result<Box<dyn Camera>> {
    let timeout = std::time::Duration::from_secs(config.timeout_secs);
    match (&config.command, &config.file) {
        (Some(command), _) => Ok(Box::new(CommandCamera::new(command, timeout))),
        (None, Some(path)) => Ok(Box::new(FileCamera::new(path))),
        (None, None) => Err(Error::Config(
            "camera.command or camera.file is required".to_string(),
        )),
    }
}

pub fn build_link(config: &LinkConfig) -> Box<dyn Link> {
    if config.up_command.is_none() && config.status_command.is_none() {
        return Box::new(StaticLink);
    }
    Box::new(CommandLink::new(
        config.up_command.clone(),
        config.status_command.clone(),
        config.down_command.clone(),
    ))
}

pub fn build_pipeline(config: &Config) -> Result<HostPipeline> {
    let retained = retained(config);
    let resolver = EndpointResolver::new(
        config.server.clone(),
        config.resolver_timeout(),
        SystemNameResolver,
        SettingsFile::new(&config.storage.root),
    );
    let credentials = CredentialStore::new(
        &config.credentials,
        HttpLoginTransport::new(config.auth_timeout())?,
        retained.clone(),
    );

    Ok(CapturePipeline::new(
        PipelineSettings::from_config(config),
        PipelineParts {
            resolver,
            credentials,
            uploader: UploadClient::new(&config.upload)?,
            store: open_queue(config)?,
            camera: build_camera(&config.camera)?,
            link: build_link(&config.link),
            retained: Box::new(retained),
            clock: Box::new(SystemWallClock),
        },
    ))
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;
