// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! mcam - The capture node behind the `motioncam` binary.
//!
//! One motion trigger wakes the node for one cycle: accept the trigger
//! outside the cooldown window, bring the wireless link up, resolve the
//! backend, make sure a session token is held, capture a frame, upload it,
//! then drain the offline backlog. A frame that cannot be delivered is
//! written to the offline queue and retried on a later wake.
//!
//! # Main Components
//!
//! - [`pipeline::CapturePipeline`] - The per-trigger state machine
//! - [`queue::OfflineQueue`] - Durable pending/sent directories on storage
//! - [`credentials::CredentialStore`] - Session token held in retained memory
//! - [`resolver::EndpointResolver`] - Discovery with cached and static fallback
//! - [`upload::UploadClient`] - Authenticated image upload over HTTP
//! - [`Config`] - TOML configuration
//!
//! # Wiring
//!
//! ```rust,ignore
//! use mcam::{node, Config};
//!
//! let config = Config::load(Path::new("motioncam.toml"))?;
//! let mut pipeline = node::build_pipeline(&config)?;
//! pipeline.record_boot();
//! let report = pipeline.run_cycle();
//! println!("{}", report.outcome);
//! ```

mod cli;
mod commands;
mod env;

pub mod config;
pub mod credentials;
pub mod devices;
pub mod handoff;
pub mod logging;
pub mod node;
pub mod pipeline;
pub mod queue;
pub mod resolver;
pub mod settings;
pub mod upload;

#[cfg(test)]
mod test_helpers;

pub use cli::{Cli, Command, OutputFormat};
pub use config::Config;
pub use mc_core::{Error, Result};
pub use pipeline::{CapturePipeline, CycleOutcome, CycleReport, PipelineSettings, Stage};

use std::path::PathBuf;

/// Dispatches a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    let config_path: PathBuf = cli.config.unwrap_or_else(config::default_config_path);

    match cli.command {
        Command::Run => commands::cycle::run(&config_path),
        Command::Watch => commands::cycle::watch(&config_path),
        Command::Status { output } => commands::status::run(&config_path, output),
        Command::Drain { max } => commands::drain::run(&config_path, max),
        Command::ForgetToken => commands::token::forget(&config_path),
    }
}
