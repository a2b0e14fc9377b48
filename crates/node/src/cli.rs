// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

const QUICKSTART_HELP: &str = "\
Get started:
  motioncam status              Show queued images and retained state
  motioncam run                 Handle one motion trigger, then exit
  echo | motioncam watch        One wake cycle per line on stdin
  motioncam drain --max 10      Upload queued images without capturing";

#[derive(Parser)]
#[command(name = "motioncam")]
#[command(version)]
#[command(about = "Motion-triggered camera uploader with an offline queue")]
#[command(after_help = QUICKSTART_HELP)]
pub struct Cli {
    /// Config file (default: $MOTIONCAM_CONFIG or ~/.config/motioncam/motioncam.toml)
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run one wake cycle for one motion trigger
    Run,

    /// Read triggers from stdin, one wake cycle per line
    Watch,

    /// Show the offline queue and retained state
    Status {
        /// Output format (text, json)
        #[arg(long, short, value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Upload queued images without capturing
    Drain {
        /// Upload at most this many entries (default: pipeline.drain_max_entries)
        #[arg(long)]
        max: Option<usize>,
    },

    /// Drop the retained token so the next wake logs in again
    ForgetToken,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
