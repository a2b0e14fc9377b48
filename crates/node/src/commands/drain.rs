// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use super::load_config;
use crate::node::build_pipeline;
use crate::queue::{DrainReport, DrainStop};
use crate::{Error, Result};

pub fn run(config_path: &Path, max: Option<usize>) -> Result<()> {
    if max == Some(0) {
        return Err(Error::Config("--max must be at least 1".to_string()));
    }
    let config = load_config(config_path)?;
    let mut pipeline = build_pipeline(&config)?;
    let report = pipeline.drain_now(max)?;
    println!("{}", format_report(&report));
    Ok(())
}

pub fn format_report(report: &DrainReport) -> String {
    let mut line = format!(
        "uploaded {} of {} attempted",
        report.uploaded, report.attempted
    );
    if report.pruned > 0 {
        line.push_str(&format!(", {} pruned", report.pruned));
    }
    let reason = match report.stop {
        DrainStop::Exhausted => None,
        DrainStop::Limit => Some("limit reached"),
        DrainStop::UploadFailed if report.unauthorized => Some("token rejected"),
        DrainStop::UploadFailed => Some("upload failed"),
        DrainStop::OutOfMemory => Some("out of memory"),
    };
    if let Some(reason) = reason {
        line.push_str(&format!(" ({})", reason));
    }
    line
}

#[cfg(test)]
#[path = "drain_tests.rs"]
mod tests;
