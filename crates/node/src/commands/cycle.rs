// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::BufRead;
use std::path::Path;

use super::load_config;
use crate::node::build_pipeline;
use crate::pipeline::CycleReport;
use crate::Result;

/// One wake cycle for one trigger. The process exit is the sleep.
pub fn run(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let mut pipeline = build_pipeline(&config)?;
    pipeline.record_boot();
    let report = pipeline.run_cycle();
    println!("{}", summary_line(&report));
    Ok(())
}

/// One wake cycle per line on stdin until it closes.
pub fn watch(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let mut pipeline = build_pipeline(&config)?;
    pipeline.record_boot();

    let stdin = std::io::stdin();
    let cycles = watch_triggers(
        stdin.lock(),
        || pipeline.run_cycle(),
        |report| println!("{}", summary_line(report)),
    )?;
    tracing::info!(cycles, "trigger input closed");
    Ok(())
}

/// Runs `cycle` once per input line, passing each report to `on_report`.
/// Returns the number of cycles run.
pub fn watch_triggers<R: BufRead>(
    input: R,
    mut cycle: impl FnMut() -> CycleReport,
    mut on_report: impl FnMut(&CycleReport),
) -> Result<usize> {
    let mut cycles = 0;
    for line in input.lines() {
        let line = line?;
        tracing::debug!(trigger = %line.trim(), "trigger received");
        let report = cycle();
        on_report(&report);
        cycles += 1;
    }
    Ok(cycles)
}

/// One-line human summary of a cycle.
pub fn summary_line(report: &CycleReport) -> String {
    match &report.drained {
        Some(drained) if drained.attempted > 0 || drained.pruned > 0 => format!(
            "{} (backlog: {} of {} uploaded)",
            report.outcome, drained.uploaded, drained.attempted
        ),
        _ => report.outcome.to_string(),
    }
}

#[cfg(test)]
#[path = "cycle_tests.rs"]
mod tests;
