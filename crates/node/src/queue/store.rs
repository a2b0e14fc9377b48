// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem-backed offline queue.
//!
//! Layout under the storage root:
//!
//! ```text
//! <root>/pending/20260309_070501.jpg    awaiting upload
//! <root>/pending/20260309_070501.iv     IV sidecar, when encrypted
//! <root>/sent/20260308_221940.jpg       delivered, kept for inspection
//! ```
//!
//! An entry only appears under its final name after all of its bytes were
//! written and fsynced, so a reader never sees a partial image. Leftover
//! `.part` files from an interrupted write are removed on open.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use mc_core::{Artifact, Endpoint, Error, Result};

use super::alloc::{BufferAllocator, HeapPool, TieredAllocator};
use super::naming::{
    entry_file_name, parse_sequence, parse_timestamp, sequence_stem, timestamp_stem, unique_stem,
    ENTRY_EXT, IV_EXT, PART_EXT,
};
use crate::upload::{Payload, Uploader};

pub const PENDING_DIR: &str = "pending";
pub const SENT_DIR: &str = "sent";

/// Ceiling for drain buffers taken from the regular heap.
const REGULAR_HEAP_LIMIT: usize = 512 * 1024;

/// Sink an entry is written through before it is renamed into place.
pub trait EntryWriter: Write {
    /// Flushes written bytes to the storage medium.
    fn sync(&mut self) -> io::Result<()>;
}

impl EntryWriter for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

/// Opens the writer for a `.part` file.
pub type WriterFactory = Box<dyn Fn(&Path) -> io::Result<Box<dyn EntryWriter>>>;

fn create_entry_file(path: &Path) -> io::Result<Box<dyn EntryWriter>> {
    Ok(Box::new(File::create(path)?))
}

/// Drain buffers: the large pool first, then the regular heap.
pub fn default_allocator(large_pool_limit: Option<usize>) -> TieredAllocator<HeapPool, HeapPool> {
    TieredAllocator::new(
        HeapPool::new(large_pool_limit),
        HeapPool::new(Some(REGULAR_HEAP_LIMIT)),
    )
}

/// One image file in the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

impl QueueEntry {
    pub fn stem(&self) -> &str {
        self.name
            .strip_suffix(&format!(".{}", ENTRY_EXT))
            .unwrap_or(&self.name)
    }

    /// Capture time encoded in the name, if it is a timestamped entry.
    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.stem())
    }

    fn iv_path(&self) -> PathBuf {
        self.path.with_extension(IV_EXT)
    }
}

fn entry_time(entry: &QueueEntry) -> Option<DateTime<Utc>> {
    entry.captured_at().or_else(|| {
        fs::metadata(&entry.path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from)
    })
}

/// Snapshot of the queue for status reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueSummary {
    pub pending: usize,
    pub pending_bytes: u64,
    pub sent: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_pending: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_pending: Option<String>,
    /// Capture time of the oldest pending entry: from its name, else its mtime.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_at: Option<DateTime<Utc>>,
}

/// Limits for one drain pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainPolicy {
    /// Upload attempts allowed in this pass.
    pub max_entries: usize,
    /// End the pass at the first failed upload.
    pub stop_on_first_failure: bool,
}

impl Default for DrainPolicy {
    fn default() -> Self {
        DrainPolicy {
            max_entries: 5,
            stop_on_first_failure: true,
        }
    }
}

/// Why a drain pass ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainStop {
    /// No pending entries left to look at.
    #[default]
    Exhausted,
    /// `max_entries` attempts were made.
    Limit,
    UploadFailed,
    OutOfMemory,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub attempted: usize,
    pub uploaded: usize,
    /// Zero-length or unreadable entries deleted without an attempt.
    pub pruned: usize,
    /// Some attempt was refused with 401.
    pub unauthorized: bool,
    pub stop: DrainStop,
}

/// Durable store for captures that could not be delivered.
pub trait ArtifactStore {
    /// Persists an artifact as a new pending entry.
    fn enqueue(&mut self, artifact: &Artifact) -> Result<QueueEntry>;

    fn has_pending(&self) -> bool;

    fn summarize(&self) -> Result<QueueSummary>;

    /// Uploads pending entries oldest first, moving each delivered one to
    /// the sent region.
    fn drain(
        &mut self,
        endpoint: &Endpoint,
        token: &str,
        uploader: &mut dyn Uploader,
        policy: &DrainPolicy,
        on_entry_start: &mut dyn FnMut(&QueueEntry),
    ) -> Result<DrainReport>;

    /// Deletes the oldest sent entries beyond `keep`. Returns how many went.
    fn prune_sent(&mut self, keep: usize) -> Result<usize>;
}

pub struct OfflineQueue {
    pending: PathBuf,
    sent: PathBuf,
    writer: WriterFactory,
    allocator: Box<dyn BufferAllocator>,
}

impl OfflineQueue {
    /// Opens the queue under `root`, creating both regions if needed.
    pub fn open(root: &Path) -> Result<Self> {
        let pending = root.join(PENDING_DIR);
        let sent = root.join(SENT_DIR);
        for dir in [&pending, &sent] {
            fs::create_dir_all(dir).map_err(|e| storage_error(dir, e))?;
        }
        let queue = OfflineQueue {
            pending,
            sent,
            writer: Box::new(create_entry_file),
            allocator: Box::new(default_allocator(None)),
        };
        queue.remove_stale_files();
        Ok(queue)
    }

    /// Replaces how `.part` files are opened.
    pub fn with_entry_writer(mut self, writer: WriterFactory) -> Self {
        self.writer = writer;
        self
    }

    /// Replaces the drain buffer allocator.
    pub fn with_allocator(mut self, allocator: impl BufferAllocator + 'static) -> Self {
        self.allocator = Box::new(allocator);
        self
    }

    pub fn pending_dir(&self) -> &Path {
        &self.pending
    }

    pub fn sent_dir(&self) -> &Path {
        &self.sent
    }

    /// Pending entries in upload order.
    pub fn pending_entries(&self) -> Result<Vec<QueueEntry>> {
        list_entries(&self.pending)
    }

    /// Sent entries, oldest first.
    pub fn sent_entries(&self) -> Result<Vec<QueueEntry>> {
        list_entries(&self.sent)
    }

    fn remove_stale_files(&self) {
        let Ok(dir) = fs::read_dir(&self.pending) else {
            return;
        };
        for path in dir.flatten().map(|e| e.path()) {
            let ext = path.extension().and_then(|e| e.to_str());
            let stale = match ext {
                Some(PART_EXT) => true,
                Some(IV_EXT) => !path.with_extension(ENTRY_EXT).exists(),
                _ => false,
            };
            if stale {
                tracing::debug!(path = %path.display(), "removing stale queue file");
                let _ = fs::remove_file(&path);
            }
        }
    }

    fn name_taken(&self, stem: &str) -> bool {
        let name = entry_file_name(stem);
        self.pending.join(&name).exists() || self.sent.join(&name).exists()
    }

    fn next_sequence(&self) -> u64 {
        let highest = [&self.pending, &self.sent]
            .into_iter()
            .filter_map(|dir| list_entries(dir).ok())
            .flatten()
            .filter_map(|entry| parse_sequence(entry.stem()))
            .max()
            .unwrap_or(0);
        highest + 1
    }

    fn new_stem(&self, artifact: &Artifact) -> String {
        match artifact.captured_at {
            Some(at) => unique_stem(&timestamp_stem(at), |s| self.name_taken(s)),
            None => sequence_stem(self.next_sequence()),
        }
    }

    fn write_part(&self, part: &Path, bytes: &[u8]) -> Result<()> {
        let mut writer = (self.writer)(part).map_err(|e| storage_error(part, e))?;
        let written = write_counted(writer.as_mut(), bytes);
        if written != bytes.len() {
            return Err(Error::StorageWriteIncomplete {
                expected: bytes.len(),
                written,
            });
        }
        writer.sync()?;
        Ok(())
    }

    fn remove_entry(&self, entry: &QueueEntry) {
        for path in [entry.path.clone(), entry.iv_path()] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(path = %path.display(), "failed to delete: {}", e),
            }
        }
    }

    /// Moves a delivered entry to the sent region. If that fails the entry
    /// is deleted instead so it is never uploaded twice.
    fn mark_sent(&self, entry: &QueueEntry) {
        let target = self.sent.join(&entry.name);
        if let Err(e) = fs::rename(&entry.path, &target) {
            tracing::warn!(entry = %entry.name, "failed to move to sent, deleting: {}", e);
            self.remove_entry(entry);
            return;
        }
        let iv = entry.iv_path();
        if iv.exists() {
            let iv_target = target.with_extension(IV_EXT);
            if fs::rename(&iv, &iv_target).is_err() {
                let _ = fs::remove_file(&iv);
            }
        }
    }
}

impl ArtifactStore for OfflineQueue {
    fn enqueue(&mut self, artifact: &Artifact) -> Result<QueueEntry> {
        if artifact.is_empty() {
            return Err(Error::CaptureFailed("cannot queue an empty image".to_string()));
        }

        let stem = self.new_stem(artifact);
        let name = entry_file_name(&stem);
        let path = self.pending.join(&name);
        let part = path.with_extension(PART_EXT);
        let iv_path = path.with_extension(IV_EXT);

        if let Err(e) = self.write_part(&part, &artifact.bytes) {
            let _ = fs::remove_file(&part);
            tracing::error!(entry = %name, "failed to queue image: {}", e);
            return Err(e);
        }

        if let Some(iv) = &artifact.encryption_iv {
            if let Err(e) = write_sidecar(&iv_path, iv) {
                let _ = fs::remove_file(&part);
                let _ = fs::remove_file(&iv_path);
                return Err(e);
            }
        }

        if let Err(e) = fs::rename(&part, &path) {
            let _ = fs::remove_file(&part);
            let _ = fs::remove_file(&iv_path);
            return Err(storage_error(&path, e));
        }

        tracing::info!(entry = %name, bytes = artifact.len(), "image queued for later upload");
        Ok(QueueEntry {
            name,
            path,
            size: artifact.len() as u64,
        })
    }

    fn has_pending(&self) -> bool {
        self.pending_entries()
            .map(|entries| !entries.is_empty())
            .unwrap_or(false)
    }

    fn summarize(&self) -> Result<QueueSummary> {
        let pending = self.pending_entries()?;
        let sent = self.sent_entries()?;
        Ok(QueueSummary {
            pending: pending.len(),
            pending_bytes: pending.iter().map(|e| e.size).sum(),
            sent: sent.len(),
            oldest_pending: pending.first().map(|e| e.name.clone()),
            newest_pending: pending.last().map(|e| e.name.clone()),
            oldest_at: pending.first().and_then(entry_time),
            newest_at: pending.last().and_then(entry_time),
        })
    }

    fn drain(
        &mut self,
        endpoint: &Endpoint,
        token: &str,
        uploader: &mut dyn Uploader,
        policy: &DrainPolicy,
        on_entry_start: &mut dyn FnMut(&QueueEntry),
    ) -> Result<DrainReport> {
        let mut report = DrainReport::default();

        for entry in self.pending_entries()? {
            if report.attempted >= policy.max_entries {
                report.stop = DrainStop::Limit;
                break;
            }

            if entry.size == 0 {
                tracing::warn!(entry = %entry.name, "deleting empty queue entry");
                self.remove_entry(&entry);
                report.pruned += 1;
                continue;
            }

            let Ok(len) = usize::try_from(entry.size) else {
                report.stop = DrainStop::OutOfMemory;
                break;
            };
            let mut buf = match self.allocator.allocate(len) {
                Ok(buf) => buf,
                Err(e) => {
                    tracing::warn!(entry = %entry.name, "stopping drain: {}", e);
                    report.stop = DrainStop::OutOfMemory;
                    break;
                }
            };

            match read_entry(&entry.path, &mut buf) {
                Ok(()) if buf.len() == len => {}
                Ok(()) => {
                    tracing::warn!(
                        entry = %entry.name,
                        expected = len,
                        read = buf.len(),
                        "deleting truncated queue entry"
                    );
                    self.remove_entry(&entry);
                    report.pruned += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(entry = %entry.name, "deleting unreadable queue entry: {}", e);
                    self.remove_entry(&entry);
                    report.pruned += 1;
                    continue;
                }
            }
            let iv = read_sidecar(&entry.iv_path());

            on_entry_start(&entry);
            report.attempted += 1;

            match uploader.upload(endpoint, Payload::new(&buf, iv.as_deref()), token) {
                Ok(_) => {
                    tracing::info!(entry = %entry.name, "queued image delivered");
                    report.uploaded += 1;
                    self.mark_sent(&entry);
                }
                Err(e) => {
                    tracing::warn!(
                        entry = %entry.name,
                        status = ?e.http_status(),
                        "queued upload failed: {}",
                        e
                    );
                    // A rejected token is dead for every remaining entry.
                    report.unauthorized |= e.is_unauthorized();
                    if policy.stop_on_first_failure || e.is_unauthorized() {
                        report.stop = DrainStop::UploadFailed;
                        break;
                    }
                }
            }
        }

        if report.attempted > 0 || report.pruned > 0 {
            tracing::info!(
                uploaded = report.uploaded,
                attempted = report.attempted,
                pruned = report.pruned,
                "drain finished"
            );
        }
        Ok(report)
    }

    fn prune_sent(&mut self, keep: usize) -> Result<usize> {
        let sent = self.sent_entries()?;
        let excess = sent.len().saturating_sub(keep);
        for entry in &sent[..excess] {
            self.remove_entry(entry);
        }
        if excess > 0 {
            tracing::debug!(removed = excess, keep, "pruned sent entries");
        }
        Ok(excess)
    }
}

fn storage_error(path: &Path, e: io::Error) -> Error {
    Error::StorageUnavailable(format!("{}: {}", path.display(), e))
}

fn list_entries(dir: &Path) -> Result<Vec<QueueEntry>> {
    let mut entries = Vec::new();
    for item in fs::read_dir(dir).map_err(|e| storage_error(dir, e))? {
        let item = item?;
        let path = item.path();
        if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXT) {
            continue;
        }
        let meta = item.metadata()?;
        if !meta.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(String::from) else {
            continue;
        };
        entries.push(QueueEntry {
            name,
            path,
            size: meta.len(),
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Writes as much of `bytes` as the writer accepts and returns the count.
fn write_counted(writer: &mut dyn EntryWriter, bytes: &[u8]) -> usize {
    let mut written = 0;
    while written < bytes.len() {
        match writer.write(&bytes[written..]) {
            Ok(0) => break,
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                tracing::warn!("write error after {} bytes: {}", written, e);
                break;
            }
        }
    }
    written
}

fn write_sidecar(path: &Path, iv: &str) -> Result<()> {
    let mut file = File::create(path).map_err(|e| storage_error(path, e))?;
    file.write_all(iv.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

fn read_sidecar(path: &Path) -> Option<String> {
    fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn read_entry(path: &Path, buf: &mut Vec<u8>) -> io::Result<()> {
    File::open(path)?.read_to_end(buf)?;
    Ok(())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
