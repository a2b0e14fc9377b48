// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the offline queue store.

#![allow(clippy::unwrap_used)]

use super::*;
use crate::test_helpers::{endpoint, jpeg, ScriptedUploader};
use chrono::{DateTime, TimeZone, Utc};
use mc_core::{Artifact, Error};
use std::io::{self, Write};
use std::path::Path;
use tempfile::{tempdir, TempDir};

fn at(secs: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 9, 7, 5, secs).unwrap()
}

fn open() -> (TempDir, OfflineQueue) {
    let dir = tempdir().unwrap();
    let queue = OfflineQueue::open(dir.path()).unwrap();
    (dir, queue)
}

fn names(entries: &[QueueEntry]) -> Vec<String> {
    entries.iter().map(|e| e.name.clone()).collect()
}

fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn drain(
    queue: &mut OfflineQueue,
    uploader: &ScriptedUploader,
    policy: DrainPolicy,
) -> DrainReport {
    let mut uploader = uploader.clone();
    queue
        .drain(&endpoint(), "tok", &mut uploader, &policy, &mut |_| {})
        .unwrap()
}

fn policy(max_entries: usize) -> DrainPolicy {
    DrainPolicy {
        max_entries,
        ..DrainPolicy::default()
    }
}

#[test]
fn test_enqueue_names_entry_after_capture_time() {
    let (_dir, mut queue) = open();
    let entry = queue
        .enqueue(&Artifact::new(jpeg(1, 64), Some(at(1))))
        .unwrap();

    assert_eq!(entry.name, "20260309_070501.jpg");
    assert_eq!(entry.size, 64);
    assert_eq!(entry.captured_at(), Some(at(1)));
    assert_eq!(std::fs::read(&entry.path).unwrap(), jpeg(1, 64));
    assert_eq!(files_in(queue.pending_dir()), vec!["20260309_070501.jpg"]);
}

#[test]
fn test_same_second_captures_get_distinct_names() {
    let (_dir, mut queue) = open();
    for tag in 1..=3 {
        queue
            .enqueue(&Artifact::new(jpeg(tag, 16), Some(at(1))))
            .unwrap();
    }
    assert_eq!(
        names(&queue.pending_entries().unwrap()),
        vec![
            "20260309_070501.jpg",
            "20260309_070501_001.jpg",
            "20260309_070501_002.jpg",
        ]
    );
}

#[test]
fn test_name_already_in_sent_is_not_reused() {
    let (_dir, mut queue) = open();
    queue
        .enqueue(&Artifact::new(jpeg(1, 16), Some(at(1))))
        .unwrap();
    drain(&mut queue, &ScriptedUploader::new(), policy(5));

    let entry = queue
        .enqueue(&Artifact::new(jpeg(2, 16), Some(at(1))))
        .unwrap();
    assert_eq!(entry.name, "20260309_070501_001.jpg");
}

#[test]
fn test_without_clock_entries_use_sequence() {
    let (_dir, mut queue) = open();
    let first = queue.enqueue(&Artifact::new(jpeg(1, 16), None)).unwrap();
    let second = queue.enqueue(&Artifact::new(jpeg(2, 16), None)).unwrap();
    assert_eq!(first.name, "seq_0000000001.jpg");
    assert_eq!(second.name, "seq_0000000002.jpg");

    // Delivered entries still count, numbers never go backwards
    drain(&mut queue, &ScriptedUploader::new(), policy(5));
    let third = queue.enqueue(&Artifact::new(jpeg(3, 16), None)).unwrap();
    assert_eq!(third.name, "seq_0000000003.jpg");
}

#[test]
fn test_enqueue_rejects_empty_artifact() {
    let (_dir, mut queue) = open();
    let err = queue.enqueue(&Artifact::new(Vec::new(), Some(at(1)))).unwrap_err();
    assert!(matches!(err, Error::CaptureFailed(_)));
    assert!(!queue.has_pending());
}

/// Accepts at most `budget` bytes, then reports the medium full.
struct ShortWriter {
    budget: usize,
    fail_hard: bool,
}

impl Write for ShortWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.budget == 0 {
            if self.fail_hard {
                return Err(io::Error::other("card removed"));
            }
            return Ok(0);
        }
        let n = buf.len().min(self.budget);
        self.budget -= n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl EntryWriter for ShortWriter {
    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn short_writer(budget: usize, fail_hard: bool) -> WriterFactory {
    Box::new(move |path: &Path| {
        // Leave a real part file behind, as an interrupted write would
        std::fs::write(path, b"partial")?;
        Ok(Box::new(ShortWriter { budget, fail_hard }) as Box<dyn EntryWriter>)
    })
}

#[test]
fn test_short_write_leaves_nothing_behind() {
    let dir = tempdir().unwrap();
    let mut queue = OfflineQueue::open(dir.path())
        .unwrap()
        .with_entry_writer(short_writer(10, false));

    let err = queue
        .enqueue(&Artifact::new(jpeg(1, 64), Some(at(1))).with_iv("aabb"))
        .unwrap_err();

    assert!(matches!(
        err,
        Error::StorageWriteIncomplete {
            expected: 64,
            written: 10
        }
    ));
    assert!(files_in(queue.pending_dir()).is_empty());
}

#[test]
fn test_write_error_is_reported_as_incomplete() {
    let dir = tempdir().unwrap();
    let mut queue = OfflineQueue::open(dir.path())
        .unwrap()
        .with_entry_writer(short_writer(32, true));

    let err = queue
        .enqueue(&Artifact::new(jpeg(1, 64), Some(at(1))))
        .unwrap_err();
    assert!(matches!(err, Error::StorageWriteIncomplete { written: 32, .. }));
    assert!(!queue.has_pending());
}

#[test]
fn test_open_removes_stale_files() {
    let dir = tempdir().unwrap();
    let pending = dir.path().join(PENDING_DIR);
    std::fs::create_dir_all(&pending).unwrap();
    std::fs::write(pending.join("20260309_070501.part"), b"half").unwrap();
    std::fs::write(pending.join("20260309_070502.iv"), b"orphan").unwrap();
    std::fs::write(pending.join("20260309_070503.jpg"), jpeg(3, 8)).unwrap();
    std::fs::write(pending.join("20260309_070503.iv"), b"kept").unwrap();

    let queue = OfflineQueue::open(dir.path()).unwrap();
    assert_eq!(
        files_in(queue.pending_dir()),
        vec!["20260309_070503.iv", "20260309_070503.jpg"]
    );
}

#[test]
fn test_open_on_unusable_root_is_storage_unavailable() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("not-a-dir");
    std::fs::write(&file, b"x").unwrap();
    let err = OfflineQueue::open(&file).err().unwrap();
    assert!(matches!(err, Error::StorageUnavailable(_)));
}

#[test]
fn test_drain_respects_max_entries() {
    let (_dir, mut queue) = open();
    for secs in 1..=3 {
        queue
            .enqueue(&Artifact::new(jpeg(secs as u8, 32), Some(at(secs))))
            .unwrap();
    }
    let uploader = ScriptedUploader::new();

    let report = drain(&mut queue, &uploader, policy(2));

    assert_eq!(report.uploaded, 2);
    assert_eq!(report.attempted, 2);
    assert_eq!(report.stop, DrainStop::Limit);
    assert_eq!(
        names(&queue.sent_entries().unwrap()),
        vec!["20260309_070501.jpg", "20260309_070502.jpg"]
    );
    assert_eq!(
        names(&queue.pending_entries().unwrap()),
        vec!["20260309_070503.jpg"]
    );
}

#[test]
fn test_drain_uploads_oldest_first() {
    let (_dir, mut queue) = open();
    // Enqueued out of order
    queue.enqueue(&Artifact::new(jpeg(3, 8), Some(at(3)))).unwrap();
    queue.enqueue(&Artifact::new(jpeg(1, 8), Some(at(1)))).unwrap();
    queue.enqueue(&Artifact::new(jpeg(2, 8), Some(at(2)))).unwrap();
    let uploader = ScriptedUploader::new();

    let report = drain(&mut queue, &uploader, policy(5));

    assert_eq!(report.stop, DrainStop::Exhausted);
    let order: Vec<u8> = uploader.calls().iter().map(|c| c.bytes[2]).collect();
    assert_eq!(order, vec![1, 2, 3]);
    assert!(!queue.has_pending());
}

#[test]
fn test_drain_stops_on_first_failure() {
    let (_dir, mut queue) = open();
    for secs in 1..=3 {
        queue.enqueue(&Artifact::new(jpeg(1, 8), Some(at(secs)))).unwrap();
    }
    let uploader = ScriptedUploader::new();
    uploader.push_status(200).push_status(500);

    let report = drain(&mut queue, &uploader, policy(5));

    assert_eq!(report.uploaded, 1);
    assert_eq!(report.attempted, 2);
    assert_eq!(report.stop, DrainStop::UploadFailed);
    assert!(!report.unauthorized);
    assert_eq!(queue.pending_entries().unwrap().len(), 2);
}

#[test]
fn test_drain_can_continue_past_failures() {
    let (_dir, mut queue) = open();
    for secs in 1..=3 {
        queue.enqueue(&Artifact::new(jpeg(1, 8), Some(at(secs)))).unwrap();
    }
    let uploader = ScriptedUploader::new();
    uploader.push_status(500);

    let report = drain(
        &mut queue,
        &uploader,
        DrainPolicy {
            max_entries: 5,
            stop_on_first_failure: false,
        },
    );

    assert_eq!(report.attempted, 3);
    assert_eq!(report.uploaded, 2);
    assert_eq!(
        names(&queue.pending_entries().unwrap()),
        vec!["20260309_070501.jpg"]
    );
}

#[test]
fn test_drain_continue_policy_stops_on_rejected_token() {
    let (_dir, mut queue) = open();
    for secs in 1..=3 {
        queue.enqueue(&Artifact::new(jpeg(1, 8), Some(at(secs)))).unwrap();
    }
    let uploader = ScriptedUploader::new();
    uploader.push_status(401);

    let report = drain(
        &mut queue,
        &uploader,
        DrainPolicy {
            max_entries: 5,
            stop_on_first_failure: false,
        },
    );

    assert_eq!(report.attempted, 1);
    assert_eq!(report.uploaded, 0);
    assert!(report.unauthorized);
    assert_eq!(report.stop, DrainStop::UploadFailed);
    assert_eq!(uploader.tokens(), vec!["tok"]);
    assert_eq!(queue.pending_entries().unwrap().len(), 3);
}

#[test]
fn test_drain_flags_unauthorized() {
    let (_dir, mut queue) = open();
    queue.enqueue(&Artifact::new(jpeg(1, 8), Some(at(1)))).unwrap();
    let uploader = ScriptedUploader::new();
    uploader.push_status(401);

    let report = drain(&mut queue, &uploader, policy(5));
    assert!(report.unauthorized);
    assert_eq!(report.uploaded, 0);
    assert!(queue.has_pending());
}

#[test]
fn test_drain_prunes_empty_entries_without_attempt() {
    let (_dir, mut queue) = open();
    std::fs::write(queue.pending_dir().join("20260309_070500.jpg"), b"").unwrap();
    queue.enqueue(&Artifact::new(jpeg(1, 8), Some(at(1)))).unwrap();
    let uploader = ScriptedUploader::new();

    let report = drain(&mut queue, &uploader, policy(1));

    assert_eq!(report.pruned, 1);
    assert_eq!(report.attempted, 1);
    assert_eq!(report.uploaded, 1);
    assert_eq!(uploader.calls().len(), 1);
    assert!(!queue.has_pending());
}

#[test]
fn test_drain_stops_when_buffer_unavailable() {
    let dir = tempdir().unwrap();
    let mut queue = OfflineQueue::open(dir.path())
        .unwrap()
        .with_allocator(HeapPool::new(Some(16)));
    queue.enqueue(&Artifact::new(jpeg(1, 8), Some(at(1)))).unwrap();
    queue.enqueue(&Artifact::new(jpeg(2, 64), Some(at(2)))).unwrap();
    queue.enqueue(&Artifact::new(jpeg(3, 8), Some(at(3)))).unwrap();
    let uploader = ScriptedUploader::new();

    let report = drain(&mut queue, &uploader, policy(5));

    assert_eq!(report.stop, DrainStop::OutOfMemory);
    assert_eq!(report.uploaded, 1);
    // The oversized entry is kept for a later pass
    assert_eq!(
        names(&queue.pending_entries().unwrap()),
        vec!["20260309_070502.jpg", "20260309_070503.jpg"]
    );
}

#[test]
fn test_drain_sends_iv_and_moves_sidecar() {
    let (_dir, mut queue) = open();
    queue
        .enqueue(&Artifact::new(jpeg(1, 8), Some(at(1))).with_iv("00112233"))
        .unwrap();
    assert_eq!(
        files_in(queue.pending_dir()),
        vec!["20260309_070501.iv", "20260309_070501.jpg"]
    );
    let uploader = ScriptedUploader::new();

    drain(&mut queue, &uploader, policy(5));

    assert_eq!(uploader.calls()[0].iv.as_deref(), Some("00112233"));
    assert!(files_in(queue.pending_dir()).is_empty());
    assert_eq!(
        files_in(queue.sent_dir()),
        vec!["20260309_070501.iv", "20260309_070501.jpg"]
    );
}

#[test]
fn test_drain_reports_each_entry_before_upload() {
    let (_dir, mut queue) = open();
    for secs in 1..=2 {
        queue.enqueue(&Artifact::new(jpeg(1, 8), Some(at(secs)))).unwrap();
    }
    let mut uploader = ScriptedUploader::new();
    let mut seen = Vec::new();

    queue
        .drain(
            &endpoint(),
            "tok",
            &mut uploader,
            &DrainPolicy::default(),
            &mut |entry| seen.push(entry.name.clone()),
        )
        .unwrap();

    assert_eq!(seen, vec!["20260309_070501.jpg", "20260309_070502.jpg"]);
}

#[test]
fn test_drain_uses_given_token() {
    let (_dir, mut queue) = open();
    queue.enqueue(&Artifact::new(jpeg(1, 8), Some(at(1)))).unwrap();
    let uploader = ScriptedUploader::new();
    drain(&mut queue, &uploader, policy(5));
    assert_eq!(uploader.tokens(), vec!["tok"]);
}

#[test]
fn test_prune_sent_keeps_newest() {
    let (_dir, mut queue) = open();
    for secs in 1..=4 {
        queue.enqueue(&Artifact::new(jpeg(1, 8), Some(at(secs)))).unwrap();
    }
    drain(&mut queue, &ScriptedUploader::new(), policy(5));

    assert_eq!(queue.prune_sent(2).unwrap(), 2);
    assert_eq!(
        names(&queue.sent_entries().unwrap()),
        vec!["20260309_070503.jpg", "20260309_070504.jpg"]
    );
    assert_eq!(queue.prune_sent(2).unwrap(), 0);
    assert_eq!(queue.prune_sent(0).unwrap(), 2);
}

#[test]
fn test_summarize() {
    let (_dir, mut queue) = open();
    assert_eq!(queue.summarize().unwrap(), QueueSummary::default());

    for secs in 1..=3 {
        queue.enqueue(&Artifact::new(jpeg(1, 10), Some(at(secs)))).unwrap();
    }
    drain(&mut queue, &ScriptedUploader::new(), policy(1));

    let summary = queue.summarize().unwrap();
    assert_eq!(summary.pending, 2);
    assert_eq!(summary.pending_bytes, 20);
    assert_eq!(summary.sent, 1);
    assert_eq!(summary.oldest_pending.as_deref(), Some("20260309_070502.jpg"));
    assert_eq!(summary.newest_pending.as_deref(), Some("20260309_070503.jpg"));
    assert_eq!(summary.oldest_at, Some(at(2)));
    assert_eq!(summary.newest_at, Some(at(3)));
}

#[test]
fn test_summarize_sequence_entries_use_mtime() {
    let (_dir, mut queue) = open();
    queue.enqueue(&Artifact::new(jpeg(1, 10), None)).unwrap();

    let summary = queue.summarize().unwrap();
    assert_eq!(summary.oldest_pending.as_deref(), Some("seq_0000000001.jpg"));
    assert!(summary.oldest_at.is_some());
    assert_eq!(summary.oldest_at, summary.newest_at);
}

#[test]
fn test_pending_survives_reopen() {
    let dir = tempdir().unwrap();
    {
        let mut queue = OfflineQueue::open(dir.path()).unwrap();
        queue.enqueue(&Artifact::new(jpeg(1, 8), Some(at(1)))).unwrap();
    }
    let queue = OfflineQueue::open(dir.path()).unwrap();
    assert!(queue.has_pending());
}

#[test]
fn test_default_allocator_falls_back_to_heap() {
    let allocator = default_allocator(Some(8));
    assert!(allocator.allocate(1024).is_ok());
}
