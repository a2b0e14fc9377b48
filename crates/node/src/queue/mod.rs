// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline queue for captures that could not be delivered.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐ enqueue ┌──────────────┐  drain   ┌──────────────┐
//! │   Pipeline   │────────►│   pending/   │─────────►│   Uploader   │
//! └──────────────┘         └──────────────┘          └──────────────┘
//!                                 │ delivered
//!                                 ▼
//!                          ┌──────────────┐
//!                          │    sent/     │ (pruned to keep_sent)
//!                          └──────────────┘
//! ```
//!
//! Entries are plain JPEG files named after their capture time, so the
//! pending region can be inspected and repaired by hand.

mod alloc;
mod naming;
mod store;

pub use alloc::{BufferAllocator, HeapPool, TieredAllocator};
pub use store::{
    default_allocator, ArtifactStore, DrainPolicy, DrainReport, DrainStop, EntryWriter,
    OfflineQueue, QueueEntry, QueueSummary, WriterFactory, PENDING_DIR, SENT_DIR,
};
