// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Fallible buffer allocation for queue entries.
//!
//! A drain reads each entry whole before uploading it. Allocation failure
//! must end the pass quietly rather than abort the process, so every buffer
//! is reserved with `try_reserve_exact`.

use mc_core::{Error, Result};

/// Hands out empty buffers with at least the requested capacity.
pub trait BufferAllocator {
    fn allocate(&self, len: usize) -> Result<Vec<u8>>;
}

/// Heap allocation with an optional per-buffer ceiling.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapPool {
    limit: Option<usize>,
}

impl HeapPool {
    pub fn new(limit: Option<usize>) -> Self {
        HeapPool { limit }
    }
}

impl BufferAllocator for HeapPool {
    fn allocate(&self, len: usize) -> Result<Vec<u8>> {
        if self.limit.is_some_and(|limit| len > limit) {
            return Err(Error::OutOfMemory { requested: len });
        }
        let mut buf = Vec::new();
        buf.try_reserve_exact(len)
            .map_err(|_| Error::OutOfMemory { requested: len })?;
        Ok(buf)
    }
}

/// Tries a preferred pool first and falls back to a second one.
#[derive(Debug, Clone, Copy)]
pub struct TieredAllocator<A, B> {
    preferred: A,
    fallback: B,
}

impl<A: BufferAllocator, B: BufferAllocator> TieredAllocator<A, B> {
    pub fn new(preferred: A, fallback: B) -> Self {
        TieredAllocator {
            preferred,
            fallback,
        }
    }
}

impl<A: BufferAllocator, B: BufferAllocator> BufferAllocator for TieredAllocator<A, B> {
    fn allocate(&self, len: usize) -> Result<Vec<u8>> {
        match self.preferred.allocate(len) {
            Ok(buf) => Ok(buf),
            Err(_) => {
                tracing::debug!(len, "preferred pool exhausted, trying fallback");
                self.fallback.allocate(len)
            }
        }
    }
}

#[cfg(test)]
#[path = "alloc_tests.rs"]
mod tests;
