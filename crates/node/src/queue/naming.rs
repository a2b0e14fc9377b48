// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Entry file names.
//!
//! Timestamped entries are named `YYYYMMDD_HHMMSS.jpg` in UTC, so filename
//! order is capture order. Captures within the same second get a `_NNN`
//! suffix. Without a valid wall clock entries fall back to `seq_NNNNNNNNNN.jpg`,
//! which sort after every timestamped entry.

use chrono::{DateTime, NaiveDateTime, Utc};

pub const ENTRY_EXT: &str = "jpg";
pub const IV_EXT: &str = "iv";
pub const PART_EXT: &str = "part";

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const SEQUENCE_PREFIX: &str = "seq_";

pub fn timestamp_stem(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub fn sequence_stem(seq: u64) -> String {
    format!("{}{:010}", SEQUENCE_PREFIX, seq)
}

/// Sequence number of a fallback stem.
pub fn parse_sequence(stem: &str) -> Option<u64> {
    stem.strip_prefix(SEQUENCE_PREFIX)?.parse().ok()
}

/// Capture time encoded in a timestamped stem, ignoring any collision suffix.
pub fn parse_timestamp(stem: &str) -> Option<DateTime<Utc>> {
    let head = stem.get(..15)?;
    NaiveDateTime::parse_from_str(head, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// First of `base`, `base_001`, `base_002`, ... for which `taken` is false.
pub fn unique_stem(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    let mut n: u32 = 1;
    loop {
        let candidate = format!("{}_{:03}", base, n);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

pub fn entry_file_name(stem: &str) -> String {
    format!("{}.{}", stem, ENTRY_EXT)
}

#[cfg(test)]
#[path = "naming_tests.rs"]
mod tests;
