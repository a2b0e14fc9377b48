// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Wall clock access.
//!
//! A node that just woke up may not have a synchronized clock yet. Callers
//! get `None` in that case and fall back to ordering schemes that do not
//! depend on calendar time.

use chrono::{DateTime, TimeZone, Utc};

/// Earliest instant accepted as a real calendar time (2020-01-01T00:00:00Z).
///
/// Anything earlier means the clock was never set since power-on.
pub const MIN_VALID_UNIX_SECS: i64 = 1_577_836_800;

/// Trait for getting the current wall clock time.
///
/// This allows injecting a fixed or unset clock for testing.
pub trait WallClock: Send + Sync {
    /// Returns the current time, or `None` when no trustworthy clock exists.
    fn now(&self) -> Option<DateTime<Utc>>;

    /// Current time in milliseconds since the Unix epoch, if known.
    fn now_ms(&self) -> Option<u64> {
        self.now()
            .and_then(|t| u64::try_from(t.timestamp_millis()).ok())
    }
}

/// System clock that reports `None` until the time has been set.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemWallClock;

impl WallClock for SystemWallClock {
    fn now(&self) -> Option<DateTime<Utc>> {
        validated(Utc::now())
    }
}

impl<C: WallClock> WallClock for &C {
    fn now(&self) -> Option<DateTime<Utc>> {
        (*self).now()
    }
}

/// A clock pinned to a fixed instant, or to "unset".
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Option<DateTime<Utc>>);

impl FixedClock {
    /// Clock pinned at the given Unix timestamp in milliseconds.
    pub fn at_ms(ms: i64) -> Self {
        FixedClock(Utc.timestamp_millis_opt(ms).single())
    }

    /// Clock that was never set.
    pub fn unset() -> Self {
        FixedClock(None)
    }
}

impl WallClock for FixedClock {
    fn now(&self) -> Option<DateTime<Utc>> {
        self.0.and_then(validated)
    }
}

fn validated(t: DateTime<Utc>) -> Option<DateTime<Utc>> {
    (t.timestamp() >= MIN_VALID_UNIX_SECS).then_some(t)
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
