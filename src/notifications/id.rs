// SPDX-License-Identifier: MPL-2.0
//! Notification identity generation.
//!
//! An id combines the wall-clock millisecond it was issued at, a random seed
//! drawn once per process, and a process-wide monotonic counter. The counter
//! alone guarantees that no two ids issued in the same process are equal,
//! whichever generator issued them. The seed tells processes apart in logs.

use crate::config::defaults::ID_SEPARATOR;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

/// Shared by every generator in the process.
static COUNTER: AtomicU64 = AtomicU64::new(0);

fn process_seed() -> u32 {
    static SEED: OnceLock<u32> = OnceLock::new();
    *SEED.get_or_init(rand::random)
}

/// Unique identifier for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationId {
    issued_at_ms: i64,
    seed: u32,
    sequence: u64,
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:x}{sep}{:08x}{sep}{:x}",
            self.issued_at_ms,
            self.seed,
            self.sequence,
            sep = ID_SEPARATOR
        )
    }
}

impl Serialize for NotificationId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Produces unique [`NotificationId`]s.
///
/// Generation is pure: it never consults the store or the scheduler.
#[derive(Debug, Clone, Copy)]
pub struct IdGenerator {
    seed: u32,
}

impl IdGenerator {
    /// Creates a generator stamping ids with the process seed.
    #[must_use]
    pub fn new() -> Self {
        Self::with_seed(process_seed())
    }

    /// Creates a generator stamping ids with a fixed seed.
    ///
    /// The seed only changes how ids render. Uniqueness comes from the
    /// process-wide counter, so generators sharing a seed never collide.
    #[must_use]
    pub fn with_seed(seed: u32) -> Self {
        Self { seed }
    }

    /// Issues the next id.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&self) -> NotificationId {
        NotificationId {
            issued_at_ms: chrono::Utc::now().timestamp_millis(),
            seed: self.seed,
            sequence: COUNTER.fetch_add(1, Ordering::Relaxed),
        }
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
