//! Wall-clock source used to stamp writes.

use std::time::{SystemTime, UNIX_EPOCH};

/// Source of write timestamps, in whole seconds since the Unix epoch.
pub trait Clock: Send + Sync + 'static {
    fn now_seconds(&self) -> i64;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_seconds(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default()
    }
}
