//! Monotonic time sources for the timer engine

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::time::Instant;

/// Source of monotonic milliseconds, unaffected by wall-clock adjustments
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Real monotonic clock measured from the moment it was created.
///
/// Built on `tokio::time::Instant`, so a paused tokio runtime (tests)
/// drives it the same way it drives timers.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Hand-driven clock for deterministic tests
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    current: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            current: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    /// Move the clock forward by `ms` milliseconds
    pub fn advance(&self, ms: u64) {
        self.current.fetch_add(ms, Ordering::SeqCst);
    }

    /// Set the clock to an absolute value; never moves it backwards
    pub fn set(&self, ms: u64) {
        self.current.fetch_max(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }
}
