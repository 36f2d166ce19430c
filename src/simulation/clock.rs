//! Time and simulation-frame sources.
//!
//! Everything time-dependent in the model (dead reckoning, liveness) reads the
//! clock through the [`Clock`] trait so tests can drive time by hand.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic time plus the simulation-wide data frame counter.
pub trait Clock: Send + Sync {
    /// Monotonic time since the clock's origin.
    fn now(&self) -> Duration;
    /// Frame number of the authoritative simulation tick source.
    fn current_frame(&self) -> u64;
}

/// Wall clock backed by `Instant`, with a frame counter advanced by the tick source.
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
    frame: AtomicU64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            frame: AtomicU64::new(0),
        }
    }

    /// Advance to the next simulation frame; returns the new frame number.
    pub fn advance_frame(&self) -> u64 {
        self.frame.fetch_add(1, Ordering::AcqRel) + 1
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn current_frame(&self) -> u64 {
        self.frame.load(Ordering::Acquire)
    }
}

/// Hand-driven clock for tests and dry runs.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
    frame: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    pub fn set_frame(&self, frame: u64) {
        self.frame.store(frame, Ordering::Release);
    }

    pub fn advance_frame(&self) -> u64 {
        self.frame.fetch_add(1, Ordering::AcqRel) + 1
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }

    fn current_frame(&self) -> u64 {
        self.frame.load(Ordering::Acquire)
    }
}
