//! Adaptive controller for dialing pools
//!
//! Two bounded single-step adjusters, run once per manager iteration:
//! the creation interval follows the idle ratio, and the target capacity
//! follows the creation success ratio. Each moves one step at a time.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Interval change per adjustment
pub const INTERVAL_STEP: Duration = Duration::from_millis(100);

/// Idle ratio below which we dial faster
pub const INTERVAL_LOW_THRESHOLD: f64 = 0.2;

/// Idle ratio above which we dial slower
pub const INTERVAL_HIGH_THRESHOLD: f64 = 0.8;

/// Success ratio below which the target shrinks
pub const CAPACITY_LOW_RATIO: f64 = 0.2;

/// Success ratio above which the target grows
pub const CAPACITY_HIGH_RATIO: f64 = 0.8;

/// Target capacity and creation interval of a dialing pool
///
/// Only the pool's manager task writes these values. The bound checks
/// are plain load-then-store, not compare-and-swap.
#[derive(Debug)]
pub struct Controller {
    capacity: AtomicUsize,
    /// Interval in nanoseconds
    interval: AtomicU64,
    min_capacity: usize,
    max_capacity: usize,
    min_interval: Duration,
    max_interval: Duration,
}

impl Controller {
    /// Start at the lower bound of both ranges
    pub fn new(
        min_capacity: usize,
        max_capacity: usize,
        min_interval: Duration,
        max_interval: Duration,
    ) -> Self {
        Controller {
            capacity: AtomicUsize::new(min_capacity),
            interval: AtomicU64::new(as_nanos(min_interval)),
            min_capacity,
            max_capacity,
            min_interval,
            max_interval,
        }
    }

    /// Current target capacity
    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Relaxed)
    }

    /// Current creation interval
    pub fn interval(&self) -> Duration {
        Duration::from_nanos(self.interval.load(Ordering::Relaxed))
    }

    /// Lower capacity bound
    pub fn min_capacity(&self) -> usize {
        self.min_capacity
    }

    /// Upper capacity bound
    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    /// Move the interval one step based on the idle count
    pub fn adjust_interval(&self, idle: usize) {
        let capacity = self.capacity() as f64;
        let idle = idle as f64;
        let interval = self.interval();

        if idle < capacity * INTERVAL_LOW_THRESHOLD && interval > self.min_interval {
            let next = interval.saturating_sub(INTERVAL_STEP).max(self.min_interval);
            self.interval.store(as_nanos(next), Ordering::Relaxed);
        } else if idle > capacity * INTERVAL_HIGH_THRESHOLD && interval < self.max_interval {
            let next = (interval + INTERVAL_STEP).min(self.max_interval);
            self.interval.store(as_nanos(next), Ordering::Relaxed);
        }
    }

    /// Move the capacity one step based on last iteration's successes
    pub fn adjust_capacity(&self, created: usize) {
        let capacity = self.capacity();
        let ratio = created as f64 / capacity.max(1) as f64;

        if ratio < CAPACITY_LOW_RATIO && capacity > self.min_capacity {
            self.capacity.fetch_sub(1, Ordering::Relaxed);
        } else if ratio > CAPACITY_HIGH_RATIO && capacity < self.max_capacity {
            self.capacity.fetch_add(1, Ordering::Relaxed);
        }
    }
}

fn as_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}
