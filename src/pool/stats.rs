//! Pool statistics
//!
//! Monotonic counters for connection registration, rejection, acquisition
//! and flushing. These are separate from the advisory error counter,
//! which only callers touch.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Statistics for a pool
#[derive(Debug, Default)]
pub struct PoolStats {
    /// Connections registered as idle
    pub total_registered: AtomicUsize,
    /// Establishment attempts that ended in a rejection
    pub total_rejected: AtomicUsize,
    /// Connections handed to callers
    pub total_acquired: AtomicUsize,
    /// Idle connections closed by a flush
    pub total_flushed: AtomicUsize,
}

impl PoolStats {
    /// Create new pool stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a registration
    pub fn record_registered(&self) {
        self.total_registered.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a rejected attempt
    pub fn record_rejected(&self) {
        self.total_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a handout
    pub fn record_acquired(&self) {
        self.total_acquired.fetch_add(1, Ordering::Relaxed);
    }

    /// Count connections closed by one flush
    pub fn record_flushed(&self, count: usize) {
        self.total_flushed.fetch_add(count, Ordering::Relaxed);
    }

    /// Get current stats snapshot
    pub fn snapshot(&self) -> PoolStatsSnapshot {
        PoolStatsSnapshot {
            total_registered: self.total_registered.load(Ordering::Relaxed),
            total_rejected: self.total_rejected.load(Ordering::Relaxed),
            total_acquired: self.total_acquired.load(Ordering::Relaxed),
            total_flushed: self.total_flushed.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of pool statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStatsSnapshot {
    pub total_registered: usize,
    pub total_rejected: usize,
    pub total_acquired: usize,
    pub total_flushed: usize,
}
