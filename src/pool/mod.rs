//! Connection pool module for Linkpool
//!
//! A pool holds pre-established connections between two endpoints. The
//! dialing side opens them ahead of time and the listening side accepts
//! them. Each connection is identified by an ID the listener assigns during
//! an in-band exchange, so both ends can pick the same connection later.
//!
//! Idle connections live in two places at once: a map from ID to handle,
//! and a bounded queue of IDs. Callers take connections by ID (usually the
//! dialing side, after learning the ID from its peer) or take whichever is
//! available next (usually the listening side).

mod acceptor;
mod controller;
pub mod id;
mod manager;
mod producer;
mod queue;
mod state;
mod stats;

pub use controller::{
    CAPACITY_HIGH_RATIO, CAPACITY_LOW_RATIO, INTERVAL_HIGH_THRESHOLD, INTERVAL_LOW_THRESHOLD,
    INTERVAL_STEP,
};
pub use state::Pool;
pub use stats::{PoolStats, PoolStatsSnapshot};

use std::time::Duration;

/// How long the dialing side waits for its connection ID
pub const ID_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Poll period while waiting for a specific ID
pub const ID_RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Backoff after a failed accept
pub const ACCEPT_RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Upper bound on closing one connection during a flush
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);
