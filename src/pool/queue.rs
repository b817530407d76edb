//! Availability queue
//!
//! Bounded queue of idle connection IDs. Its length is the pool's idle
//! count, and it is the rendezvous acquire-any callers wait on. Permits on
//! the semaphore track queued IDs so waiters sleep without polling.

use crate::error::{PoolError, Result};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Bounded queue of idle connection IDs
#[derive(Debug)]
pub(crate) struct IdQueue {
    /// Queued IDs, approximately FIFO
    ids: Mutex<VecDeque<String>>,
    /// One permit per queued ID
    ready: Semaphore,
    /// Maximum queue length
    capacity: usize,
}

impl IdQueue {
    pub(crate) fn new(capacity: usize) -> Self {
        IdQueue {
            ids: Mutex::new(VecDeque::with_capacity(capacity)),
            ready: Semaphore::new(0),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<String>> {
        self.ids.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current number of queued IDs
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Enqueue without blocking, running `register` first
    ///
    /// `register` runs under the queue lock and only when there is room,
    /// so a registered connection is always matched by a queued ID. When the
    /// queue is full, `register` is dropped unrun along with anything it owns.
    pub(crate) fn try_push_with<F>(&self, id: &str, register: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        {
            let mut ids = self.lock();
            if ids.len() >= self.capacity {
                return Err(PoolError::PoolFull);
            }
            register()?;
            ids.push_back(id.to_string());
        }
        self.ready.add_permits(1);
        Ok(())
    }

    /// Wait for the next ID until `deadline` or until `token` is canceled
    pub(crate) async fn pop(&self, deadline: Instant, token: &CancellationToken) -> Option<String> {
        loop {
            let permit = tokio::select! {
                permit = self.ready.acquire() => permit.ok()?,
                _ = tokio::time::sleep_until(deadline) => return None,
                _ = token.cancelled() => return None,
            };
            permit.forget();

            // Empty when a concurrent remove or drain took the ID
            let next = self.lock().pop_front();
            if let Some(id) = next {
                return Some(id);
            }
        }
    }

    /// Remove a specific ID, consuming its permit
    pub(crate) fn remove(&self, id: &str) -> bool {
        let removed = {
            let mut ids = self.lock();
            match ids.iter().position(|queued| queued == id) {
                Some(index) => ids.remove(index).is_some(),
                None => false,
            }
        };
        if removed {
            // A waiter may already hold this permit; it will find one ID fewer
            if let Ok(permit) = self.ready.try_acquire() {
                permit.forget();
            }
        }
        removed
    }

    /// Empty the queue, handing the drained IDs to `f` under the queue lock
    pub(crate) fn drain<R>(&self, f: impl FnOnce(Vec<String>) -> R) -> R {
        let mut ids = self.lock();
        let drained: Vec<String> = ids.drain(..).collect();
        self.ready.forget_permits(self.ready.available_permits());
        f(drained)
    }
}
