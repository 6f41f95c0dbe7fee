//! Bounded pool for best-effort background work
//!
//! Room summaries and offline notifications run here so the send path never
//! waits on them. Capacity is a semaphore; `spawn` never blocks and drops
//! the task when every permit is taken.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tracing::{error, warn};

pub const DEFAULT_MAX_IN_FLIGHT: usize = 256;

#[derive(Clone, Debug)]
pub struct TaskPool {
    name: &'static str,
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl TaskPool {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            name,
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of tasks currently running
    pub fn in_flight(&self) -> usize {
        self.capacity - self.permits.available_permits()
    }

    /// Run `task` in the background. Returns `false` if the pool was full
    /// and the task was dropped.
    pub fn spawn<F, E>(&self, label: &'static str, task: F) -> bool
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let Ok(permit) = Arc::clone(&self.permits).try_acquire_owned() else {
            warn!(pool = self.name, task = label, "Background pool saturated, dropping task");
            return false;
        };

        let pool = self.name;
        let handle = tokio::spawn(async move {
            let _permit = permit;
            if let Err(e) = task.await {
                warn!(pool, task = label, error = %e, "Background task failed");
            }
        });

        // Surface panics without making the caller wait on the task
        tokio::spawn(async move {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    error!(pool, task = label, "Background task panicked");
                }
            }
        });
        true
    }

    /// Wait until every running task has finished or `timeout` elapses.
    /// Returns whether the pool went idle.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let start = Instant::now();
        loop {
            if self.permits.available_permits() >= self.capacity {
                return true;
            }
            if start.elapsed() >= timeout {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

impl Default for TaskPool {
    fn default() -> Self {
        Self::new("background", DEFAULT_MAX_IN_FLIGHT)
    }
}
