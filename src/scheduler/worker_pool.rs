//! Worker pool of sequential lanes.
//!
//! This module provides a fixed set of [`SequentialQueue`] lanes. Each
//! submission goes to the lane with the smallest active count at the moment of
//! submission (first minimum wins ties), giving bounded parallelism equal to the
//! lane count while keeping FIFO order inside every lane.
//!
//! # Features
//!
//! - Configurable number of lanes (clamped to at least one)
//! - Least-busy dispatch, decided once per submission and never rebalanced
//! - Pool statistics tracking
//!
//! The least-busy choice is a snapshot: two submissions racing each other may
//! land on the same lane.

use std::future::Future;
use std::sync::Arc;

use futures::future::{self, Either};
use tracing::{debug, error};

use crate::error::PoolError;
use crate::panic_bus::{PanicBus, PanicMessage};

use super::queue::SequentialQueue;

const SERVICE_NAME: &str = "WorkerPool";

/// Configuration for the worker pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerPoolConfig {
    /// Number of sequential lanes to create.
    pub num_workers: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            num_workers: Self::DEFAULT_WORKERS,
        }
    }
}

impl WorkerPoolConfig {
    /// Lane count used when nothing usable is configured.
    pub const DEFAULT_WORKERS: usize = 4;

    /// Creates a configuration with the given lane count, clamped to at least one.
    pub fn new(num_workers: usize) -> Self {
        Self {
            num_workers: num_workers.max(1),
        }
    }

    /// Builds the configuration from a raw setting such as the `WORKERS` variable.
    ///
    /// The leading integer of the trimmed value is used (`"3.9"` is 3,
    /// `"7abc"` is 7). Missing or unparsable values fall back to
    /// [`Self::DEFAULT_WORKERS`]; values below one become one.
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.and_then(parse_leading_integer) {
            Some(n) if n < 1 => Self::new(1),
            Some(n) => Self::new(usize::try_from(n).unwrap_or(usize::MAX)),
            None => Self::default(),
        }
    }
}

fn parse_leading_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    // Saturate rather than fail on absurdly large values.
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

/// Statistics about the worker pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Total number of lanes in the pool.
    pub num_workers: usize,
    /// Tasks submitted but not yet settled, across all lanes.
    pub active_tasks: usize,
    /// Tasks that ran to completion.
    pub tasks_completed: u64,
    /// Tasks that panicked.
    pub tasks_panicked: u64,
}

impl PoolStats {
    /// Returns the total number of settled tasks.
    pub fn total_processed(&self) -> u64 {
        self.tasks_completed + self.tasks_panicked
    }
}

/// Fixed collection of sequential lanes with least-busy dispatch.
///
/// Cheap to clone; clones share the same lanes.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    queues: Arc<[SequentialQueue]>,
    panic_bus: PanicBus,
}

impl WorkerPool {
    /// Creates a pool with `config.num_workers` lanes (at least one).
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: &WorkerPoolConfig, panic_bus: PanicBus) -> Self {
        let queues = (0..config.num_workers.max(1))
            .map(|_| SequentialQueue::new())
            .collect();
        Self::from_queues(queues, panic_bus)
    }

    /// Creates a pool over existing lanes.
    pub fn from_queues(queues: Vec<SequentialQueue>, panic_bus: PanicBus) -> Self {
        Self {
            queues: queues.into(),
            panic_bus,
        }
    }

    /// Number of lanes.
    pub fn len(&self) -> usize {
        self.queues.len()
    }

    /// Returns true if the pool has no lanes.
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// The lanes, in dispatch scan order.
    pub fn queues(&self) -> &[SequentialQueue] {
        &self.queues
    }

    /// Snapshot of every lane's active count.
    pub fn active_counts(&self) -> Vec<usize> {
        self.queues.iter().map(|q| q.active_count()).collect()
    }

    /// Index of the lane the next submission would go to.
    pub fn least_busy_index(&self) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        for (index, queue) in self.queues.iter().enumerate() {
            let active = queue.active_count();
            match best {
                Some((_, best_active)) if active >= best_active => {}
                _ => best = Some((index, active)),
            }
        }
        best.map(|(index, _)| index)
    }

    /// Submits `task` to the least busy lane and returns its outcome.
    ///
    /// Like [`SequentialQueue::submit`], the lane is chosen and the task
    /// enqueued when this method is called.
    ///
    /// # Errors
    ///
    /// Resolves to `PoolError::NoWorkers` (after publishing on the panic bus) if
    /// the pool has no lanes.
    pub fn submit<F, Fut, T>(&self, task: F) -> impl Future<Output = Result<T, PoolError>> + Send + 'static
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        match self.least_busy_index() {
            Some(index) => {
                let queue = &self.queues[index];
                debug!(
                    queue = index,
                    active = queue.active_count(),
                    "Dispatching task to least busy queue"
                );
                Either::Left(queue.submit(task))
            }
            None => {
                error!("Worker pool has no queues");
                self.panic_bus.publish(PanicMessage::new(
                    SERVICE_NAME,
                    "No workers available to submit a task",
                ));
                Either::Right(future::ready(Err(PoolError::NoWorkers)))
            }
        }
    }

    /// Returns current pool statistics.
    pub fn stats(&self) -> PoolStats {
        self.queues.iter().fold(
            PoolStats {
                num_workers: self.queues.len(),
                ..PoolStats::default()
            },
            |mut stats, queue| {
                stats.active_tasks += queue.active_count();
                stats.tasks_completed += queue.completed_count();
                stats.tasks_panicked += queue.panicked_count();
                stats
            },
        )
    }
}
