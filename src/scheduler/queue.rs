//! Sequential execution lane.
//!
//! A [`SequentialQueue`] runs the tasks submitted to it strictly one at a time,
//! in submission order. Each lane owns a single tokio task that drains an
//! unbounded FIFO channel of boxed jobs.
//!
//! # Guarantees
//!
//! - **FIFO**: if task A is submitted before task B, A settles before B starts.
//! - **No poisoning**: a task that fails or panics does not stop later tasks.
//! - **Own outcome**: every caller receives the outcome of its own task.
//!
//! # Load accounting
//!
//! The active count rises when a task is submitted and falls when it settles,
//! so it counts queued and running tasks alike. It is decremented before the
//! result is handed back, which means a caller that has observed its result
//! also observes the decremented count.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::error::PoolError;

type Job = BoxFuture<'static, ()>;

/// Counters shared by a lane and its clones.
#[derive(Debug, Default)]
struct LaneCounters {
    active: AtomicUsize,
    completed: AtomicU64,
    panicked: AtomicU64,
}

impl LaneCounters {
    fn increment_active(&self) {
        self.active.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement_active(&self) {
        // Floored at zero.
        let _ = self
            .active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                Some(n.saturating_sub(1))
            });
    }
}

/// A single FIFO lane of asynchronous work.
///
/// Cloning yields another handle to the same lane.
#[derive(Clone)]
pub struct SequentialQueue {
    sender: mpsc::UnboundedSender<Job>,
    counters: Arc<LaneCounters>,
}

impl std::fmt::Debug for SequentialQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequentialQueue")
            .field("active", &self.active_count())
            .finish()
    }
}

impl Default for SequentialQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl SequentialQueue {
    /// Creates a lane and spawns its drain task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();

        tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                job.await;
            }
        });

        Self {
            sender,
            counters: Arc::new(LaneCounters::default()),
        }
    }

    /// Number of submitted tasks that have not settled yet.
    pub fn active_count(&self) -> usize {
        self.counters.active.load(Ordering::SeqCst)
    }

    /// Number of tasks that ran to completion (including ones returning an `Err`).
    pub fn completed_count(&self) -> u64 {
        self.counters.completed.load(Ordering::SeqCst)
    }

    /// Number of tasks that panicked.
    pub fn panicked_count(&self) -> u64 {
        self.counters.panicked.load(Ordering::SeqCst)
    }

    /// Enqueues `task` and returns a future resolving to its outcome.
    ///
    /// Submission happens when this method is called, not when the returned
    /// future is first polled. Dropping the returned future does not cancel the
    /// task.
    pub fn submit<F, Fut, T>(&self, task: F) -> impl Future<Output = Result<T, PoolError>> + Send + 'static
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let counters = Arc::clone(&self.counters);

        self.counters.increment_active();

        let job: Job = Box::pin(async move {
            let outcome = AssertUnwindSafe(async move { task().await })
                .catch_unwind()
                .await;

            counters.decrement_active();

            let outcome = match outcome {
                Ok(value) => {
                    counters.completed.fetch_add(1, Ordering::SeqCst);
                    Ok(value)
                }
                Err(payload) => {
                    counters.panicked.fetch_add(1, Ordering::SeqCst);
                    let reason = panic_reason(payload.as_ref());
                    warn!(reason = %reason, "Task panicked in queue lane");
                    Err(PoolError::TaskPanicked(reason))
                }
            };

            // The caller may have stopped waiting; the task still ran.
            let _ = result_tx.send(outcome);
        });

        let enqueued = self.sender.send(job).is_ok();
        if !enqueued {
            self.counters.decrement_active();
        }

        async move {
            if !enqueued {
                return Err(PoolError::QueueClosed);
            }
            match result_rx.await {
                Ok(outcome) => outcome,
                Err(_) => Err(PoolError::QueueClosed),
            }
        }
    }
}

fn panic_reason(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
