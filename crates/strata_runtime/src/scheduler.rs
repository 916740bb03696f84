//! Tracking of in-flight registration tasks.
//!
//! Declaring a resource is fire-and-forget: the declaring call returns a
//! handle immediately while a spawned task drives the registration. Those
//! task handles land here, and the deployment run drains the queue before
//! it finishes so no registration is silently abandoned.

use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::task::{JoinError, JoinHandle};

/// Registry of in-flight registration tasks for one deployment.
#[derive(Debug, Default)]
pub struct TaskScheduler {
    pending: Mutex<VecDeque<JoinHandle<()>>>,
}

impl TaskScheduler {
    /// An empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks currently queued.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Enqueues one in-flight task.
    pub fn track(&self, task: JoinHandle<()>) {
        self.pending.lock().push_back(task);
    }

    /// Awaits queued tasks until the queue is observed empty.
    ///
    /// A task awaited here may declare further resources and enqueue
    /// further tasks, so emptiness is re-checked after every await rather
    /// than snapshotting the queue once. The lock is never held across an
    /// await.
    ///
    /// Registration failures are not errors at this level; they live on
    /// the affected resource's outputs. A task that panicked is another
    /// matter: draining continues so the rest of the deployment settles,
    /// and the first panic is reported once the queue empties.
    ///
    /// # Errors
    ///
    /// Returns the first panicked task's [`JoinError`].
    pub async fn drain(&self) -> Result<(), JoinError> {
        let mut first_panic = None;
        loop {
            let next = self.pending.lock().pop_front();
            let Some(task) = next else {
                break;
            };
            if let Err(error) = task.await {
                tracing::error!(%error, "registration task panicked");
                first_panic.get_or_insert(error);
            }
        }
        match first_panic {
            None => Ok(()),
            Some(error) => Err(error),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────
