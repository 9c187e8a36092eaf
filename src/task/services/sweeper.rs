//! Automatic release of tasks held past the holding timeout.

use crate::task::{
    domain::TaskId,
    ports::{TaskStore, TaskStoreResult},
};
use chrono::TimeDelta;
use mockable::Clock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one timeout sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    released: Vec<TaskId>,
    failed: Vec<TaskId>,
}

impl SweepReport {
    /// Returns the tasks returned to the open pool.
    #[must_use]
    pub fn released(&self) -> &[TaskId] {
        &self.released
    }

    /// Returns the expired tasks whose release could not be written.
    #[must_use]
    pub fn failed(&self) -> &[TaskId] {
        &self.failed
    }

    /// Returns whether the sweep found nothing to release.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.released.is_empty() && self.failed.is_empty()
    }
}

/// Releases in-progress tasks whose holder has kept them for at least the
/// holding timeout.
///
/// Sweeps are idempotent: a task released by one sweep is open and is
/// skipped by the next.
pub struct TimeoutSweeper<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    clock: Arc<C>,
    timeout: TimeDelta,
}

impl<S, C> Clone for TimeoutSweeper<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            timeout: self.timeout,
        }
    }
}

impl<S, C> TimeoutSweeper<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    /// Creates a sweeper releasing tasks held for at least `timeout`.
    #[must_use]
    pub const fn new(store: Arc<S>, clock: Arc<C>, timeout: TimeDelta) -> Self {
        Self {
            store,
            clock,
            timeout,
        }
    }

    /// Returns the holding timeout.
    #[must_use]
    pub const fn timeout(&self) -> TimeDelta {
        self.timeout
    }

    /// Releases every expired task.
    ///
    /// A failed write is logged and recorded in the report; the remaining
    /// tasks are still processed.
    ///
    /// # Errors
    ///
    /// Returns the store error when the task listing itself fails.
    pub async fn sweep(&self) -> TaskStoreResult<SweepReport> {
        let now = self.clock.utc();
        let mut report = SweepReport::default();

        for mut task in self.store.list_all().await? {
            let holder = task
                .holder()
                .map(|holder| holder.address().as_str().to_owned());
            if !task.release_expired(self.timeout, now) {
                continue;
            }

            let task_id = task.id();
            match self.store.update(&task).await {
                Ok(_) => {
                    info!(
                        task_id = %task_id,
                        address = holder.as_deref().unwrap_or_default(),
                        "task released after holding timeout"
                    );
                    report.released.push(task_id);
                }
                Err(err) => {
                    warn!(task_id = %task_id, error = %err, "failed to release expired task");
                    report.failed.push(task_id);
                }
            }
        }

        debug!(
            released = report.released.len(),
            failed = report.failed.len(),
            "timeout sweep finished"
        );
        Ok(report)
    }
}
