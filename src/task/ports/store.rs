//! Store port for shared task persistence and change notification.

use crate::identity::WalletAddress;
use crate::task::domain::{Task, TaskId, TaskSnapshot};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

/// Result type for task store operations.
pub type TaskStoreResult<T> = Result<T, TaskStoreError>;

/// Live feed of full task snapshots, newest task first.
pub type TaskFeed = watch::Receiver<Arc<TaskSnapshot>>;

/// Shared task collection contract.
///
/// Writes are conditional on [`Task::revision`]: a write succeeds only when
/// the stored record still carries the revision the caller read, and the
/// stored copy then advances to the next revision. Of two writers that read
/// the same revision, at most one is admitted.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Inserts a new task unless its creator already posted `limit` tasks at
    /// or after `window_start`. The count and insert are atomic.
    ///
    /// Returns the stored task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::QuotaExhausted`] when the limit is reached
    /// and [`TaskStoreError::DuplicateTask`] when the identifier exists.
    async fn insert_within_quota(
        &self,
        task: &Task,
        window_start: DateTime<Utc>,
        limit: u32,
    ) -> TaskStoreResult<Task>;

    /// Persists changes to an existing task.
    ///
    /// Returns the stored task carrying its new revision.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::NotFound`] when the task does not exist and
    /// [`TaskStoreError::Conflict`] when it changed since it was read.
    async fn update(&self, task: &Task) -> TaskStoreResult<Task>;

    /// Removes a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::NotFound`] when the task does not exist and
    /// [`TaskStoreError::Conflict`] when it changed since it was read.
    async fn delete(&self, task: &Task) -> TaskStoreResult<()>;

    /// Finds a task by identifier.
    ///
    /// Returns `None` when the task does not exist.
    async fn find_by_id(&self, id: TaskId) -> TaskStoreResult<Option<Task>>;

    /// Returns every task, newest first.
    async fn list_all(&self) -> TaskStoreResult<Vec<Task>>;

    /// Counts tasks posted by `address` at or after `since`.
    async fn count_created_since(
        &self,
        address: &WalletAddress,
        since: DateTime<Utc>,
    ) -> TaskStoreResult<usize>;

    /// Subscribes to snapshots published after every successful write.
    fn subscribe(&self) -> TaskFeed;
}

/// Errors returned by task store implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskStoreError {
    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// The task was not found.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The task changed since the caller read it.
    #[error("task {task_id} was modified concurrently (expected revision {expected})")]
    Conflict {
        /// Task identifier.
        task_id: TaskId,
        /// Revision the caller read.
        expected: u64,
    },

    /// The creator has used up the creation quota for the window.
    #[error("creation quota of {limit} tasks exhausted")]
    QuotaExhausted {
        /// Quota that was reached.
        limit: u32,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskStoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
