//! Error types for task domain validation and lifecycle guards.

use super::{TaskId, TaskStatus};
use thiserror::Error;

/// Errors returned by task construction and lifecycle guards.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// A required descriptive field is empty after trimming.
    #[error("task {0} must not be empty")]
    EmptyField(&'static str),

    /// The robot type is not offered by the marketplace.
    #[error("unknown robot type: {0}")]
    UnknownRobotType(String),

    /// The workflow has no `nodes` array.
    #[error("workflow must have at least {minimum} blocks to complete the task (no `nodes` array)")]
    MalformedWorkflow {
        /// Required node count.
        minimum: usize,
    },

    /// The workflow has fewer nodes than required.
    #[error("workflow must have at least {minimum} blocks to complete the task (found {found})")]
    WorkflowTooSmall {
        /// Required node count.
        minimum: usize,
        /// Node count supplied.
        found: usize,
    },

    /// Transitioning between two statuses is not permitted.
    #[error("task {task_id} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        /// Task identifier.
        task_id: TaskId,
        /// Current status.
        from: TaskStatus,
        /// Requested status.
        to: TaskStatus,
    },

    /// The caller does not hold the task.
    #[error("You can only {action} tasks you have taken")]
    NotHolder {
        /// Task identifier.
        task_id: TaskId,
        /// Attempted action, for example `complete`.
        action: &'static str,
    },

    /// The caller did not create the task.
    #[error("only the creator can delete this task")]
    NotCreator(TaskId),

    /// The task has left the open pool and can no longer be deleted.
    #[error("can only delete open tasks (task {task_id} is {status})")]
    NotDeletable {
        /// Task identifier.
        task_id: TaskId,
        /// Current status.
        status: TaskStatus,
    },

    /// The task is completed and its workflow proof is fixed.
    #[error("task {0} is completed; its workflow can no longer change")]
    WorkflowLocked(TaskId),
}

/// Error returned while parsing task statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);
