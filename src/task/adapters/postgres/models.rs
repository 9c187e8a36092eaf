//! Diesel row models for task persistence.

use super::schema::tasks;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for task records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    /// Internal task identifier.
    pub id: uuid::Uuid,
    /// Task title.
    pub title: String,
    /// Task description.
    pub description: String,
    /// Robot type.
    pub robot_type: String,
    /// Task location.
    pub location: String,
    /// Optional distance note.
    pub distance: Option<String>,
    /// Lifecycle status.
    pub status: String,
    /// Creator display label.
    pub created_by: String,
    /// Creator wallet address.
    pub created_by_wallet: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Holder display label.
    pub taken_by: Option<String>,
    /// Holder wallet address.
    pub taken_by_wallet: Option<String>,
    /// Timestamp the holder took the task.
    pub taken_at: Option<DateTime<Utc>>,
    /// Completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Workflow proof payload.
    pub workflow: Option<Value>,
    /// Whether the holding timeout released the task.
    pub timeout_released: bool,
    /// Optimistic-concurrency revision.
    pub revision: i64,
}

/// Insert model for task records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tasks)]
pub struct NewTaskRow {
    /// Internal task identifier.
    pub id: uuid::Uuid,
    /// Task title.
    pub title: String,
    /// Task description.
    pub description: String,
    /// Robot type.
    pub robot_type: String,
    /// Task location.
    pub location: String,
    /// Optional distance note.
    pub distance: Option<String>,
    /// Lifecycle status.
    pub status: String,
    /// Creator display label.
    pub created_by: String,
    /// Creator wallet address.
    pub created_by_wallet: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Holder display label.
    pub taken_by: Option<String>,
    /// Holder wallet address.
    pub taken_by_wallet: Option<String>,
    /// Timestamp the holder took the task.
    pub taken_at: Option<DateTime<Utc>>,
    /// Completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Workflow proof payload.
    pub workflow: Option<Value>,
    /// Whether the holding timeout released the task.
    pub timeout_released: bool,
    /// Optimistic-concurrency revision.
    pub revision: i64,
}

/// Changeset for lifecycle updates. Descriptive and creator columns are
/// immutable and therefore absent.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = tasks)]
#[diesel(treat_none_as_null = true)]
pub struct TaskLifecycleChangeset {
    /// Lifecycle status.
    pub status: String,
    /// Holder display label.
    pub taken_by: Option<String>,
    /// Holder wallet address.
    pub taken_by_wallet: Option<String>,
    /// Timestamp the holder took the task.
    pub taken_at: Option<DateTime<Utc>>,
    /// Completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Workflow proof payload.
    pub workflow: Option<Value>,
    /// Whether the holding timeout released the task.
    pub timeout_released: bool,
    /// Revision the row advances to.
    pub revision: i64,
}
