//! Conversions between task aggregates and `PostgreSQL` rows.

use super::models::{NewTaskRow, TaskLifecycleChangeset, TaskRow};
use crate::identity::WalletAddress;
use crate::task::{
    domain::{
        PersistedTaskData, RobotType, Task, TaskCreator, TaskDetails, TaskHolder, TaskId,
        TaskStatus, Workflow,
    },
    ports::{TaskStoreError, TaskStoreResult},
};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Holder label, address and taken-at columns.
type HolderColumns = (Option<String>, Option<String>, Option<DateTime<Utc>>);

/// Row contents that cannot form a valid task.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub(crate) enum RowConversionError {
    /// Holder columns are only partly populated.
    #[error("task {0} has partially populated holder columns")]
    PartialHolder(TaskId),

    /// The revision does not fit the column type.
    #[error("revision {0} is out of range")]
    RevisionOutOfRange(String),
}

pub(crate) fn revision_to_column(revision: u64) -> TaskStoreResult<i64> {
    i64::try_from(revision).map_err(|_| {
        TaskStoreError::persistence(RowConversionError::RevisionOutOfRange(revision.to_string()))
    })
}

fn holder_columns(task: &Task) -> HolderColumns {
    task.holder().map_or((None, None, None), |holder| {
        (
            Some(holder.display_label().to_owned()),
            Some(holder.address().as_str().to_owned()),
            Some(holder.taken_at()),
        )
    })
}

pub(crate) fn to_new_row(task: &Task) -> TaskStoreResult<NewTaskRow> {
    let details = task.details();
    let (taken_by, taken_by_wallet, taken_at) = holder_columns(task);

    Ok(NewTaskRow {
        id: task.id().into_inner(),
        title: details.title().to_owned(),
        description: details.description().to_owned(),
        robot_type: details.robot_type().as_str().to_owned(),
        location: details.location().to_owned(),
        distance: details.distance().map(str::to_owned),
        status: task.status().as_str().to_owned(),
        created_by: task.creator().display_label().to_owned(),
        created_by_wallet: task.creator().address().as_str().to_owned(),
        created_at: task.created_at(),
        taken_by,
        taken_by_wallet,
        taken_at,
        completed_at: task.completed_at(),
        workflow: task.workflow().map(|workflow| workflow.as_value().clone()),
        timeout_released: task.timeout_released(),
        revision: revision_to_column(task.revision())?,
    })
}

pub(crate) fn to_changeset(
    task: &Task,
    next_revision: u64,
) -> TaskStoreResult<TaskLifecycleChangeset> {
    let (taken_by, taken_by_wallet, taken_at) = holder_columns(task);

    Ok(TaskLifecycleChangeset {
        status: task.status().as_str().to_owned(),
        taken_by,
        taken_by_wallet,
        taken_at,
        completed_at: task.completed_at(),
        workflow: task.workflow().map(|workflow| workflow.as_value().clone()),
        timeout_released: task.timeout_released(),
        revision: revision_to_column(next_revision)?,
    })
}

pub(crate) fn row_to_task(row: TaskRow) -> TaskStoreResult<Task> {
    let TaskRow {
        id,
        title,
        description,
        robot_type,
        location,
        distance,
        status,
        created_by,
        created_by_wallet,
        created_at,
        taken_by,
        taken_by_wallet,
        taken_at,
        completed_at,
        workflow,
        timeout_released,
        revision,
    } = row;
    let task_id = TaskId::from_uuid(id);

    let robot = RobotType::try_from(robot_type.as_str()).map_err(TaskStoreError::persistence)?;
    let mut details = TaskDetails::new(title, description, robot, location)
        .map_err(TaskStoreError::persistence)?;
    if let Some(note) = distance {
        details = details.with_distance(note);
    }

    let holder = match (taken_by, taken_by_wallet, taken_at) {
        (Some(label), Some(wallet), Some(at)) => Some(TaskHolder::new(
            WalletAddress::new(wallet).map_err(TaskStoreError::persistence)?,
            label,
            at,
        )),
        (None, None, None) => None,
        _ => {
            return Err(TaskStoreError::persistence(
                RowConversionError::PartialHolder(task_id),
            ));
        }
    };

    let persisted_revision = u64::try_from(revision).map_err(|_| {
        TaskStoreError::persistence(RowConversionError::RevisionOutOfRange(revision.to_string()))
    })?;

    Ok(Task::from_persisted(PersistedTaskData {
        id: task_id,
        details,
        status: TaskStatus::try_from(status.as_str()).map_err(TaskStoreError::persistence)?,
        creator: TaskCreator::new(
            WalletAddress::new(created_by_wallet).map_err(TaskStoreError::persistence)?,
            created_by,
        ),
        created_at,
        holder,
        completed_at,
        workflow: workflow.map(Workflow::new),
        timeout_released,
        revision: persisted_revision,
    }))
}
