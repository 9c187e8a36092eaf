//! Task aggregate root and related task lifecycle types.

use super::{
    ParseTaskStatusError, TaskDetails, TaskDomainError, TaskId, TimeRemaining, Workflow,
};
use crate::identity::{Identity, WalletAddress};
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task is posted and available to take.
    Open,
    /// Task is held by a single taker.
    InProgress,
    /// Task has been completed with a workflow proof.
    Completed,
}

impl TaskStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    /// Returns whether the lifecycle permits moving from `self` to `target`.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Open, Self::InProgress)
                | (Self::InProgress, Self::Open | Self::Completed)
        )
    }

    /// Returns whether no transition leaves this status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "open" => Ok(Self::Open),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            _ => Err(ParseTaskStatusError(value.to_owned())),
        }
    }
}

/// Identity that posted a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCreator {
    address: WalletAddress,
    display_label: String,
}

impl TaskCreator {
    /// Creates a creator record.
    #[must_use]
    pub fn new(address: WalletAddress, display_label: impl Into<String>) -> Self {
        Self {
            address,
            display_label: display_label.into(),
        }
    }

    /// Returns the creator's canonical address.
    #[must_use]
    pub const fn address(&self) -> &WalletAddress {
        &self.address
    }

    /// Returns the creator's display label.
    #[must_use]
    pub fn display_label(&self) -> &str {
        &self.display_label
    }
}

impl From<&Identity> for TaskCreator {
    fn from(identity: &Identity) -> Self {
        Self::new(identity.address().clone(), identity.display_label())
    }
}

/// Identity currently holding a task and when it took it.
///
/// Held as a single optional value on [`Task`], so the taker label, address
/// and instant are always present or absent together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskHolder {
    address: WalletAddress,
    display_label: String,
    taken_at: DateTime<Utc>,
}

impl TaskHolder {
    /// Creates a holder record.
    #[must_use]
    pub fn new(
        address: WalletAddress,
        display_label: impl Into<String>,
        taken_at: DateTime<Utc>,
    ) -> Self {
        Self {
            address,
            display_label: display_label.into(),
            taken_at,
        }
    }

    /// Returns the holder's canonical address.
    #[must_use]
    pub const fn address(&self) -> &WalletAddress {
        &self.address
    }

    /// Returns the holder's display label.
    #[must_use]
    pub fn display_label(&self) -> &str {
        &self.display_label
    }

    /// Returns when the task was taken.
    #[must_use]
    pub const fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// Returns whether the hold has lasted at least `timeout` at `now`.
    #[must_use]
    pub fn is_expired(&self, timeout: TimeDelta, now: DateTime<Utc>) -> bool {
        now - self.taken_at >= timeout
    }
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    details: TaskDetails,
    status: TaskStatus,
    creator: TaskCreator,
    created_at: DateTime<Utc>,
    holder: Option<TaskHolder>,
    completed_at: Option<DateTime<Utc>>,
    workflow: Option<Workflow>,
    timeout_released: bool,
    revision: u64,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted descriptive fields.
    pub details: TaskDetails,
    /// Persisted lifecycle status.
    pub status: TaskStatus,
    /// Persisted creator.
    pub creator: TaskCreator,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted holder, if any.
    pub holder: Option<TaskHolder>,
    /// Persisted completion timestamp, if any.
    pub completed_at: Option<DateTime<Utc>>,
    /// Persisted workflow proof, if any.
    pub workflow: Option<Workflow>,
    /// Whether the last release was caused by the holding timeout.
    pub timeout_released: bool,
    /// Persisted optimistic-concurrency revision.
    pub revision: u64,
}

impl Task {
    /// Creates an open task posted by `creator`.
    #[must_use]
    pub fn new(details: TaskDetails, creator: &Identity, clock: &impl Clock) -> Self {
        Self {
            id: TaskId::new(),
            details,
            status: TaskStatus::Open,
            creator: TaskCreator::from(creator),
            created_at: clock.utc(),
            holder: None,
            completed_at: None,
            workflow: None,
            timeout_released: false,
            revision: 0,
        }
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            details: data.details,
            status: data.status,
            creator: data.creator,
            created_at: data.created_at,
            holder: data.holder,
            completed_at: data.completed_at,
            workflow: data.workflow,
            timeout_released: data.timeout_released,
            revision: data.revision,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the descriptive fields.
    #[must_use]
    pub const fn details(&self) -> &TaskDetails {
        &self.details
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the creator.
    #[must_use]
    pub const fn creator(&self) -> &TaskCreator {
        &self.creator
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the current holder, if any.
    #[must_use]
    pub const fn holder(&self) -> Option<&TaskHolder> {
        self.holder.as_ref()
    }

    /// Returns when the current holder took the task, if held.
    #[must_use]
    pub fn taken_at(&self) -> Option<DateTime<Utc>> {
        self.holder.as_ref().map(TaskHolder::taken_at)
    }

    /// Returns the completion timestamp, if completed.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Returns the attached workflow, if any.
    #[must_use]
    pub const fn workflow(&self) -> Option<&Workflow> {
        self.workflow.as_ref()
    }

    /// Returns whether the holding timeout released this task.
    #[must_use]
    pub const fn timeout_released(&self) -> bool {
        self.timeout_released
    }

    /// Returns the optimistic-concurrency revision read from the store.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns whether `address` posted this task.
    #[must_use]
    pub fn is_created_by(&self, address: &WalletAddress) -> bool {
        self.creator.address() == address
    }

    /// Returns whether `address` currently holds this task.
    #[must_use]
    pub fn is_held_by(&self, address: &WalletAddress) -> bool {
        self.holder
            .as_ref()
            .is_some_and(|holder| holder.address() == address)
    }

    /// Takes the task on behalf of `taker`.
    ///
    /// The creator is not barred from taking their own task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStatusTransition`] unless the task
    /// is open.
    pub fn take(&mut self, taker: &Identity, clock: &impl Clock) -> Result<(), TaskDomainError> {
        self.ensure_transition(TaskStatus::InProgress)?;
        self.holder = Some(TaskHolder::new(
            taker.address().clone(),
            taker.display_label(),
            clock.utc(),
        ));
        self.status = TaskStatus::InProgress;
        Ok(())
    }

    /// Replaces the attached workflow without changing status.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::WorkflowLocked`] once the task is completed.
    pub fn attach_workflow(&mut self, workflow: Workflow) -> Result<(), TaskDomainError> {
        if self.status.is_terminal() {
            return Err(TaskDomainError::WorkflowLocked(self.id));
        }
        self.workflow = Some(workflow);
        Ok(())
    }

    /// Completes the task with `workflow` as proof.
    ///
    /// # Errors
    ///
    /// Returns workflow validation errors first, then
    /// [`TaskDomainError::NotHolder`] when `caller` does not hold the task,
    /// then [`TaskDomainError::InvalidStatusTransition`] when it is not in
    /// progress.
    pub fn complete(
        &mut self,
        caller: &WalletAddress,
        workflow: Workflow,
        minimum_blocks: usize,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        workflow.validate(minimum_blocks)?;
        self.ensure_holder(caller, "complete")?;
        self.ensure_transition(TaskStatus::Completed)?;
        self.workflow = Some(workflow);
        self.completed_at = Some(clock.utc());
        self.status = TaskStatus::Completed;
        Ok(())
    }

    /// Returns the task to the open pool at the holder's request.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::NotHolder`] when `caller` does not hold the
    /// task and [`TaskDomainError::InvalidStatusTransition`] when it is not in
    /// progress.
    pub fn cancel(&mut self, caller: &WalletAddress) -> Result<(), TaskDomainError> {
        self.ensure_holder(caller, "cancel")?;
        self.ensure_transition(TaskStatus::Open)?;
        self.release();
        Ok(())
    }

    /// Releases the task if its hold has lasted at least `timeout` at `now`.
    ///
    /// Returns `true` when the task was released. Open and completed tasks
    /// are left untouched, which makes repeated sweeps idempotent.
    pub fn release_expired(&mut self, timeout: TimeDelta, now: DateTime<Utc>) -> bool {
        let expired = self.status == TaskStatus::InProgress
            && self
                .holder
                .as_ref()
                .is_some_and(|holder| holder.is_expired(timeout, now));
        if expired {
            self.release();
            self.timeout_released = true;
        }
        expired
    }

    /// Checks that `caller` may delete this task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::NotCreator`] for anyone but the creator and
    /// [`TaskDomainError::NotDeletable`] once the task has left the open pool.
    pub fn ensure_deletable_by(&self, caller: &WalletAddress) -> Result<(), TaskDomainError> {
        if !self.is_created_by(caller) {
            return Err(TaskDomainError::NotCreator(self.id));
        }
        if self.status != TaskStatus::Open {
            return Err(TaskDomainError::NotDeletable {
                task_id: self.id,
                status: self.status,
            });
        }
        Ok(())
    }

    /// Returns the time left before the holding timeout, for in-progress
    /// tasks only.
    ///
    /// The result is informational: an expired task stays in progress until
    /// the next timeout sweep releases it.
    #[must_use]
    pub fn time_remaining(&self, timeout: TimeDelta, now: DateTime<Utc>) -> Option<TimeRemaining> {
        if self.status != TaskStatus::InProgress {
            return None;
        }
        self.taken_at()
            .map(|taken_at| TimeRemaining::until(taken_at + timeout, now))
    }

    /// Returns a copy stamped with the revision assigned by the store.
    pub(crate) fn with_revision(mut self, revision: u64) -> Self {
        self.revision = revision;
        self
    }

    fn ensure_holder(
        &self,
        caller: &WalletAddress,
        action: &'static str,
    ) -> Result<(), TaskDomainError> {
        if self.is_held_by(caller) {
            Ok(())
        } else {
            Err(TaskDomainError::NotHolder {
                task_id: self.id,
                action,
            })
        }
    }

    const fn ensure_transition(&self, target: TaskStatus) -> Result<(), TaskDomainError> {
        if self.status.can_transition_to(target) {
            Ok(())
        } else {
            Err(TaskDomainError::InvalidStatusTransition {
                task_id: self.id,
                from: self.status,
                to: target,
            })
        }
    }

    fn release(&mut self) {
        self.holder = None;
        self.workflow = None;
        self.status = TaskStatus::Open;
    }
}
