//! Service layer for the task lifecycle: posting, taking, completing,
//! cancelling and deleting marketplace tasks.

use super::TimeoutSweeper;
use crate::config::LifecycleConfig;
use crate::identity::{Identity, IdentityProvider};
use crate::task::{
    domain::{
        RobotType, Task, TaskDetails, TaskDomainError, TaskId, TaskSnapshot, TimeRemaining,
        Workflow, remaining_quota, utc_day_start,
    },
    ports::{TaskFeed, TaskStore, TaskStoreError},
};
use mockable::Clock;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::info;

/// Request payload for posting a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    title: String,
    description: String,
    robot_type: String,
    location: String,
    distance: Option<String>,
}

impl CreateTaskRequest {
    /// Creates a request with the required fields.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        robot_type: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            robot_type: robot_type.into(),
            location: location.into(),
            distance: None,
        }
    }

    /// Sets the task description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the distance note.
    #[must_use]
    pub fn with_distance(mut self, distance: impl Into<String>) -> Self {
        self.distance = Some(distance.into());
        self
    }

    fn into_details(self) -> Result<TaskDetails, TaskDomainError> {
        let robot_type = RobotType::try_from(self.robot_type.as_str())?;
        let mut details =
            TaskDetails::new(self.title, self.description, robot_type, self.location)?;
        if let Some(distance) = self.distance {
            details = details.with_distance(distance);
        }
        Ok(details)
    }
}

/// Service-level errors for task lifecycle operations.
#[derive(Debug, Error)]
pub enum TaskLifecycleError {
    /// No identity is connected.
    #[error("must connect a wallet to {0}")]
    Unauthenticated(&'static str),

    /// The caller has posted the maximum number of tasks today.
    #[error("daily limit reached: you can create at most {limit} tasks per day")]
    QuotaExceeded {
        /// Daily creation limit.
        limit: u32,
    },

    /// Input failed validation.
    #[error(transparent)]
    ValidationFailed(TaskDomainError),

    /// The task does not exist.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The caller lacks the role the operation requires.
    #[error(transparent)]
    Forbidden(TaskDomainError),

    /// The task's status does not permit the operation.
    #[error(transparent)]
    InvalidState(TaskDomainError),

    /// Another writer changed the task first.
    #[error("task {0} was changed by someone else; reload and try again")]
    Conflict(TaskId),

    /// The store failed.
    #[error(transparent)]
    Store(TaskStoreError),
}

impl From<TaskDomainError> for TaskLifecycleError {
    fn from(err: TaskDomainError) -> Self {
        match err {
            TaskDomainError::EmptyField(_)
            | TaskDomainError::UnknownRobotType(_)
            | TaskDomainError::MalformedWorkflow { .. }
            | TaskDomainError::WorkflowTooSmall { .. } => Self::ValidationFailed(err),
            TaskDomainError::NotHolder { .. } | TaskDomainError::NotCreator(_) => {
                Self::Forbidden(err)
            }
            TaskDomainError::InvalidStatusTransition { .. }
            | TaskDomainError::NotDeletable { .. }
            | TaskDomainError::WorkflowLocked(_) => Self::InvalidState(err),
        }
    }
}

impl From<TaskStoreError> for TaskLifecycleError {
    fn from(err: TaskStoreError) -> Self {
        match err {
            TaskStoreError::NotFound(task_id) => Self::NotFound(task_id),
            TaskStoreError::Conflict { task_id, .. } => Self::Conflict(task_id),
            TaskStoreError::QuotaExhausted { limit } => Self::QuotaExceeded { limit },
            TaskStoreError::DuplicateTask(_) | TaskStoreError::Persistence(_) => Self::Store(err),
        }
    }
}

/// Result type for task lifecycle service operations.
pub type TaskLifecycleResult<T> = Result<T, TaskLifecycleError>;

/// Task lifecycle orchestration service.
///
/// The caller's identity is read from the [`IdentityProvider`] on every
/// operation. Time is read from the injected clock, which is the single time
/// source for quota windows, holding timeouts and timestamps.
pub struct TaskLifecycleService<S, I, C>
where
    S: TaskStore,
    I: IdentityProvider,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    identity: Arc<I>,
    clock: Arc<C>,
    config: LifecycleConfig,
    active_task: Arc<Mutex<Option<TaskId>>>,
}

impl<S, I, C> Clone for TaskLifecycleService<S, I, C>
where
    S: TaskStore,
    I: IdentityProvider,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            identity: Arc::clone(&self.identity),
            clock: Arc::clone(&self.clock),
            config: self.config,
            active_task: Arc::clone(&self.active_task),
        }
    }
}

impl<S, I, C> TaskLifecycleService<S, I, C>
where
    S: TaskStore,
    I: IdentityProvider,
    C: Clock + Send + Sync,
{
    /// Creates a service with the default lifecycle configuration.
    #[must_use]
    pub fn new(store: Arc<S>, identity: Arc<I>, clock: Arc<C>) -> Self {
        Self::with_config(store, identity, clock, LifecycleConfig::default())
    }

    /// Creates a service with an explicit lifecycle configuration.
    #[must_use]
    pub fn with_config(
        store: Arc<S>,
        identity: Arc<I>,
        clock: Arc<C>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            store,
            identity,
            clock,
            config,
            active_task: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns the lifecycle configuration.
    #[must_use]
    pub const fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Posts a new open task on behalf of the connected identity.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Unauthenticated`] without an identity,
    /// [`TaskLifecycleError::ValidationFailed`] for invalid fields and
    /// [`TaskLifecycleError::QuotaExceeded`] once the daily limit is reached.
    pub async fn create(&self, request: CreateTaskRequest) -> TaskLifecycleResult<Task> {
        let creator = self.require_identity("create tasks")?;
        let details = request.into_details()?;
        let limit = self.config.daily_task_limit();
        let task = Task::new(details, &creator, &*self.clock);
        let window_start = utc_day_start(task.created_at());

        let stored = self
            .store
            .insert_within_quota(&task, window_start, limit)
            .await?;
        info!(
            task_id = %stored.id(),
            address = %creator.address(),
            robot_type = %stored.details().robot_type(),
            "task created"
        );
        Ok(stored)
    }

    /// Takes an open task on behalf of the connected identity.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Unauthenticated`] without an identity,
    /// [`TaskLifecycleError::NotFound`] for an unknown task,
    /// [`TaskLifecycleError::InvalidState`] unless the task is open and
    /// [`TaskLifecycleError::Conflict`] when another taker won the race.
    pub async fn take(&self, task_id: TaskId) -> TaskLifecycleResult<Task> {
        let taker = self.require_identity("take tasks")?;
        let mut task = self.require_task(task_id).await?;
        task.take(&taker, &*self.clock)?;

        let stored = self.store.update(&task).await?;
        info!(task_id = %task_id, address = %taker.address(), "task taken");
        Ok(stored)
    }

    /// Marks a task as the one being edited in this session.
    pub fn start_working(&self, task_id: TaskId) {
        *self.lock_active_task() = Some(task_id);
    }

    /// Returns the task marked by [`Self::start_working`], if any.
    #[must_use]
    pub fn active_task_id(&self) -> Option<TaskId> {
        *self.lock_active_task()
    }

    /// Returns the marked task as it appears in the current snapshot.
    #[must_use]
    pub fn active_task(&self) -> Option<Task> {
        let task_id = self.active_task_id()?;
        self.snapshot().get(task_id).cloned()
    }

    /// Replaces a task's workflow draft without changing its status.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::NotFound`] for an unknown task and
    /// [`TaskLifecycleError::InvalidState`] once the task is completed.
    pub async fn attach_workflow(
        &self,
        task_id: TaskId,
        workflow: Workflow,
    ) -> TaskLifecycleResult<Task> {
        let mut task = self.require_task(task_id).await?;
        task.attach_workflow(workflow)?;

        let stored = self.store.update(&task).await?;
        info!(task_id = %task_id, "workflow saved");
        Ok(stored)
    }

    /// Completes a held task with `workflow` as proof.
    ///
    /// Guards run in order: identity, workflow size, existence, holder.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Unauthenticated`],
    /// [`TaskLifecycleError::ValidationFailed`],
    /// [`TaskLifecycleError::NotFound`] or [`TaskLifecycleError::Forbidden`]
    /// according to the first failing guard.
    pub async fn complete(&self, task_id: TaskId, workflow: Workflow) -> TaskLifecycleResult<Task> {
        let caller = self.require_identity("complete tasks")?;
        let minimum_blocks = self.config.min_workflow_blocks();
        workflow.validate(minimum_blocks)?;
        let mut task = self.require_task(task_id).await?;
        task.complete(caller.address(), workflow, minimum_blocks, &*self.clock)?;

        let stored = self.store.update(&task).await?;
        self.clear_active_task(task_id);
        info!(task_id = %task_id, address = %caller.address(), "task completed");
        Ok(stored)
    }

    /// Returns a held task to the open pool.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Unauthenticated`] without an identity,
    /// [`TaskLifecycleError::NotFound`] for an unknown task and
    /// [`TaskLifecycleError::Forbidden`] unless the caller holds it.
    pub async fn cancel(&self, task_id: TaskId) -> TaskLifecycleResult<Task> {
        let caller = self.require_identity("cancel tasks")?;
        let mut task = self.require_task(task_id).await?;
        task.cancel(caller.address())?;

        let stored = self.store.update(&task).await?;
        self.clear_active_task(task_id);
        info!(task_id = %task_id, address = %caller.address(), "task cancelled");
        Ok(stored)
    }

    /// Deletes an open task posted by the connected identity.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Unauthenticated`] without an identity,
    /// [`TaskLifecycleError::NotFound`] for an unknown task,
    /// [`TaskLifecycleError::Forbidden`] unless the caller created it and
    /// [`TaskLifecycleError::InvalidState`] once it has left the open pool.
    pub async fn delete(&self, task_id: TaskId) -> TaskLifecycleResult<()> {
        let caller = self.require_identity("delete tasks")?;
        let task = self.require_task(task_id).await?;
        task.ensure_deletable_by(caller.address())?;

        self.store.delete(&task).await?;
        self.clear_active_task(task_id);
        info!(task_id = %task_id, address = %caller.address(), "task deleted");
        Ok(())
    }

    /// Returns how many more tasks the connected identity may post today.
    ///
    /// Returns zero when no identity is connected.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Store`] when counting fails.
    pub async fn remaining_quota(&self) -> TaskLifecycleResult<u32> {
        let Some(identity) = self.identity.current_identity() else {
            return Ok(0);
        };
        let window_start = utc_day_start(self.clock.utc());
        let created_today = self
            .store
            .count_created_since(identity.address(), window_start)
            .await?;
        Ok(remaining_quota(
            self.config.daily_task_limit(),
            created_today,
        ))
    }

    /// Returns the time left before `task` is released, for held tasks.
    #[must_use]
    pub fn time_remaining(&self, task: &Task) -> Option<TimeRemaining> {
        task.time_remaining(self.config.task_timeout(), self.clock.utc())
    }

    /// Finds a task in the store.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Store`] when the lookup fails.
    pub async fn find(&self, task_id: TaskId) -> TaskLifecycleResult<Option<Task>> {
        Ok(self.store.find_by_id(task_id).await?)
    }

    /// Returns the latest snapshot published by the store.
    #[must_use]
    pub fn snapshot(&self) -> Arc<TaskSnapshot> {
        Arc::clone(&self.store.subscribe().borrow())
    }

    /// Subscribes to snapshots published by the store.
    #[must_use]
    pub fn subscribe(&self) -> TaskFeed {
        self.store.subscribe()
    }

    /// Returns whether the connected identity posted `task`.
    #[must_use]
    pub fn is_creator(&self, task: &Task) -> bool {
        self.identity
            .current_identity()
            .is_some_and(|identity| task.is_created_by(identity.address()))
    }

    /// Returns whether the connected identity holds `task`.
    #[must_use]
    pub fn is_holder(&self, task: &Task) -> bool {
        self.identity
            .current_identity()
            .is_some_and(|identity| task.is_held_by(identity.address()))
    }

    /// Returns whether `workflow` is large enough to complete a task.
    #[must_use]
    pub fn validate_workflow(&self, workflow: &Workflow) -> bool {
        workflow.validate(self.config.min_workflow_blocks()).is_ok()
    }

    /// Returns a sweeper that releases tasks held past the timeout.
    #[must_use]
    pub fn sweeper(&self) -> TimeoutSweeper<S, C> {
        TimeoutSweeper::new(
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
            self.config.task_timeout(),
        )
    }

    fn require_identity(&self, action: &'static str) -> TaskLifecycleResult<Identity> {
        self.identity
            .current_identity()
            .ok_or(TaskLifecycleError::Unauthenticated(action))
    }

    async fn require_task(&self, task_id: TaskId) -> TaskLifecycleResult<Task> {
        self.store
            .find_by_id(task_id)
            .await?
            .ok_or(TaskLifecycleError::NotFound(task_id))
    }

    fn lock_active_task(&self) -> MutexGuard<'_, Option<TaskId>> {
        self.active_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn clear_active_task(&self, task_id: TaskId) {
        let mut active = self.lock_active_task();
        if *active == Some(task_id) {
            *active = None;
        }
    }
}
