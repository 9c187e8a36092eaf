//! In-memory task store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::watch;

use crate::identity::WalletAddress;
use crate::task::{
    domain::{Task, TaskId, TaskSnapshot},
    ports::{TaskFeed, TaskStore, TaskStoreError, TaskStoreResult},
};

/// Thread-safe in-memory task store.
///
/// Every successful write publishes a fresh [`TaskSnapshot`] to subscribers.
/// Clones share the same collection and feed.
#[derive(Debug, Clone)]
pub struct InMemoryTaskStore {
    tasks: Arc<RwLock<HashMap<TaskId, Task>>>,
    feed: Arc<watch::Sender<Arc<TaskSnapshot>>>,
}

impl InMemoryTaskStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        let (feed, _) = watch::channel(Arc::new(TaskSnapshot::default()));
        Self {
            tasks: Arc::new(RwLock::new(HashMap::new())),
            feed: Arc::new(feed),
        }
    }

    fn read(&self) -> TaskStoreResult<RwLockReadGuard<'_, HashMap<TaskId, Task>>> {
        self.tasks.read().map_err(|err| {
            TaskStoreError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write(&self) -> TaskStoreResult<RwLockWriteGuard<'_, HashMap<TaskId, Task>>> {
        self.tasks.write().map_err(|err| {
            TaskStoreError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn publish(&self, tasks: &HashMap<TaskId, Task>) {
        let snapshot = TaskSnapshot::new(tasks.values().cloned());
        self.feed.send_replace(Arc::new(snapshot));
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks that the stored copy of `task` still has the revision it was read at.
fn ensure_current(tasks: &HashMap<TaskId, Task>, task: &Task) -> TaskStoreResult<()> {
    let stored = tasks
        .get(&task.id())
        .ok_or(TaskStoreError::NotFound(task.id()))?;
    if stored.revision() != task.revision() {
        return Err(TaskStoreError::Conflict {
            task_id: task.id(),
            expected: task.revision(),
        });
    }
    Ok(())
}

fn created_since(
    tasks: &HashMap<TaskId, Task>,
    address: &WalletAddress,
    since: DateTime<Utc>,
) -> usize {
    tasks
        .values()
        .filter(|task| task.is_created_by(address) && task.created_at() >= since)
        .count()
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert_within_quota(
        &self,
        task: &Task,
        window_start: DateTime<Utc>,
        limit: u32,
    ) -> TaskStoreResult<Task> {
        let mut tasks = self.write()?;
        if tasks.contains_key(&task.id()) {
            return Err(TaskStoreError::DuplicateTask(task.id()));
        }

        let used = created_since(&tasks, task.creator().address(), window_start);
        if u32::try_from(used).unwrap_or(u32::MAX) >= limit {
            return Err(TaskStoreError::QuotaExhausted { limit });
        }

        let stored = task.clone().with_revision(0);
        tasks.insert(stored.id(), stored.clone());
        self.publish(&tasks);
        Ok(stored)
    }

    async fn update(&self, task: &Task) -> TaskStoreResult<Task> {
        let mut tasks = self.write()?;
        ensure_current(&tasks, task)?;

        let stored = task
            .clone()
            .with_revision(task.revision().saturating_add(1));
        tasks.insert(stored.id(), stored.clone());
        self.publish(&tasks);
        Ok(stored)
    }

    async fn delete(&self, task: &Task) -> TaskStoreResult<()> {
        let mut tasks = self.write()?;
        ensure_current(&tasks, task)?;

        tasks.remove(&task.id());
        self.publish(&tasks);
        Ok(())
    }

    async fn find_by_id(&self, id: TaskId) -> TaskStoreResult<Option<Task>> {
        let tasks = self.read()?;
        Ok(tasks.get(&id).cloned())
    }

    async fn list_all(&self) -> TaskStoreResult<Vec<Task>> {
        let tasks = self.read()?;
        let snapshot = TaskSnapshot::new(tasks.values().cloned());
        Ok(snapshot.tasks().to_vec())
    }

    async fn count_created_since(
        &self,
        address: &WalletAddress,
        since: DateTime<Utc>,
    ) -> TaskStoreResult<usize> {
        let tasks = self.read()?;
        Ok(created_since(&tasks, address, since))
    }

    fn subscribe(&self) -> TaskFeed {
        self.feed.subscribe()
    }
}
