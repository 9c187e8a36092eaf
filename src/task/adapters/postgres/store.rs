//! `PostgreSQL` task store implementation.

use super::{
    conversion::{revision_to_column, row_to_task, to_changeset, to_new_row},
    models::TaskRow,
    schema::tasks,
};
use crate::identity::WalletAddress;
use crate::task::{
    domain::{Task, TaskId, TaskSnapshot},
    ports::{TaskFeed, TaskStore, TaskStoreError, TaskStoreResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::Text;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

/// `PostgreSQL` connection pool type used by task adapters.
pub type TaskPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed task store.
///
/// Snapshots are published after each write made through this store and on
/// [`PostgresTaskStore::refresh`]. Writes made by other processes become
/// visible on the next refresh.
#[derive(Debug, Clone)]
pub struct PostgresTaskStore {
    pool: TaskPgPool,
    feed: Arc<watch::Sender<Arc<TaskSnapshot>>>,
}

/// Failure inside the quota transaction.
#[derive(Debug)]
enum QuotaTransactionError {
    Store(TaskStoreError),
    Database(DieselError),
}

impl From<DieselError> for QuotaTransactionError {
    fn from(err: DieselError) -> Self {
        Self::Database(err)
    }
}

impl PostgresTaskStore {
    /// Creates a new store from a `PostgreSQL` connection pool.
    #[must_use]
    pub fn new(pool: TaskPgPool) -> Self {
        let (feed, _) = watch::channel(Arc::new(TaskSnapshot::default()));
        Self {
            pool,
            feed: Arc::new(feed),
        }
    }

    /// Reloads every task and publishes the result to subscribers.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::Persistence`] when the query fails.
    pub async fn refresh(&self) -> TaskStoreResult<()> {
        let all = self.list_all().await?;
        self.feed.send_replace(Arc::new(TaskSnapshot::new(all)));
        Ok(())
    }

    async fn publish_after_write(&self) {
        if let Err(err) = self.refresh().await {
            warn!(error = %err, "failed to publish task snapshot after write");
        }
    }

    async fn run_blocking<F, T>(&self, f: F) -> TaskStoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> TaskStoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(TaskStoreError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(TaskStoreError::persistence)?
    }
}

#[async_trait]
impl TaskStore for PostgresTaskStore {
    async fn insert_within_quota(
        &self,
        task: &Task,
        window_start: DateTime<Utc>,
        limit: u32,
    ) -> TaskStoreResult<Task> {
        let task_id = task.id();
        let creator_wallet = task.creator().address().as_str().to_owned();
        let stored = task.clone().with_revision(0);
        let new_row = to_new_row(&stored)?;

        self.run_blocking(move |connection| {
            connection
                .transaction::<_, QuotaTransactionError, _>(|tx| {
                    lock_creator_window(tx, &creator_wallet)?;
                    let used: i64 = tasks::table
                        .filter(tasks::created_by_wallet.eq(&creator_wallet))
                        .filter(tasks::created_at.ge(window_start))
                        .count()
                        .get_result(tx)?;
                    if used >= i64::from(limit) {
                        return Err(QuotaTransactionError::Store(
                            TaskStoreError::QuotaExhausted { limit },
                        ));
                    }
                    diesel::insert_into(tasks::table)
                        .values(&new_row)
                        .execute(tx)?;
                    Ok(())
                })
                .map_err(|err| match err {
                    QuotaTransactionError::Store(store_err) => store_err,
                    QuotaTransactionError::Database(DieselError::DatabaseError(
                        DatabaseErrorKind::UniqueViolation,
                        _,
                    )) => TaskStoreError::DuplicateTask(task_id),
                    QuotaTransactionError::Database(db_err) => {
                        TaskStoreError::persistence(db_err)
                    }
                })
        })
        .await?;

        self.publish_after_write().await;
        Ok(stored)
    }

    async fn update(&self, task: &Task) -> TaskStoreResult<Task> {
        let task_id = task.id();
        let expected = task.revision();
        let next_revision = expected.saturating_add(1);
        let expected_column = revision_to_column(expected)?;
        let changeset = to_changeset(task, next_revision)?;

        self.run_blocking(move |connection| {
            let affected = diesel::update(
                tasks::table
                    .filter(tasks::id.eq(task_id.into_inner()))
                    .filter(tasks::revision.eq(expected_column)),
            )
            .set(&changeset)
            .execute(connection)
            .map_err(TaskStoreError::persistence)?;
            if affected == 0 {
                return Err(missing_or_conflict(connection, task_id, expected));
            }
            Ok(())
        })
        .await?;

        self.publish_after_write().await;
        Ok(task.clone().with_revision(next_revision))
    }

    async fn delete(&self, task: &Task) -> TaskStoreResult<()> {
        let task_id = task.id();
        let expected = task.revision();
        let expected_column = revision_to_column(expected)?;

        self.run_blocking(move |connection| {
            let affected = diesel::delete(
                tasks::table
                    .filter(tasks::id.eq(task_id.into_inner()))
                    .filter(tasks::revision.eq(expected_column)),
            )
            .execute(connection)
            .map_err(TaskStoreError::persistence)?;
            if affected == 0 {
                return Err(missing_or_conflict(connection, task_id, expected));
            }
            Ok(())
        })
        .await?;

        self.publish_after_write().await;
        Ok(())
    }

    async fn find_by_id(&self, id: TaskId) -> TaskStoreResult<Option<Task>> {
        self.run_blocking(move |connection| {
            let row = tasks::table
                .filter(tasks::id.eq(id.into_inner()))
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()
                .map_err(TaskStoreError::persistence)?;
            row.map(row_to_task).transpose()
        })
        .await
    }

    async fn list_all(&self) -> TaskStoreResult<Vec<Task>> {
        self.run_blocking(|connection| {
            let rows = tasks::table
                .order((tasks::created_at.desc(), tasks::id.asc()))
                .select(TaskRow::as_select())
                .load::<TaskRow>(connection)
                .map_err(TaskStoreError::persistence)?;
            rows.into_iter().map(row_to_task).collect()
        })
        .await
    }

    async fn count_created_since(
        &self,
        address: &WalletAddress,
        since: DateTime<Utc>,
    ) -> TaskStoreResult<usize> {
        let wallet = address.as_str().to_owned();
        let count: i64 = self
            .run_blocking(move |connection| {
                tasks::table
                    .filter(tasks::created_by_wallet.eq(wallet))
                    .filter(tasks::created_at.ge(since))
                    .count()
                    .get_result(connection)
                    .map_err(TaskStoreError::persistence)
            })
            .await?;
        usize::try_from(count).map_err(TaskStoreError::persistence)
    }

    fn subscribe(&self) -> TaskFeed {
        self.feed.subscribe()
    }
}

/// Serializes quota inserts for one creator until the transaction ends.
///
/// Each statement in a read-committed transaction sees rows committed
/// before it started, so the count taken after this lock includes every
/// insert made by the previous holder.
fn lock_creator_window(connection: &mut PgConnection, wallet: &str) -> QueryResult<()> {
    diesel::sql_query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind::<Text, _>(wallet)
        .execute(connection)?;
    Ok(())
}

/// Explains a conditional write that touched no rows.
fn missing_or_conflict(
    connection: &mut PgConnection,
    task_id: TaskId,
    expected: u64,
) -> TaskStoreError {
    let exists = diesel::select(diesel::dsl::exists(
        tasks::table.filter(tasks::id.eq(task_id.into_inner())),
    ))
    .get_result::<bool>(connection);
    match exists {
        Ok(true) => TaskStoreError::Conflict { task_id, expected },
        Ok(false) => TaskStoreError::NotFound(task_id),
        Err(err) => TaskStoreError::persistence(err),
    }
}
