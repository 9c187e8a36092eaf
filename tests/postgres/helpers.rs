//! Shared helpers for `PostgreSQL` task store integration tests.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use pg_embedded_setup_unpriv::TestCluster;
use serde_json::json;
use taskboard::{
    clock::ManualClock,
    config::LifecycleConfig,
    identity::{Identity, WalletAddress, adapters::SessionIdentityProvider},
    task::{
        adapters::postgres::{PostgresTaskStore, TaskPgPool},
        domain::Workflow,
        services::TaskLifecycleService,
    },
};
use tokio::runtime::Runtime;

/// SQL creating the `tasks` table.
pub const CREATE_TASKS_SQL: &str =
    include_str!("../../migrations/2026-10-17-000000_create_tasks/up.sql");

/// Template database holding the migrated schema.
pub const TEMPLATE_DB: &str = "taskboard_test_template";

/// Service wired to the `PostgreSQL` store.
pub type PgService = TaskLifecycleService<PostgresTaskStore, SessionIdentityProvider, ManualClock>;

/// Builds a multi-threaded runtime for driving async store calls.
///
/// # Errors
///
/// Returns an error if the runtime cannot be created.
pub fn test_runtime() -> eyre::Result<Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()?)
}

/// Ensures the template database exists with the schema applied.
///
/// # Errors
///
/// Returns an error if template creation or migration fails.
pub fn ensure_template(cluster: &TestCluster) -> eyre::Result<()> {
    cluster
        .ensure_template_exists(TEMPLATE_DB, |db_name| {
            let url = cluster.connection().database_url(db_name);
            apply_migrations(&url)?;
            Ok(())
        })
        .map_err(|err| eyre::eyre!("template setup failed: {err}"))
}

fn apply_migrations(url: &str) -> eyre::Result<()> {
    let mut conn = PgConnection::establish(url).map_err(|err| eyre::eyre!("{err}"))?;
    conn.batch_execute(CREATE_TASKS_SQL)
        .map_err(|err| eyre::eyre!("migration failed: {err}"))?;
    Ok(())
}

/// Database cloned from the template, dropped with the guard.
pub struct TestDatabase {
    cluster: &'static TestCluster,
    name: String,
}

impl TestDatabase {
    /// Creates a uniquely named database from the migrated template.
    ///
    /// # Errors
    ///
    /// Returns an error if the template or the database cannot be created.
    pub fn create(cluster: &'static TestCluster, prefix: &str) -> eyre::Result<Self> {
        ensure_template(cluster)?;
        let name = format!("{prefix}_{}", uuid::Uuid::new_v4().simple());
        cluster
            .create_database_from_template(name.as_str(), TEMPLATE_DB)
            .map_err(|err| eyre::eyre!("create database {name}: {err}"))?;
        Ok(Self { cluster, name })
    }

    /// Returns the connection URL for this database.
    #[must_use]
    pub fn url(&self) -> String {
        self.cluster.connection().database_url(&self.name)
    }

    /// Opens a pool of up to `max_size` connections.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be built.
    pub fn pool(&self, max_size: u32) -> eyre::Result<TaskPgPool> {
        let manager = ConnectionManager::<PgConnection>::new(self.url());
        Ok(Pool::builder().max_size(max_size).build(manager)?)
    }

    /// Counts stored rows, bypassing the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count_rows(&self) -> eyre::Result<i64> {
        #[derive(diesel::QueryableByName)]
        struct CountRow {
            #[diesel(sql_type = diesel::sql_types::BigInt)]
            total: i64,
        }

        let mut conn = PgConnection::establish(&self.url())?;
        let row = diesel::sql_query("SELECT count(*) AS total FROM tasks")
            .get_result::<CountRow>(&mut conn)?;
        Ok(row.total)
    }
}

impl Drop for TestDatabase {
    fn drop(&mut self) {
        drop(self.cluster.drop_database(self.name.as_str()));
    }
}

/// Store, clock and database shared by the services of one test.
pub struct PgHarness {
    pub store: Arc<PostgresTaskStore>,
    pub clock: ManualClock,
    pub database: TestDatabase,
}

impl PgHarness {
    /// Opens a store over a fresh database with the clock at [`start_instant`].
    ///
    /// # Errors
    ///
    /// Returns an error if the database or pool cannot be created.
    pub fn new(cluster: &'static TestCluster, prefix: &str) -> eyre::Result<Self> {
        let database = TestDatabase::create(cluster, prefix)?;
        let store = Arc::new(PostgresTaskStore::new(database.pool(8)?));
        Ok(Self {
            store,
            clock: ManualClock::new(start_instant()?),
            database,
        })
    }

    /// Builds a service acting as `caller` with the default configuration.
    #[must_use]
    pub fn service_for(&self, caller: &Identity) -> PgService {
        self.configured_service_for(caller, LifecycleConfig::default())
    }

    /// Builds a service acting as `caller` with an explicit configuration.
    #[must_use]
    pub fn configured_service_for(&self, caller: &Identity, config: LifecycleConfig) -> PgService {
        TaskLifecycleService::with_config(
            Arc::clone(&self.store),
            Arc::new(SessionIdentityProvider::connected(caller.clone())),
            Arc::new(self.clock.clone()),
            config,
        )
    }
}

/// Instant every test starts at: 09:00 UTC on 1 March 2026.
///
/// # Errors
///
/// Returns an error if the instant cannot be constructed.
pub fn start_instant() -> eyre::Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
        .single()
        .ok_or_else(|| eyre::eyre!("invalid start instant"))
}

/// Builds an identity whose address starts with `name`.
///
/// # Errors
///
/// Returns an error if `name` contains whitespace.
pub fn identity(name: &str) -> eyre::Result<Identity> {
    Ok(Identity::new(WalletAddress::new(format!(
        "{name}9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL"
    ))?))
}

/// Builds a linear workflow with `blocks` nodes.
#[must_use]
pub fn workflow_with(blocks: usize) -> Workflow {
    let nodes: Vec<_> = (0..blocks)
        .map(|index| json!({ "id": index.to_string(), "type": "move" }))
        .collect();
    Workflow::new(json!({ "nodes": nodes, "edges": [] }))
}
