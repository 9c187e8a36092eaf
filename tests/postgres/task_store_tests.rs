//! `PostgreSQL` persistence tests for the task store.

use chrono::TimeDelta;
use pg_embedded_setup_unpriv::TestCluster;
use pg_embedded_setup_unpriv::test_support::shared_test_cluster;
use rstest::rstest;
use taskboard::{
    config::LifecycleConfig,
    task::{
        adapters::postgres::PostgresTaskStore,
        domain::{Task, TaskStatus},
        ports::{TaskStore, TaskStoreError},
        services::{CreateTaskRequest, TaskLifecycleError},
    },
};
use tokio::task::JoinSet;

use super::helpers::{PgHarness, identity, test_runtime};

#[rstest]
fn task_without_description_is_stored_with_empty_text(
    shared_test_cluster: &'static TestCluster,
) -> eyre::Result<()> {
    let harness = PgHarness::new(shared_test_cluster, "test_no_description")?;
    let rt = test_runtime()?;

    rt.block_on(async {
        let poster = harness.service_for(&identity("Alice")?);
        let posted = poster
            .create(CreateTaskRequest::new("Patrol Zone A", "drone", "Zone A"))
            .await?;

        let stored = harness
            .store
            .find_by_id(posted.id())
            .await?
            .ok_or_else(|| eyre::eyre!("posted task was not stored"))?;
        eyre::ensure!(stored.details().description().is_empty());
        eyre::ensure!(stored.status() == TaskStatus::Open);
        eyre::ensure!(stored == posted, "stored row differs from the created task");
        Ok(())
    })
}

#[rstest]
fn racing_creates_never_exceed_the_daily_limit(
    shared_test_cluster: &'static TestCluster,
) -> eyre::Result<()> {
    let harness = PgHarness::new(shared_test_cluster, "test_racing_creates")?;
    let rt = test_runtime()?;
    let creator = identity("Creator")?;
    let config = LifecycleConfig::default().with_daily_task_limit(5);

    rt.block_on(async {
        let mut creates = JoinSet::new();
        for index in 0..10 {
            let service = harness.configured_service_for(&creator, config);
            creates.spawn(async move {
                service
                    .create(CreateTaskRequest::new(format!("Task {index}"), "drone", "Field"))
                    .await
            });
        }

        let mut created = 0_usize;
        let mut rejected = 0_usize;
        while let Some(joined) = creates.join_next().await {
            match joined? {
                Ok(_) => created += 1,
                Err(TaskLifecycleError::QuotaExceeded { limit: 5 }) => rejected += 1,
                Err(other) => eyre::bail!("unexpected create failure: {other}"),
            }
        }

        eyre::ensure!(created == 5, "expected 5 creates, got {created}");
        eyre::ensure!(rejected == 5, "expected 5 rejections, got {rejected}");
        let observer = harness.configured_service_for(&creator, config);
        eyre::ensure!(observer.remaining_quota().await? == 0);
        Ok(())
    })?;

    let rows = harness.database.count_rows()?;
    eyre::ensure!(rows == 5, "expected 5 stored rows, found {rows}");
    Ok(())
}

#[rstest]
fn quota_is_counted_per_creator(shared_test_cluster: &'static TestCluster) -> eyre::Result<()> {
    let harness = PgHarness::new(shared_test_cluster, "test_quota_per_creator")?;
    let rt = test_runtime()?;
    let config = LifecycleConfig::default().with_daily_task_limit(1);

    rt.block_on(async {
        let alice = harness.configured_service_for(&identity("Alice")?, config);
        let bob = harness.configured_service_for(&identity("Bob")?, config);

        alice
            .create(CreateTaskRequest::new("Scan shelf", "warehouse", "Aisle 3"))
            .await?;
        bob.create(CreateTaskRequest::new("Scan shelf", "warehouse", "Aisle 4"))
            .await?;
        let refused = alice
            .create(CreateTaskRequest::new("Scan shelf", "warehouse", "Aisle 5"))
            .await;
        eyre::ensure!(
            matches!(refused, Err(TaskLifecycleError::QuotaExceeded { limit: 1 })),
            "expected quota refusal, got {refused:?}"
        );

        harness.clock.advance(TimeDelta::days(1));
        alice
            .create(CreateTaskRequest::new("Scan shelf", "warehouse", "Aisle 5"))
            .await?;
        Ok(())
    })
}

#[rstest]
fn only_one_of_many_racing_takers_wins(
    shared_test_cluster: &'static TestCluster,
) -> eyre::Result<()> {
    let harness = PgHarness::new(shared_test_cluster, "test_racing_takers")?;
    let rt = test_runtime()?;

    rt.block_on(async {
        let poster = harness.service_for(&identity("Poster")?);
        let posted = poster
            .create(CreateTaskRequest::new("Contested task", "delivery", "Dock 2"))
            .await?;

        let mut takers = JoinSet::new();
        for index in 0..8 {
            let taker = harness.service_for(&identity(&format!("Taker{index}"))?);
            let task_id = posted.id();
            takers.spawn(async move { taker.take(task_id).await });
        }

        let mut winners = Vec::new();
        while let Some(joined) = takers.join_next().await {
            match joined? {
                Ok(task) => winners.push(task),
                Err(TaskLifecycleError::Conflict(_) | TaskLifecycleError::InvalidState(_)) => {}
                Err(other) => eyre::bail!("unexpected take failure: {other}"),
            }
        }

        eyre::ensure!(winners.len() == 1, "expected one winner, got {}", winners.len());
        let stored = poster
            .find(posted.id())
            .await?
            .ok_or_else(|| eyre::eyre!("contested task disappeared"))?;
        let winner = winners
            .first()
            .and_then(Task::holder)
            .ok_or_else(|| eyre::eyre!("winner has no holder"))?;
        eyre::ensure!(stored.status() == TaskStatus::InProgress);
        eyre::ensure!(stored.is_held_by(winner.address()));
        Ok(())
    })
}

#[rstest]
fn stale_update_is_rejected_as_conflict(
    shared_test_cluster: &'static TestCluster,
) -> eyre::Result<()> {
    let harness = PgHarness::new(shared_test_cluster, "test_stale_update")?;
    let rt = test_runtime()?;

    rt.block_on(async {
        let poster = harness.service_for(&identity("Alice")?);
        let posted = poster
            .create(CreateTaskRequest::new("Deliver parts", "delivery", "Bay 1"))
            .await?;

        let mut first = posted.clone();
        first.take(&identity("Bob")?, &harness.clock)?;
        let updated = harness.store.update(&first).await?;
        eyre::ensure!(updated.revision() == posted.revision() + 1);

        let mut stale = posted.clone();
        stale.take(&identity("Carol")?, &harness.clock)?;
        let result = harness.store.update(&stale).await;
        eyre::ensure!(
            matches!(
                result,
                Err(TaskStoreError::Conflict { task_id, expected })
                    if task_id == posted.id() && expected == posted.revision()
            ),
            "expected conflict, got {result:?}"
        );
        Ok(())
    })
}

#[rstest]
fn deleting_a_missing_task_reports_not_found(
    shared_test_cluster: &'static TestCluster,
) -> eyre::Result<()> {
    let harness = PgHarness::new(shared_test_cluster, "test_delete_missing")?;
    let rt = test_runtime()?;

    rt.block_on(async {
        let poster = harness.service_for(&identity("Alice")?);
        let posted = poster
            .create(CreateTaskRequest::new("Deliver parts", "delivery", "Bay 1"))
            .await?;
        harness.store.delete(&posted).await?;

        let result = harness.store.delete(&posted).await;
        eyre::ensure!(
            matches!(result, Err(TaskStoreError::NotFound(id)) if id == posted.id()),
            "expected not found, got {result:?}"
        );
        eyre::ensure!(harness.store.find_by_id(posted.id()).await?.is_none());
        Ok(())
    })
}

#[rstest]
fn writes_and_refresh_publish_snapshots(
    shared_test_cluster: &'static TestCluster,
) -> eyre::Result<()> {
    let harness = PgHarness::new(shared_test_cluster, "test_snapshot_feed")?;
    let rt = test_runtime()?;

    rt.block_on(async {
        let feed = harness.store.subscribe();
        eyre::ensure!(feed.borrow().is_empty());

        let poster = harness.service_for(&identity("Alice")?);
        let posted = poster
            .create(CreateTaskRequest::new("Patrol Zone B", "drone", "Zone B"))
            .await?;
        eyre::ensure!(feed.borrow().get(posted.id()).is_some());

        let other = PostgresTaskStore::new(harness.database.pool(1)?);
        eyre::ensure!(other.subscribe().borrow().is_empty());
        other.refresh().await?;
        eyre::ensure!(other.subscribe().borrow().len() == 1);
        Ok(())
    })
}
