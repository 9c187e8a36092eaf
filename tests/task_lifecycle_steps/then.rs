//! Then steps for task lifecycle BDD scenarios.

use super::world::LifecycleWorld;
use rstest_bdd_macros::then;
use taskboard::task::{domain::TaskStatus, services::TaskLifecycleError};

#[then(r#"the task status is "{status}""#)]
fn task_status_is(world: &LifecycleWorld, status: String) -> Result<(), eyre::Report> {
    let expected = TaskStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let task = world.current_task()?;

    if task.status() != expected {
        return Err(eyre::eyre!(
            "expected status {}, found {}",
            expected.as_str(),
            task.status().as_str()
        ));
    }
    Ok(())
}

#[then(r#"the task was created by "{name}""#)]
fn task_created_by(world: &mut LifecycleWorld, name: String) -> Result<(), eyre::Report> {
    let creator = world.identity(&name)?;
    let task = world.current_task()?;
    eyre::ensure!(
        task.is_created_by(creator.address()),
        "task was created by {}",
        task.creator().address()
    );
    eyre::ensure!(task.creator().display_label() == creator.display_label());
    Ok(())
}

#[then("the task has no holder")]
fn task_has_no_holder(world: &LifecycleWorld) -> Result<(), eyre::Report> {
    let task = world.current_task()?;
    eyre::ensure!(task.holder().is_none(), "task is still held");
    eyre::ensure!(task.taken_at().is_none(), "task still records a take time");
    Ok(())
}

#[then(r#"the task is held by "{name}""#)]
fn task_held_by(world: &mut LifecycleWorld, name: String) -> Result<(), eyre::Report> {
    let holder = world.identity(&name)?;
    let task = world.current_task()?;
    eyre::ensure!(
        task.is_held_by(holder.address()),
        "task is not held by {name}"
    );
    Ok(())
}

#[then("the task records when it was taken")]
fn task_records_taken_at(world: &LifecycleWorld) -> Result<(), eyre::Report> {
    let task = world.current_task()?;
    eyre::ensure!(
        task.taken_at() == Some(world.clock.now()),
        "unexpected take time {:?}",
        task.taken_at()
    );
    Ok(())
}

#[then("the task records when it was completed")]
fn task_records_completed_at(world: &LifecycleWorld) -> Result<(), eyre::Report> {
    let task = world.current_task()?;
    eyre::ensure!(
        task.completed_at() == Some(world.clock.now()),
        "unexpected completion time {:?}",
        task.completed_at()
    );
    Ok(())
}

#[then(r#"the operation is forbidden with message "{message}""#)]
fn operation_forbidden(world: &LifecycleWorld, message: String) -> Result<(), eyre::Report> {
    let result = world
        .last_result
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing operation result"))?;

    match result {
        Err(err @ TaskLifecycleError::Forbidden(_)) if err.to_string() == message => Ok(()),
        other => Err(eyre::eyre!("expected Forbidden error, got {other:?}")),
    }
}

#[then("the operation fails because the daily limit of {limit:u32} was reached")]
fn operation_exceeds_quota(world: &LifecycleWorld, limit: u32) -> Result<(), eyre::Report> {
    let result = world
        .last_result
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing operation result"))?;

    match result {
        Err(TaskLifecycleError::QuotaExceeded { limit: reached }) if *reached == limit => Ok(()),
        other => Err(eyre::eyre!("expected QuotaExceeded error, got {other:?}")),
    }
}

#[then("the task was released by the timeout")]
fn task_released_by_timeout(world: &LifecycleWorld) -> Result<(), eyre::Report> {
    let task = world.current_task()?;
    eyre::ensure!(task.timeout_released(), "timeout marker not set");
    let report = world
        .last_sweep
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing sweep report"))?;
    eyre::ensure!(
        report.released().contains(&task.id()),
        "sweep did not report the release"
    );
    Ok(())
}
