//! Background runtime for a lifecycle service: snapshot relay and periodic
//! timeout sweeps.

use super::{TaskLifecycleService, TimeoutSweeper};
use crate::identity::IdentityProvider;
use crate::task::{
    domain::TaskSnapshot,
    ports::{TaskFeed, TaskStore},
};
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Owns the published task snapshot and the timeout sweep timer.
///
/// Consumers read snapshots through [`Self::subscribe`]. A sweep runs once
/// when the first non-empty snapshot arrives and then on every sweep
/// interval. Background tasks stop on [`Self::shutdown`] or when the manager
/// is dropped.
#[derive(Debug)]
pub struct TaskLifecycleManager {
    feed: watch::Receiver<Arc<TaskSnapshot>>,
    cancel: CancellationToken,
    workers: Vec<JoinHandle<()>>,
}

impl TaskLifecycleManager {
    /// Starts the relay and sweep tasks for `service`.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn start<S, I, C>(service: &TaskLifecycleService<S, I, C>) -> Self
    where
        S: TaskStore + 'static,
        I: IdentityProvider,
        C: Clock + Send + Sync + 'static,
    {
        let source = service.subscribe();
        let initial = Arc::clone(&source.borrow());
        let (publisher, feed) = watch::channel(initial);
        let cancel = CancellationToken::new();
        let sweeper = service.sweeper();
        let interval = service.config().sweep_interval();

        let relay = tokio::spawn(relay_snapshots(
            source,
            publisher,
            sweeper.clone(),
            cancel.clone(),
        ));
        let periodic = tokio::spawn(sweep_periodically(sweeper, interval, cancel.clone()));

        Self {
            feed,
            cancel,
            workers: vec![relay, periodic],
        }
    }

    /// Returns a read-only view of published snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<TaskSnapshot>> {
        self.feed.clone()
    }

    /// Returns the most recently published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<TaskSnapshot> {
        Arc::clone(&self.feed.borrow())
    }

    /// Stops the background tasks and waits for them to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        for worker in std::mem::take(&mut self.workers) {
            if let Err(err) = worker.await {
                warn!(error = %err, "lifecycle worker ended abnormally");
            }
        }
    }
}

impl Drop for TaskLifecycleManager {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn relay_snapshots<S, C>(
    mut source: TaskFeed,
    publisher: watch::Sender<Arc<TaskSnapshot>>,
    sweeper: TimeoutSweeper<S, C>,
    cancel: CancellationToken,
) where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    let mut swept_on_load = false;
    loop {
        let snapshot = Arc::clone(&source.borrow_and_update());
        let first_load = !swept_on_load && !snapshot.is_empty();
        publisher.send_replace(snapshot);
        if first_load {
            swept_on_load = true;
            run_sweep(&sweeper).await;
        }

        tokio::select! {
            () = cancel.cancelled() => break,
            changed = source.changed() => {
                if changed.is_err() {
                    debug!("task store feed closed");
                    break;
                }
            }
        }
    }
}

async fn sweep_periodically<S, C>(
    sweeper: TimeoutSweeper<S, C>,
    period: Duration,
    cancel: CancellationToken,
) where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately; the load sweep already covers it.
    ticker.tick().await;

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => run_sweep(&sweeper).await,
        }
    }
}

async fn run_sweep<S, C>(sweeper: &TimeoutSweeper<S, C>)
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    if let Err(err) = sweeper.sweep().await {
        warn!(error = %err, "timeout sweep failed");
    }
}
