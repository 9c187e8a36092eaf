//! Shared world state for task lifecycle BDD scenarios.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use rstest::fixture;
use taskboard::{
    clock::ManualClock,
    identity::{Identity, WalletAddress, adapters::SessionIdentityProvider},
    task::{
        adapters::memory::InMemoryTaskStore,
        domain::Task,
        services::{SweepReport, TaskLifecycleError, TaskLifecycleService},
    },
};

/// Service type used by the BDD world.
pub type TestTaskService =
    TaskLifecycleService<InMemoryTaskStore, SessionIdentityProvider, ManualClock>;

/// Scenario world for task lifecycle behaviour tests.
pub struct LifecycleWorld {
    pub service: TestTaskService,
    pub session: SessionIdentityProvider,
    pub clock: ManualClock,
    pub identities: HashMap<String, Identity>,
    pub last_task: Option<Task>,
    pub last_result: Option<Result<Task, TaskLifecycleError>>,
    pub last_sweep: Option<SweepReport>,
}

impl LifecycleWorld {
    /// Creates a world at 09:00 UTC with nobody connected.
    ///
    /// # Panics
    ///
    /// Panics if the fixed start instant cannot be constructed.
    #[must_use]
    pub fn new() -> Self {
        let session = SessionIdentityProvider::new();
        let clock = ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
                .single()
                .expect("valid start instant"),
        );
        let service = TaskLifecycleService::new(
            Arc::new(InMemoryTaskStore::new()),
            Arc::new(session.clone()),
            Arc::new(clock.clone()),
        );

        Self {
            service,
            session,
            clock,
            identities: HashMap::new(),
            last_task: None,
            last_result: None,
            last_sweep: None,
        }
    }

    /// Connects the wallet known by `name` in the scenario text.
    ///
    /// # Errors
    ///
    /// Returns an error if the derived wallet address is invalid.
    pub fn connect(&mut self, name: &str) -> Result<Identity, eyre::Report> {
        let identity = self.identity(name)?;
        self.session.connect(identity.clone());
        Ok(identity)
    }

    /// Returns the identity for `name`, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the derived wallet address is invalid.
    pub fn identity(&mut self, name: &str) -> Result<Identity, eyre::Report> {
        if let Some(known) = self.identities.get(name) {
            return Ok(known.clone());
        }
        let address = WalletAddress::new(format!("Wallet{name}7xKXtg2CW87d97TX"))?;
        let identity = Identity::new(address);
        self.identities.insert(name.to_owned(), identity.clone());
        Ok(identity)
    }

    /// Returns the task the scenario is about.
    ///
    /// # Errors
    ///
    /// Returns an error if no task has been posted yet.
    pub fn current_task(&self) -> Result<&Task, eyre::Report> {
        self.last_task
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing task in scenario world"))
    }

    /// Records the outcome of a lifecycle call.
    pub fn record(&mut self, result: Result<Task, TaskLifecycleError>) {
        if let Ok(ref task) = result {
            self.last_task = Some(task.clone());
        }
        self.last_result = Some(result);
    }
}

impl Default for LifecycleWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> LifecycleWorld {
    LifecycleWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
