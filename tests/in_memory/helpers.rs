//! Shared test helpers for in-memory store integration tests.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rstest::fixture;
use serde_json::json;
use taskboard::{
    clock::ManualClock,
    config::LifecycleConfig,
    identity::{Identity, WalletAddress, adapters::SessionIdentityProvider},
    task::{adapters::memory::InMemoryTaskStore, domain::Workflow, services::TaskLifecycleService},
};

/// Service wired to in-memory adapters.
pub type TestService = TaskLifecycleService<InMemoryTaskStore, SessionIdentityProvider, ManualClock>;

/// Instant every test starts at: 09:00 UTC on 1 March 2026.
///
/// # Panics
///
/// Panics if the fixed instant cannot be constructed.
#[must_use]
pub fn start_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
        .single()
        .expect("valid start instant")
}

/// Provides a fresh in-memory store for each test.
#[fixture]
pub fn store() -> Arc<InMemoryTaskStore> {
    Arc::new(InMemoryTaskStore::new())
}

/// Provides a clock pinned at [`start_instant`].
#[fixture]
pub fn clock() -> ManualClock {
    ManualClock::new(start_instant())
}

/// Builds an identity whose address starts with `name`.
///
/// # Panics
///
/// Panics if `name` contains whitespace.
#[must_use]
pub fn identity(name: &str) -> Identity {
    Identity::new(
        WalletAddress::new(format!("{name}9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL"))
            .expect("valid wallet address"),
    )
}

/// Builds a service acting as `caller` over a shared store and clock.
#[must_use]
pub fn service_for(
    store: &Arc<InMemoryTaskStore>,
    clock: &ManualClock,
    caller: &Identity,
) -> TestService {
    configured_service_for(store, clock, caller, LifecycleConfig::default())
}

/// Builds a service acting as `caller` with an explicit configuration.
#[must_use]
pub fn configured_service_for(
    store: &Arc<InMemoryTaskStore>,
    clock: &ManualClock,
    caller: &Identity,
    config: LifecycleConfig,
) -> TestService {
    TaskLifecycleService::with_config(
        Arc::clone(store),
        Arc::new(SessionIdentityProvider::connected(caller.clone())),
        Arc::new(clock.clone()),
        config,
    )
}

/// Builds a linear workflow with `blocks` nodes.
#[must_use]
pub fn workflow_with(blocks: usize) -> Workflow {
    let nodes: Vec<_> = (0..blocks)
        .map(|index| json!({ "id": index.to_string(), "type": "move" }))
        .collect();
    let edges: Vec<_> = (1..blocks)
        .map(|index| json!({ "source": (index - 1).to_string(), "target": index.to_string() }))
        .collect();
    Workflow::new(json!({ "nodes": nodes, "edges": edges }))
}
