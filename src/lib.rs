//! Taskboard: lifecycle core for a robot-task marketplace.
//!
//! Tasks are posted by wallet identities, taken by a single holder, and
//! completed by attaching a workflow proof. A daily creation quota limits
//! how many tasks an identity may post, and a background sweep returns tasks
//! that have been held too long to the open pool.
//!
//! # Architecture
//!
//! Taskboard follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, sessions)
//!
//! # Modules
//!
//! - [`task`]: Task records, lifecycle guards, timeout sweep, and queries
//! - [`identity`]: Caller identity as supplied by a wallet session
//! - [`config`]: Tunable lifecycle policy values
//! - [`clock`]: Manually advanced clock for deterministic time handling

pub mod clock;
pub mod config;
pub mod identity;
pub mod task;
