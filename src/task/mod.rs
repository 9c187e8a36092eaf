//! Marketplace task lifecycle.
//!
//! Tasks are posted by one identity, taken by another, and either completed
//! with a workflow proof, cancelled by their holder, or released
//! automatically once the holding timeout elapses. Open tasks may be deleted
//! by their creator. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
