//! `PostgreSQL` adapters for task lifecycle persistence.

pub(crate) mod conversion;
pub(crate) mod models;
mod schema;
mod store;

pub use store::{PostgresTaskStore, TaskPgPool};
