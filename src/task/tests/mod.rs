//! Unit tests for the task module.
//!
//! Tests are organised by concept: value validation, the status machine,
//! marketplace queries, the lifecycle service, the timeout sweep, the
//! background manager, and `PostgreSQL` row conversion.
