//! Step definitions for task lifecycle behaviour tests.

pub mod world;

mod then;
