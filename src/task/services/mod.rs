//! Application services for task lifecycle orchestration.

mod lifecycle;
mod manager;
mod sweeper;

pub use lifecycle::{
    CreateTaskRequest, TaskLifecycleError, TaskLifecycleResult, TaskLifecycleService,
};
pub use manager::TaskLifecycleManager;
pub use sweeper::{SweepReport, TimeoutSweeper};
