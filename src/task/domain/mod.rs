//! Domain model for task lifecycle management.
//!
//! The task domain models posting, taking, completing, cancelling and
//! timing out marketplace tasks, while keeping all infrastructure concerns
//! outside of the domain boundary.

mod details;
mod error;
mod ids;
mod policy;
mod snapshot;
mod task;
mod workflow;

pub use details::{RobotType, TaskDetails};
pub use error::{ParseTaskStatusError, TaskDomainError};
pub use ids::TaskId;
pub use policy::{TimeRemaining, remaining_quota, utc_day_start};
pub use snapshot::{TaskFilter, TaskSnapshot, TaskStats, TaskView};
pub use task::{PersistedTaskData, Task, TaskCreator, TaskHolder, TaskStatus};
pub use workflow::Workflow;
