//! Point-in-time view of the task collection and marketplace queries.

use super::{RobotType, Task, TaskId, TaskStatus};
use crate::identity::WalletAddress;
use chrono::{DateTime, Utc};

/// Immutable view of every task, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskSnapshot {
    tasks: Vec<Task>,
}

impl TaskSnapshot {
    /// Builds a snapshot ordered by creation time, newest first.
    #[must_use]
    pub fn new(tasks: impl IntoIterator<Item = Task>) -> Self {
        let mut ordered: Vec<Task> = tasks.into_iter().collect();
        ordered.sort_by(|left, right| {
            right
                .created_at()
                .cmp(&left.created_at())
                .then_with(|| left.id().cmp(&right.id()))
        });
        Self { tasks: ordered }
    }

    /// Returns the tasks, newest first.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Returns the number of tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns whether the snapshot holds no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Finds a task by identifier.
    #[must_use]
    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id() == id)
    }

    /// Counts tasks posted by `address` at or after `since`.
    #[must_use]
    pub fn count_created_since(&self, address: &WalletAddress, since: DateTime<Utc>) -> usize {
        self.tasks
            .iter()
            .filter(|task| task.is_created_by(address) && task.created_at() >= since)
            .count()
    }

    /// Returns the tasks matching `filter`, newest first.
    #[must_use]
    pub fn filter(&self, filter: &TaskFilter) -> Vec<&Task> {
        let needle = filter.search_needle();
        self.tasks
            .iter()
            .filter(|task| filter.matches(task, needle.as_deref()))
            .collect()
    }

    /// Counts tasks per status; `my_active` counts in-progress tasks held by
    /// `viewer`.
    #[must_use]
    pub fn stats(&self, viewer: Option<&WalletAddress>) -> TaskStats {
        self.tasks
            .iter()
            .fold(TaskStats::default(), |mut stats, task| {
                match task.status() {
                    TaskStatus::Open => stats.open += 1,
                    TaskStatus::InProgress => {
                        stats.in_progress += 1;
                        if viewer.is_some_and(|address| task.is_held_by(address)) {
                            stats.my_active += 1;
                        }
                    }
                    TaskStatus::Completed => stats.completed += 1,
                }
                stats
            })
    }
}

/// Marketplace tab selecting which tasks are listed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TaskView {
    /// Every task.
    #[default]
    All,
    /// Open and in-progress tasks.
    Active,
    /// Completed tasks.
    Completed,
    /// Tasks created or held by the address.
    Mine(WalletAddress),
}

impl TaskView {
    fn includes(&self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Active => matches!(task.status(), TaskStatus::Open | TaskStatus::InProgress),
            Self::Completed => task.status() == TaskStatus::Completed,
            Self::Mine(address) => task.is_created_by(address) || task.is_held_by(address),
        }
    }
}

/// Combined tab, robot type, and free-text filter.
///
/// # Examples
///
/// ```
/// use taskboard::task::domain::{RobotType, TaskFilter, TaskView};
///
/// let filter = TaskFilter::new(TaskView::Active)
///     .with_robot_type(RobotType::Drone)
///     .with_search("zone a");
/// assert_eq!(filter.robot_type(), Some(RobotType::Drone));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskFilter {
    view: TaskView,
    robot_type: Option<RobotType>,
    search: Option<String>,
}

impl TaskFilter {
    /// Creates a filter for the given tab.
    #[must_use]
    pub const fn new(view: TaskView) -> Self {
        Self {
            view,
            robot_type: None,
            search: None,
        }
    }

    /// Restricts results to one robot type.
    #[must_use]
    pub const fn with_robot_type(mut self, robot_type: RobotType) -> Self {
        self.robot_type = Some(robot_type);
        self
    }

    /// Restricts results to tasks whose title, description, or location
    /// contains `search`, ignoring case. Blank input disables the search.
    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let value = search.into();
        let trimmed = value.trim();
        self.search = (!trimmed.is_empty()).then(|| trimmed.to_owned());
        self
    }

    /// Returns the selected tab.
    #[must_use]
    pub const fn view(&self) -> &TaskView {
        &self.view
    }

    /// Returns the robot type restriction, if any.
    #[must_use]
    pub const fn robot_type(&self) -> Option<RobotType> {
        self.robot_type
    }

    /// Returns the search text, if any.
    #[must_use]
    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    fn search_needle(&self) -> Option<String> {
        self.search.as_deref().map(str::to_lowercase)
    }

    fn matches(&self, task: &Task, needle: Option<&str>) -> bool {
        self.view.includes(task)
            && self
                .robot_type
                .is_none_or(|robot_type| task.details().robot_type() == robot_type)
            && needle.is_none_or(|text| task.details().matches_search(text))
    }
}

/// Task counts shown on the marketplace header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    /// Open tasks.
    pub open: usize,
    /// In-progress tasks.
    pub in_progress: usize,
    /// Completed tasks.
    pub completed: usize,
    /// In-progress tasks held by the viewer.
    pub my_active: usize,
}
