//! Descriptive task fields.

use super::TaskDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of robot a task is posted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotType {
    /// Aerial drone.
    Drone,
    /// Humanoid robot.
    Humanoid,
    /// Ground delivery bot.
    Delivery,
    /// Industrial arm.
    Industrial,
}

impl RobotType {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Drone => "drone",
            Self::Humanoid => "humanoid",
            Self::Delivery => "delivery",
            Self::Industrial => "industrial",
        }
    }

    /// Returns the marketplace display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Drone => "Drone",
            Self::Humanoid => "Humanoid",
            Self::Delivery => "Delivery Bot",
            Self::Industrial => "Industrial Arm",
        }
    }
}

impl fmt::Display for RobotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for RobotType {
    type Error = TaskDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "drone" => Ok(Self::Drone),
            "humanoid" => Ok(Self::Humanoid),
            "delivery" => Ok(Self::Delivery),
            "industrial" => Ok(Self::Industrial),
            _ => Err(TaskDomainError::UnknownRobotType(value.to_owned())),
        }
    }
}

/// Descriptive fields fixed at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDetails {
    title: String,
    description: String,
    robot_type: RobotType,
    location: String,
    distance: Option<String>,
}

impl TaskDetails {
    /// Creates validated task details.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyField`] naming the first blank
    /// required field. The description may be left blank.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        robot_type: RobotType,
        location: impl Into<String>,
    ) -> Result<Self, TaskDomainError> {
        Ok(Self {
            title: required("title", title.into())?,
            description: description.into().trim().to_owned(),
            robot_type,
            location: required("location", location.into())?,
            distance: None,
        })
    }

    /// Sets the optional distance note. Blank input clears it.
    #[must_use]
    pub fn with_distance(mut self, distance: impl Into<String>) -> Self {
        let value = distance.into();
        let trimmed = value.trim();
        self.distance = (!trimmed.is_empty()).then(|| trimmed.to_owned());
        self
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the robot type.
    #[must_use]
    pub const fn robot_type(&self) -> RobotType {
        self.robot_type
    }

    /// Returns the location.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Returns the distance note, if any.
    #[must_use]
    pub fn distance(&self) -> Option<&str> {
        self.distance.as_deref()
    }

    /// Case-insensitive substring match over title, description and location.
    ///
    /// `needle` must already be lowercase.
    pub(crate) fn matches_search(&self, needle: &str) -> bool {
        [&self.title, &self.description, &self.location]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

fn required(field: &'static str, value: String) -> Result<String, TaskDomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TaskDomainError::EmptyField(field));
    }
    Ok(trimmed.to_owned())
}
