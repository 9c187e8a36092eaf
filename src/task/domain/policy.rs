//! Quota window and holding-timeout arithmetic.

use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use std::fmt;

/// Returns 00:00 UTC of the calendar day containing `at`.
///
/// The daily creation quota counts tasks created at or after this instant.
#[must_use]
pub fn utc_day_start(at: DateTime<Utc>) -> DateTime<Utc> {
    at.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Returns how many more tasks may be created given `created_today`.
#[must_use]
pub fn remaining_quota(limit: u32, created_today: usize) -> u32 {
    let used = u32::try_from(created_today).unwrap_or(u32::MAX);
    limit.saturating_sub(used)
}

/// Time left before a held task reaches its holding timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRemaining {
    /// The hold is still within its timeout.
    Remaining(TimeDelta),
    /// The timeout has elapsed; release happens on the next sweep.
    Expired,
}

impl TimeRemaining {
    /// Computes the time left until `deadline` as seen at `now`.
    #[must_use]
    pub fn until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let remaining = deadline - now;
        if remaining <= TimeDelta::zero() {
            Self::Expired
        } else {
            Self::Remaining(remaining)
        }
    }

    /// Returns whether the timeout has elapsed.
    #[must_use]
    pub const fn is_expired(self) -> bool {
        matches!(self, Self::Expired)
    }
}

/// Formats as `"{hours}h {minutes}m"` or `"Expired"`.
impl fmt::Display for TimeRemaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remaining(remaining) => {
                let hours = remaining.num_hours();
                let minutes = remaining.num_minutes() - hours * 60;
                write!(f, "{hours}h {minutes}m")
            }
            Self::Expired => f.write_str("Expired"),
        }
    }
}
