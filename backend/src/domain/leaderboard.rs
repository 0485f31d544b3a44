//! Leaderboard request and result types.
//!
//! Parameters are validated on construction so services and adapters only
//! ever see a positive window and a bounded limit.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{KarmaWindow, UserId};

/// Default trailing window, in hours.
pub const DEFAULT_WINDOW_HOURS: i64 = 24;
/// Longest accepted trailing window, in hours.
pub const MAX_WINDOW_HOURS: i64 = 365 * 24;
/// Default number of leaderboard rows.
pub const DEFAULT_LIMIT: usize = 5;
/// Largest accepted number of leaderboard rows.
pub const MAX_LIMIT: usize = 100;

/// Validation errors for leaderboard parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaderboardValidationError {
    WindowNotPositive,
    WindowTooLong { max_hours: i64 },
    LimitOutOfRange { min: usize, max: usize },
}

impl fmt::Display for LeaderboardValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WindowNotPositive => write!(f, "window must be positive"),
            Self::WindowTooLong { max_hours } => {
                write!(f, "window must be at most {max_hours} hours")
            }
            Self::LimitOutOfRange { min, max } => {
                write!(f, "limit must be between {min} and {max}")
            }
        }
    }
}

impl std::error::Error for LeaderboardValidationError {}

/// Trailing span the leaderboard aggregates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderboardSpan(Duration);

impl LeaderboardSpan {
    /// Validate an arbitrary span.
    pub fn new(span: Duration) -> Result<Self, LeaderboardValidationError> {
        if span <= Duration::zero() {
            return Err(LeaderboardValidationError::WindowNotPositive);
        }
        if span > Duration::hours(MAX_WINDOW_HOURS) {
            return Err(LeaderboardValidationError::WindowTooLong {
                max_hours: MAX_WINDOW_HOURS,
            });
        }
        Ok(Self(span))
    }

    /// Validate a span given in whole hours.
    pub fn from_hours(hours: i64) -> Result<Self, LeaderboardValidationError> {
        if hours <= 0 {
            return Err(LeaderboardValidationError::WindowNotPositive);
        }
        if hours > MAX_WINDOW_HOURS {
            return Err(LeaderboardValidationError::WindowTooLong {
                max_hours: MAX_WINDOW_HOURS,
            });
        }
        Self::new(Duration::hours(hours))
    }

    pub fn duration(self) -> Duration {
        self.0
    }

    /// Resolve the span against `now` into a concrete `[now - span, now)`.
    pub fn window_ending_at(self, now: DateTime<Utc>) -> KarmaWindow {
        KarmaWindow::trailing(now, self.0)
    }
}

impl Default for LeaderboardSpan {
    fn default() -> Self {
        Self(Duration::hours(DEFAULT_WINDOW_HOURS))
    }
}

/// Maximum number of leaderboard rows to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LeaderboardLimit(usize);

impl LeaderboardLimit {
    pub fn new(limit: usize) -> Result<Self, LeaderboardValidationError> {
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(LeaderboardValidationError::LimitOutOfRange {
                min: 1,
                max: MAX_LIMIT,
            });
        }
        Ok(Self(limit))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for LeaderboardLimit {
    fn default() -> Self {
        Self(DEFAULT_LIMIT)
    }
}

/// Input for [`crate::domain::ports::LeaderboardQuery::top`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LeaderboardRequest {
    pub span: LeaderboardSpan,
    pub limit: LeaderboardLimit,
}

/// Input for [`crate::domain::ports::LeaderboardQuery::user_karma`].
///
/// Without a span the total covers the whole ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserKarmaRequest {
    pub user_id: UserId,
    pub span: Option<LeaderboardSpan>,
}

/// One ranked row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    pub username: String,
    pub total: i64,
}

/// Derived karma for a single user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserKarma {
    pub user_id: UserId,
    pub total: i64,
}
