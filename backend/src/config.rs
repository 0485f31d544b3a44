//! Feed configuration loaded via OrthoConfig.
//!
//! Values come from CLI flags, `KARMA_*` environment variables, and an
//! optional config file, in that order of precedence.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::leaderboard::{DEFAULT_LIMIT, DEFAULT_WINDOW_HOURS};
use crate::domain::{LeaderboardLimit, LeaderboardSpan, LeaderboardValidationError};

const DEFAULT_POOL_MAX_SIZE: u32 = 10;
const DEFAULT_LOCK_TIMEOUT_MS: u64 = 2_000;

/// Runtime settings for the feed backend and its operator CLI.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "KARMA")]
pub struct FeedSettings {
    /// PostgreSQL connection URL.
    pub database_url: Option<String>,
    /// Upper bound on pooled connections.
    #[ortho_config(default = DEFAULT_POOL_MAX_SIZE)]
    pub pool_max_size: u32,
    /// Longest wait for a like target's row lock, in milliseconds.
    #[ortho_config(default = DEFAULT_LOCK_TIMEOUT_MS)]
    pub lock_timeout_ms: u64,
    /// Default leaderboard window in hours.
    #[ortho_config(default = DEFAULT_WINDOW_HOURS)]
    pub leaderboard_window_hours: i64,
    /// Default number of leaderboard rows.
    #[ortho_config(default = DEFAULT_LIMIT)]
    pub leaderboard_limit: usize,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            database_url: None,
            pool_max_size: DEFAULT_POOL_MAX_SIZE,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            leaderboard_window_hours: DEFAULT_WINDOW_HOURS,
            leaderboard_limit: DEFAULT_LIMIT,
        }
    }
}

/// Raised when a required setting is absent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("missing required setting {name}")]
pub struct MissingSetting {
    pub name: &'static str,
}

impl FeedSettings {
    /// The configured database URL.
    ///
    /// # Errors
    ///
    /// Returns [`MissingSetting`] when neither `KARMA_DATABASE_URL` nor
    /// `--database-url` was provided.
    pub fn database_url(&self) -> Result<&str, MissingSetting> {
        self.database_url.as_deref().ok_or(MissingSetting {
            name: "KARMA_DATABASE_URL",
        })
    }

    pub fn pool_max_size(&self) -> u32 {
        self.pool_max_size
    }

    /// Lock wait for like toggles.
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Default leaderboard window, validated.
    pub fn leaderboard_span(&self) -> Result<LeaderboardSpan, LeaderboardValidationError> {
        LeaderboardSpan::from_hours(self.leaderboard_window_hours)
    }

    /// Default leaderboard size, validated.
    pub fn leaderboard_limit(&self) -> Result<LeaderboardLimit, LeaderboardValidationError> {
        LeaderboardLimit::new(self.leaderboard_limit)
    }
}
