//! Driving port for karma read models.

use async_trait::async_trait;

use crate::domain::{Error, LeaderboardEntry, LeaderboardRequest, UserKarma, UserKarmaRequest};

/// Driving port for the leaderboard and per-user karma totals.
///
/// # Examples
///
/// ```rust,no_run
/// # async fn example() -> Result<(), karma_backend::domain::Error> {
/// use karma_backend::domain::LeaderboardRequest;
/// use karma_backend::domain::ports::{FixtureLeaderboardQuery, LeaderboardQuery};
///
/// let rows = FixtureLeaderboardQuery.top(LeaderboardRequest::default()).await?;
/// assert!(rows.is_empty());
/// # Ok(())
/// # }
/// ```
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LeaderboardQuery: Send + Sync {
    /// Top users by karma earned inside the trailing window ending now.
    async fn top(&self, request: LeaderboardRequest) -> Result<Vec<LeaderboardEntry>, Error>;

    /// Karma earned by one user, inside a trailing window or over all time.
    ///
    /// Unknown users yield [`crate::domain::ErrorCode::NotFound`].
    async fn user_karma(&self, request: UserKarmaRequest) -> Result<UserKarma, Error>;
}

/// Fixture query over an empty ledger.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureLeaderboardQuery;

#[async_trait]
impl LeaderboardQuery for FixtureLeaderboardQuery {
    async fn top(&self, _request: LeaderboardRequest) -> Result<Vec<LeaderboardEntry>, Error> {
        Ok(Vec::new())
    }

    async fn user_karma(&self, request: UserKarmaRequest) -> Result<UserKarma, Error> {
        Ok(UserKarma {
            user_id: request.user_id,
            total: 0,
        })
    }
}
