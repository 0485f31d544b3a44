//! Read-only port over the karma ledger.
//!
//! Every figure is an aggregate computed by the store at query time. There is
//! no cached counter to keep in sync.

use async_trait::async_trait;

use crate::domain::{KarmaWindow, LeaderboardEntry, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by karma ledger adapters.
    pub enum KarmaLedgerRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "karma ledger connection failed: {message}",
        /// Query failed during execution.
        Query { message: String } =>
            "karma ledger query failed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KarmaLedgerRepository: Send + Sync {
    /// Rank beneficiaries by the sum of entries created inside `window`.
    ///
    /// Ordering is total descending, then user id ascending. Users without
    /// entries in the window are omitted. At most `limit` rows are returned.
    async fn leaderboard(
        &self,
        window: KarmaWindow,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, KarmaLedgerRepositoryError>;

    /// Sum of entries credited to `user_id`, over `window` or all time.
    async fn total_for_user(
        &self,
        user_id: &UserId,
        window: Option<KarmaWindow>,
    ) -> Result<i64, KarmaLedgerRepositoryError>;
}

/// Fixture over an empty ledger.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureKarmaLedgerRepository;

#[async_trait]
impl KarmaLedgerRepository for FixtureKarmaLedgerRepository {
    async fn leaderboard(
        &self,
        _window: KarmaWindow,
        _limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, KarmaLedgerRepositoryError> {
        Ok(Vec::new())
    }

    async fn total_for_user(
        &self,
        _user_id: &UserId,
        _window: Option<KarmaWindow>,
    ) -> Result<i64, KarmaLedgerRepositoryError> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn fixture_ledger_is_empty() {
        let repo = FixtureKarmaLedgerRepository;
        let window = KarmaWindow::trailing(Utc::now(), Duration::hours(24));

        let rows = repo.leaderboard(window, 5).await.expect("fixture query");
        let total = repo
            .total_for_user(&UserId::random(), None)
            .await
            .expect("fixture query");

        assert!(rows.is_empty());
        assert_eq!(total, 0);
    }
}
