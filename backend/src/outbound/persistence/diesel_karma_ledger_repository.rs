//! PostgreSQL-backed karma ledger reads.
//!
//! Both queries aggregate `karma_transactions` at request time. The
//! `(user_id, created_at)` and `created_at` indexes keep the windowed scans
//! proportional to the rows inside the window.

use async_trait::async_trait;
use diesel::dsl::sum;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Timestamptz};
use diesel_async::RunQueryDsl;

use crate::domain::ports::{KarmaLedgerRepository, KarmaLedgerRepositoryError};
use crate::domain::{KarmaWindow, LeaderboardEntry, UserId};

use super::diesel_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::LeaderboardRow;
use super::pool::{DbPool, PoolError};
use super::schema::karma_transactions;

/// Ranked window totals. Ties on the total break by user id so the order is
/// stable between calls.
const LEADERBOARD_SQL: &str = "\
    SELECT k.user_id, u.username, SUM(k.amount)::BIGINT AS total \
    FROM karma_transactions k \
    JOIN users u ON u.id = k.user_id \
    WHERE k.created_at >= $1 AND k.created_at < $2 \
    GROUP BY k.user_id, u.username \
    ORDER BY total DESC, k.user_id ASC \
    LIMIT $3";

/// Diesel-backed implementation of the `KarmaLedgerRepository` port.
#[derive(Clone)]
pub struct DieselKarmaLedgerRepository {
    pool: DbPool,
}

impl DieselKarmaLedgerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> KarmaLedgerRepositoryError {
    map_basic_pool_error(error, KarmaLedgerRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error, operation: &str) -> KarmaLedgerRepositoryError {
    map_basic_diesel_error(
        error,
        operation,
        KarmaLedgerRepositoryError::query,
        KarmaLedgerRepositoryError::connection,
    )
}

#[async_trait]
impl KarmaLedgerRepository for DieselKarmaLedgerRepository {
    async fn leaderboard(
        &self,
        window: KarmaWindow,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, KarmaLedgerRepositoryError> {
        let limit = i64::try_from(limit)
            .map_err(|_| KarmaLedgerRepositoryError::query("leaderboard limit overflows i64"))?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<LeaderboardRow> = diesel::sql_query(LEADERBOARD_SQL)
            .bind::<Timestamptz, _>(window.start)
            .bind::<Timestamptz, _>(window.end)
            .bind::<BigInt, _>(limit)
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "load leaderboard"))?;

        Ok(rows.into_iter().map(LeaderboardEntry::from).collect())
    }

    async fn total_for_user(
        &self,
        user_id: &UserId,
        window: Option<KarmaWindow>,
    ) -> Result<i64, KarmaLedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let mut query = karma_transactions::table
            .filter(karma_transactions::user_id.eq(*user_id.as_uuid()))
            .select(sum(karma_transactions::amount))
            .into_boxed();
        if let Some(window) = window {
            query = query.filter(
                karma_transactions::created_at
                    .ge(window.start)
                    .and(karma_transactions::created_at.lt(window.end)),
            );
        }

        let total: Option<i64> = query
            .get_result(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "sum user karma"))?;
        Ok(total.unwrap_or(0))
    }
}
