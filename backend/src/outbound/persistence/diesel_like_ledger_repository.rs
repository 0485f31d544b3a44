//! PostgreSQL-backed like ledger using explicit Diesel transactions.
//!
//! `diesel-async`'s closure-based `transaction` helper cannot hand the open
//! transaction back to the domain service, so this adapter drives
//! [`AnsiTransactionManager`] by hand on an owned pooled connection:
//!
//! - `begin` checks a connection out, opens a transaction, and bounds lock
//!   waits with `SET LOCAL lock_timeout`;
//! - `lock_target` issues `SELECT ... FOR UPDATE` on the post or comment row;
//! - `commit` and `rollback` end the transaction.
//!
//! A transaction dropped while still open returns its connection to bb8 in
//! a transaction, which bb8 treats as broken and closes. PostgreSQL then
//! aborts the transaction, so cancellation never leaves partial writes.

use std::time::Duration;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::pooled_connection::bb8::PooledConnection;
use diesel_async::{AnsiTransactionManager, AsyncPgConnection, RunQueryDsl, TransactionManager};
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{
    LikeLedgerRepository, LikeLedgerRepositoryError, LikeLedgerTransaction,
};
use crate::domain::{
    KarmaTransaction, Like, LikeId, LikeTarget, NewKarmaTransaction, NewLike, UserId,
};

use super::diesel_error_mapping::{DieselFailure, classify_diesel_error, pool_error_message};
use super::models::{KarmaTransactionRow, LikeRow, NewKarmaTransactionRow, NewLikeRow};
use super::pool::{DbPool, PoolError};
use super::schema::{comments, karma_transactions, likes, posts};

/// Lock wait applied when no explicit timeout is configured.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

type OwnedConnection = PooledConnection<'static, AsyncPgConnection>;

/// Diesel-backed implementation of the `LikeLedgerRepository` port.
#[derive(Clone)]
pub struct DieselLikeLedgerRepository {
    pool: DbPool,
    lock_timeout: Duration,
}

impl DieselLikeLedgerRepository {
    /// Create a repository whose transactions wait at most `lock_timeout` for
    /// a target row lock.
    pub fn new(pool: DbPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }
}

fn lock_timeout_statement(timeout: Duration) -> String {
    // PostgreSQL treats 0 as "wait forever"; keep at least one millisecond.
    let millis = timeout.as_millis().max(1);
    format!("SET LOCAL lock_timeout = '{millis}ms'")
}

fn map_pool_error(error: PoolError) -> LikeLedgerRepositoryError {
    LikeLedgerRepositoryError::connection(pool_error_message(error))
}

fn map_diesel_error(error: diesel::result::Error, operation: &str) -> LikeLedgerRepositoryError {
    let message = format!("{operation}: {error}");
    match classify_diesel_error(&error, operation) {
        DieselFailure::Connection => LikeLedgerRepositoryError::connection(message),
        DieselFailure::UniqueViolation => LikeLedgerRepositoryError::duplicate_like(message),
        DieselFailure::LockTimeout => LikeLedgerRepositoryError::lock_timeout(message),
        DieselFailure::Aborted => LikeLedgerRepositoryError::aborted(message),
        DieselFailure::ForeignKeyViolation | DieselFailure::Query => {
            LikeLedgerRepositoryError::query(message)
        }
    }
}

#[async_trait]
impl LikeLedgerRepository for DieselLikeLedgerRepository {
    async fn begin(&self) -> Result<Box<dyn LikeLedgerTransaction>, LikeLedgerRepositoryError> {
        let mut conn = self.pool.get_owned().await.map_err(map_pool_error)?;

        AnsiTransactionManager::begin_transaction(&mut *conn)
            .await
            .map_err(|err| map_diesel_error(err, "begin transaction"))?;
        diesel::sql_query(lock_timeout_statement(self.lock_timeout))
            .execute(&mut *conn)
            .await
            .map_err(|err| map_diesel_error(err, "set lock timeout"))?;

        Ok(Box::new(DieselLikeLedgerTransaction {
            conn,
            finished: false,
        }))
    }
}

/// One open PostgreSQL transaction on an owned pooled connection.
pub struct DieselLikeLedgerTransaction {
    conn: OwnedConnection,
    finished: bool,
}

impl DieselLikeLedgerTransaction {
    fn ensure_open(&self) -> Result<(), LikeLedgerRepositoryError> {
        if self.finished {
            return Err(LikeLedgerRepositoryError::aborted(
                "transaction already committed or rolled back",
            ));
        }
        Ok(())
    }
}

impl Drop for DieselLikeLedgerTransaction {
    fn drop(&mut self) {
        if !self.finished {
            debug!("like ledger transaction dropped while open; connection will be discarded");
        }
    }
}

#[async_trait]
impl LikeLedgerTransaction for DieselLikeLedgerTransaction {
    async fn lock_target(
        &mut self,
        target: LikeTarget,
    ) -> Result<Option<UserId>, LikeLedgerRepositoryError> {
        self.ensure_open()?;
        let author: Option<Uuid> = match target {
            LikeTarget::Post(post_id) => posts::table
                .filter(posts::id.eq(post_id.get()))
                .select(posts::author_id)
                .for_update()
                .get_result::<Uuid>(&mut *self.conn)
                .await
                .optional(),
            LikeTarget::Comment(comment_id) => comments::table
                .filter(comments::id.eq(comment_id.get()))
                .select(comments::author_id)
                .for_update()
                .get_result::<Uuid>(&mut *self.conn)
                .await
                .optional(),
        }
        .map_err(|err| map_diesel_error(err, "lock like target"))?;

        Ok(author.map(UserId::from_uuid))
    }

    async fn find_like(
        &mut self,
        user_id: &UserId,
        target: LikeTarget,
    ) -> Result<Option<Like>, LikeLedgerRepositoryError> {
        self.ensure_open()?;
        let query = likes::table
            .filter(likes::user_id.eq(*user_id.as_uuid()))
            .into_boxed();
        let query = match target {
            LikeTarget::Post(post_id) => query.filter(likes::post_id.eq(post_id.get())),
            LikeTarget::Comment(comment_id) => {
                query.filter(likes::comment_id.eq(comment_id.get()))
            }
        };

        let row: Option<LikeRow> = query
            .select(LikeRow::as_select())
            .first(&mut *self.conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, "find like"))?;

        row.map(Like::try_from)
            .transpose()
            .map_err(LikeLedgerRepositoryError::query)
    }

    async fn insert_like(
        &mut self,
        like: &NewLike,
    ) -> Result<Option<Like>, LikeLedgerRepositoryError> {
        self.ensure_open()?;
        let row: Option<LikeRow> = diesel::insert_into(likes::table)
            .values(NewLikeRow::from(like))
            .on_conflict_do_nothing()
            .returning(LikeRow::as_returning())
            .get_result(&mut *self.conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, "insert like"))?;

        row.map(Like::try_from)
            .transpose()
            .map_err(LikeLedgerRepositoryError::query)
    }

    async fn insert_karma(
        &mut self,
        entry: &NewKarmaTransaction,
    ) -> Result<KarmaTransaction, LikeLedgerRepositoryError> {
        self.ensure_open()?;
        let row: KarmaTransactionRow = diesel::insert_into(karma_transactions::table)
            .values(NewKarmaTransactionRow::from(entry))
            .returning(KarmaTransactionRow::as_returning())
            .get_result(&mut *self.conn)
            .await
            .map_err(|err| map_diesel_error(err, "insert karma transaction"))?;
        Ok(row.into())
    }

    async fn delete_karma_for_like(
        &mut self,
        like_id: LikeId,
    ) -> Result<u64, LikeLedgerRepositoryError> {
        self.ensure_open()?;
        let deleted = diesel::delete(
            karma_transactions::table
                .filter(karma_transactions::source_like_id.eq(like_id.get())),
        )
        .execute(&mut *self.conn)
        .await
        .map_err(|err| map_diesel_error(err, "delete karma transaction"))?;
        Ok(deleted as u64)
    }

    async fn delete_like(&mut self, like_id: LikeId) -> Result<u64, LikeLedgerRepositoryError> {
        self.ensure_open()?;
        let deleted = diesel::delete(likes::table.filter(likes::id.eq(like_id.get())))
            .execute(&mut *self.conn)
            .await
            .map_err(|err| map_diesel_error(err, "delete like"))?;
        Ok(deleted as u64)
    }

    async fn commit(&mut self) -> Result<(), LikeLedgerRepositoryError> {
        self.ensure_open()?;
        self.finished = true;
        AnsiTransactionManager::commit_transaction(&mut *self.conn)
            .await
            .map_err(|err| map_diesel_error(err, "commit"))
    }

    async fn rollback(&mut self) -> Result<(), LikeLedgerRepositoryError> {
        self.ensure_open()?;
        self.finished = true;
        AnsiTransactionManager::rollback_transaction(&mut *self.conn)
            .await
            .map_err(|err| map_diesel_error(err, "rollback"))
    }
}
