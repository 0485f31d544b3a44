//! Port for the like and karma ledger unit of work.
//!
//! Toggling a like touches two tables that must change together. The
//! repository hands out a [`LikeLedgerTransaction`] that owns one store
//! transaction; every write goes through it and nothing is visible to other
//! readers until [`LikeLedgerTransaction::commit`] succeeds.
//!
//! # Dropping
//!
//! A transaction dropped without `commit` is rolled back. Adapters must
//! guarantee this even when the owning future is cancelled mid-flight, since
//! no async code can run in `Drop`.

use async_trait::async_trait;

use crate::domain::{
    KarmaTransaction, Like, LikeId, LikeTarget, NewKarmaTransaction, NewLike, UserId,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by like ledger adapters.
    pub enum LikeLedgerRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "like ledger connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "like ledger query failed: {message}",
        /// The target row lock was not granted within the lock timeout.
        LockTimeout { message: String } =>
            "like ledger lock wait exceeded: {message}",
        /// A like for the same user and target already exists.
        DuplicateLike { message: String } =>
            "like already recorded: {message}",
        /// The transaction is no longer usable and was rolled back.
        Aborted { message: String } =>
            "like ledger transaction aborted: {message}",
    }
}

/// Factory for ledger transactions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LikeLedgerRepository: Send + Sync {
    /// Open a transaction with a bounded lock wait already configured.
    async fn begin(&self) -> Result<Box<dyn LikeLedgerTransaction>, LikeLedgerRepositoryError>;
}

/// One open store transaction over likes and ledger entries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LikeLedgerTransaction: Send {
    /// Lock the target row for the rest of the transaction and return the
    /// target's author.
    ///
    /// Returns `None` when the target does not exist. Blocks while another
    /// transaction holds the lock, up to the configured lock timeout.
    async fn lock_target(
        &mut self,
        target: LikeTarget,
    ) -> Result<Option<UserId>, LikeLedgerRepositoryError>;

    /// Fetch the like `user_id` holds on `target`, if any.
    async fn find_like(
        &mut self,
        user_id: &UserId,
        target: LikeTarget,
    ) -> Result<Option<Like>, LikeLedgerRepositoryError>;

    /// Insert a like, skipping the row on a uniqueness conflict.
    ///
    /// Returns `None` when an equivalent like already exists. Adapters may
    /// instead report the conflict as
    /// [`LikeLedgerRepositoryError::DuplicateLike`].
    async fn insert_like(
        &mut self,
        like: &NewLike,
    ) -> Result<Option<Like>, LikeLedgerRepositoryError>;

    /// Append a ledger entry.
    async fn insert_karma(
        &mut self,
        entry: &NewKarmaTransaction,
    ) -> Result<KarmaTransaction, LikeLedgerRepositoryError>;

    /// Delete the ledger entry created for `like_id`; returns rows removed.
    async fn delete_karma_for_like(
        &mut self,
        like_id: LikeId,
    ) -> Result<u64, LikeLedgerRepositoryError>;

    /// Delete a like; returns rows removed.
    async fn delete_like(&mut self, like_id: LikeId) -> Result<u64, LikeLedgerRepositoryError>;

    /// Make all writes visible and release the lock.
    async fn commit(&mut self) -> Result<(), LikeLedgerRepositoryError>;

    /// Discard all writes and release the lock.
    async fn rollback(&mut self) -> Result<(), LikeLedgerRepositoryError>;
}

/// Fixture repository whose transactions see an empty store.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureLikeLedgerRepository;

#[async_trait]
impl LikeLedgerRepository for FixtureLikeLedgerRepository {
    async fn begin(&self) -> Result<Box<dyn LikeLedgerTransaction>, LikeLedgerRepositoryError> {
        Ok(Box::new(FixtureLikeLedgerTransaction))
    }
}

/// Transaction for [`FixtureLikeLedgerRepository`].
///
/// No target exists, inserts echo their input with identifier 1, and
/// deletes remove nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureLikeLedgerTransaction;

#[async_trait]
impl LikeLedgerTransaction for FixtureLikeLedgerTransaction {
    async fn lock_target(
        &mut self,
        _target: LikeTarget,
    ) -> Result<Option<UserId>, LikeLedgerRepositoryError> {
        Ok(None)
    }

    async fn find_like(
        &mut self,
        _user_id: &UserId,
        _target: LikeTarget,
    ) -> Result<Option<Like>, LikeLedgerRepositoryError> {
        Ok(None)
    }

    async fn insert_like(
        &mut self,
        like: &NewLike,
    ) -> Result<Option<Like>, LikeLedgerRepositoryError> {
        Ok(Some(Like {
            id: LikeId::new(1),
            user_id: like.user_id,
            target: like.target,
            created_at: like.created_at,
        }))
    }

    async fn insert_karma(
        &mut self,
        entry: &NewKarmaTransaction,
    ) -> Result<KarmaTransaction, LikeLedgerRepositoryError> {
        Ok(KarmaTransaction {
            id: crate::domain::KarmaTransactionId::new(1),
            beneficiary: entry.beneficiary,
            amount: entry.amount,
            source_like: entry.source_like,
            created_at: entry.created_at,
        })
    }

    async fn delete_karma_for_like(
        &mut self,
        _like_id: LikeId,
    ) -> Result<u64, LikeLedgerRepositoryError> {
        Ok(0)
    }

    async fn delete_like(&mut self, _like_id: LikeId) -> Result<u64, LikeLedgerRepositoryError> {
        Ok(0)
    }

    async fn commit(&mut self) -> Result<(), LikeLedgerRepositoryError> {
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), LikeLedgerRepositoryError> {
        Ok(())
    }
}
