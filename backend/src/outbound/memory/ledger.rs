//! Like ledger transactions over the in-memory store.
//!
//! Writes are staged on the transaction and applied to the shared tables
//! only on commit, so a dropped or rolled-back transaction leaves no trace.
//! Reads inside the transaction see committed rows overlaid with its own
//! staged writes.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

use crate::domain::ports::{
    LikeLedgerRepository, LikeLedgerRepositoryError, LikeLedgerTransaction,
};
use crate::domain::{
    KarmaTransaction, Like, LikeId, LikeTarget, NewKarmaTransaction, NewLike, UserId,
};

use super::store::{InMemoryFeedStore, Shared, Tables};

#[derive(Debug, Clone)]
enum StagedWrite {
    InsertLike(Like),
    InsertKarma(KarmaTransaction),
    DeleteKarmaForLike(LikeId),
    DeleteLike(LikeId),
}

#[async_trait]
impl LikeLedgerRepository for InMemoryFeedStore {
    async fn begin(&self) -> Result<Box<dyn LikeLedgerTransaction>, LikeLedgerRepositoryError> {
        Ok(Box::new(InMemoryLikeLedgerTransaction {
            shared: Arc::clone(&self.shared),
            held: BTreeSet::new(),
            guards: Vec::new(),
            staged: Vec::new(),
            finished: false,
        }))
    }
}

/// Open transaction against an [`InMemoryFeedStore`].
pub struct InMemoryLikeLedgerTransaction {
    shared: Arc<Shared>,
    held: BTreeSet<LikeTarget>,
    guards: Vec<OwnedMutexGuard<()>>,
    staged: Vec<StagedWrite>,
    finished: bool,
}

impl InMemoryLikeLedgerTransaction {
    fn ensure_open(&self) -> Result<(), LikeLedgerRepositoryError> {
        if self.finished {
            return Err(LikeLedgerRepositoryError::aborted(
                "transaction already committed or rolled back",
            ));
        }
        Ok(())
    }

    fn staged_deletes_like(&self, like_id: LikeId) -> bool {
        self.staged
            .iter()
            .any(|write| matches!(write, StagedWrite::DeleteLike(id) if *id == like_id))
    }

    fn staged_deletes_karma_for(&self, like_id: LikeId) -> bool {
        self.staged
            .iter()
            .any(|write| matches!(write, StagedWrite::DeleteKarmaForLike(id) if *id == like_id))
    }

    /// Likes visible to this transaction.
    fn visible_likes(&self, tables: &Tables) -> Vec<Like> {
        let committed = tables
            .likes
            .values()
            .filter(|like| !self.staged_deletes_like(like.id))
            .cloned();
        let staged = self.staged.iter().filter_map(|write| match write {
            StagedWrite::InsertLike(like) if !self.staged_deletes_like(like.id) => {
                Some(like.clone())
            }
            _ => None,
        });
        committed.chain(staged).collect()
    }

    /// Ledger entries visible to this transaction.
    fn visible_karma(&self, tables: &Tables) -> Vec<KarmaTransaction> {
        let committed = tables
            .karma
            .values()
            .filter(|entry| !self.staged_deletes_karma_for(entry.source_like))
            .cloned();
        let staged = self.staged.iter().filter_map(|write| match write {
            StagedWrite::InsertKarma(entry) if !self.staged_deletes_karma_for(entry.source_like) => {
                Some(entry.clone())
            }
            _ => None,
        });
        committed.chain(staged).collect()
    }

    fn release(&mut self) {
        self.finished = true;
        self.staged.clear();
        self.guards.clear();
        self.held.clear();
    }
}

/// Check staged writes against rows other transactions committed meanwhile.
fn validate(tables: &Tables, staged: &[StagedWrite]) -> Result<(), LikeLedgerRepositoryError> {
    for write in staged {
        if let StagedWrite::InsertLike(like) = write {
            if tables.target_author(like.target).is_none() {
                return Err(LikeLedgerRepositoryError::aborted(format!(
                    "{} was deleted before commit",
                    like.target
                )));
            }
            let duplicate = tables.likes.values().any(|existing| {
                existing.user_id == like.user_id && existing.target == like.target
            });
            if duplicate {
                return Err(LikeLedgerRepositoryError::duplicate_like(format!(
                    "user {} already likes {}",
                    like.user_id, like.target
                )));
            }
        }
    }
    Ok(())
}

fn apply(tables: &mut Tables, staged: Vec<StagedWrite>) {
    for write in staged {
        match write {
            StagedWrite::InsertLike(like) => {
                tables.likes.insert(like.id, like);
            }
            StagedWrite::InsertKarma(entry) => {
                tables.karma.insert(entry.id, entry);
            }
            StagedWrite::DeleteKarmaForLike(like_id) => {
                tables.karma.retain(|_, entry| entry.source_like != like_id);
            }
            StagedWrite::DeleteLike(like_id) => {
                tables.likes.remove(&like_id);
                tables.karma.retain(|_, entry| entry.source_like != like_id);
            }
        }
    }
}

impl Drop for InMemoryLikeLedgerTransaction {
    fn drop(&mut self) {
        if !self.finished {
            debug!(
                staged = self.staged.len(),
                "like ledger transaction dropped while open; discarding staged writes"
            );
        }
    }
}

#[async_trait]
impl LikeLedgerTransaction for InMemoryLikeLedgerTransaction {
    async fn lock_target(
        &mut self,
        target: LikeTarget,
    ) -> Result<Option<UserId>, LikeLedgerRepositoryError> {
        self.ensure_open()?;
        if !self.held.contains(&target) {
            let lock = self.shared.target_lock(target);
            let guard = tokio::time::timeout(self.shared.lock_timeout, lock.lock_owned())
                .await
                .map_err(|_| {
                    LikeLedgerRepositoryError::lock_timeout(format!(
                        "waited {:?} for {target}",
                        self.shared.lock_timeout
                    ))
                })?;
            self.guards.push(guard);
            self.held.insert(target);
        }
        Ok(self.shared.tables().target_author(target))
    }

    async fn find_like(
        &mut self,
        user_id: &UserId,
        target: LikeTarget,
    ) -> Result<Option<Like>, LikeLedgerRepositoryError> {
        self.ensure_open()?;
        let tables = self.shared.tables();
        Ok(self
            .visible_likes(&tables)
            .into_iter()
            .find(|like| like.user_id == *user_id && like.target == target))
    }

    async fn insert_like(
        &mut self,
        like: &NewLike,
    ) -> Result<Option<Like>, LikeLedgerRepositoryError> {
        self.ensure_open()?;
        let stored = {
            let mut tables = self.shared.tables();
            let exists = self
                .visible_likes(&tables)
                .iter()
                .any(|existing| existing.user_id == like.user_id && existing.target == like.target);
            if exists {
                return Ok(None);
            }
            if tables.target_author(like.target).is_none() {
                return Err(LikeLedgerRepositoryError::query(format!(
                    "{} does not exist",
                    like.target
                )));
            }
            if !tables.users.contains_key(&like.user_id) {
                return Err(LikeLedgerRepositoryError::query(format!(
                    "user {} does not exist",
                    like.user_id
                )));
            }
            Like {
                id: tables.next_like_id(),
                user_id: like.user_id,
                target: like.target,
                created_at: like.created_at,
            }
        };
        self.staged.push(StagedWrite::InsertLike(stored.clone()));
        Ok(Some(stored))
    }

    async fn insert_karma(
        &mut self,
        entry: &NewKarmaTransaction,
    ) -> Result<KarmaTransaction, LikeLedgerRepositoryError> {
        self.ensure_open()?;
        let stored = {
            let mut tables = self.shared.tables();
            let like_visible = self
                .visible_likes(&tables)
                .iter()
                .any(|like| like.id == entry.source_like);
            if !like_visible {
                return Err(LikeLedgerRepositoryError::query(format!(
                    "source {} does not exist",
                    entry.source_like
                )));
            }
            let already_recorded = self
                .visible_karma(&tables)
                .iter()
                .any(|existing| existing.source_like == entry.source_like);
            if already_recorded {
                return Err(LikeLedgerRepositoryError::duplicate_like(format!(
                    "ledger entry for {} already exists",
                    entry.source_like
                )));
            }
            KarmaTransaction {
                id: tables.next_karma_id(),
                beneficiary: entry.beneficiary,
                amount: entry.amount,
                source_like: entry.source_like,
                created_at: entry.created_at,
            }
        };
        self.staged.push(StagedWrite::InsertKarma(stored.clone()));
        Ok(stored)
    }

    async fn delete_karma_for_like(
        &mut self,
        like_id: LikeId,
    ) -> Result<u64, LikeLedgerRepositoryError> {
        self.ensure_open()?;
        let removed = {
            let tables = self.shared.tables();
            self.visible_karma(&tables)
                .iter()
                .filter(|entry| entry.source_like == like_id)
                .count() as u64
        };
        if removed > 0 {
            self.staged.push(StagedWrite::DeleteKarmaForLike(like_id));
        }
        Ok(removed)
    }

    async fn delete_like(&mut self, like_id: LikeId) -> Result<u64, LikeLedgerRepositoryError> {
        self.ensure_open()?;
        let removed = {
            let tables = self.shared.tables();
            self.visible_likes(&tables)
                .iter()
                .filter(|like| like.id == like_id)
                .count() as u64
        };
        if removed > 0 {
            self.staged.push(StagedWrite::DeleteLike(like_id));
        }
        Ok(removed)
    }

    async fn commit(&mut self) -> Result<(), LikeLedgerRepositoryError> {
        self.ensure_open()?;
        let staged = std::mem::take(&mut self.staged);
        let outcome = {
            let mut tables = self.shared.tables();
            validate(&tables, &staged).map(|()| apply(&mut tables, staged))
        };
        self.release();
        outcome
    }

    async fn rollback(&mut self) -> Result<(), LikeLedgerRepositoryError> {
        self.ensure_open()?;
        self.release();
        Ok(())
    }
}

#[cfg(test)]
#[path = "ledger_tests.rs"]
mod tests;
