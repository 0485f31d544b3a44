//! Like toggle domain service.
//!
//! Implements [`LikeToggleCommand`] over a [`LikeLedgerRepository`]. One
//! toggle is one store transaction:
//!
//! 1. lock the target row, which also yields the target's author;
//! 2. look up the actor's like;
//! 3. either delete the like together with its ledger entry, or insert the
//!    like and exactly one ledger entry crediting the author;
//! 4. commit.
//!
//! Every early exit rolls back. A uniqueness conflict on the like insert or
//! at commit means a concurrent toggle already recorded the like, so the
//! toggle reports `liked = true` and writes nothing.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::ports::{
    LikeLedgerRepository, LikeLedgerRepositoryError, LikeLedgerTransaction, LikeToggleCommand,
    ToggleLikeRequest,
};
use crate::domain::{Error, KarmaTransaction, LikeState, LikeTarget, NewKarmaTransaction, NewLike};

/// What a toggle did inside its transaction.
#[derive(Debug)]
enum ToggleOutcome {
    Liked(KarmaTransaction),
    Unliked { removed_entries: u64 },
    AlreadyLiked,
    TargetMissing,
}

/// Like toggle service implementing the driving port.
#[derive(Clone)]
pub struct LikeToggleService<R> {
    ledger: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R> LikeToggleService<R> {
    /// Create a new service over the given ledger repository.
    pub fn new(ledger: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { ledger, clock }
    }
}

impl<R> LikeToggleService<R>
where
    R: LikeLedgerRepository,
{
    fn map_ledger_error(error: LikeLedgerRepositoryError, target: LikeTarget) -> Error {
        match error {
            LikeLedgerRepositoryError::Connection { message } => {
                Error::service_unavailable(format!("like ledger unavailable: {message}"))
            }
            LikeLedgerRepositoryError::LockTimeout { message } => Error::lock_timeout(format!(
                "{target} is busy, retry the toggle: {message}"
            ))
            .with_details(json!({ "target": target })),
            LikeLedgerRepositoryError::Query { message }
            | LikeLedgerRepositoryError::Aborted { message } => {
                Error::transaction_aborted(format!("like toggle rolled back: {message}"))
            }
            LikeLedgerRepositoryError::DuplicateLike { message } => {
                Error::internal(format!("unexpected duplicate like: {message}"))
            }
        }
    }

    async fn apply_toggle(
        &self,
        tx: &mut dyn LikeLedgerTransaction,
        request: &ToggleLikeRequest,
    ) -> Result<ToggleOutcome, LikeLedgerRepositoryError> {
        let Some(author) = tx.lock_target(request.target).await? else {
            return Ok(ToggleOutcome::TargetMissing);
        };

        if let Some(existing) = tx.find_like(&request.actor, request.target).await? {
            let removed_entries = tx.delete_karma_for_like(existing.id).await?;
            tx.delete_like(existing.id).await?;
            return Ok(ToggleOutcome::Unliked { removed_entries });
        }

        let now = self.clock.utc();
        let new_like = NewLike {
            user_id: request.actor,
            target: request.target,
            created_at: now,
        };
        let like = match tx.insert_like(&new_like).await {
            Ok(Some(like)) => like,
            Ok(None) | Err(LikeLedgerRepositoryError::DuplicateLike { .. }) => {
                return Ok(ToggleOutcome::AlreadyLiked);
            }
            Err(err) => return Err(err),
        };

        let entry = tx
            .insert_karma(&NewKarmaTransaction {
                beneficiary: author,
                amount: request.target.kind().karma_amount(),
                source_like: like.id,
                created_at: now,
            })
            .await?;
        Ok(ToggleOutcome::Liked(entry))
    }

    async fn discard(tx: &mut dyn LikeLedgerTransaction, target: LikeTarget) {
        if let Err(error) = tx.rollback().await {
            warn!(%target, %error, "like toggle rollback failed; connection will be discarded");
        }
    }
}

#[async_trait]
impl<R> LikeToggleCommand for LikeToggleService<R>
where
    R: LikeLedgerRepository,
{
    async fn toggle_like(&self, request: ToggleLikeRequest) -> Result<LikeState, Error> {
        let target = request.target;
        let mut tx = self
            .ledger
            .begin()
            .await
            .map_err(|err| Self::map_ledger_error(err, target))?;

        let outcome = match self.apply_toggle(tx.as_mut(), &request).await {
            Ok(outcome) => outcome,
            Err(error) => {
                Self::discard(tx.as_mut(), target).await;
                return Err(Self::map_ledger_error(error, target));
            }
        };

        match outcome {
            ToggleOutcome::Liked(entry) => {
                match tx.commit().await {
                    Ok(()) => {}
                    Err(LikeLedgerRepositoryError::DuplicateLike { message }) => {
                        warn!(
                            actor = %request.actor,
                            %target,
                            %message,
                            "concurrent like won the commit; reporting liked"
                        );
                        return Ok(LikeState::LIKED);
                    }
                    Err(err) => return Err(Self::map_ledger_error(err, target)),
                }
                info!(
                    actor = %request.actor,
                    %target,
                    beneficiary = %entry.beneficiary,
                    amount = entry.amount,
                    "like recorded"
                );
                Ok(LikeState::LIKED)
            }
            ToggleOutcome::Unliked { removed_entries } => {
                tx.commit()
                    .await
                    .map_err(|err| Self::map_ledger_error(err, target))?;
                info!(actor = %request.actor, %target, removed_entries, "like removed");
                Ok(LikeState::UNLIKED)
            }
            ToggleOutcome::AlreadyLiked => {
                Self::discard(tx.as_mut(), target).await;
                warn!(
                    actor = %request.actor,
                    %target,
                    "concurrent like won the insert; reporting liked"
                );
                Ok(LikeState::LIKED)
            }
            ToggleOutcome::TargetMissing => {
                Self::discard(tx.as_mut(), target).await;
                Err(Error::not_found(format!("{target} does not exist")))
            }
        }
    }
}

#[cfg(test)]
#[path = "like_toggle_service_tests.rs"]
mod tests;
