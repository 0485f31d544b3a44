//! Driving port for liking and unliking posts and comments.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Error, LikeState, LikeTarget, UserId};

/// Request to flip the actor's like on a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleLikeRequest {
    pub actor: UserId,
    pub target: LikeTarget,
}

/// Driving port for the like toggle.
///
/// Each call flips the actor's like on the target and returns the state
/// afterwards. The like and its karma ledger entry are created or removed
/// together; concurrent calls on one target serialise on the target's row
/// lock.
///
/// # Errors
///
/// - [`crate::domain::ErrorCode::NotFound`] when the target does not exist.
/// - [`crate::domain::ErrorCode::LockTimeout`] when the target stays locked
///   past the configured timeout. Retrying is safe.
/// - [`crate::domain::ErrorCode::TransactionAborted`] or
///   [`crate::domain::ErrorCode::ServiceUnavailable`] on store failures; the
///   store is left unchanged.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LikeToggleCommand: Send + Sync {
    async fn toggle_like(&self, request: ToggleLikeRequest) -> Result<LikeState, Error>;
}

/// Fixture command that reports every toggle as a fresh like.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureLikeToggleCommand;

#[async_trait]
impl LikeToggleCommand for FixtureLikeToggleCommand {
    async fn toggle_like(&self, _request: ToggleLikeRequest) -> Result<LikeState, Error> {
        Ok(LikeState::LIKED)
    }
}
