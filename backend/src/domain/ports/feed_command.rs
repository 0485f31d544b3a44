//! Driving port for creating and deleting feed content.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Comment, CommentId, Error, Post, PostId, UserId};

/// Request to publish a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub author: UserId,
    pub content: String,
}

/// Request to comment on a post, optionally replying to another comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub author: UserId,
    pub post_id: PostId,
    pub parent_id: Option<CommentId>,
    pub content: String,
}

/// Request to delete a post the actor authored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePostRequest {
    pub actor: UserId,
    pub post_id: PostId,
}

/// Request to delete a comment the actor authored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCommentRequest {
    pub actor: UserId,
    pub comment_id: CommentId,
}

/// Driving port for feed writes.
///
/// Deleting content also removes the karma it earned: likes on the deleted
/// post, its comments, and their ledger entries go with it.
///
/// # Errors
///
/// - `InvalidRequest` for empty or oversized content, or a parent comment on
///   a different post.
/// - `NotFound` for a missing post, parent, or deletion target.
/// - `Forbidden` when the actor did not author the content being deleted.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedCommand: Send + Sync {
    async fn create_post(&self, request: CreatePostRequest) -> Result<Post, Error>;

    async fn create_comment(&self, request: CreateCommentRequest) -> Result<Comment, Error>;

    async fn delete_post(&self, request: DeletePostRequest) -> Result<(), Error>;

    async fn delete_comment(&self, request: DeleteCommentRequest) -> Result<(), Error>;
}

/// Fixture command that echoes creations and accepts deletions.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureFeedCommand;

#[async_trait]
impl FeedCommand for FixtureFeedCommand {
    async fn create_post(&self, request: CreatePostRequest) -> Result<Post, Error> {
        Ok(Post {
            id: PostId::new(1),
            author_id: request.author,
            content: request.content,
            created_at: chrono::DateTime::<chrono::Utc>::UNIX_EPOCH,
        })
    }

    async fn create_comment(&self, request: CreateCommentRequest) -> Result<Comment, Error> {
        Ok(Comment {
            id: CommentId::new(1),
            post_id: request.post_id,
            author_id: request.author,
            parent_id: request.parent_id,
            content: request.content,
            created_at: chrono::DateTime::<chrono::Utc>::UNIX_EPOCH,
        })
    }

    async fn delete_post(&self, _request: DeletePostRequest) -> Result<(), Error> {
        Ok(())
    }

    async fn delete_comment(&self, _request: DeleteCommentRequest) -> Result<(), Error> {
        Ok(())
    }
}
