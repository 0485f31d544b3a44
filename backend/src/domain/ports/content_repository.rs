//! Port for post and comment persistence.
//!
//! Deletes cascade inside the store: removing a post removes its comments,
//! and removing a post or comment removes the likes on it together with
//! their ledger entries.

use async_trait::async_trait;

use crate::domain::{
    Comment, CommentId, CommentRecord, NewComment, NewPost, Post, PostId, PostRecord,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by content repository adapters.
    pub enum ContentRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "content repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "content repository query failed: {message}",
        /// A referenced post, comment, or author vanished before the write.
        MissingReference { message: String } =>
            "content repository reference missing: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentRepository: Send + Sync {
    async fn create_post(&self, post: &NewPost) -> Result<Post, ContentRepositoryError>;

    async fn create_comment(&self, comment: &NewComment)
    -> Result<Comment, ContentRepositoryError>;

    async fn find_post(&self, id: PostId) -> Result<Option<Post>, ContentRepositoryError>;

    async fn find_comment(&self, id: CommentId)
    -> Result<Option<Comment>, ContentRepositoryError>;

    /// Delete a post and everything hanging off it. Returns whether the post
    /// existed.
    async fn delete_post(&self, id: PostId) -> Result<bool, ContentRepositoryError>;

    /// Delete a comment with its replies and likes. Returns whether the
    /// comment existed.
    async fn delete_comment(&self, id: CommentId) -> Result<bool, ContentRepositoryError>;

    /// All posts, newest first, with their like counts.
    async fn list_posts(&self) -> Result<Vec<PostRecord>, ContentRepositoryError>;

    /// Every comment of the given posts with its like count, ordered by
    /// `(created_at, id)`.
    async fn list_comments_for_posts(
        &self,
        post_ids: &[PostId],
    ) -> Result<Vec<CommentRecord>, ContentRepositoryError>;
}

/// Fixture repository backed by nothing: lookups miss and lists are empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureContentRepository;

#[async_trait]
impl ContentRepository for FixtureContentRepository {
    async fn create_post(&self, post: &NewPost) -> Result<Post, ContentRepositoryError> {
        Ok(Post {
            id: PostId::new(1),
            author_id: post.author_id,
            content: post.content.as_str().to_owned(),
            created_at: post.created_at,
        })
    }

    async fn create_comment(
        &self,
        comment: &NewComment,
    ) -> Result<Comment, ContentRepositoryError> {
        Ok(Comment {
            id: CommentId::new(1),
            post_id: comment.post_id,
            author_id: comment.author_id,
            parent_id: comment.parent_id,
            content: comment.content.as_str().to_owned(),
            created_at: comment.created_at,
        })
    }

    async fn find_post(&self, _id: PostId) -> Result<Option<Post>, ContentRepositoryError> {
        Ok(None)
    }

    async fn find_comment(
        &self,
        _id: CommentId,
    ) -> Result<Option<Comment>, ContentRepositoryError> {
        Ok(None)
    }

    async fn delete_post(&self, _id: PostId) -> Result<bool, ContentRepositoryError> {
        Ok(false)
    }

    async fn delete_comment(&self, _id: CommentId) -> Result<bool, ContentRepositoryError> {
        Ok(false)
    }

    async fn list_posts(&self) -> Result<Vec<PostRecord>, ContentRepositoryError> {
        Ok(Vec::new())
    }

    async fn list_comments_for_posts(
        &self,
        _post_ids: &[PostId],
    ) -> Result<Vec<CommentRecord>, ContentRepositoryError> {
        Ok(Vec::new())
    }
}
