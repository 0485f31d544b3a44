//! Feed domain service: posting, commenting, deleting, and the read path.
//!
//! The read path costs two store round trips regardless of thread depth:
//! one for the posts and one for every comment of those posts. The comment
//! trees are then assembled in memory by [`build_comment_forest`].

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{debug, info};

use crate::domain::ports::{
    ContentRepository, ContentRepositoryError, CreateCommentRequest, CreatePostRequest,
    DeleteCommentRequest, DeletePostRequest, FeedCommand, FeedQuery, PostThread,
};
use crate::domain::{
    Body, Comment, ContentValidationError, Error, NewComment, NewPost, Post, PostId,
    build_comment_forest,
};

/// Feed service implementing the feed driving ports.
#[derive(Clone)]
pub struct FeedService<C> {
    content: Arc<C>,
    clock: Arc<dyn Clock>,
}

impl<C> FeedService<C> {
    pub fn new(content: Arc<C>, clock: Arc<dyn Clock>) -> Self {
        Self { content, clock }
    }
}

fn map_content_error(error: ContentRepositoryError) -> Error {
    match error {
        ContentRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("content repository unavailable: {message}"))
        }
        ContentRepositoryError::Query { message } => {
            Error::internal(format!("content repository error: {message}"))
        }
        ContentRepositoryError::MissingReference { message } => Error::not_found(message),
    }
}

fn map_validation_error(error: ContentValidationError) -> Error {
    Error::invalid_request(error.to_string())
}

impl<C> FeedService<C>
where
    C: ContentRepository,
{
    async fn require_post(&self, post_id: PostId) -> Result<Post, Error> {
        self.content
            .find_post(post_id)
            .await
            .map_err(map_content_error)?
            .ok_or_else(|| Error::not_found(format!("{post_id} does not exist")))
    }
}

#[async_trait]
impl<C> FeedCommand for FeedService<C>
where
    C: ContentRepository,
{
    async fn create_post(&self, request: CreatePostRequest) -> Result<Post, Error> {
        let content = Body::new(request.content).map_err(map_validation_error)?;
        let post = self
            .content
            .create_post(&NewPost {
                author_id: request.author,
                content,
                created_at: self.clock.utc(),
            })
            .await
            .map_err(map_content_error)?;
        info!(post = %post.id, author = %post.author_id, "post created");
        Ok(post)
    }

    async fn create_comment(&self, request: CreateCommentRequest) -> Result<Comment, Error> {
        let content = Body::new(request.content).map_err(map_validation_error)?;
        self.require_post(request.post_id).await?;

        if let Some(parent_id) = request.parent_id {
            let parent = self
                .content
                .find_comment(parent_id)
                .await
                .map_err(map_content_error)?
                .ok_or_else(|| Error::not_found(format!("{parent_id} does not exist")))?;
            if parent.post_id != request.post_id {
                return Err(Error::invalid_request(format!(
                    "{parent_id} belongs to {}, not {}",
                    parent.post_id, request.post_id
                )));
            }
        }

        let comment = self
            .content
            .create_comment(&NewComment {
                post_id: request.post_id,
                author_id: request.author,
                parent_id: request.parent_id,
                content,
                created_at: self.clock.utc(),
            })
            .await
            .map_err(map_content_error)?;
        info!(
            comment = %comment.id,
            post = %comment.post_id,
            author = %comment.author_id,
            "comment created"
        );
        Ok(comment)
    }

    async fn delete_post(&self, request: DeletePostRequest) -> Result<(), Error> {
        let post = self.require_post(request.post_id).await?;
        if post.author_id != request.actor {
            return Err(Error::forbidden(format!(
                "only the author may delete {}",
                post.id
            )));
        }
        let removed = self
            .content
            .delete_post(post.id)
            .await
            .map_err(map_content_error)?;
        if !removed {
            return Err(Error::not_found(format!("{} does not exist", post.id)));
        }
        info!(post = %post.id, "post deleted with its comments, likes, and karma");
        Ok(())
    }

    async fn delete_comment(&self, request: DeleteCommentRequest) -> Result<(), Error> {
        let comment_id = request.comment_id;
        let comment = self
            .content
            .find_comment(comment_id)
            .await
            .map_err(map_content_error)?
            .ok_or_else(|| Error::not_found(format!("{comment_id} does not exist")))?;
        if comment.author_id != request.actor {
            return Err(Error::forbidden(format!(
                "only the author may delete {comment_id}"
            )));
        }
        let removed = self
            .content
            .delete_comment(comment_id)
            .await
            .map_err(map_content_error)?;
        if !removed {
            return Err(Error::not_found(format!("{comment_id} does not exist")));
        }
        info!(comment = %comment_id, "comment deleted with its replies, likes, and karma");
        Ok(())
    }
}

#[async_trait]
impl<C> FeedQuery for FeedService<C>
where
    C: ContentRepository,
{
    async fn list_feed(&self) -> Result<Vec<PostThread>, Error> {
        let posts = self.content.list_posts().await.map_err(map_content_error)?;
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let post_ids: Vec<PostId> = posts.iter().map(|record| record.post.id).collect();
        let comments = self
            .content
            .list_comments_for_posts(&post_ids)
            .await
            .map_err(map_content_error)?;
        let mut forest = build_comment_forest(comments);
        debug!(
            posts = posts.len(),
            threaded_posts = forest.post_count(),
            comments = forest.comment_count(),
            "feed loaded"
        );

        Ok(posts
            .into_iter()
            .map(|post| {
                let comments = forest.take_roots(post.post.id);
                PostThread { post, comments }
            })
            .collect())
    }
}

#[cfg(test)]
#[path = "feed_service_tests.rs"]
mod tests;
