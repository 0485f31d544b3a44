//! PostgreSQL-backed post and comment storage.
//!
//! Deletes rely on the `ON DELETE CASCADE` foreign keys in the schema:
//! dropping a post removes its comments, the likes on both, and the ledger
//! entries those likes produced, in one statement.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_types::{Array, Int8};
use diesel_async::RunQueryDsl;

use crate::domain::ports::{ContentRepository, ContentRepositoryError};
use crate::domain::{
    Comment, CommentId, CommentRecord, NewComment, NewPost, Post, PostId, PostRecord,
};

use super::diesel_error_mapping::{DieselFailure, classify_diesel_error, pool_error_message};
use super::models::{
    CommentRow, CommentWithLikesRow, NewCommentRow, NewPostRow, PostRow, PostWithLikesRow,
};
use super::pool::{DbPool, PoolError};
use super::schema::{comments, posts};

const LIST_POSTS_SQL: &str = "\
    SELECT p.id, p.author_id, p.content, p.created_at, COUNT(l.id) AS like_count \
    FROM posts p \
    LEFT JOIN likes l ON l.post_id = p.id \
    GROUP BY p.id \
    ORDER BY p.created_at DESC, p.id DESC";

const LIST_COMMENTS_SQL: &str = "\
    SELECT c.id, c.post_id, c.author_id, c.parent_id, c.content, c.created_at, \
           COUNT(l.id) AS like_count \
    FROM comments c \
    LEFT JOIN likes l ON l.comment_id = c.id \
    WHERE c.post_id = ANY($1) \
    GROUP BY c.id \
    ORDER BY c.created_at ASC, c.id ASC";

/// Diesel-backed implementation of the `ContentRepository` port.
#[derive(Clone)]
pub struct DieselContentRepository {
    pool: DbPool,
}

impl DieselContentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> ContentRepositoryError {
    ContentRepositoryError::connection(pool_error_message(error))
}

fn map_diesel_error(error: diesel::result::Error, operation: &str) -> ContentRepositoryError {
    let message = format!("{operation}: {error}");
    match classify_diesel_error(&error, operation) {
        DieselFailure::Connection => ContentRepositoryError::connection(message),
        DieselFailure::ForeignKeyViolation => ContentRepositoryError::missing_reference(message),
        _ => ContentRepositoryError::query(message),
    }
}

#[async_trait]
impl ContentRepository for DieselContentRepository {
    async fn create_post(&self, post: &NewPost) -> Result<Post, ContentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = NewPostRow {
            author_id: *post.author_id.as_uuid(),
            content: post.content.as_str(),
            created_at: post.created_at,
        };

        let stored: PostRow = diesel::insert_into(posts::table)
            .values(&row)
            .returning(PostRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "insert post"))?;
        Ok(stored.into())
    }

    async fn create_comment(
        &self,
        comment: &NewComment,
    ) -> Result<Comment, ContentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = NewCommentRow {
            post_id: comment.post_id.get(),
            author_id: *comment.author_id.as_uuid(),
            parent_id: comment.parent_id.map(CommentId::get),
            content: comment.content.as_str(),
            created_at: comment.created_at,
        };

        let stored: CommentRow = diesel::insert_into(comments::table)
            .values(&row)
            .returning(CommentRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "insert comment"))?;
        Ok(stored.into())
    }

    async fn find_post(&self, id: PostId) -> Result<Option<Post>, ContentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<PostRow> = posts::table
            .find(id.get())
            .select(PostRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, "find post"))?;
        Ok(row.map(Post::from))
    }

    async fn find_comment(
        &self,
        id: CommentId,
    ) -> Result<Option<Comment>, ContentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<CommentRow> = comments::table
            .find(id.get())
            .select(CommentRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, "find comment"))?;
        Ok(row.map(Comment::from))
    }

    async fn delete_post(&self, id: PostId) -> Result<bool, ContentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(posts::table.find(id.get()))
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "delete post"))?;
        Ok(deleted > 0)
    }

    async fn delete_comment(&self, id: CommentId) -> Result<bool, ContentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(comments::table.find(id.get()))
            .execute(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "delete comment"))?;
        Ok(deleted > 0)
    }

    async fn list_posts(&self) -> Result<Vec<PostRecord>, ContentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<PostWithLikesRow> = diesel::sql_query(LIST_POSTS_SQL)
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "list posts"))?;
        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn list_comments_for_posts(
        &self,
        post_ids: &[PostId],
    ) -> Result<Vec<CommentRecord>, ContentRepositoryError> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = post_ids.iter().map(|id| id.get()).collect();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<CommentWithLikesRow> = diesel::sql_query(LIST_COMMENTS_SQL)
            .bind::<Array<Int8>, _>(ids)
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "list comments"))?;
        Ok(rows.into_iter().map(CommentRecord::from).collect())
    }
}
