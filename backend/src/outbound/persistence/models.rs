//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Conversions into domain types live next
//! to the rows so adapters stay thin.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Int8, Nullable, Text, Timestamptz, Uuid as SqlUuid};
use uuid::Uuid;

use crate::domain::{
    Comment, CommentId, CommentRecord, KarmaTransaction, KarmaTransactionId, LeaderboardEntry,
    Like, LikeId, LikeTarget, Post, PostId, PostRecord, User, UserId, Username,
};

use super::schema::{comments, karma_transactions, likes, posts, users};

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub username: String,
}

impl TryFrom<UserRow> for User {
    type Error = String;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let username = Username::new(row.username)
            .map_err(|err| format!("stored username for {} is invalid: {err}", row.id))?;
        Ok(User::new(UserId::from_uuid(row.id), username))
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: Uuid,
    pub username: &'a str,
}

// ---------------------------------------------------------------------------
// Posts and comments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PostRow {
    pub id: i64,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Self {
            id: PostId::new(row.id),
            author_id: UserId::from_uuid(row.author_id),
            content: row.content,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = posts)]
pub(crate) struct NewPostRow<'a> {
    pub author_id: Uuid,
    pub content: &'a str,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = comments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub author_id: Uuid,
    pub parent_id: Option<i64>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: CommentId::new(row.id),
            post_id: PostId::new(row.post_id),
            author_id: UserId::from_uuid(row.author_id),
            parent_id: row.parent_id.map(CommentId::new),
            content: row.content,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = comments)]
pub(crate) struct NewCommentRow<'a> {
    pub post_id: i64,
    pub author_id: Uuid,
    pub parent_id: Option<i64>,
    pub content: &'a str,
    pub created_at: DateTime<Utc>,
}

/// Post joined with its like count, read through `sql_query`.
#[derive(Debug, Clone, QueryableByName)]
pub(crate) struct PostWithLikesRow {
    #[diesel(sql_type = Int8)]
    pub id: i64,
    #[diesel(sql_type = SqlUuid)]
    pub author_id: Uuid,
    #[diesel(sql_type = Text)]
    pub content: String,
    #[diesel(sql_type = Timestamptz)]
    pub created_at: DateTime<Utc>,
    #[diesel(sql_type = BigInt)]
    pub like_count: i64,
}

impl From<PostWithLikesRow> for PostRecord {
    fn from(row: PostWithLikesRow) -> Self {
        Self {
            post: Post {
                id: PostId::new(row.id),
                author_id: UserId::from_uuid(row.author_id),
                content: row.content,
                created_at: row.created_at,
            },
            like_count: count_to_u64(row.like_count),
        }
    }
}

/// Comment joined with its like count, read through `sql_query`.
#[derive(Debug, Clone, QueryableByName)]
pub(crate) struct CommentWithLikesRow {
    #[diesel(sql_type = Int8)]
    pub id: i64,
    #[diesel(sql_type = Int8)]
    pub post_id: i64,
    #[diesel(sql_type = SqlUuid)]
    pub author_id: Uuid,
    #[diesel(sql_type = Nullable<Int8>)]
    pub parent_id: Option<i64>,
    #[diesel(sql_type = Text)]
    pub content: String,
    #[diesel(sql_type = Timestamptz)]
    pub created_at: DateTime<Utc>,
    #[diesel(sql_type = BigInt)]
    pub like_count: i64,
}

impl From<CommentWithLikesRow> for CommentRecord {
    fn from(row: CommentWithLikesRow) -> Self {
        Self {
            comment: Comment {
                id: CommentId::new(row.id),
                post_id: PostId::new(row.post_id),
                author_id: UserId::from_uuid(row.author_id),
                parent_id: row.parent_id.map(CommentId::new),
                content: row.content,
                created_at: row.created_at,
            },
            like_count: count_to_u64(row.like_count),
        }
    }
}

fn count_to_u64(count: i64) -> u64 {
    u64::try_from(count).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Likes and the karma ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = likes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct LikeRow {
    pub id: i64,
    pub user_id: Uuid,
    pub post_id: Option<i64>,
    pub comment_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<LikeRow> for Like {
    type Error = String;

    fn try_from(row: LikeRow) -> Result<Self, Self::Error> {
        let target = match (row.post_id, row.comment_id) {
            (Some(post_id), None) => LikeTarget::Post(PostId::new(post_id)),
            (None, Some(comment_id)) => LikeTarget::Comment(CommentId::new(comment_id)),
            _ => return Err(format!("like {} does not have exactly one target", row.id)),
        };
        Ok(Self {
            id: LikeId::new(row.id),
            user_id: UserId::from_uuid(row.user_id),
            target,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = likes)]
pub(crate) struct NewLikeRow {
    pub user_id: Uuid,
    pub post_id: Option<i64>,
    pub comment_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<&crate::domain::NewLike> for NewLikeRow {
    fn from(like: &crate::domain::NewLike) -> Self {
        Self {
            user_id: *like.user_id.as_uuid(),
            post_id: like.target.post_id().map(PostId::get),
            comment_id: like.target.comment_id().map(CommentId::get),
            created_at: like.created_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = karma_transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct KarmaTransactionRow {
    pub id: i64,
    pub user_id: Uuid,
    pub amount: i32,
    pub source_like_id: i64,
    pub created_at: DateTime<Utc>,
}

impl From<KarmaTransactionRow> for KarmaTransaction {
    fn from(row: KarmaTransactionRow) -> Self {
        Self {
            id: KarmaTransactionId::new(row.id),
            beneficiary: UserId::from_uuid(row.user_id),
            amount: row.amount,
            source_like: LikeId::new(row.source_like_id),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = karma_transactions)]
pub(crate) struct NewKarmaTransactionRow {
    pub user_id: Uuid,
    pub amount: i32,
    pub source_like_id: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&crate::domain::NewKarmaTransaction> for NewKarmaTransactionRow {
    fn from(entry: &crate::domain::NewKarmaTransaction) -> Self {
        Self {
            user_id: *entry.beneficiary.as_uuid(),
            amount: entry.amount,
            source_like_id: entry.source_like.get(),
            created_at: entry.created_at,
        }
    }
}

/// One aggregated leaderboard row, read through `sql_query`.
#[derive(Debug, Clone, QueryableByName)]
pub(crate) struct LeaderboardRow {
    #[diesel(sql_type = SqlUuid)]
    pub user_id: Uuid,
    #[diesel(sql_type = Text)]
    pub username: String,
    #[diesel(sql_type = BigInt)]
    pub total: i64,
}

impl From<LeaderboardRow> for LeaderboardEntry {
    fn from(row: LeaderboardRow) -> Self {
        Self {
            user_id: UserId::from_uuid(row.user_id),
            username: row.username,
            total: row.total,
        }
    }
}
