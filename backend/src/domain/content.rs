//! Posts and comments.
//!
//! A comment belongs to exactly one post and optionally replies to another
//! comment of the same post. The parent is fixed at creation time and must
//! already exist then, so reply chains cannot form cycles.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CommentId, PostId, UserId};

/// Maximum body length, in characters, for posts and comments.
pub const BODY_MAX: usize = 10_000;

/// Validation errors for post and comment bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentValidationError {
    EmptyBody,
    BodyTooLong { max: usize },
}

impl fmt::Display for ContentValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyBody => write!(f, "content must not be empty"),
            Self::BodyTooLong { max } => write!(f, "content must be at most {max} characters"),
        }
    }
}

impl std::error::Error for ContentValidationError {}

/// Validated text body shared by posts and comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Body(String);

impl Body {
    /// Validate a body. Surrounding whitespace is preserved; only
    /// whitespace-only input is rejected.
    pub fn new(raw: impl Into<String>) -> Result<Self, ContentValidationError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(ContentValidationError::EmptyBody);
        }
        if raw.chars().count() > BODY_MAX {
            return Err(ContentValidationError::BodyTooLong { max: BODY_MAX });
        }
        Ok(Self(raw))
    }

    /// Borrow the body text.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<Body> for String {
    fn from(value: Body) -> Self {
        value.0
    }
}

impl TryFrom<String> for Body {
    type Error = ContentValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// A post authored by a user; the root of a comment forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A comment on a post, optionally replying to another comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub author_id: UserId,
    pub parent_id: Option<CommentId>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Post read model annotated with its current like count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    #[serde(flatten)]
    pub post: Post,
    pub like_count: u64,
}

/// Comment read model annotated with its current like count.
///
/// This is the flat input of [`crate::domain::build_comment_forest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRecord {
    #[serde(flatten)]
    pub comment: Comment,
    pub like_count: u64,
}

impl CommentRecord {
    /// Wrap a comment with no likes yet.
    pub fn unliked(comment: Comment) -> Self {
        Self {
            comment,
            like_count: 0,
        }
    }
}

/// Values for inserting a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub author_id: UserId,
    pub content: Body,
    pub created_at: DateTime<Utc>,
}

/// Values for inserting a comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub post_id: PostId,
    pub author_id: UserId,
    pub parent_id: Option<CommentId>,
    pub content: Body,
    pub created_at: DateTime<Utc>,
}
