//! Likes and their targets.
//!
//! A like points at exactly one post or exactly one comment. The enum makes
//! "both" and "neither" unrepresentable; the schema repeats the rule as a
//! CHECK constraint for rows written by anything else.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CommentId, LikeId, PostId, UserId};

/// Karma credited to a post's author for each like.
pub const POST_LIKE_KARMA: i32 = 5;
/// Karma credited to a comment's author for each like.
pub const COMMENT_LIKE_KARMA: i32 = 1;

/// Kind of entity a like applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Post,
    Comment,
}

impl TargetKind {
    /// Ledger amount awarded to the target's author per like.
    pub const fn karma_amount(self) -> i32 {
        match self {
            Self::Post => POST_LIKE_KARMA,
            Self::Comment => COMMENT_LIKE_KARMA,
        }
    }
}

/// The post or comment a like applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum LikeTarget {
    Post(PostId),
    Comment(CommentId),
}

impl LikeTarget {
    /// Kind of the targeted entity.
    pub const fn kind(self) -> TargetKind {
        match self {
            Self::Post(_) => TargetKind::Post,
            Self::Comment(_) => TargetKind::Comment,
        }
    }

    /// Targeted post, if any.
    pub const fn post_id(self) -> Option<PostId> {
        match self {
            Self::Post(id) => Some(id),
            Self::Comment(_) => None,
        }
    }

    /// Targeted comment, if any.
    pub const fn comment_id(self) -> Option<CommentId> {
        match self {
            Self::Post(_) => None,
            Self::Comment(id) => Some(id),
        }
    }
}

impl fmt::Display for LikeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Post(id) => id.fmt(f),
            Self::Comment(id) => id.fmt(f),
        }
    }
}

/// "User liked target" fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    pub id: LikeId,
    pub user_id: UserId,
    pub target: LikeTarget,
    pub created_at: DateTime<Utc>,
}

/// Values for inserting a like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLike {
    pub user_id: UserId,
    pub target: LikeTarget,
    pub created_at: DateTime<Utc>,
}

/// Result of a toggle: whether the actor likes the target afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
    pub liked: bool,
}

impl LikeState {
    pub const LIKED: Self = Self { liked: true };
    pub const UNLIKED: Self = Self { liked: false };
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TargetKind::Post, 5)]
    #[case(TargetKind::Comment, 1)]
    fn karma_amount_follows_policy(#[case] kind: TargetKind, #[case] expected: i32) {
        assert_eq!(kind.karma_amount(), expected);
    }

    #[rstest]
    fn target_exposes_exactly_one_identifier() {
        let post = LikeTarget::Post(PostId::new(4));
        assert_eq!(post.post_id(), Some(PostId::new(4)));
        assert_eq!(post.comment_id(), None);

        let comment = LikeTarget::Comment(CommentId::new(9));
        assert_eq!(comment.post_id(), None);
        assert_eq!(comment.comment_id(), Some(CommentId::new(9)));
        assert_eq!(comment.kind(), TargetKind::Comment);
    }

    #[rstest]
    fn target_serialises_with_type_tag() {
        let value = serde_json::to_value(LikeTarget::Comment(CommentId::new(2))).expect("json");
        assert_eq!(value, serde_json::json!({ "type": "comment", "id": 2 }));
    }
}
