//! Domain primitives, algorithms, and services.
//!
//! Purpose: define the feed entities (users, posts, comments, likes, and the
//! karma ledger), the pure comment-tree builder, and the services that
//! implement the driving ports in [`ports`]. Nothing here knows about
//! PostgreSQL; adapters live under `crate::outbound`.
//!
//! Public surface:
//! - Error (alias to `error::Error`) with its stable `ErrorCode`.
//! - Entities and identifiers: `User`, `Post`, `Comment`, `Like`,
//!   `KarmaTransaction`, and their id newtypes.
//! - `build_comment_forest` for assembling reply trees.
//! - Services: `LikeToggleService`, `LeaderboardService`, `FeedService`,
//!   `UserDirectoryService`.

pub mod comment_tree;
pub mod content;
pub mod error;
mod feed_service;
pub mod ids;
pub mod karma;
pub mod leaderboard;
mod leaderboard_service;
pub mod like;
mod like_toggle_service;
pub mod ports;
pub mod user;
mod user_directory_service;

pub use self::comment_tree::{CommentForest, CommentNode, build_comment_forest};
pub use self::content::{
    BODY_MAX, Body, Comment, CommentRecord, ContentValidationError, NewComment, NewPost, Post,
    PostRecord,
};
pub use self::error::{Error, ErrorCode};
pub use self::feed_service::FeedService;
pub use self::ids::{CommentId, KarmaTransactionId, LikeId, PostId};
pub use self::karma::{
    KarmaTotal, KarmaTransaction, KarmaWindow, NewKarmaTransaction, rank_karma, sum_karma,
};
pub use self::leaderboard::{
    LeaderboardEntry, LeaderboardLimit, LeaderboardRequest, LeaderboardSpan,
    LeaderboardValidationError, UserKarma, UserKarmaRequest,
};
pub use self::leaderboard_service::LeaderboardService;
pub use self::like::{
    COMMENT_LIKE_KARMA, Like, LikeState, LikeTarget, NewLike, POST_LIKE_KARMA, TargetKind,
};
pub use self::like_toggle_service::LikeToggleService;
pub use self::user::{USERNAME_MAX, User, UserId, UserValidationError, Username};
pub use self::user_directory_service::UserDirectoryService;
