//! Driving port for reading the feed.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{CommentNode, Error, PostRecord};

/// A post with its comment forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostThread {
    #[serde(flatten)]
    pub post: PostRecord,
    pub comments: Vec<CommentNode>,
}

/// Driving port for the feed read path.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedQuery: Send + Sync {
    /// Every post, newest first, each with its nested comments in creation
    /// order.
    async fn list_feed(&self) -> Result<Vec<PostThread>, Error>;
}

/// Fixture query over an empty feed.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureFeedQuery;

#[async_trait]
impl FeedQuery for FixtureFeedQuery {
    async fn list_feed(&self) -> Result<Vec<PostThread>, Error> {
        Ok(Vec::new())
    }
}
