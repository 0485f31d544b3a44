//! Process-local store backing every driven port.
//!
//! All tables live behind one `std::sync::Mutex` that is only held for the
//! duration of a synchronous read or write. Per-target locks for like
//! toggles are separate `tokio` mutexes so a waiting toggle never blocks the
//! runtime.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;

use crate::domain::ports::{
    ContentRepository, ContentRepositoryError, KarmaLedgerRepository, KarmaLedgerRepositoryError,
    UserRepository, UserRepositoryError,
};
use crate::domain::{
    Comment, CommentId, CommentRecord, KarmaTransaction, KarmaTransactionId, KarmaWindow,
    LeaderboardEntry, Like, LikeId, LikeTarget, NewComment, NewPost, Post, PostId, PostRecord,
    User, UserId, rank_karma, sum_karma,
};

/// Committed rows. Identifiers come from per-table sequences that never
/// reuse a value, even after a rollback.
#[derive(Debug, Default)]
pub(super) struct Tables {
    pub users: HashMap<UserId, User>,
    pub posts: BTreeMap<PostId, Post>,
    pub comments: BTreeMap<CommentId, Comment>,
    pub likes: BTreeMap<LikeId, Like>,
    pub karma: BTreeMap<KarmaTransactionId, KarmaTransaction>,
    next_post: i64,
    next_comment: i64,
    next_like: i64,
    next_karma: i64,
}

fn bump(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

impl Tables {
    pub fn next_post_id(&mut self) -> PostId {
        PostId::new(bump(&mut self.next_post))
    }

    pub fn next_comment_id(&mut self) -> CommentId {
        CommentId::new(bump(&mut self.next_comment))
    }

    pub fn next_like_id(&mut self) -> LikeId {
        LikeId::new(bump(&mut self.next_like))
    }

    pub fn next_karma_id(&mut self) -> KarmaTransactionId {
        KarmaTransactionId::new(bump(&mut self.next_karma))
    }

    /// Author of the target, or `None` when it does not exist.
    pub fn target_author(&self, target: LikeTarget) -> Option<UserId> {
        match target {
            LikeTarget::Post(id) => self.posts.get(&id).map(|post| post.author_id),
            LikeTarget::Comment(id) => self.comments.get(&id).map(|comment| comment.author_id),
        }
    }

    pub fn like_count(&self, target: LikeTarget) -> u64 {
        self.likes.values().filter(|like| like.target == target).count() as u64
    }

    /// Remove likes matching `doomed` together with the ledger entries they
    /// produced.
    fn remove_likes_where(&mut self, doomed: impl Fn(&Like) -> bool) {
        let like_ids: Vec<LikeId> = self
            .likes
            .values()
            .filter(|like| doomed(like))
            .map(|like| like.id)
            .collect();
        for like_id in &like_ids {
            self.likes.remove(like_id);
        }
        self.karma
            .retain(|_, entry| !like_ids.contains(&entry.source_like));
    }

    /// Remove a comment and every reply beneath it, cascading to likes.
    fn remove_comment_subtree(&mut self, root: CommentId) {
        let mut doomed = vec![root];
        let mut frontier = vec![root];
        while let Some(parent) = frontier.pop() {
            let children: Vec<CommentId> = self
                .comments
                .values()
                .filter(|comment| comment.parent_id == Some(parent))
                .map(|comment| comment.id)
                .collect();
            doomed.extend(children.iter().copied());
            frontier.extend(children);
        }
        for id in &doomed {
            self.comments.remove(id);
        }
        self.remove_likes_where(|like| {
            like.target
                .comment_id()
                .is_some_and(|comment_id| doomed.contains(&comment_id))
        });
    }

    fn remove_post(&mut self, post_id: PostId) {
        self.posts.remove(&post_id);
        let comment_ids: Vec<CommentId> = self
            .comments
            .values()
            .filter(|comment| comment.post_id == post_id)
            .map(|comment| comment.id)
            .collect();
        self.comments.retain(|_, comment| comment.post_id != post_id);
        self.remove_likes_where(|like| match like.target {
            LikeTarget::Post(id) => id == post_id,
            LikeTarget::Comment(id) => comment_ids.contains(&id),
        });
    }
}

pub(super) struct Shared {
    tables: Mutex<Tables>,
    target_locks: Mutex<HashMap<LikeTarget, Arc<AsyncMutex<()>>>>,
    pub lock_timeout: Duration,
}

impl Shared {
    pub fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The lock guarding likes on `target`, created on first use.
    ///
    /// Entries nobody holds or waits on are pruned first, so the map only
    /// tracks targets in use.
    pub fn target_lock(&self, target: LikeTarget) -> Arc<AsyncMutex<()>> {
        let mut locks = self.target_locks();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(target).or_default())
    }

    fn target_locks(&self) -> MutexGuard<'_, HashMap<LikeTarget, Arc<AsyncMutex<()>>>> {
        self.target_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    pub fn tracked_target_locks(&self) -> usize {
        self.target_locks().len()
    }
}

/// In-memory implementation of the user, content, karma ledger, and like
/// ledger ports.
///
/// Clones share the same tables. Suited to tests and single-process demos;
/// nothing is persisted.
#[derive(Clone)]
pub struct InMemoryFeedStore {
    pub(super) shared: Arc<Shared>,
}

impl InMemoryFeedStore {
    /// Create an empty store whose like toggles wait at most `lock_timeout`
    /// for a target lock.
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                tables: Mutex::new(Tables::default()),
                target_locks: Mutex::new(HashMap::new()),
                lock_timeout,
            }),
        }
    }

    /// Snapshot of every committed ledger entry, oldest first.
    pub fn karma_entries(&self) -> Vec<KarmaTransaction> {
        self.shared.tables().karma.values().cloned().collect()
    }

    /// Snapshot of every committed like.
    pub fn likes(&self) -> Vec<Like> {
        self.shared.tables().likes.values().cloned().collect()
    }

    /// Committed likes on `target`.
    pub fn like_count(&self, target: LikeTarget) -> u64 {
        self.shared.tables().like_count(target)
    }

    /// Hold the toggle lock for `target` until the returned guard drops.
    ///
    /// Lets callers simulate a long-running competing transaction.
    pub async fn hold_target_lock(&self, target: LikeTarget) -> tokio::sync::OwnedMutexGuard<()> {
        self.shared.target_lock(target).lock_owned().await
    }
}

impl Default for InMemoryFeedStore {
    fn default() -> Self {
        Self::new(crate::outbound::persistence::DEFAULT_LOCK_TIMEOUT)
    }
}

#[async_trait]
impl UserRepository for InMemoryFeedStore {
    async fn create(&self, user: &User) -> Result<(), UserRepositoryError> {
        let mut tables = self.shared.tables();
        if tables
            .users
            .values()
            .any(|existing| existing.username == user.username)
        {
            return Err(UserRepositoryError::duplicate_username(
                user.username.as_str(),
            ));
        }
        if tables.users.contains_key(&user.id) {
            return Err(UserRepositoryError::query(format!(
                "user {} already exists",
                user.id
            )));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserRepositoryError> {
        Ok(self.shared.tables().users.get(id).cloned())
    }
}

#[async_trait]
impl ContentRepository for InMemoryFeedStore {
    async fn create_post(&self, post: &NewPost) -> Result<Post, ContentRepositoryError> {
        let mut tables = self.shared.tables();
        if !tables.users.contains_key(&post.author_id) {
            return Err(ContentRepositoryError::missing_reference(format!(
                "author {} does not exist",
                post.author_id
            )));
        }
        let stored = Post {
            id: tables.next_post_id(),
            author_id: post.author_id,
            content: post.content.as_str().to_owned(),
            created_at: post.created_at,
        };
        tables.posts.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn create_comment(
        &self,
        comment: &NewComment,
    ) -> Result<Comment, ContentRepositoryError> {
        let mut tables = self.shared.tables();
        if !tables.users.contains_key(&comment.author_id) {
            return Err(ContentRepositoryError::missing_reference(format!(
                "author {} does not exist",
                comment.author_id
            )));
        }
        if !tables.posts.contains_key(&comment.post_id) {
            return Err(ContentRepositoryError::missing_reference(format!(
                "{} does not exist",
                comment.post_id
            )));
        }
        if let Some(parent_id) = comment.parent_id
            && !tables.comments.contains_key(&parent_id)
        {
            return Err(ContentRepositoryError::missing_reference(format!(
                "{parent_id} does not exist"
            )));
        }
        let stored = Comment {
            id: tables.next_comment_id(),
            post_id: comment.post_id,
            author_id: comment.author_id,
            parent_id: comment.parent_id,
            content: comment.content.as_str().to_owned(),
            created_at: comment.created_at,
        };
        tables.comments.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_post(&self, id: PostId) -> Result<Option<Post>, ContentRepositoryError> {
        Ok(self.shared.tables().posts.get(&id).cloned())
    }

    async fn find_comment(
        &self,
        id: CommentId,
    ) -> Result<Option<Comment>, ContentRepositoryError> {
        Ok(self.shared.tables().comments.get(&id).cloned())
    }

    async fn delete_post(&self, id: PostId) -> Result<bool, ContentRepositoryError> {
        // Deleting a row waits for any toggle holding its lock, as a row
        // lock would.
        let _guard = self
            .shared
            .target_lock(LikeTarget::Post(id))
            .lock_owned()
            .await;
        let mut tables = self.shared.tables();
        if !tables.posts.contains_key(&id) {
            return Ok(false);
        }
        tables.remove_post(id);
        Ok(true)
    }

    async fn delete_comment(&self, id: CommentId) -> Result<bool, ContentRepositoryError> {
        let _guard = self
            .shared
            .target_lock(LikeTarget::Comment(id))
            .lock_owned()
            .await;
        let mut tables = self.shared.tables();
        if !tables.comments.contains_key(&id) {
            return Ok(false);
        }
        tables.remove_comment_subtree(id);
        Ok(true)
    }

    async fn list_posts(&self) -> Result<Vec<PostRecord>, ContentRepositoryError> {
        let tables = self.shared.tables();
        let mut records: Vec<PostRecord> = tables
            .posts
            .values()
            .map(|post| PostRecord {
                like_count: tables.like_count(LikeTarget::Post(post.id)),
                post: post.clone(),
            })
            .collect();
        records.sort_by(|a, b| {
            b.post
                .created_at
                .cmp(&a.post.created_at)
                .then_with(|| b.post.id.cmp(&a.post.id))
        });
        Ok(records)
    }

    async fn list_comments_for_posts(
        &self,
        post_ids: &[PostId],
    ) -> Result<Vec<CommentRecord>, ContentRepositoryError> {
        let tables = self.shared.tables();
        let mut records: Vec<CommentRecord> = tables
            .comments
            .values()
            .filter(|comment| post_ids.contains(&comment.post_id))
            .map(|comment| CommentRecord {
                like_count: tables.like_count(LikeTarget::Comment(comment.id)),
                comment: comment.clone(),
            })
            .collect();
        records.sort_by(|a, b| {
            a.comment
                .created_at
                .cmp(&b.comment.created_at)
                .then_with(|| a.comment.id.cmp(&b.comment.id))
        });
        Ok(records)
    }
}

#[async_trait]
impl KarmaLedgerRepository for InMemoryFeedStore {
    async fn leaderboard(
        &self,
        window: KarmaWindow,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, KarmaLedgerRepositoryError> {
        let tables = self.shared.tables();
        rank_karma(tables.karma.values(), &window, limit)
            .into_iter()
            .map(|ranked| {
                let user = tables.users.get(&ranked.user_id).ok_or_else(|| {
                    KarmaLedgerRepositoryError::query(format!(
                        "ledger beneficiary {} has no user row",
                        ranked.user_id
                    ))
                })?;
                Ok(LeaderboardEntry {
                    user_id: ranked.user_id,
                    username: user.username.as_str().to_owned(),
                    total: ranked.total,
                })
            })
            .collect()
    }

    async fn total_for_user(
        &self,
        user_id: &UserId,
        window: Option<KarmaWindow>,
    ) -> Result<i64, KarmaLedgerRepositoryError> {
        let tables = self.shared.tables();
        Ok(sum_karma(tables.karma.values(), user_id, window.as_ref()))
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
