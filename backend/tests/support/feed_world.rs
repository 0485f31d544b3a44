//! A wired set of feed services for scenario tests.
//!
//! [`FeedWorld`] builds every domain service over one set of adapters and a
//! ticking clock, so scenarios read as a sequence of user actions. The same
//! scenarios run against the in-memory store and against PostgreSQL.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone, Utc};
use karma_backend::domain::ports::{
    ContentRepository, CreateCommentRequest, CreatePostRequest, FeedCommand, KarmaLedgerRepository,
    LeaderboardQuery, LikeLedgerRepository, LikeToggleCommand, RegisterUserRequest,
    ToggleLikeRequest, UserDirectory, UserRepository,
};
use karma_backend::domain::{
    CommentId, Error, FeedService, LeaderboardEntry, LeaderboardLimit, LeaderboardRequest,
    LeaderboardService, LeaderboardSpan, LikeState, LikeTarget, LikeToggleService, PostId,
    UserDirectoryService, UserId, UserKarmaRequest,
};
use karma_backend::outbound::memory::InMemoryFeedStore;
use karma_backend::outbound::persistence::{
    DbPool, DieselContentRepository, DieselKarmaLedgerRepository, DieselLikeLedgerRepository,
    DieselUserRepository,
};
use mockable::Clock;

/// Clock that advances one second on every read, starting at a fixed
/// instant, so rows created in sequence get distinct timestamps.
pub struct TickingClock {
    start: DateTime<Utc>,
    ticks: AtomicI64,
}

impl TickingClock {
    pub fn new() -> Self {
        Self {
            start: Utc
                .with_ymd_and_hms(2026, 10, 19, 12, 0, 0)
                .single()
                .expect("valid timestamp"),
            ticks: AtomicI64::new(0),
        }
    }

    /// Jump the clock forward without creating anything.
    pub fn advance(&self, by: chrono::Duration) {
        self.ticks.fetch_add(by.num_seconds(), Ordering::SeqCst);
    }
}

impl Clock for TickingClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        self.start + chrono::Duration::seconds(tick)
    }
}

/// Feed services over user, content, like ledger, and karma ledger adapters.
pub struct FeedWorld<U, C, L, K> {
    pub directory: UserDirectoryService<U>,
    pub feed: FeedService<C>,
    pub likes: LikeToggleService<L>,
    pub leaderboard: LeaderboardService<K, U>,
    pub clock: Arc<TickingClock>,
}

/// World backed by a single [`InMemoryFeedStore`].
pub type MemoryWorld =
    FeedWorld<InMemoryFeedStore, InMemoryFeedStore, InMemoryFeedStore, InMemoryFeedStore>;

/// World backed by the Diesel adapters.
pub type DieselWorld = FeedWorld<
    DieselUserRepository,
    DieselContentRepository,
    DieselLikeLedgerRepository,
    DieselKarmaLedgerRepository,
>;

impl MemoryWorld {
    pub fn in_memory(store: InMemoryFeedStore) -> Self {
        let store = Arc::new(store);
        Self::assemble(
            Arc::clone(&store),
            Arc::clone(&store),
            Arc::clone(&store),
            store,
        )
    }
}

impl DieselWorld {
    pub fn diesel(pool: DbPool, lock_timeout: Duration) -> Self {
        Self::assemble(
            Arc::new(DieselUserRepository::new(pool.clone())),
            Arc::new(DieselContentRepository::new(pool.clone())),
            Arc::new(DieselLikeLedgerRepository::new(pool.clone(), lock_timeout)),
            Arc::new(DieselKarmaLedgerRepository::new(pool)),
        )
    }
}

impl<U, C, L, K> FeedWorld<U, C, L, K>
where
    U: UserRepository,
    C: ContentRepository,
    L: LikeLedgerRepository,
    K: KarmaLedgerRepository,
{
    fn assemble(users: Arc<U>, content: Arc<C>, ledger: Arc<L>, karma: Arc<K>) -> Self {
        let clock = Arc::new(TickingClock::new());
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        Self {
            directory: UserDirectoryService::new(Arc::clone(&users)),
            feed: FeedService::new(content, Arc::clone(&dyn_clock)),
            likes: LikeToggleService::new(ledger, Arc::clone(&dyn_clock)),
            leaderboard: LeaderboardService::new(karma, users, dyn_clock),
            clock,
        }
    }

    pub async fn register(&self, username: &str) -> UserId {
        self.directory
            .register_user(RegisterUserRequest {
                username: username.to_owned(),
            })
            .await
            .expect("register user")
            .id
    }

    pub async fn post(&self, author: UserId, content: &str) -> PostId {
        self.feed
            .create_post(CreatePostRequest {
                author,
                content: content.to_owned(),
            })
            .await
            .expect("create post")
            .id
    }

    pub async fn comment(
        &self,
        author: UserId,
        post_id: PostId,
        parent_id: Option<CommentId>,
        content: &str,
    ) -> CommentId {
        self.feed
            .create_comment(CreateCommentRequest {
                author,
                post_id,
                parent_id,
                content: content.to_owned(),
            })
            .await
            .expect("create comment")
            .id
    }

    pub async fn toggle(&self, actor: UserId, target: LikeTarget) -> Result<LikeState, Error> {
        self.likes
            .toggle_like(ToggleLikeRequest { actor, target })
            .await
    }

    /// Leaderboard over the default 24 hour window.
    pub async fn top(&self, limit: usize) -> Vec<LeaderboardEntry> {
        self.leaderboard
            .top(LeaderboardRequest {
                span: LeaderboardSpan::default(),
                limit: LeaderboardLimit::new(limit).expect("valid limit"),
            })
            .await
            .expect("leaderboard")
    }

    /// All-time karma for one user.
    pub async fn karma_of(&self, user_id: UserId) -> i64 {
        self.leaderboard
            .user_karma(UserKarmaRequest {
                user_id,
                span: None,
            })
            .await
            .expect("user karma")
            .total
    }
}
