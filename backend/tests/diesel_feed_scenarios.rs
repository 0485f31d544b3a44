//! Feed scenarios against embedded PostgreSQL through the Diesel adapters.
//!
//! Each test runs on its own database cloned from a migrated template.
//! Suites skip with a `SKIP-TEST-CLUSTER` marker when `SKIP_TEST_CLUSTER` is
//! set and the embedded cluster cannot start.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use karma_backend::domain::ports::{
    DeletePostRequest, FeedCommand, FeedQuery, LikeLedgerRepository,
};
use karma_backend::domain::{ErrorCode, LikeState, LikeTarget, NewLike};
use karma_backend::outbound::persistence::{
    DbPool, DieselLikeLedgerRepository, PoolConfig,
};
use pg_embedded_setup_unpriv::TemporaryDatabase;
use postgres::{Client, NoTls};
use rstest::{fixture, rstest};
use tokio::runtime::Runtime;

mod support;

use support::cluster_skip::handle_cluster_setup_failure;
use support::embedded_postgres::provision_database;
use support::feed_world::DieselWorld;
use support::format_postgres_error;

const LOCK_TIMEOUT: Duration = Duration::from_millis(200);

// Field order is drop order: connections close before the database goes.
struct TestContext {
    world: Arc<DieselWorld>,
    pool: DbPool,
    runtime: Runtime,
    database_url: String,
    _database: TemporaryDatabase,
}

impl TestContext {
    fn count(&self, table: &str) -> i64 {
        let mut client =
            Client::connect(&self.database_url, NoTls).expect("connect for row count");
        let row = client
            .query_one(format!("SELECT COUNT(*) FROM {table}").as_str(), &[])
            .map_err(|err| format_postgres_error(&err))
            .expect("count rows");
        row.get(0)
    }
}

fn setup_context() -> Result<TestContext, String> {
    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let database = provision_database()?;
    let database_url = database.url().to_string();

    let config = PoolConfig::new(database_url.as_str())
        .with_max_size(8)
        .with_min_idle(Some(1));
    let pool = runtime
        .block_on(async { DbPool::new(config).await })
        .map_err(|err| err.to_string())?;

    Ok(TestContext {
        world: Arc::new(DieselWorld::diesel(pool.clone(), LOCK_TIMEOUT)),
        pool,
        runtime,
        database_url,
        _database: database,
    })
}

#[fixture]
fn context() -> Option<TestContext> {
    match setup_context() {
        Ok(ctx) => Some(ctx),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

#[rstest]
fn like_then_unlike_round_trips_through_the_ledger(context: Option<TestContext>) {
    let Some(ctx) = context else {
        eprintln!("SKIP-TEST-CLUSTER: like_then_unlike_round_trips_through_the_ledger skipped");
        return;
    };
    let world = Arc::clone(&ctx.world);

    ctx.runtime.block_on(async {
        let alice = world.register("alice").await;
        let bob = world.register("bob").await;
        let post = world.post(alice, "hello postgres").await;
        let target = LikeTarget::Post(post);

        assert_eq!(world.toggle(bob, target).await.expect("like"), LikeState::LIKED);
        let board = world.top(5).await;
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].username, "alice");
        assert_eq!(board[0].total, 5);

        assert_eq!(
            world.toggle(bob, target).await.expect("unlike"),
            LikeState::UNLIKED
        );
        assert!(world.top(5).await.is_empty());
        assert_eq!(world.karma_of(alice).await, 0);
    });

    assert_eq!(ctx.count("likes"), 0);
    assert_eq!(ctx.count("karma_transactions"), 0);
}

#[rstest]
fn post_likes_outrank_comment_likes(context: Option<TestContext>) {
    let Some(ctx) = context else {
        eprintln!("SKIP-TEST-CLUSTER: post_likes_outrank_comment_likes skipped");
        return;
    };
    let world = Arc::clone(&ctx.world);

    ctx.runtime.block_on(async {
        let x = world.register("xavier").await;
        let y = world.register("yasmin").await;
        let post = world.post(x, "worth liking").await;
        let reply = world.comment(y, post, None, "agreed").await;
        for name in ["u1", "u2", "u3", "u4", "u5"] {
            let fan = world.register(name).await;
            world
                .toggle(fan, LikeTarget::Post(post))
                .await
                .expect("post like");
        }
        let other = world.register("u6").await;
        world
            .toggle(other, LikeTarget::Comment(reply))
            .await
            .expect("comment like");

        let board = world.top(5).await;

        let summary: Vec<(_, i64)> = board
            .iter()
            .map(|entry| (entry.user_id, entry.total))
            .collect();
        assert_eq!(summary, vec![(x, 25), (y, 1)]);
    });
}

#[rstest]
fn feed_reads_nested_threads_with_like_counts(context: Option<TestContext>) {
    let Some(ctx) = context else {
        eprintln!("SKIP-TEST-CLUSTER: feed_reads_nested_threads_with_like_counts skipped");
        return;
    };
    let world = Arc::clone(&ctx.world);

    ctx.runtime.block_on(async {
        let alice = world.register("alice").await;
        let bob = world.register("bob").await;
        let older = world.post(alice, "older").await;
        let newer = world.post(bob, "newer").await;
        let c0 = world.comment(bob, older, None, "root").await;
        let c1 = world.comment(alice, older, Some(c0), "reply").await;
        world
            .toggle(alice, LikeTarget::Comment(c1))
            .await
            .expect("like own reply");

        let threads = world.feed.list_feed().await.expect("feed");

        let order: Vec<_> = threads.iter().map(|thread| thread.post.post.id).collect();
        assert_eq!(order, vec![newer, older]);
        let roots = &threads[1].comments;
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].id(), c0);
        assert_eq!(roots[0].replies[0].id(), c1);
        assert_eq!(roots[0].replies[0].record.like_count, 1);
    });
}

#[rstest]
fn deleting_a_post_cascades_through_the_ledger(context: Option<TestContext>) {
    let Some(ctx) = context else {
        eprintln!("SKIP-TEST-CLUSTER: deleting_a_post_cascades_through_the_ledger skipped");
        return;
    };
    let world = Arc::clone(&ctx.world);

    ctx.runtime.block_on(async {
        let alice = world.register("alice").await;
        let bob = world.register("bob").await;
        let post = world.post(alice, "short lived").await;
        let reply = world.comment(bob, post, None, "nice").await;
        world
            .toggle(bob, LikeTarget::Post(post))
            .await
            .expect("post like");
        world
            .toggle(alice, LikeTarget::Comment(reply))
            .await
            .expect("comment like");

        world
            .feed
            .delete_post(DeletePostRequest {
                actor: alice,
                post_id: post,
            })
            .await
            .expect("delete post");

        assert_eq!(world.karma_of(alice).await, 0);
        assert_eq!(world.karma_of(bob).await, 0);
    });

    assert_eq!(ctx.count("comments"), 0);
    assert_eq!(ctx.count("likes"), 0);
    assert_eq!(ctx.count("karma_transactions"), 0);
}

#[rstest]
fn held_row_lock_times_out_the_toggle(context: Option<TestContext>) {
    let Some(ctx) = context else {
        eprintln!("SKIP-TEST-CLUSTER: held_row_lock_times_out_the_toggle skipped");
        return;
    };
    let world = Arc::clone(&ctx.world);
    let (bob, post) = ctx.runtime.block_on(async {
        let alice = world.register("alice").await;
        let bob = world.register("bob").await;
        (bob, world.post(alice, "contended").await)
    });

    let mut client = Client::connect(&ctx.database_url, NoTls).expect("connect");
    let mut blocker = client.transaction().expect("begin blocker");
    blocker
        .query_one("SELECT id FROM posts WHERE id = $1 FOR UPDATE", &[&post.get()])
        .expect("lock post row");

    let err = ctx
        .runtime
        .block_on(world.toggle(bob, LikeTarget::Post(post)))
        .expect_err("lock wait exceeded");
    assert_eq!(err.code(), ErrorCode::LockTimeout);
    assert!(err.is_retryable());

    blocker.rollback().expect("release blocker");
    assert_eq!(ctx.count("likes"), 0);
    assert_eq!(ctx.count("karma_transactions"), 0);

    let retried = ctx
        .runtime
        .block_on(world.toggle(bob, LikeTarget::Post(post)))
        .expect("retry");
    assert_eq!(retried, LikeState::LIKED);
}

#[rstest]
fn dropped_transaction_leaves_no_rows(context: Option<TestContext>) {
    let Some(ctx) = context else {
        eprintln!("SKIP-TEST-CLUSTER: dropped_transaction_leaves_no_rows skipped");
        return;
    };
    let world = Arc::clone(&ctx.world);
    let ledger = DieselLikeLedgerRepository::new(ctx.pool.clone(), LOCK_TIMEOUT);

    ctx.runtime.block_on(async {
        let alice = world.register("alice").await;
        let bob = world.register("bob").await;
        let post = world.post(alice, "abandoned").await;

        let mut tx = ledger.begin().await.expect("begin");
        tx.lock_target(LikeTarget::Post(post))
            .await
            .expect("lock")
            .expect("post exists");
        tx.insert_like(&NewLike {
            user_id: bob,
            target: LikeTarget::Post(post),
            created_at: chrono::Utc::now(),
        })
        .await
        .expect("insert")
        .expect("new like");
        drop(tx);

        // The discarded connection must not keep the row locked.
        assert_eq!(
            world
                .toggle(bob, LikeTarget::Post(post))
                .await
                .expect("toggle after drop"),
            LikeState::LIKED
        );
    });

    assert_eq!(ctx.count("likes"), 1);
    assert_eq!(ctx.count("karma_transactions"), 1);
}

#[rstest]
fn concurrent_toggles_by_one_actor_stay_paired(context: Option<TestContext>) {
    let Some(ctx) = context else {
        eprintln!("SKIP-TEST-CLUSTER: concurrent_toggles_by_one_actor_stay_paired skipped");
        return;
    };
    let world = Arc::clone(&ctx.world);

    let mut outcomes: Vec<bool> = ctx.runtime.block_on(async {
        let alice = world.register("alice").await;
        let bob = world.register("bob").await;
        let target = LikeTarget::Post(world.post(alice, "raced").await);

        let attempts = (0..2).map(|_| {
            let world = Arc::clone(&world);
            tokio::spawn(async move { world.toggle(bob, target).await })
        });
        join_all(attempts)
            .await
            .into_iter()
            .map(|joined| joined.expect("task").expect("toggle").liked)
            .collect()
    });
    outcomes.sort_unstable();

    assert_eq!(outcomes, vec![false, true]);
    let likes = ctx.count("likes");
    assert_eq!(likes, ctx.count("karma_transactions"));
    assert!(likes <= 1);
}

#[rstest]
fn concurrent_first_likes_by_distinct_actors_all_count(context: Option<TestContext>) {
    let Some(ctx) = context else {
        eprintln!("SKIP-TEST-CLUSTER: concurrent_first_likes_by_distinct_actors_all_count skipped");
        return;
    };
    let world = Arc::clone(&ctx.world);

    let total = ctx.runtime.block_on(async {
        let alice = world.register("alice").await;
        let post = world.post(alice, "popular").await;
        let mut fans = Vec::new();
        for index in 0..6 {
            fans.push(world.register(&format!("fan{index}")).await);
        }

        let attempts = fans.into_iter().map(|fan| {
            let world = Arc::clone(&world);
            tokio::spawn(async move { world.toggle(fan, LikeTarget::Post(post)).await })
        });
        for joined in join_all(attempts).await {
            assert_eq!(joined.expect("task").expect("toggle"), LikeState::LIKED);
        }
        world.karma_of(alice).await
    });

    assert_eq!(total, 30);
    assert_eq!(ctx.count("karma_transactions"), 6);
}
