//! Tests for the in-memory content, user, and karma ledger adapters.

use super::*;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use rstest::{fixture, rstest};

use crate::domain::{Body, NewKarmaTransaction, NewLike, Username};
use crate::domain::ports::LikeLedgerRepository;

fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 12, minute, 0)
        .single()
        .expect("valid timestamp")
}

#[fixture]
fn store() -> InMemoryFeedStore {
    InMemoryFeedStore::new(Duration::from_millis(50))
}

async fn register(store: &InMemoryFeedStore, name: &str) -> UserId {
    let user = User::new(UserId::random(), Username::new(name).expect("valid username"));
    store.create(&user).await.expect("create user");
    user.id
}

async fn post(store: &InMemoryFeedStore, author: UserId, minute: u32) -> Post {
    store
        .create_post(&NewPost {
            author_id: author,
            content: Body::new("hello").expect("body"),
            created_at: at(minute),
        })
        .await
        .expect("create post")
}

async fn comment(
    store: &InMemoryFeedStore,
    author: UserId,
    post_id: PostId,
    parent_id: Option<CommentId>,
    minute: u32,
) -> Comment {
    store
        .create_comment(&NewComment {
            post_id,
            author_id: author,
            parent_id,
            content: Body::new("reply").expect("body"),
            created_at: at(minute),
        })
        .await
        .expect("create comment")
}

async fn like_with_karma(store: &InMemoryFeedStore, liker: UserId, target: LikeTarget) {
    let mut tx = store.begin().await.expect("begin");
    let author = tx
        .lock_target(target)
        .await
        .expect("lock")
        .expect("target exists");
    let like = tx
        .insert_like(&NewLike {
            user_id: liker,
            target,
            created_at: at(30),
        })
        .await
        .expect("insert like")
        .expect("new like");
    tx.insert_karma(&NewKarmaTransaction {
        beneficiary: author,
        amount: target.kind().karma_amount(),
        source_like: like.id,
        created_at: at(30),
    })
    .await
    .expect("insert karma");
    tx.commit().await.expect("commit");
}

#[rstest]
#[tokio::test]
async fn duplicate_username_is_rejected(store: InMemoryFeedStore) {
    register(&store, "alice").await;
    let clash = User::new(UserId::random(), Username::new("alice").expect("valid"));

    let err = store.create(&clash).await.expect_err("duplicate");

    assert_eq!(err, UserRepositoryError::duplicate_username("alice"));
}

#[rstest]
#[tokio::test]
async fn post_requires_existing_author(store: InMemoryFeedStore) {
    let err = store
        .create_post(&NewPost {
            author_id: UserId::random(),
            content: Body::new("orphan").expect("body"),
            created_at: at(0),
        })
        .await
        .expect_err("missing author");

    assert!(matches!(err, ContentRepositoryError::MissingReference { .. }));
}

#[rstest]
#[tokio::test]
async fn identifiers_increase_per_table(store: InMemoryFeedStore) {
    let author = register(&store, "alice").await;
    let first = post(&store, author, 0).await;
    let second = post(&store, author, 1).await;
    let reply = comment(&store, author, first.id, None, 2).await;

    assert_eq!(first.id, PostId::new(1));
    assert_eq!(second.id, PostId::new(2));
    assert_eq!(reply.id, CommentId::new(1));
}

#[rstest]
#[tokio::test]
async fn posts_list_newest_first_with_like_counts(store: InMemoryFeedStore) {
    let author = register(&store, "alice").await;
    let fan = register(&store, "bob").await;
    let older = post(&store, author, 0).await;
    let newer = post(&store, author, 5).await;
    like_with_karma(&store, fan, LikeTarget::Post(older.id)).await;

    let records = store.list_posts().await.expect("list posts");

    let summary: Vec<(PostId, u64)> = records
        .iter()
        .map(|record| (record.post.id, record.like_count))
        .collect();
    assert_eq!(summary, vec![(newer.id, 0), (older.id, 1)]);
}

#[rstest]
#[tokio::test]
async fn comments_are_filtered_by_post_and_ordered_by_creation(store: InMemoryFeedStore) {
    let author = register(&store, "alice").await;
    let first = post(&store, author, 0).await;
    let second = post(&store, author, 1).await;
    let late = comment(&store, author, first.id, None, 9).await;
    let early = comment(&store, author, first.id, None, 3).await;
    comment(&store, author, second.id, None, 4).await;

    let records = store
        .list_comments_for_posts(&[first.id])
        .await
        .expect("list comments");

    let ids: Vec<CommentId> = records.iter().map(|record| record.comment.id).collect();
    assert_eq!(ids, vec![early.id, late.id]);
}

#[rstest]
#[tokio::test]
async fn deleting_a_post_cascades_to_comments_likes_and_karma(store: InMemoryFeedStore) {
    let author = register(&store, "alice").await;
    let fan = register(&store, "bob").await;
    let doomed = post(&store, author, 0).await;
    let kept = post(&store, author, 1).await;
    let reply = comment(&store, author, doomed.id, None, 2).await;
    like_with_karma(&store, fan, LikeTarget::Post(doomed.id)).await;
    like_with_karma(&store, fan, LikeTarget::Comment(reply.id)).await;
    like_with_karma(&store, fan, LikeTarget::Post(kept.id)).await;

    assert!(store.delete_post(doomed.id).await.expect("delete"));

    assert_eq!(store.find_comment(reply.id).await.expect("find"), None);
    assert_eq!(store.likes().len(), 1);
    let ledger = store.karma_entries();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].amount, 5);
}

#[rstest]
#[tokio::test]
async fn deleting_a_comment_removes_its_replies(store: InMemoryFeedStore) {
    let author = register(&store, "alice").await;
    let parent_post = post(&store, author, 0).await;
    let root = comment(&store, author, parent_post.id, None, 1).await;
    let child = comment(&store, author, parent_post.id, Some(root.id), 2).await;
    let grandchild = comment(&store, author, parent_post.id, Some(child.id), 3).await;
    let sibling = comment(&store, author, parent_post.id, None, 4).await;

    assert!(store.delete_comment(root.id).await.expect("delete"));

    let remaining: Vec<CommentId> = store
        .list_comments_for_posts(&[parent_post.id])
        .await
        .expect("list")
        .into_iter()
        .map(|record| record.comment.id)
        .collect();
    assert_eq!(remaining, vec![sibling.id]);
    assert_eq!(store.find_comment(grandchild.id).await.expect("find"), None);
}

#[rstest]
#[tokio::test]
async fn deleting_missing_content_reports_false(store: InMemoryFeedStore) {
    assert!(!store.delete_post(PostId::new(404)).await.expect("delete"));
    assert!(!store.delete_comment(CommentId::new(404)).await.expect("delete"));
}

#[rstest]
#[tokio::test]
async fn leaderboard_joins_usernames_and_ranks(store: InMemoryFeedStore) {
    let author = register(&store, "alice").await;
    let commenter = register(&store, "carol").await;
    let fan = register(&store, "bob").await;
    let popular = post(&store, author, 0).await;
    let reply = comment(&store, commenter, popular.id, None, 1).await;
    like_with_karma(&store, fan, LikeTarget::Post(popular.id)).await;
    like_with_karma(&store, fan, LikeTarget::Comment(reply.id)).await;

    let window = KarmaWindow::trailing(at(45), ChronoDuration::hours(1));
    let board = store.leaderboard(window, 10).await.expect("leaderboard");

    let summary: Vec<(&str, i64)> = board
        .iter()
        .map(|entry| (entry.username.as_str(), entry.total))
        .collect();
    assert_eq!(summary, vec![("alice", 5), ("carol", 1)]);
}

#[rstest]
#[tokio::test]
async fn total_for_user_respects_window(store: InMemoryFeedStore) {
    let author = register(&store, "alice").await;
    let fan = register(&store, "bob").await;
    let liked = post(&store, author, 0).await;
    like_with_karma(&store, fan, LikeTarget::Post(liked.id)).await;

    let all_time = store.total_for_user(&author, None).await.expect("total");
    let stale_window = KarmaWindow::trailing(at(10), ChronoDuration::minutes(5));
    let windowed = store
        .total_for_user(&author, Some(stale_window))
        .await
        .expect("total");

    assert_eq!(all_time, 5);
    assert_eq!(windowed, 0);
}

#[rstest]
#[tokio::test]
async fn idle_target_locks_are_pruned(store: InMemoryFeedStore) {
    let author = register(&store, "alice").await;
    let liker = register(&store, "bob").await;
    for minute in 0..4 {
        let target = LikeTarget::Post(post(&store, author, minute).await.id);
        like_with_karma(&store, liker, target).await;
    }
    assert_eq!(store.shared.tracked_target_locks(), 1);

    let first = LikeTarget::Post(PostId::new(1));
    let held = store.hold_target_lock(first).await;
    let mut tx = store.begin().await.expect("begin");
    tx.lock_target(LikeTarget::Post(PostId::new(2)))
        .await
        .expect("lock second post");

    assert_eq!(store.shared.tracked_target_locks(), 2);

    tx.rollback().await.expect("rollback");
    drop(held);
    store.delete_post(PostId::new(3)).await.expect("delete post");
    assert_eq!(store.shared.tracked_target_locks(), 1);
}
