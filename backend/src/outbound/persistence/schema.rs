//! Diesel table definitions for the feed schema.
//!
//! Kept in step with `backend/migrations` by hand; the column order matches
//! the `CREATE TABLE` statements.

diesel::table! {
    /// Registered users. Karma is never stored here.
    users (id) {
        id -> Uuid,
        #[max_length = 150]
        username -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Top-level posts, each the root of a comment forest.
    posts (id) {
        id -> Int8,
        author_id -> Uuid,
        content -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Comments; `parent_id` is null for top-level comments.
    comments (id) {
        id -> Int8,
        post_id -> Int8,
        author_id -> Uuid,
        parent_id -> Nullable<Int8>,
        content -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Likes; exactly one of `post_id` and `comment_id` is set.
    likes (id) {
        id -> Int8,
        user_id -> Uuid,
        post_id -> Nullable<Int8>,
        comment_id -> Nullable<Int8>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only karma ledger; `user_id` is the beneficiary.
    karma_transactions (id) {
        id -> Int8,
        user_id -> Uuid,
        amount -> Int4,
        source_like_id -> Int8,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(posts -> users (author_id));
diesel::joinable!(comments -> posts (post_id));
diesel::joinable!(karma_transactions -> users (user_id));
diesel::joinable!(karma_transactions -> likes (source_like_id));

diesel::allow_tables_to_appear_in_same_query!(comments, karma_transactions, likes, posts, users,);
