//! Shared helper utilities for backend integration tests.
//!
//! Integration tests compile as separate crates under `backend/tests/`, so
//! each suite pulls these helpers in with `mod support;`. Not every suite
//! uses every helper.
#![allow(dead_code)]

pub mod cluster_skip;
pub mod embedded_postgres;
pub mod feed_world;

/// Render a `postgres` error with the server message and SQLSTATE.
///
/// `postgres::Error`'s `Display` collapses database errors to `db error`,
/// which hides the cause in CI logs.
pub fn format_postgres_error(error: &postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let mut summary = format!(
        "postgres error {:?}: {}",
        db_error.code(),
        db_error.message()
    );
    if let Some(detail) = db_error.detail() {
        summary.push_str("; detail: ");
        summary.push_str(detail);
    }
    if let Some(hint) = db_error.hint() {
        summary.push_str("; hint: ");
        summary.push_str(hint);
    }
    summary
}
