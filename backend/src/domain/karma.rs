//! Karma ledger entries and the aggregation rules over them.
//!
//! The ledger is append-only: entries are inserted when a like is created and
//! deleted together with their like. No entry is ever updated, and no user
//! row stores a running total, so every total below is recomputed from the
//! entries that exist right now.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{KarmaTransactionId, LikeId, UserId};

/// Immutable ledger entry crediting `beneficiary` for one like.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KarmaTransaction {
    pub id: KarmaTransactionId,
    pub beneficiary: UserId,
    pub amount: i32,
    pub source_like: LikeId,
    pub created_at: DateTime<Utc>,
}

/// Values for appending a ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewKarmaTransaction {
    pub beneficiary: UserId,
    pub amount: i32,
    pub source_like: LikeId,
    pub created_at: DateTime<Utc>,
}

/// Half-open time range `[start, end)` over ledger creation timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KarmaWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl KarmaWindow {
    /// Window ending at `now` and reaching back `span`.
    pub fn trailing(now: DateTime<Utc>, span: chrono::Duration) -> Self {
        Self {
            start: now - span,
            end: now,
        }
    }

    /// Whether `at` falls inside the window. The lower bound is inclusive.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}

/// Per-user total over a window, as ranked on the leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KarmaTotal {
    pub user_id: UserId,
    pub total: i64,
}

/// Sum of `amount` over entries for `user_id`, optionally restricted to a
/// window.
pub fn sum_karma<'a>(
    entries: impl IntoIterator<Item = &'a KarmaTransaction>,
    user_id: &UserId,
    window: Option<&KarmaWindow>,
) -> i64 {
    entries
        .into_iter()
        .filter(|entry| entry.beneficiary == *user_id)
        .filter(|entry| window.is_none_or(|w| w.contains(entry.created_at)))
        .map(|entry| i64::from(entry.amount))
        .sum()
}

/// Group entries inside `window` by beneficiary and rank them.
///
/// Totals sort descending; equal totals sort by user id ascending. Users with
/// no entries inside the window do not appear at all. At most `limit`
/// totals are returned.
pub fn rank_karma<'a>(
    entries: impl IntoIterator<Item = &'a KarmaTransaction>,
    window: &KarmaWindow,
    limit: usize,
) -> Vec<KarmaTotal> {
    let mut totals: HashMap<UserId, i64> = HashMap::new();
    for entry in entries {
        if window.contains(entry.created_at) {
            *totals.entry(entry.beneficiary).or_default() += i64::from(entry.amount);
        }
    }

    let mut ranked: Vec<KarmaTotal> = totals
        .into_iter()
        .map(|(user_id, total)| KarmaTotal { user_id, total })
        .collect();
    ranked.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.user_id.cmp(&b.user_id)));
    ranked.truncate(limit);
    ranked
}
