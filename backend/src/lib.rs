//! Discussion feed core: nested comment threads, idempotent like toggles, and
//! a karma leaderboard computed live from an append-only ledger.

pub mod config;
pub mod domain;
pub mod outbound;
pub mod telemetry;

pub use config::FeedSettings;
