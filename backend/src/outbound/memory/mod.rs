//! In-memory adapters for every driven port.
//!
//! [`InMemoryFeedStore`] mirrors the PostgreSQL schema's guarantees: unique
//! likes per user and target, one ledger entry per like, cascading deletes,
//! and bounded waits for a target lock. Services built on it behave the same
//! as with the Diesel adapters, which makes it the default backing for
//! scenario tests.

mod ledger;
mod store;

pub use ledger::InMemoryLikeLedgerTransaction;
pub use store::InMemoryFeedStore;
