//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the feed's driven ports, backed by PostgreSQL
//! through `diesel-async` with `bb8` connection pooling.
//!
//! # Architecture
//!
//! - **Thin adapters**: repositories translate between Diesel rows and
//!   domain types. Toggle rules and tree assembly stay in the domain.
//! - **Internal models**: row structs (`models.rs`) and table definitions
//!   (`schema.rs`) never leave this module.
//! - **Database-enforced invariants**: one like per user and target, one
//!   ledger entry per like, and cascading deletes are constraints in the
//!   schema, not application checks.
//!
//! # Example
//!
//! ```ignore
//! use karma_backend::outbound::persistence::{
//!     DbPool, DieselLikeLedgerRepository, PoolConfig, DEFAULT_LOCK_TIMEOUT,
//! };
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/feed")).await?;
//! let ledger = DieselLikeLedgerRepository::new(pool, DEFAULT_LOCK_TIMEOUT);
//! ```

mod diesel_content_repository;
mod diesel_error_mapping;
mod diesel_karma_ledger_repository;
mod diesel_like_ledger_repository;
mod diesel_user_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_content_repository::DieselContentRepository;
pub use diesel_karma_ledger_repository::DieselKarmaLedgerRepository;
pub use diesel_like_ledger_repository::{
    DEFAULT_LOCK_TIMEOUT, DieselLikeLedgerRepository, DieselLikeLedgerTransaction,
};
pub use diesel_user_repository::DieselUserRepository;
pub use migrations::{MIGRATIONS, MigrationError, run_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
