//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed repositories using Diesel ORM
//! - **memory**: process-local implementations of the same ports
//!
//! Adapters are thin translators between domain types and storage. They
//! contain no business logic.

pub mod memory;
pub mod persistence;
