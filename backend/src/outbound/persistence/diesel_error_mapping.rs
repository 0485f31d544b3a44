//! Shared Diesel error classification for the feed repositories.
//!
//! Each repository owns its port error enum, so the helpers here take the
//! constructors to call instead of returning a concrete type.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// Database failure classes the repositories care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DieselFailure {
    /// Connection closed or unusable.
    Connection,
    /// A unique constraint rejected the write.
    UniqueViolation,
    /// A foreign key pointed at a missing row.
    ForeignKeyViolation,
    /// `lock_timeout` expired while waiting for a row lock.
    LockTimeout,
    /// Serialization failure or the transaction is already aborted.
    Aborted,
    /// Anything else.
    Query,
}

/// Extract a readable message from a pool error.
pub(crate) fn pool_error_message(error: PoolError) -> String {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    }
}

/// PostgreSQL reports an expired `lock_timeout` as SQLSTATE 55P03 with this
/// message; Diesel does not surface the SQLSTATE itself.
fn is_lock_timeout_message(message: &str) -> bool {
    message.contains("canceling statement due to lock timeout")
        || message.contains("could not obtain lock")
}

fn is_aborted_message(message: &str) -> bool {
    message.contains("current transaction is aborted")
        || message.contains("deadlock detected")
}

/// Classify a Diesel error and emit debug context.
pub(crate) fn classify_diesel_error(error: &DieselError, operation: &str) -> DieselFailure {
    match error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), %operation, "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(error),
            %operation,
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _)
        | DieselError::BrokenTransactionManager => DieselFailure::Connection,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            DieselFailure::UniqueViolation
        }
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
            DieselFailure::ForeignKeyViolation
        }
        DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => {
            DieselFailure::Aborted
        }
        DieselError::DatabaseError(_, info) if is_lock_timeout_message(info.message()) => {
            DieselFailure::LockTimeout
        }
        DieselError::DatabaseError(_, info) if is_aborted_message(info.message()) => {
            DieselFailure::Aborted
        }
        DieselError::RollbackErrorOnCommit { .. } | DieselError::RollbackTransaction => {
            DieselFailure::Aborted
        }
        _ => DieselFailure::Query,
    }
}

/// Map pool errors into a repository-specific connection error constructor.
pub(crate) fn map_basic_pool_error<E, C>(error: PoolError, connection: C) -> E
where
    C: FnOnce(String) -> E,
{
    connection(pool_error_message(error))
}

/// Map Diesel errors for repositories that only distinguish connection
/// failures from everything else.
pub(crate) fn map_basic_diesel_error<E, Q, C>(
    error: DieselError,
    operation: &str,
    query: Q,
    connection: C,
) -> E
where
    Q: FnOnce(String) -> E,
    C: FnOnce(String) -> E,
{
    match classify_diesel_error(&error, operation) {
        DieselFailure::Connection => connection(format!("{operation}: database connection error")),
        _ => query(format!("{operation}: {error}")),
    }
}
