//! Translate driver errors into [`RepositoryError`].

use mongodb::error::{Error as DriverError, ErrorKind, WriteFailure};
use tracing::debug;

use crate::domain::ports::RepositoryError;

/// Server code for a unique index violation.
const DUPLICATE_KEY: i32 = 11000;

/// Map a driver error. `unique_field` names the field behind the
/// collection's unique index, reported on duplicate-key failures.
pub(super) fn map_driver_error(error: &DriverError, unique_field: &str) -> RepositoryError {
    debug!(error = %error, "mongodb operation failed");
    match error.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY => {
            RepositoryError::duplicate(unique_field)
        }
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::ConnectionPoolCleared { .. }
        | ErrorKind::DnsResolve { .. } => RepositoryError::connection(error.to_string()),
        ErrorKind::BsonDeserialization(_) | ErrorKind::BsonSerialization(_) => {
            RepositoryError::corrupt(error.to_string())
        }
        _ => RepositoryError::query(error.to_string()),
    }
}

/// Shorthand for collections without a unique constraint.
pub(super) fn query_error(error: DriverError) -> RepositoryError {
    map_driver_error(&error, "_id")
}
