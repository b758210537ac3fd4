//! Error shared by every persistence port.

use tracing::error;

use crate::domain::Error;

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by repository adapters.
    pub enum RepositoryError {
        /// The database could not be reached.
        Connection { message: String } => "repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "repository query failed: {message}",
        /// A unique index rejected the write.
        Duplicate { field: String } => "duplicate value for {field}",
        /// A stored document could not be mapped to a domain value.
        Corrupt { message: String } => "stored record is invalid: {message}",
    }
}

impl From<RepositoryError> for Error {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Connection { message } => {
                error!(error = %message, "database unavailable");
                Error::service_unavailable("database unavailable")
            }
            RepositoryError::Duplicate { field } => {
                Error::conflict(format!("{field} already exists"))
                    .with_details(serde_json::json!({ "field": field }))
            }
            other => {
                error!(error = %other, "repository failure");
                Error::internal(other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    #[rstest]
    #[case(RepositoryError::connection("refused"), ErrorCode::ServiceUnavailable)]
    #[case(RepositoryError::duplicate("email"), ErrorCode::Conflict)]
    #[case(RepositoryError::query("syntax"), ErrorCode::InternalError)]
    #[case(RepositoryError::corrupt("bad id"), ErrorCode::InternalError)]
    fn maps_to_domain_codes(#[case] err: RepositoryError, #[case] expected: ErrorCode) {
        assert_eq!(Error::from(err).code(), expected);
    }

    #[rstest]
    fn duplicate_names_the_field() {
        let err = Error::from(RepositoryError::duplicate("email"));
        assert_eq!(err.message(), "email already exists");
    }
}
