//! Classified errors for the coaching core and the share-link authorizer.

use crate::db::repository::RepositoryError;

pub type CoachResult<T> = Result<T, CoachError>;

#[derive(Debug, thiserror::Error)]
pub enum CoachError {
    /// Malformed or missing required input; raised before any write.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Authenticated, but not allowed to touch the target resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// An external capability (analysis, profile lookup) failed or timed out.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(#[source] RepositoryError),
}

impl CoachError {
    /// Stable machine-readable code, also used as the HTTP error code.
    pub fn code(&self) -> &'static str {
        match self {
            CoachError::InvalidInput(_) => "INVALID_INPUT",
            CoachError::NotFound(_) => "NOT_FOUND",
            CoachError::Forbidden(_) => "FORBIDDEN",
            CoachError::Unauthenticated(_) => "UNAUTHENTICATED",
            CoachError::Conflict(_) => "CONFLICT",
            CoachError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            CoachError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

impl From<RepositoryError> for CoachError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { message, .. } => CoachError::NotFound(message),
            RepositoryError::ValidationError { message, .. } => CoachError::InvalidInput(message),
            RepositoryError::ConflictError { message, .. } => CoachError::Conflict(message),
            other => CoachError::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::ErrorContext;

    #[test]
    fn test_repository_error_classification() {
        let e: CoachError = RepositoryError::not_found("Call 9 not found").into();
        assert!(matches!(e, CoachError::NotFound(ref m) if m == "Call 9 not found"));

        let e: CoachError = RepositoryError::validation("bad duration").into();
        assert_eq!(e.code(), "INVALID_INPUT");

        let e: CoachError =
            RepositoryError::conflict_with_context("dup", ErrorContext::new("insert_share")).into();
        assert_eq!(e.code(), "CONFLICT");

        let e: CoachError = RepositoryError::connection("down").into();
        assert!(matches!(e, CoachError::Storage(_)));
        assert_eq!(e.code(), "STORAGE_ERROR");
    }
}
