//! Error types for clipmark.

use thiserror::Error;

/// Result type alias using clipmark's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for clipmark operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Document not found
    #[error("Document not found: {0}")]
    DocumentNotFound(uuid::Uuid),

    /// Segment not found
    #[error("Segment not found: {0}")]
    SegmentNotFound(uuid::Uuid),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Business-rule violation (duplicate name, non-empty category, ...)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// External document provider failed
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider access lost: the document was deleted or permission revoked.
    /// Reconciliation treats this as an expected terminal state, not a bug.
    #[error("Provider access lost: {0}")]
    ProviderAccessLost(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Authentication/authorization failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Forbidden (authenticated but not authorized)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error marks the expected access-lost terminal state.
    pub fn is_access_lost(&self) -> bool {
        matches!(self, Error::ProviderAccessLost(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("watch folder".to_string());
        assert_eq!(err.to_string(), "Not found: watch folder");
    }

    #[test]
    fn test_error_display_document_not_found() {
        let id = Uuid::nil();
        let err = Error::DocumentNotFound(id);
        assert_eq!(err.to_string(), format!("Document not found: {}", id));
    }

    #[test]
    fn test_error_display_segment_not_found() {
        let id = Uuid::new_v4();
        let err = Error::SegmentNotFound(id);
        assert!(err.to_string().contains(&id.to_string()));
    }

    #[test]
    fn test_error_display_conflict() {
        let err = Error::Conflict("category is not empty".to_string());
        assert_eq!(err.to_string(), "Conflict: category is not empty");
    }

    #[test]
    fn test_error_display_provider_access_lost() {
        let err = Error::ProviderAccessLost("file deleted".to_string());
        assert_eq!(err.to_string(), "Provider access lost: file deleted");
        assert!(err.is_access_lost());
    }

    #[test]
    fn test_provider_error_is_not_access_lost() {
        let err = Error::Provider("rate limited".to_string());
        assert!(!err.is_access_lost());
    }

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("GOOGLE_CLIENT_ID not set".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: GOOGLE_CLIENT_ID not set"
        );
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number");
        assert!(json_err.is_err());

        let err: Error = json_err.unwrap_err().into();
        match err {
            Error::Serialization(msg) => {
                assert!(!msg.is_empty());
            }
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn test_result_type_ok() {
        fn get_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(get_result().unwrap(), 42);
    }
}
