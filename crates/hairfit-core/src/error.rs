//! Error types for hairfit.

use thiserror::Error;

/// Result type alias using hairfit's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for hairfit operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A gender or category with this name already exists
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Gender, category, or style not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uploaded image exceeds the configured maximum
    #[error("Payload too large: {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: u64, limit: u64 },

    /// A transform request is already in flight
    #[error("A transform is already in progress")]
    AlreadyProcessing,

    /// Backing store rejected a write because it is full
    #[error("Storage quota exceeded: {0}")]
    StorageQuotaExceeded(String),

    /// External image-generation provider failed
    #[error("Provider error: {0}")]
    Provider(String),

    /// Polling a provider exhausted its attempt budget
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation not allowed in the current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Another catalog edit session is still open
    #[error("A catalog edit session is already open")]
    EditInProgress,

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether a transform failure came from the network or a provider rather
    /// than from the caller's own input.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Error::Provider(_) | Error::Timeout(_) | Error::Request(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout(e.to_string())
        } else {
            Error::Request(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_duplicate_key() {
        let err = Error::DuplicateKey("gender 'male'".to_string());
        assert_eq!(err.to_string(), "Duplicate key: gender 'male'");
    }

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("category 'perm'".to_string());
        assert_eq!(err.to_string(), "Not found: category 'perm'");
    }

    #[test]
    fn test_error_display_payload_too_large() {
        let err = Error::PayloadTooLarge {
            size: 11,
            limit: 10,
        };
        assert_eq!(
            err.to_string(),
            "Payload too large: 11 bytes exceeds limit of 10 bytes"
        );
    }

    #[test]
    fn test_error_display_already_processing() {
        assert_eq!(
            Error::AlreadyProcessing.to_string(),
            "A transform is already in progress"
        );
    }

    #[test]
    fn test_error_display_storage_quota() {
        let err = Error::StorageQuotaExceeded("catalog is 6MB".to_string());
        assert_eq!(err.to_string(), "Storage quota exceeded: catalog is 6MB");
    }

    #[test]
    fn test_error_display_provider() {
        let err = Error::Provider("gemini returned 500".to_string());
        assert_eq!(err.to_string(), "Provider error: gemini returned 500");
    }

    #[test]
    fn test_error_display_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::Io(io_err);
        assert!(err.to_string().contains("I/O error:"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_is_upstream() {
        assert!(Error::Provider("x".into()).is_upstream());
        assert!(Error::Timeout("x".into()).is_upstream());
        assert!(Error::Request("x".into()).is_upstream());
        assert!(!Error::AlreadyProcessing.is_upstream());
        assert!(!Error::InvalidInput("x".into()).is_upstream());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
