//! Error types for docmap

use thiserror::Error;

/// Core error type for docmap operations
#[derive(Error, Debug)]
pub enum DocmapError {
    /// Missing or invalid store configuration (for example an unset URI).
    /// Fatal for the configuration until it is corrected; never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid namespace: {0}")]
    InvalidNamespace(String),

    /// The pool could not lend a connection within the acquire timeout
    #[error("Connection pool exhausted: {0}")]
    PoolExhausted(String),

    #[error("Connection error: {0}")]
    Connection(String),

    /// Conversion between a map and a native document failed
    #[error("Codec error: {0}")]
    Codec(String),

    /// The store rejected an insert, update, delete or read
    #[error("Store operation failed: {0}")]
    Store(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocmapError {
    /// Whether retrying the same call could succeed.
    ///
    /// Configuration, namespace and codec errors are deterministic and are
    /// never worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DocmapError::PoolExhausted(_)
                | DocmapError::Connection(_)
                | DocmapError::Driver(_)
                | DocmapError::Timeout(_)
        )
    }
}

/// Result type alias for docmap operations
pub type Result<T> = std::result::Result<T, DocmapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DocmapError::Configuration("URI is not set".into());
        assert_eq!(err.to_string(), "Configuration error: URI is not set");
        assert_eq!(DocmapError::Cancelled.to_string(), "Cancelled");
    }

    #[test]
    fn test_transient_classification() {
        assert!(DocmapError::PoolExhausted("busy".into()).is_transient());
        assert!(DocmapError::Connection("refused".into()).is_transient());
        assert!(!DocmapError::Configuration("no uri".into()).is_transient());
        assert!(!DocmapError::Codec("bad json".into()).is_transient());
        assert!(!DocmapError::Cancelled.is_transient());
    }
}
