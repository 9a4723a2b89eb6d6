//! Change Notifier error types

use thiserror::Error;

/// Change Notifier error type
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed inbound change batch or unknown statement value type
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Triple store query or update failed
    #[error("Store error: {0}")]
    Store(String),

    /// Durable outbox read or write failed
    #[error("Outbox error: {0}")]
    Outbox(String),

    /// Shape validation engine failed
    #[error("Match engine error: {0}")]
    MatchEngine(String),

    /// Digest rendering failed
    #[error("Render error: {0}")]
    Render(String),

    /// Digest could not be handed to the mail queue
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// One or more subscribers failed during a flush; their entries are kept
    #[error(
        "Partial flush: {delivered} delivered, {} failed ({})",
        .failed.len(),
        .failed.join(", ")
    )]
    PartialFlush {
        delivered: usize,
        failed: Vec<String>,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Whether the error was caused by the caller's request
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

/// Result type alias for Change Notifier operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(Error::InvalidInput("bad".to_string()).is_client_error());
        assert!(!Error::Store("down".to_string()).is_client_error());
        assert!(!Error::PartialFlush {
            delivered: 1,
            failed: vec!["http://example.org/u/1".to_string()],
        }
        .is_client_error());
    }

    #[test]
    fn test_partial_flush_message() {
        let err = Error::PartialFlush {
            delivered: 2,
            failed: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(err.to_string(), "Partial flush: 2 delivered, 2 failed (a, b)");
    }
}
