//! Error types for Tabrec

use std::io;
use thiserror::Error;

/// Result type for Tabrec operations
pub type Result<T> = std::result::Result<T, TabrecError>;

/// Errors that can occur in Tabrec
#[derive(Debug, Error)]
pub enum TabrecError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Observer could not attach to the target
    #[error("Failed to attach observer: {0}")]
    Attach(String),

    /// Remote property fetch exceeded its time budget
    #[error("Property fetch timed out after {timeout_ms} ms")]
    PropertyFetchTimeout {
        /// Configured timeout in milliseconds
        timeout_ms: u64,
    },

    /// Remote property fetch failed (context gone, protocol error)
    #[error("Property fetch failed: {0}")]
    PropertyFetch(String),

    /// Command issued against a non-recordable target
    #[error("Cannot perform {action} on {url_kind} pages: {url}")]
    InvalidTarget {
        /// Command that was attempted
        action: String,
        /// Human-readable classification of the URL
        url_kind: String,
        /// The offending URL
        url: String,
    },

    /// Command not valid in the current session state
    #[error("Cannot {command} while session is {state}")]
    InvalidState {
        /// Command that was attempted
        command: &'static str,
        /// Current session state
        state: &'static str,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Snapshot save/load failure
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Collaborator network failure (geo lookup)
    #[error("Network error: {0}")]
    Network(String),

    /// Serialization failure
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}
