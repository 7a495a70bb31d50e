//! Scribeflow error types

use thiserror::Error;

/// Scribeflow error type
///
/// Only fatal conditions surface as `Error`. Transient status-check failures
/// and secondary vectorization failures degrade operation outcomes instead
/// (see [`crate::publish::PublishOutcome`]) and are logged, not raised.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// An initial process or publish request did not succeed. Fatal and
    /// user-visible; the operation is aborted without retry.
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Processing did not complete within the polling ceiling. Fatal and
    /// user-visible, distinct from a request failure.
    #[error("Processing of artifact {artifact_id} timed out after {waited_secs}s")]
    PollTimeout {
        /// Artifact whose processing never completed
        artifact_id: String,
        /// Total time spent polling before giving up
        waited_secs: u64,
    },

    /// The collaborator backend returned a malformed or unexpected response
    #[error("Backend error: {0}")]
    Backend(String),

    /// Publish was invoked with no destination selected
    #[error("Invalid publish request: {0}")]
    InvalidPublish(String),

    /// A publish is already in flight for this session
    #[error("Publish already in progress")]
    PublishInFlight,

    /// An operation requires a loaded session
    #[error("No session loaded")]
    NoSession,

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for scribeflow operations
pub type Result<T> = std::result::Result<T, Error>;
