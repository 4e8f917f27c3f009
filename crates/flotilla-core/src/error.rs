//! Error types for the flotilla provisioner
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for provisioner operations
pub type Result<T> = std::result::Result<T, Error>;

/// A single per-host failure observed during a displacement run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostFailure {
    /// Host label derived from the event path
    pub host: String,
    /// Task label derived from the event path
    pub task: String,
    /// Error string carried by the event
    pub error: String,
}

impl std::fmt::Display for HostFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Host: {}, Task: {}, Error: {}",
            self.host, self.task, self.error
        )
    }
}

/// Core error type for the provisioner
#[derive(Error, Debug)]
pub enum Error {
    /// Named cloud project does not exist
    #[error("project with name {0:?} not found")]
    ProjectNotFound(String),

    /// Malformed cloud resource identifier
    #[error("invalid resource identifier: {0}")]
    InvalidIdentifier(String),

    /// Configuration errors (including partial environment-variable sets)
    #[error("configuration error: {0}")]
    Config(String),

    /// Registrar response did not carry the expected structure
    #[error("registrar response parse error: {0}")]
    RemoteParse(String),

    /// Registrar refused the full-snapshot commit
    #[error("registrar rejected commit: {0}")]
    CommitRejected(String),

    /// One or more hosts failed during a displacement run
    ///
    /// Carries every `(host, task, error)` tuple collected while the
    /// event stream was drained.
    #[error("displacement failed on {} host task(s)", .0.len())]
    Displacement(Vec<HostFailure>),

    /// Topology store errors
    #[error("topology store error: {0}")]
    Topology(String),

    /// Cloud provider errors (transport or API)
    #[error("cloud provider error: {0}")]
    Cloud(String),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Network-related errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a "project not found" error
    pub fn project_not_found(name: impl Into<String>) -> Self {
        Self::ProjectNotFound(name.into())
    }

    /// Create an invalid-identifier error
    pub fn invalid_identifier(msg: impl Into<String>) -> Self {
        Self::InvalidIdentifier(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a remote-parse error
    pub fn remote_parse(msg: impl Into<String>) -> Self {
        Self::RemoteParse(msg.into())
    }

    /// Create a commit-rejected error
    pub fn commit_rejected(msg: impl Into<String>) -> Self {
        Self::CommitRejected(msg.into())
    }

    /// Create a topology store error
    pub fn topology(msg: impl Into<String>) -> Self {
        Self::Topology(msg.into())
    }

    /// Create a cloud provider error
    pub fn cloud(msg: impl Into<String>) -> Self {
        Self::Cloud(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// The failure tuples of a displacement error, if this is one
    pub fn host_failures(&self) -> Option<&[HostFailure]> {
        match self {
            Self::Displacement(failures) => Some(failures),
            _ => None,
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
