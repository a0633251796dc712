//! Error types for bundle synchronization.
//!
//! Every failure while processing a single binding is an [`Error`]. Failures
//! that prevent a run from starting at all (unreadable configuration file) are
//! a [`ConfigError`].

use std::path::PathBuf;

use thiserror::Error;

use crate::config::{SourceError, TargetKind};

/// Error raised while resolving or applying a single binding
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid binding declaration (missing name, unset or ambiguous source)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A referenced cluster object does not exist
    #[error("{kind} {name:?} not found")]
    NotFound { kind: String, name: String },

    /// The secret exists but carries no entry for the requested key
    #[error("key {key:?} not found in secret '{namespace}/{name}'")]
    KeyNotFound {
        namespace: String,
        name: String,
        key: String,
    },

    /// Reading a file source failed
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The target was modified between fetch and write
    #[error("{kind} {name:?} was modified concurrently, update rejected")]
    Conflict { kind: TargetKind, name: String },

    /// Kubernetes API or transport error
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
}

impl Error {
    /// Build a not-found error for a target resource
    pub fn target_not_found(kind: TargetKind, name: &str) -> Self {
        Error::NotFound {
            kind: kind.to_string(),
            name: name.to_string(),
        }
    }

    /// Check if this error indicates a not-found condition
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound { .. } => true,
            Error::Kube(kube::Error::Api(e)) => e.code == 404,
            _ => false,
        }
    }

    /// Check if this error is an optimistic-concurrency conflict
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::Conflict { .. } => true,
            Error::Kube(kube::Error::Api(e)) => e.code == 409,
            _ => false,
        }
    }

    /// Check if this error comes from the binding declaration itself
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}

impl From<SourceError> for Error {
    fn from(e: SourceError) -> Self {
        Error::Configuration(e.to_string())
    }
}

/// Result type alias for binding operations
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal error loading the configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}
