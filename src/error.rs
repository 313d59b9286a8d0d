//! Error types for gitomatic
//!
//! Every failure the daemon can hit is one variant here. The sync loop
//! treats all of them as fatal: they propagate to `main`, get logged and
//! terminate the process.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for gitomatic operations
#[derive(Debug, Error)]
pub enum Error {
    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    #[error("Invalid interval '{value}': {reason}")]
    InvalidInterval { value: String, reason: String },

    #[error("Failed to read private key '{path}': {source}")]
    KeyLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File '{path}' does not contain a private key")]
    InvalidKey { path: PathBuf },

    #[error("Cannot expand '{path}': home directory is unknown")]
    HomeDirUnavailable { path: PathBuf },

    // ==========================================================================
    // Repository Access Errors
    // ==========================================================================
    #[error("Failed to open repository at '{path}': {source}")]
    RepositoryOpen {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("Failed to read working tree status: {source}")]
    Status {
        #[source]
        source: git2::Error,
    },

    #[error("Failed to list remotes: {source}")]
    RemoteList {
        #[source]
        source: git2::Error,
    },

    // ==========================================================================
    // Sync Stage Errors
    // ==========================================================================
    #[error("Failed to stage '{path}': {source}")]
    Stage {
        path: String,
        #[source]
        source: git2::Error,
    },

    #[error("Failed to create commit: {source}")]
    Commit {
        #[source]
        source: git2::Error,
    },

    #[error("Failed to pull from '{remote}': {message}")]
    Pull {
        remote: String,
        message: String,
        #[source]
        source: Option<git2::Error>,
    },

    #[error("Failed to push to '{remote}': {message}")]
    Push {
        remote: String,
        message: String,
        #[source]
        source: Option<git2::Error>,
    },

    // ==========================================================================
    // Catch-all
    // ==========================================================================
    #[error("Git operation failed: {message}")]
    Git {
        message: String,
        #[source]
        source: Option<git2::Error>,
    },
}

/// Result type alias for gitomatic operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<git2::Error> for Error {
    fn from(err: git2::Error) -> Self {
        Error::Git {
            message: err.message().to_string(),
            source: Some(err),
        }
    }
}

impl Error {
    /// Build a pull error from a libgit2 failure
    pub(crate) fn pull(remote: &str, source: git2::Error) -> Self {
        Error::Pull {
            remote: remote.to_string(),
            message: source.message().to_string(),
            source: Some(source),
        }
    }

    /// Build a push error from a libgit2 failure
    pub(crate) fn push(remote: &str, source: git2::Error) -> Self {
        Error::Push {
            remote: remote.to_string(),
            message: source.message().to_string(),
            source: Some(source),
        }
    }

    /// Returns true if this error is raised while building the configuration,
    /// before any cycle runs
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidInterval { .. }
                | Error::KeyLoad { .. }
                | Error::InvalidKey { .. }
                | Error::HomeDirUnavailable { .. }
        )
    }
}
