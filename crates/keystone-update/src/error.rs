//! Error types for each stage of the install pipeline

use keystone_core::BundleState;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::events::FailureStage;

/// A single path the cleaner could not remove
#[derive(Debug)]
pub struct RemovalFailure {
    pub path: PathBuf,
    pub source: io::Error,
}

impl fmt::Display for RemovalFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.source)
    }
}

/// Removal failures collected across one cleaning pass
#[derive(Error, Debug)]
#[error("failed to remove {} path(s): {}", .failures.len(), join_failures(.failures))]
pub struct CleanError {
    pub failures: Vec<RemovalFailure>,
}

fn join_failures(failures: &[RemovalFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Download and extraction failures
#[derive(Error, Debug)]
pub enum FetchError {
    /// The HTTP client could not be constructed
    #[error("failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request could not be sent or no response headers arrived
    #[error("failed to connect to {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status
    #[error("server returned {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// The connection failed while the body was streaming
    #[error("connection lost while downloading: {0}")]
    Transport(String),

    /// The payload was not a valid gzip-compressed tar archive, or an
    /// entry could not be written
    #[error("failed to extract archive: {0}")]
    Extraction(#[source] io::Error),

    /// The extraction task panicked or was aborted
    #[error("extraction task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// The download was cancelled by the caller
    #[error("download cancelled")]
    Cancelled,
}

impl FetchError {
    /// Whether the failure happened on the network side rather than while
    /// decoding or writing the archive
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Client(_) | Self::Request { .. } | Self::Status { .. } | Self::Transport(_)
        )
    }
}

/// Configuration merge failures
#[derive(Error, Debug)]
pub enum MergeError {
    /// The newly shipped configuration is missing
    #[error("file not found: {}", .path.display())]
    IncomingMissing { path: PathBuf },

    /// The newly shipped configuration is not a JSON object
    #[error("failed to parse new configuration {}: {message}", .path.display())]
    IncomingInvalid { path: PathBuf, message: String },

    /// Reading or writing a configuration file failed
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The merged document could not be serialized
    #[error("failed to serialize merged configuration: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failures while promoting the temp workspace into the live bundle
#[derive(Error, Debug)]
pub enum FinalizeError {
    /// A path the archive should have contained was not extracted
    #[error("expected {} in the extracted archive", .path.display())]
    MissingStaged { path: PathBuf },

    /// Copying, removing or creating a path failed
    #[error("{action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Merging the configuration failed
    #[error(transparent)]
    Config(#[from] MergeError),

    /// The bundle did not validate after promotion
    #[error("failed to validate bundle deployment: {state}")]
    ValidationFailed { state: BundleState },

    /// Finalization was cancelled between steps
    #[error("finalization cancelled")]
    Cancelled,
}

impl FinalizeError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

/// Top-level failure of an install attempt
#[derive(Error, Debug)]
pub enum InstallError {
    /// Stale artifacts could not be removed; no download was attempted
    #[error("An error occurred while cleaning the bundle before install: {0}")]
    Cleaning(#[from] CleanError),

    /// The archive could not be downloaded or extracted
    #[error("Failed to download archive: {0}")]
    Download(#[from] FetchError),

    /// The extracted bundle could not be promoted or validated
    #[error("An error occurred while deploying the bundle: {0}")]
    Finalize(#[from] FinalizeError),

    /// The attempt was cancelled before the bundle was touched
    #[error("Install cancelled before it started")]
    Cancelled,
}

impl InstallError {
    /// Pipeline stage that failed
    pub fn stage(&self) -> FailureStage {
        match self {
            Self::Cleaning(_) | Self::Cancelled => FailureStage::Cleaning,
            Self::Download(err) if err.is_transport() => FailureStage::Download,
            Self::Download(FetchError::Cancelled) => FailureStage::Download,
            Self::Download(_) => FailureStage::Extraction,
            Self::Finalize(FinalizeError::Config(_)) => FailureStage::Config,
            Self::Finalize(_) => FailureStage::Finalize,
        }
    }

    /// Whether the attempt ended because the caller cancelled it
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Cancelled
                | Self::Download(FetchError::Cancelled)
                | Self::Finalize(FinalizeError::Cancelled)
        )
    }
}
