//! Error types shared by the API client and the upload engine.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for upload operations.
pub type UploadResult<T> = Result<T, UploadError>;

/// Errors that can occur while replacing or uploading files.
#[derive(Debug, Error)]
pub enum UploadError {
    /// A local file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    /// The service answered with a non-success status.
    #[error("remote API returned HTTP {status}: {body}")]
    RemoteApi { status: u16, body: String },

    /// The request never produced a response (connect failure, timeout, ...).
    #[error("request to {url} failed: {reason}")]
    Transport {
        url: String,
        reason: String,
        timed_out: bool,
    },

    /// The partition plan broke the contiguity/coverage contract.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// A part kept failing after its retry budget was spent.
    #[error("part {part_number} failed after {attempts} attempt(s): {last_error}")]
    PartTransferFailed {
        part_number: u32,
        attempts: u32,
        last_error: Box<UploadError>,
    },

    /// The service disagrees with the local digest or size.
    #[error("checksum mismatch for {name}: expected {expected}, remote reported {actual}")]
    ChecksumMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    /// The local descriptor cannot be registered (e.g. an empty file).
    #[error("invalid upload descriptor for {}: {reason}", path.display())]
    InvalidDescriptor { path: PathBuf, reason: String },

    /// A session operation was invoked from the wrong lifecycle state.
    #[error("invalid session transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    /// A response body did not have the expected shape.
    #[error("failed to decode {context}: {reason}")]
    Decode { context: String, reason: String },

    /// The batch was cancelled before this step could run.
    #[error("upload cancelled")]
    Cancelled,
}

impl UploadError {
    /// Whether retrying the same request may succeed.
    ///
    /// Server errors, request timeouts, rate limiting and transport failures
    /// are transient. Every other 4xx and all local/protocol errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RemoteApi { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            Self::Transport { .. } => true,
            _ => false,
        }
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RemoteApi { status, .. } => Some(*status),
            Self::PartTransferFailed { last_error, .. } => last_error.status(),
            _ => None,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn decode(context: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode {
            context: context.into(),
            reason: reason.to_string(),
        }
    }
}
