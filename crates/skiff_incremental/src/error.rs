//! Error types for build operations.

use skiff_common::InternalError;

/// Errors that abort a build.
///
/// User-facing problems (files that fail to check, outputs that fail to
/// write, missing roots) are diagnostics, not errors: the build continues and
/// reports them. A `BuildError` means the build did not complete; only a
/// build cancelled while writing outputs persists its state, so the
/// artifacts it did not write stay pending.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// An I/O error occurred while reading or writing build state.
    #[error("build I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Another build holds the lock on this build root.
    #[error("failed to lock build root at {path}: {source}")]
    Lock {
        /// The lock file path.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The build-info document could not be serialized.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },

    /// The build was cancelled before it completed.
    #[error("build cancelled")]
    Cancelled,

    /// An engine invariant was violated.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

/// Reasons a persisted build-info document is rejected.
///
/// Never surfaced to the user as a failure: a rejected document is a cache
/// miss and the build starts from scratch.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The bytes are not a well-formed build-info document.
    #[error("malformed build info: {0}")]
    Json(#[from] serde_json::Error),

    /// The document was written by an incompatible encoder.
    #[error("build info version {found} is incompatible with {expected}")]
    IncompatibleVersion {
        /// The version found in the document.
        found: String,
        /// The version this encoder writes.
        expected: &'static str,
    },

    /// The document parsed but its contents are inconsistent.
    #[error("corrupt build info: {0}")]
    Corrupt(String),
}
