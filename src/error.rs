//! Error types for pattern matching and document handling
//!
//! Errors fall into four groups: user input problems (bad patterns, bad
//! document files, I/O), cancellation, internal consistency failures, and
//! out-of-range indices. The `is_*` helpers let callers decide how to report.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Two wildcarded patterns declare a different number of wildcards.
    #[error("pattern '{pattern}' has {found} wildcard(s), expected {expected} like the other patterns")]
    InconsistentWildcardCount {
        pattern: String,
        expected: usize,
        found: usize,
    },

    #[error("malformed document {path}: {message}")]
    MalformedDocument { path: PathBuf, message: String },

    #[error("document {path} has version {version}, newest supported is {supported}")]
    UnsupportedVersion {
        path: PathBuf,
        version: u32,
        supported: u32,
    },

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize document: {0}")]
    Json(#[from] serde_json::Error),

    /// `~` could not be expanded because no home directory is known.
    #[error("cannot expand '~': home directory is not set")]
    HomeDirectory,

    #[error("layout {rows}x{columns} cannot host {patterns} pattern(s)")]
    LayoutTooSmall {
        rows: usize,
        columns: usize,
        patterns: usize,
    },

    #[error("{found} caption template(s) given for {expected} pattern(s)")]
    CaptionTemplateCount { expected: usize, found: usize },

    #[error("document has no file path yet; save it under a name first")]
    NoDocumentPath,

    /// Matching was cancelled from the progress callback.
    #[error("operation cancelled")]
    Cancelled,

    #[error("invalid regular expression generated for pattern '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The globber and the translated regex disagree. Always a defect.
    #[error("internal error: {0}")]
    Internal(String),

    #[error("instance index {index} out of range (have {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn malformed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::MalformedDocument {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Errors that should be shown to the user as a plain message
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::InconsistentWildcardCount { .. }
                | Error::MalformedDocument { .. }
                | Error::UnsupportedVersion { .. }
                | Error::Io { .. }
                | Error::Json(_)
                | Error::HomeDirectory
                | Error::LayoutTooSmall { .. }
                | Error::CaptionTemplateCount { .. }
                | Error::NoDocumentPath
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Errors that indicate a bug rather than bad input
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Error::Internal(_) | Error::InvalidRegex { .. } | Error::IndexOutOfRange { .. }
        )
    }
}
