//! Error types and handling for curation operations

use thiserror::Error;

/// Main error type for curation operations
#[derive(Debug, Error)]
pub enum CurationError {
    /// The annotation service rejected or failed to resolve an alteration
    #[error("Lookup failed for '{alteration}': {message}")]
    LookupFailed { alteration: String, message: String },

    /// A field path does not address a live slot in the session
    #[error("Unparsable field path: {path}")]
    UnparsablePath { path: String },

    /// A candidate alteration matched an already accepted state
    #[error("Duplicate alteration(s) removed")]
    DuplicateRejected,

    /// Generic internal errors
    #[error("Internal error: {message}")]
    InternalError { message: String },
}

/// Error kind enumeration for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lookup,
    Path,
    Duplicate,
    Internal,
}

impl CurationError {
    /// Get the error kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CurationError::LookupFailed { .. } => ErrorKind::Lookup,
            CurationError::UnparsablePath { .. } => ErrorKind::Path,
            CurationError::DuplicateRejected => ErrorKind::Duplicate,
            CurationError::InternalError { .. } => ErrorKind::Internal,
        }
    }

    /// Check if this error is recoverable (the session stays consistent
    /// and processing of sibling items can continue)
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Lookup | ErrorKind::Duplicate)
    }

    /// Create a lookup failure error
    pub fn lookup_failed(alteration: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LookupFailed {
            alteration: alteration.into(),
            message: message.into(),
        }
    }

    /// Create an unparsable path error
    pub fn unparsable_path(path: impl Into<String>) -> Self {
        Self::UnparsablePath { path: path.into() }
    }

    /// Create an internal error
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }
}
