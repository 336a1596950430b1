//! Result type alias for curation operations

use crate::error::CurationError;

/// Standard Result type for curation operations
pub type Result<T> = std::result::Result<T, CurationError>;

/// Extension trait for results whose failure must not abort sibling work.
pub trait ResultExt<T> {
    /// Log the error at a severity matching its recoverability and
    /// collapse the failure to `None`.
    fn log_and_continue(self) -> Option<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn log_and_continue(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(err) => {
                if err.is_recoverable() {
                    tracing::warn!("continuing after recoverable error: {err}");
                } else {
                    tracing::error!("unrecoverable curation error: {err}");
                }
                None
            }
        }
    }
}
