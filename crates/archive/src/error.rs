//! Archive Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// An archive error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// No entry exists for the locator.
    #[display("entry not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// A string could not be parsed as a `<namespace>/<path>` locator.
    #[display("invalid locator: {_0}")]
    InvalidLocator(#[error(not(source))] String),
    /// Title contains invalid characters or escapes the archive root.
    #[display("invalid path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// Redirect chain is longer than allowed, most likely a loop.
    #[display("too many redirects starting at {_0}")]
    RedirectLoop(#[error(not(source))] String),
    /// `resolve_redirect` was called on an entry that is not a redirect.
    #[display("not a redirect: {_0}")]
    NotARedirect(#[error(not(source))] String),
    /// Entry content is not valid UTF-8 text.
    #[display("entry is not valid UTF-8: {_0}")]
    InvalidUtf8(#[error(not(source))] String),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
