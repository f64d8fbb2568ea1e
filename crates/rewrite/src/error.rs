//! Rewrite Error Types
//!
//! Rewriting a document never fails: a scan that finds nothing is a no-op.
//! Errors only come from the helpers that interpret a single reference.

use derive_more::{Display, Error};

/// A rewrite error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for rewrite operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A resource reference could not be turned into an archive title, e.g.
    /// because of a broken percent-escape. The element should be skipped.
    #[display("malformed resource reference: {_0}")]
    MalformedReference(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // A reference is either well-formed or it isn't.
        false
    }
}
