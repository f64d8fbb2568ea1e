//! Cache Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. These never leave [`CacheService`](crate::CacheService):
//! its public operations turn every tier error into an
//! [`Outcome`](crate::Outcome), an absent value, or a log event.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("database error")]
    Database,
    #[display("database migration error")]
    Migration,
    /// Filesystem operation in the directory tier or preference file failed.
    #[display("I/O error: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
    /// Stored entry could not be decoded.
    #[display("invalid cache data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
    /// Key cannot be represented by the tier.
    #[display("invalid cache key: {_0}")]
    InvalidKey(#[error(not(source))] String),
    /// Unrecognised `clear` scope.
    #[display("invalid clear scope: {_0} (expected `lastpages` or `all`)")]
    InvalidScope(#[error(not(source))] String),
    /// Preference file exists but could not be parsed.
    #[display("invalid preferences file: {}", _0.display())]
    InvalidPreferences(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database | Self::Io(_))
    }
}
