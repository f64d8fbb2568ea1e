//! Render Error Types
//!
//! Only the entrypoints return these. Once a render is under way, a resource
//! that cannot be resolved is logged and settled against its stage gate; it
//! never fails the render.

use derive_more::{Display, Error};

/// A render error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for render operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The requested document does not exist in the archive.
    #[display("not found in archive: {_0}")]
    NotFound(#[error(not(source))] String),
    /// A single resource could not be resolved.
    #[display("unresolved resource: {_0}")]
    Resource(#[error(not(source))] String),
    /// A newer render owns the surface.
    #[display("render {_0} was superseded")]
    Stale(#[error(not(source))] u64),
    /// The archive failed while reading.
    #[display("archive error")]
    Archive,
    /// The display surface could not be prepared.
    #[display("render surface `{_0}` failed")]
    Surface(#[error(not(source))] String),
    /// The spawned extraction task died.
    #[display("render task failed")]
    Task,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Archive | Self::Surface(_))
    }
}
