//! Command-line Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A command error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for commands.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    #[display("could not load preferences")]
    Preferences,
    #[display("could not open archive at {}", _0.display())]
    Archive(#[error(not(source))] PathBuf),
    #[display("nothing to resume in {_0}")]
    NothingToResume(#[error(not(source))] String),
    #[display("render failed")]
    Render,
}
