//! Archive collaborator contract.
//!
//! The rendering pipeline never parses archive files itself. Everything it
//! needs from an archive goes through the narrow [`Archive`] trait: look up a
//! title, read an entry as text or bytes, and follow redirects. Two reference
//! implementations live here:
//!
//! - [`DirectoryArchive`](archive::DirectoryArchive): an archive extracted to
//!   disk as `<root>/<namespace>/<path>`, with symlinks acting as redirects.
//! - [`MemoryArchive`](archive::MemoryArchive) (feature `mock`): an in-memory
//!   archive for tests.

pub mod archive;
pub mod error;
mod locator;
mod path;

pub use crate::archive::{Archive, MAX_REDIRECTS, resolve};
pub use crate::locator::Locator;
pub use crate::path::validate as validate_title;
use std::sync::Arc;

pub type ArchiveHandle = Arc<dyn Archive + Send + Sync>;
