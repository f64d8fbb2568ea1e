//! Tiered asset cache.
//!
//! Resolved archive resources (documents, stylesheets, scripts, images) are
//! kept across sessions so that revisiting a page does not decompress the
//! same entries again. Three storage tiers exist with incompatible native
//! APIs; the [`Detector`] probes them once per session, in rank order, and the
//! winning tier sits behind the uniform [`Tier`] trait:
//!
//! 1. **Structured** ([`SqliteTier`]): transactional SQLite store.
//! 2. **Simple** ([`DirectoryTier`]): flat key/value files in a directory.
//! 3. **Memory** ([`MemoryTier`]): a map that lives as long as the process.
//!
//! [`CacheService`] is the only thing callers talk to. It routes document
//! keys (`archive@A/path.html`) through the last-visited-page path, consults
//! the persisted [`Preferences`] flags before any read or write, and never
//! lets a tier error escape.

mod capability;
pub mod error;
mod key;
mod preferences;
mod service;
pub mod tier;

pub use crate::capability::{Capability, Detector, DetectorOptions};
pub use crate::key::{Asset, CacheKey, is_document_path};
pub use crate::preferences::Preferences;
pub use crate::service::{CacheCount, CacheService, ClearScope, Outcome};
pub use crate::tier::{DirectoryTier, MemoryTier, SqliteTier, Tier, TierHandle};
