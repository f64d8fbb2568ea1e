//! The archive trait and its implementations.

mod directory;
#[cfg(feature = "mock")]
mod memory;

pub use self::directory::DirectoryArchive;
#[cfg(feature = "mock")]
pub use self::memory::MemoryArchive;
use crate::Locator;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use tracing::instrument;

/// Longest redirect chain [`resolve`] will follow before giving up.
pub const MAX_REDIRECTS: usize = 8;

/// Resource lookup contract for a content-addressed archive.
///
/// All lookups are asynchronous; the rendering pipeline issues many of them
/// concurrently (one per stylesheet, script and image in a document).
///
/// # Examples
///
/// ```no_run
/// use zimview_archive::{Archive, error::Result};
///
/// async fn stylesheet(archive: &dyn Archive) -> Result<Option<String>> {
///     match archive.entry_by_title("-/s/style.css").await? {
///         Some(locator) => Ok(Some(archive.read_utf8(&locator).await?)),
///         None => Ok(None),
///     }
/// }
/// ```
#[async_trait]
pub trait Archive: Send + Sync {
    /// Identifier of the archive (usually the file name of the first file in
    /// the set). Used as the first component of every cache key.
    fn identifier(&self) -> &str;

    /// Look up an entry by its full title (`<namespace>/<path>`).
    ///
    /// Returns `Ok(None)` when no such entry exists. Redirect entries are
    /// returned as-is; see [`resolve_redirect()`](Self::resolve_redirect).
    async fn entry_by_title(&self, title: &str) -> Result<Option<Locator>>;

    /// Read an entry as UTF-8 text.
    async fn read_utf8(&self, locator: &Locator) -> Result<String>;

    /// Read an entry as raw bytes.
    async fn read_binary(&self, locator: &Locator) -> Result<Vec<u8>>;

    /// Resolve a redirect entry one hop.
    ///
    /// Returns [`NotARedirect`](crate::error::ErrorKind::NotARedirect) when
    /// called on a regular entry.
    async fn resolve_redirect(&self, locator: &Locator) -> Result<Locator>;
}

/// Look up `title` and follow redirects until a regular entry is reached.
///
/// Returns `Ok(None)` if the title does not exist; a redirect pointing at a
/// missing entry is [`NotFound`](crate::error::ErrorKind::NotFound). Chains longer than [`MAX_REDIRECTS`] are reported as
/// [`RedirectLoop`](crate::error::ErrorKind::RedirectLoop).
#[instrument(level = "debug", skip(archive), fields(archive = archive.identifier()))]
pub async fn resolve(archive: &dyn Archive, title: &str) -> Result<Option<Locator>> {
    let Some(mut locator) = archive.entry_by_title(title).await? else {
        return Ok(None);
    };
    for _ in 0..MAX_REDIRECTS {
        if !locator.is_redirect() {
            return Ok(Some(locator));
        }
        locator = archive.resolve_redirect(&locator).await?;
    }
    match locator.is_redirect() {
        true => exn::bail!(ErrorKind::RedirectLoop(title.to_string())),
        false => Ok(Some(locator)),
    }
}
