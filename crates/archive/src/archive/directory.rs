//! Directory-backed archive.
//!
//! An archive that has been extracted to disk, one file per entry at
//! `<root>/<namespace>/<path>`. Symbolic links inside the root are treated
//! as redirect entries.

use crate::error::{ErrorKind, Result};
use crate::path::validate as validate_title;
use crate::{Archive, Locator};
use async_trait::async_trait;
use exn::ResultExt;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Archive extracted to a local directory.
///
/// # Examples
///
/// ```no_run
/// use zimview_archive::archive::DirectoryArchive;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let archive = DirectoryArchive::new("/srv/archives/wikipedia_en_100")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DirectoryArchive {
    identifier: String,
    root: PathBuf,
}

impl DirectoryArchive {
    /// Open an extracted archive.
    ///
    /// The identifier is the final component of `root`. Returns
    /// [`InvalidPath`](ErrorKind::InvalidPath) if `root` is not an existing
    /// directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        // Opening happens once per session; not worth an async constructor.
        if !root.is_dir() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        let Some(identifier) = root.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            exn::bail!(ErrorKind::InvalidPath(root));
        };
        Ok(Self { identifier, root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn absolute_path(&self, title: &str) -> Result<PathBuf> {
        Ok(self.root.join(validate_title(title)?))
    }

    fn map_io_error(e: std::io::Error, title: &str) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(title.to_string()),
            _ => ErrorKind::Io(e),
        }
    }

    /// Turn a symlink target into a full title relative to the archive root.
    async fn redirect_target(&self, title: &str, link: &Path) -> Result<String> {
        let target = fs::read_link(link).await.map_err(|e| Self::map_io_error(e, title))?;
        let relative = match target.is_absolute() {
            true => target
                .strip_prefix(&self.root)
                .or_raise(|| ErrorKind::InvalidPath(target.clone()))?
                .to_path_buf(),
            false => Path::new(title).parent().unwrap_or(Path::new("")).join(&target),
        };
        let validated = validate_title(&relative)?;
        validated
            .to_str()
            .map(|s| s.replace(std::path::MAIN_SEPARATOR, "/"))
            .ok_or_else(|| exn::Exn::from(ErrorKind::InvalidPath(validated.clone())))
    }
}

#[async_trait]
impl Archive for DirectoryArchive {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn entry_by_title(&self, title: &str) -> Result<Option<Locator>> {
        let locator: Locator = title.parse()?;
        let path = self.absolute_path(title)?;
        let metadata = match fs::symlink_metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => exn::bail!(ErrorKind::Io(e)),
        };
        if metadata.file_type().is_symlink() {
            let target = self.redirect_target(title, &path).await?;
            return Ok(Some(locator.with_redirect(target)));
        }
        // Directories are not entries.
        Ok(metadata.is_file().then_some(locator))
    }

    async fn read_utf8(&self, locator: &Locator) -> Result<String> {
        let bytes = self.read_binary(locator).await?;
        String::from_utf8(bytes).map_err(|_| exn::Exn::from(ErrorKind::InvalidUtf8(locator.full_url())))
    }

    async fn read_binary(&self, locator: &Locator) -> Result<Vec<u8>> {
        let title = locator.full_url();
        let path = self.absolute_path(&title)?;
        fs::read(&path).await.map_err(|e| exn::Exn::from(Self::map_io_error(e, &title)))
    }

    async fn resolve_redirect(&self, locator: &Locator) -> Result<Locator> {
        let Some(target) = &locator.redirect else {
            exn::bail!(ErrorKind::NotARedirect(locator.full_url()));
        };
        match self.entry_by_title(target).await? {
            Some(resolved) => Ok(resolved),
            None => exn::bail!(ErrorKind::NotFound(target.clone())),
        }
    }
}
