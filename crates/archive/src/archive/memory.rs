//! In-memory archive for testing.

use crate::error::{ErrorKind, Result};
use crate::{Archive, Locator};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

enum Entry {
    Content(Vec<u8>),
    Redirect(String),
}

/// In-memory archive for testing.
///
/// Entries are keyed by full title (`<namespace>/<path>`) and kept behind a
/// [`RwLock`] so entries can be added while a render is in flight.
///
/// # Examples
///
/// ```
/// use zimview_archive::archive::MemoryArchive;
/// use zimview_archive::{Archive, resolve};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let archive = MemoryArchive::with_entries([("-/s.css", "body{color:red}")])
///     .with_redirect("-/old.css", "-/s.css");
/// let locator = resolve(&archive, "-/old.css").await?.unwrap();
/// assert_eq!(archive.read_utf8(&locator).await?, "body{color:red}");
/// # Ok(())
/// # }
/// ```
pub struct MemoryArchive {
    identifier: String,
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryArchive {
    /// Create an archive pre-populated with content entries.
    ///
    /// Panics if any title is not a valid locator. If test setup is wrong,
    /// then the test should not pass.
    pub fn with_entries(entries: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = HashMap::new();
        for (title, data) in entries {
            let title = title.into();
            let Ok(locator) = title.parse::<Locator>() else {
                panic!("MemoryArchive::with_entries: invalid title {title}");
            };
            map.insert(locator.full_url(), Entry::Content(data.into()));
        }
        Self { identifier: "archive".to_string(), entries: RwLock::new(map) }
    }

    /// Add a redirect entry pointing at another full title.
    pub fn with_redirect(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.entries.get_mut().insert(from.into(), Entry::Redirect(to.into()));
        self
    }

    /// Change the archive identifier (defaults to `"archive"`).
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Add or replace a content entry.
    pub async fn insert(&self, title: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.entries.write().await.insert(title.into(), Entry::Content(data.into()));
    }
}

impl Default for MemoryArchive {
    fn default() -> Self {
        let entries: [(&str, &str); 0] = [];
        Self::with_entries(entries)
    }
}

#[async_trait]
impl Archive for MemoryArchive {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn entry_by_title(&self, title: &str) -> Result<Option<Locator>> {
        let locator: Locator = title.parse()?;
        let guard = self.entries.read().await;
        Ok(guard.get(&locator.full_url()).map(|entry| match entry {
            Entry::Content(_) => locator.clone(),
            Entry::Redirect(target) => locator.clone().with_redirect(target.clone()),
        }))
    }

    async fn read_utf8(&self, locator: &Locator) -> Result<String> {
        let bytes = self.read_binary(locator).await?;
        String::from_utf8(bytes).map_err(|_| exn::Exn::from(ErrorKind::InvalidUtf8(locator.full_url())))
    }

    async fn read_binary(&self, locator: &Locator) -> Result<Vec<u8>> {
        match self.entries.read().await.get(&locator.full_url()) {
            Some(Entry::Content(data)) => Ok(data.clone()),
            Some(Entry::Redirect(_)) | None => exn::bail!(ErrorKind::NotFound(locator.full_url())),
        }
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
