use exn::ResultExt;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use zimview_archive::{ArchiveHandle, resolve};
use zimview_cache::CacheService;
use zimview_rewrite::{LinkTarget, rewrite};

use crate::controller::{Controller, RenderHandle};
use crate::error::{ErrorKind, Result};
use crate::surface::SurfaceHandle;

/// Opens articles from one archive.
pub struct Reader {
    archive: ArchiveHandle,
    cache: Arc<CacheService>,
    controller: Controller,
}

fn is_document(html: &str) -> bool {
    html.to_ascii_lowercase().contains("<html")
}

impl Reader {
    pub fn new(archive: ArchiveHandle, cache: Arc<CacheService>, surface: SurfaceHandle) -> Self {
        let controller = Controller::new(Arc::clone(&archive), Arc::clone(&cache), surface);
        Self { archive, cache, controller }
    }

    pub fn archive(&self) -> &ArchiveHandle {
        &self.archive
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Open the article `title` (`<namespace>/<path>`), following redirects.
    ///
    /// The remembered copy of the document is used when it is the one being
    /// asked for; anything read from the archive becomes the new remembered
    /// copy.
    #[instrument(skip(self), fields(archive = self.archive.identifier()))]
    pub async fn open(&self, title: &str) -> Result<RenderHandle> {
        let Some(locator) = resolve(self.archive.as_ref(), title).await.or_raise(|| ErrorKind::Archive)? else {
            exn::bail!(ErrorKind::NotFound(title.to_string()));
        };
        let identifier = self.archive.identifier();
        let path = locator.full_url();
        let raw = match self.cache.get_document(identifier, &path).await {
            Some(html) if is_document(&html) => {
                debug!(path = %path, "document from cache");
                html
            },
            _ => {
                let html = self.archive.read_utf8(&locator).await.or_raise(|| ErrorKind::Archive)?;
                let outcome = self.cache.set_document(identifier, &path, &html).await;
                debug!(path = %path, %outcome, "document from archive");
                html
            },
        };
        self.controller.render(&rewrite(&raw, &locator), &locator).await
    }

    /// Follow a link bound on the surface. Only links to other articles open
    /// anything; the surface handles the rest itself.
    pub async fn follow(&self, target: &LinkTarget) -> Result<Option<RenderHandle>> {
        match target {
            LinkTarget::Article(title) => self.open(title).await.map(Some),
            _ => Ok(None),
        }
    }

    /// Reopen the last page visited in this archive, if one is remembered.
    pub async fn resume(&self) -> Result<Option<RenderHandle>> {
        let Some(path) = self.cache.preferences().last_page(self.archive.identifier()) else {
            return Ok(None);
        };
        info!(path = %path, "resuming last visited page");
        self.open(&path).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{HeadlessSurface, RenderSurface};
    use rstest::rstest;
    use zimview_archive::archive::MemoryArchive;
    use zimview_cache::{Capability, Detector, DetectorOptions, Preferences};

    const PAGE: &str = "<html><head></head><body>archive copy</body></html>";

    fn reader(archive: MemoryArchive) -> (Reader, Arc<HeadlessSurface>) {
        let detector = Detector::new(DetectorOptions { force: Capability::Memory, ..Default::default() });
        let cache = Arc::new(CacheService::new(detector, Preferences::in_memory()));
        let surface = Arc::new(HeadlessSurface::new());
        (Reader::new(Arc::new(archive), cache, surface.clone()), surface)
    }

    #[rstest]
    #[case("<html><body></body></html>", true)]
    #[case("<!DOCTYPE html><HTML>", true)]
    #[case("", false)]
    #[case("<body>fragment</body>", false)]
    fn test_is_document(#[case] html: &str, #[case] expected: bool) {
        assert_eq!(is_document(html), expected);
    }

    #[tokio::test]
    async fn test_open_remembers_document() {
        let (reader, surface) = reader(MemoryArchive::with_entries([("A/page.html", PAGE)]));
        reader.open("A/page.html").await.unwrap().finished().await.unwrap();

        assert!(surface.content().await.contains("archive copy"));
        assert_eq!(reader.cache.preferences().last_page("archive").as_deref(), Some("A/page.html"));
        assert_eq!(reader.cache.get_document("archive", "A/page.html").await.as_deref(), Some(PAGE));
    }

    #[tokio::test]
    async fn test_open_prefers_remembered_copy() {
        let (reader, surface) = reader(MemoryArchive::with_entries([("A/page.html", PAGE)]));
        let cached = "<html><head></head><body>cached copy</body></html>";
        reader.cache.set_document("archive", "A/page.html", cached).await;
        reader.open("A/page.html").await.unwrap().finished().await.unwrap();
        assert!(surface.content().await.contains("cached copy"));
    }

    #[tokio::test]
    async fn test_open_ignores_remembered_fragment() {
        let (reader, surface) = reader(MemoryArchive::with_entries([("A/page.html", PAGE)]));
        reader.cache.set_document("archive", "A/page.html", "<p>not a document</p>").await;
        reader.open("A/page.html").await.unwrap().finished().await.unwrap();
        assert!(surface.content().await.contains("archive copy"));
    }

    #[tokio::test]
    async fn test_open_follows_redirect() {
        let archive = MemoryArchive::with_entries([("A/page.html", PAGE)]).with_redirect("A/old.html", "A/page.html");
        let (reader, surface) = reader(archive);
        reader.open("A/old.html").await.unwrap().finished().await.unwrap();
        assert_eq!(surface.snapshot().await.history, ["A/page.html"]);
    }

    #[tokio::test]
    async fn test_open_missing() {
        let (reader, _) = reader(MemoryArchive::default());
        let err = reader.open("A/missing.html").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_follow_article_link() {
        let first = r##"<html><head></head><body><a href="#top">up</a><a href="Next%20Page.html">next</a></body></html>"##;
        let archive = MemoryArchive::with_entries([("A/page.html", first), ("A/Next Page.html", PAGE)]);
        let (reader, surface) = reader(archive);
        reader.open("A/page.html").await.unwrap().finished().await.unwrap();

        let links = surface.snapshot().await.links;
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].target, LinkTarget::Fragment("top".into()));
        assert!(reader.follow(&links[0].target).await.unwrap().is_none());

        reader.follow(&links[1].target).await.unwrap().unwrap().finished().await.unwrap();
        let snapshot = surface.snapshot().await;
        assert!(snapshot.content.contains("archive copy"));
        assert_eq!(snapshot.history, ["A/page.html", "A/Next Page.html"]);
    }

    #[tokio::test]
    async fn test_resume() {
        let (reader, surface) = reader(MemoryArchive::with_entries([("A/page.html", PAGE)]));
        assert!(reader.resume().await.unwrap().is_none());

        reader.open("A/page.html").await.unwrap().finished().await.unwrap();
        surface.teardown().await;
        reader.resume().await.unwrap().unwrap().finished().await.unwrap();
        assert!(surface.content().await.contains("archive copy"));
        assert_eq!(reader.controller().generation(), 2);
    }
}
