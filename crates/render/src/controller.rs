//! The render surface controller.

use exn::ResultExt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, instrument, warn};
use zimview_archive::{ArchiveHandle, Locator};
use zimview_cache::CacheService;
use zimview_rewrite::{LinkTarget, Rewritten, anchors, base_path, root_classes};

use crate::error::{ErrorKind, Result};
use crate::page::PageState;
use crate::scheduler::Scheduler;
use crate::surface::{LinkBinding, SurfaceHandle};

/// Prepares the surface for each new document and hands it to the
/// [`Scheduler`].
///
/// Starting a render never cancels the one before it. The older render
/// finishes on its own, but once it is superseded the [`Scheduler`] keeps it
/// away from the surface; it may still warm the cache.
pub struct Controller {
    surface: SurfaceHandle,
    scheduler: Scheduler,
}

/// A render in flight.
#[derive(Debug)]
pub struct RenderHandle {
    page: Arc<PageState>,
    task: JoinHandle<()>,
}

impl RenderHandle {
    pub fn page(&self) -> &Arc<PageState> {
        &self.page
    }

    pub fn generation(&self) -> u64 {
        self.page.generation()
    }

    /// Wait for every stage to finish.
    pub async fn finished(self) -> Result<Arc<PageState>> {
        self.task.await.or_raise(|| ErrorKind::Task)?;
        Ok(self.page)
    }
}

impl Controller {
    pub fn new(archive: ArchiveHandle, cache: Arc<CacheService>, surface: SurfaceHandle) -> Self {
        let scheduler = Scheduler::new(archive, cache, Arc::clone(&surface));
        Self { surface, scheduler }
    }

    pub fn surface(&self) -> &SurfaceHandle {
        &self.surface
    }

    /// Number of renders started so far.
    pub fn generation(&self) -> u64 {
        self.scheduler.generation()
    }

    /// Show `rewritten`, the document stored at `locator`.
    ///
    /// The surface is hidden behind the progress indicator, torn down and
    /// reloaded blank before the new content goes in. Resource extraction
    /// runs on a spawned task; the surface is revealed once the document's
    /// stylesheets have settled.
    #[instrument(skip_all, fields(locator = %locator, surface = self.surface.name()))]
    pub async fn render(&self, rewritten: &Rewritten, locator: &Locator) -> Result<RenderHandle> {
        let generation = self.scheduler.begin();
        if generation > 1 {
            debug!(generation, "previous render left to finish on its own");
        }
        self.surface.set_progress(true).await;
        self.surface.teardown().await;
        self.surface.load_blank().await?;

        self.surface.replace_root(&rewritten.document).await;
        if let Some(classes) = root_classes(&rewritten.document) {
            self.surface.add_body_classes(&classes).await;
        }
        self.surface.push_history(&locator.full_url()).await;
        self.bind_links(&rewritten.document, &base_path(locator)).await;

        let page = Arc::new(PageState::discover(rewritten).with_generation(generation));
        let task = tokio::spawn({
            let scheduler = self.scheduler.clone();
            let page = Arc::clone(&page);
            async move { scheduler.run(page).await }.in_current_span()
        });
        Ok(RenderHandle { page, task })
    }

    /// External links already open elsewhere; every other link is left to
    /// the host.
    async fn bind_links(&self, document: &str, base: &str) {
        for anchor in anchors(document, base) {
            if matches!(anchor.target, LinkTarget::External(_)) {
                continue;
            }
            let binding = LinkBinding { element: anchor.ordinal, target: anchor.target };
            if !self.surface.bind_link(&binding).await {
                warn!(element = anchor.ordinal, link = %binding.target, "link not bound");
            }
        }
    }
}
