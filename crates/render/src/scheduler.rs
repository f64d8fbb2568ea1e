//! The stage-gated extraction scheduler.

use exn::ResultExt;
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, instrument, warn};
use zimview_archive::{ArchiveHandle, Locator, resolve};
use zimview_asyncutils::Gate;
use zimview_cache::{Asset, CacheKey, CacheService};
use zimview_rewrite::{Placeholder, event_functions, event_name, inline_stylesheet, lookup_title, with_source};

use crate::error::{ErrorKind, Result};
use crate::mime::{JAVASCRIPT, data_uri, image_mime};
use crate::page::{PageState, Phase, Stage};
use crate::surface::{EventBinding, SurfaceHandle};

/// Resolves a page's placeholders against an archive and fills them in on a
/// surface.
///
/// Images run eagerly and in parallel with the stage queue. The stages run
/// one after another, each waiting on the gate of the stage before it. The
/// surface is revealed as soon as the CSS gate settles, however the later
/// stages fare.
///
/// Only the page of the latest [`begin()`](Self::begin) may touch the
/// surface. An older page keeps resolving (and warming the cache) but its
/// fills, injections, bindings and reveal are dropped.
#[derive(Clone)]
pub struct Scheduler {
    archive: ArchiveHandle,
    cache: Arc<CacheService>,
    surface: SurfaceHandle,
    current: Arc<AtomicU64>,
}

/// Await `future` against one slot of `gate`. A failure is logged and
/// abandons the slot, so the gate still opens.
async fn settle<F>(gate: &Arc<Gate>, url: &str, future: F)
where
    F: Future<Output = Result<()>>,
{
    if let Err(e) = gate.track(future).await {
        warn!(url, gate = gate.name(), error = ?e, "resource not resolved");
    }
}

/// `<script>` element loading `body` from a `data:` URI.
fn script_element(body: &str) -> String {
    format!("<script src=\"{}\"></script>", data_uri(&format!("{JAVASCRIPT};charset=utf-8"), body.as_bytes()))
}

impl Scheduler {
    pub fn new(archive: ArchiveHandle, cache: Arc<CacheService>, surface: SurfaceHandle) -> Self {
        Self { archive, cache, surface, current: Arc::new(AtomicU64::new(0)) }
    }

    /// Start a new generation, making every page handed out before it stale.
    pub(crate) fn begin(&self) -> u64 {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Latest generation handed out by [`begin()`](Self::begin).
    pub fn generation(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    fn is_current(&self, page: &PageState) -> bool {
        page.generation() == self.generation()
    }

    /// Drive `page` to completion.
    #[instrument(skip_all, fields(generation = page.generation(), surface = self.surface.name()))]
    pub async fn run(&self, page: Arc<PageState>) {
        futures::join!(self.images(&page), self.stages(&page), self.reveal(&page));
        page.set_phase(Phase::Complete);
        info!(css = ?page.css.counts(), images = ?page.images.counts(), scripts = ?page.scripts.counts(), "render complete");
    }

    async fn stages(&self, page: &PageState) {
        while let Some(stage) = page.next_stage() {
            if let Some(gate) = page.prerequisite(stage) {
                gate.settled().await;
            }
            page.set_phase(stage.phase());
            debug!(%stage, "stage started");
            match stage {
                Stage::Css => self.stylesheets(page).await,
                Stage::Scripts => self.scripts(page).await,
                Stage::InlineScripts => self.inline_scripts(page).await,
                Stage::EventBindings => self.event_bindings(page).await,
            }
        }
    }

    async fn reveal(&self, page: &PageState) {
        page.css.settled().await;
        if !self.is_current(page) {
            debug!(generation = page.generation(), "stale page not revealed");
            return;
        }
        self.surface.set_progress(false).await;
        self.surface.reveal().await;
        debug!(css = ?page.css.counts(), "surface revealed");
    }

    async fn images(&self, page: &PageState) {
        join_all(page.images().iter().map(|p| settle(&page.images, &p.url, self.image(page, p)))).await;
    }

    async fn stylesheets(&self, page: &PageState) {
        join_all(page.stylesheets().iter().map(|p| settle(&page.css, &p.url, self.stylesheet(page, p)))).await;
    }

    async fn scripts(&self, page: &PageState) {
        join_all(page.scripts().iter().map(|p| settle(&page.scripts, &p.url, self.script(page, p)))).await;
    }

    /// Archive entry a placeholder refers to, with redirects followed.
    async fn locate(&self, placeholder: &Placeholder) -> Result<Locator> {
        let title = lookup_title(&placeholder.url).or_raise(|| ErrorKind::Resource(placeholder.url.clone()))?;
        match resolve(self.archive.as_ref(), &title).await.or_raise(|| ErrorKind::Archive)? {
            Some(locator) => Ok(locator),
            None => exn::bail!(ErrorKind::NotFound(title)),
        }
    }

    /// Swap a placeholder for its resolved element.
    ///
    /// Fails once a newer page owns the surface, even if the new document
    /// happens to carry the same placeholder.
    async fn fill(&self, page: &PageState, placeholder: &Placeholder, replacement: &str) -> Result<()> {
        if !self.is_current(page) {
            exn::bail!(ErrorKind::Stale(page.generation()));
        }
        match self.surface.replace_element(&placeholder.element, replacement).await {
            true => Ok(()),
            false => exn::bail!(ErrorKind::Resource(placeholder.url.clone())),
        }
    }

    async fn image(&self, page: &PageState, placeholder: &Placeholder) -> Result<()> {
        let locator = self.locate(placeholder).await?;
        let bytes = self.archive.read_binary(&locator).await.or_raise(|| ErrorKind::Archive)?;
        self.fill(page, placeholder, &with_source(placeholder, &data_uri(&image_mime(&locator.url), &bytes))).await?;
        debug!(url = %locator, bytes = bytes.len(), "image resolved");
        Ok(())
    }

    async fn stylesheet(&self, page: &PageState, placeholder: &Placeholder) -> Result<()> {
        let identifier = self.archive.identifier();
        let title = lookup_title(&placeholder.url).or_raise(|| ErrorKind::Resource(placeholder.url.clone()))?;
        // Keyed by the title as written, so a redirected stylesheet still
        // hits on the next visit.
        let key = CacheKey::new(identifier, &title).to_string();
        if let Some(css) = self.cache.get(&key).await.as_ref().and_then(Asset::as_text) {
            self.fill(page, placeholder, &inline_stylesheet(placeholder, css)).await?;
            debug!(key = %key, "stylesheet resolved from cache");
            return Ok(());
        }
        let locator = self.locate(placeholder).await?;
        let css = self.archive.read_utf8(&locator).await.or_raise(|| ErrorKind::Archive)?;
        let outcome = self.cache.set(&key, Asset::from(css.as_str())).await;
        self.fill(page, placeholder, &inline_stylesheet(placeholder, &css)).await?;
        debug!(key = %key, %outcome, "stylesheet resolved from archive");
        Ok(())
    }

    async fn script(&self, page: &PageState, placeholder: &Placeholder) -> Result<()> {
        let locator = self.locate(placeholder).await?;
        let bytes = self.archive.read_binary(&locator).await.or_raise(|| ErrorKind::Archive)?;
        self.fill(page, placeholder, &with_source(placeholder, &data_uri(JAVASCRIPT, &bytes))).await?;
        debug!(url = %locator, bytes = bytes.len(), "script resolved");
        Ok(())
    }

    /// Re-inject the lifted inline scripts, then the event sheet, as
    /// external scripts the sandbox will run.
    async fn inline_scripts(&self, page: &PageState) {
        if !self.is_current(page) {
            debug!(generation = page.generation(), "stale page, inline scripts dropped");
            return;
        }
        for script in page.inline_scripts() {
            self.surface.append_to_head(&script_element(script)).await;
        }
        if !page.event_sheet().is_empty() {
            self.surface.append_to_head(&script_element(page.event_sheet())).await;
        }
        debug!(count = page.inline_scripts().len(), "inline scripts injected");
    }

    async fn event_bindings(&self, page: &PageState) {
        if !self.is_current(page) {
            debug!(generation = page.generation(), "stale page, events not bound");
            return;
        }
        let content = self.surface.content().await;
        for handlers in event_functions(&content) {
            for function in &handlers.functions {
                let Some(event) = event_name(function) else {
                    warn!(function = %function, "not an event handler name");
                    continue;
                };
                let binding =
                    EventBinding { element: handlers.ordinal, event: event.to_string(), function: function.clone() };
                if !self.surface.bind_event(&binding).await {
                    warn!(function = %function, element = handlers.ordinal, "event not bound");
                }
            }
        }
    }
}
